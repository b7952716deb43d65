//! clicktally-platform: platform-specific I/O boundary for clicktally.
//!
//! This crate provides the global click listener: a background thread that
//! registers a system-wide mouse hook and turns every mouse-down into one
//! `clicktally_core::Click` on a channel.
//!
//! ## Module Structure
//!
//! - `error` - Common error types
//! - `input_hook` - Listener, click sink and per-platform hook backends
//! - `permissions` - Instructions shown when the OS refuses the hook

mod error;
mod input_hook;
mod permissions;

pub use error::{PlatformError, PlatformResult};

pub use input_hook::{
    native_backend, ButtonFilter, ClickListener, ClickSink, HookBackend, HookContext,
    ListenerConfig, ListenerState,
};

pub use permissions::permission_hint;
