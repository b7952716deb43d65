//! Common error types for clicktally-platform.

use thiserror::Error;

/// Platform-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The OS refused to register the hook (missing accessibility grant,
    /// insufficient privileges, no display server).
    #[error("hook registration refused: {0}")]
    PermissionDenied(String),
    /// A hook was already claimed by this process.
    #[error("a global click hook is already registered in this process")]
    AlreadyRegistered,
    #[error("global click hooks are not supported on this platform")]
    Unsupported,
    #[error("hook did not confirm registration in time")]
    StartTimeout,
    #[error("hook thread exited before registering")]
    HookExited,
    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
