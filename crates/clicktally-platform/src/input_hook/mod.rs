//! Global mouse-click hook.
//!
//! The listener owns a background thread on which a platform backend
//! registers the OS hook. The OS callback only calls `ClickSink::emit`, which
//! is a couple of atomic loads and a non-blocking channel send; counting
//! happens on the consumer side.
//!
//! Platform implementations:
//! - Windows: `SetWindowsHookExW(WH_MOUSE_LL)` (`windows_native.rs`)
//! - macOS: Core Graphics event tap (`macos.rs`)
//! - Linux: rdev crate (`rdev_impl.rs`)

use crate::error::{PlatformError, PlatformResult};
use clicktally_core::{Click, MouseButton};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[cfg(target_os = "windows")]
mod windows_native;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
mod rdev_impl;

/// Set once the native hook has been claimed; never cleared.
static NATIVE_HOOK_CLAIMED: AtomicBool = AtomicBool::new(false);

/// A platform hook implementation.
pub trait HookBackend: Send + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Runs on the listener's hook thread.
    ///
    /// Must register the OS hook, report the outcome through
    /// `HookContext::report_ready`, forward mouse-downs to `ctx.sink`, and
    /// return after `ctx.stop_rx` fires (or disconnects), unregistering the
    /// hook before returning.
    fn run(self: Box<Self>, ctx: HookContext);
}

/// Everything a backend gets from the listener.
pub struct HookContext {
    pub sink: ClickSink,
    pub stop_rx: Receiver<()>,
    ready_tx: Sender<PlatformResult<()>>,
}

impl HookContext {
    /// Report whether hook registration succeeded.
    pub fn report_ready(&self, result: PlatformResult<()>) {
        let _ = self.ready_tx.try_send(result);
    }
}

/// Which buttons produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonFilter(u8);

impl ButtonFilter {
    pub fn new(buttons: &[MouseButton]) -> Self {
        Self(buttons.iter().fold(0, |mask, b| mask | Self::bit(*b)))
    }

    pub fn all() -> Self {
        Self::new(&[
            MouseButton::Left,
            MouseButton::Right,
            MouseButton::Middle,
            MouseButton::Other,
        ])
    }

    pub fn accepts(&self, button: MouseButton) -> bool {
        self.0 & Self::bit(button) != 0
    }

    fn bit(button: MouseButton) -> u8 {
        match button {
            MouseButton::Left => 1,
            MouseButton::Right => 1 << 1,
            MouseButton::Middle => 1 << 2,
            MouseButton::Other => 1 << 3,
        }
    }
}

/// Producer end handed to the OS callback.
#[derive(Clone)]
pub struct ClickSink {
    tx: Sender<Click>,
    active: Arc<AtomicBool>,
    filter: ButtonFilter,
}

impl ClickSink {
    pub fn new(tx: Sender<Click>, active: Arc<AtomicBool>, filter: ButtonFilter) -> Self {
        Self { tx, active, filter }
    }

    /// Forward one mouse-down. Never blocks. Returns true if a notification
    /// was sent.
    pub fn emit(&self, button: MouseButton) -> bool {
        if !self.active.load(Ordering::Acquire) || !self.filter.accepts(button) {
            return false;
        }
        match self.tx.try_send(Click) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Click channel full, dropping click");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Listener lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not started yet.
    Idle,
    /// Hook registered, clicks flowing.
    Active,
    /// Registration failed; the listener does nothing.
    Inert,
    /// Hook unregistered and thread joined.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub buttons: Vec<MouseButton>,
    pub startup_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            buttons: vec![MouseButton::Left],
            startup_timeout: Duration::from_secs(2),
        }
    }
}

/// Global click listener. Produces one `Click` per observed mouse-down.
pub struct ClickListener {
    config: ListenerConfig,
    state: ListenerState,
    active: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ClickListener {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            state: ListenerState::Idle,
            active: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ListenerState::Active
    }

    /// Register the hook on a background thread and wait for confirmation.
    ///
    /// On failure the listener becomes `Inert` and never forwards a click.
    /// `clicks` is dropped once the hook thread is gone, so the consumer sees
    /// a disconnected channel. After a timeout that thread is joined by `stop`.
    pub fn start(&mut self, backend: Box<dyn HookBackend>, clicks: Sender<Click>) -> PlatformResult<()> {
        if self.state != ListenerState::Idle {
            return Err(PlatformError::AlreadyRegistered);
        }

        let name = backend.name();
        let (ready_tx, ready_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded(1);

        let sink = ClickSink::new(
            clicks,
            self.active.clone(),
            ButtonFilter::new(&self.config.buttons),
        );
        let ctx = HookContext {
            sink,
            stop_rx,
            ready_tx,
        };

        let thread = thread::Builder::new()
            .name("clicktally-hook".into())
            .spawn(move || backend.run(ctx));
        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                self.state = ListenerState::Inert;
                return Err(PlatformError::ThreadSpawn(e.to_string()));
            }
        };

        match ready_rx.recv_timeout(self.config.startup_timeout) {
            Ok(Ok(())) => {
                self.active.store(true, Ordering::Release);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                self.state = ListenerState::Active;
                info!(backend = name, "Click listener active");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(backend = name, "Click hook registration failed: {}", e);
                let _ = stop_tx.send(());
                let _ = thread.join();
                self.state = ListenerState::Inert;
                Err(e)
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!(backend = name, "Click hook thread exited before registering");
                let _ = thread.join();
                self.state = ListenerState::Inert;
                Err(PlatformError::HookExited)
            }
            Err(RecvTimeoutError::Timeout) => {
                // A late backend may still register. It is told to stop now
                // and joined by `stop()`, so it never outlives the listener.
                error!(backend = name, "Click hook registration timed out");
                let _ = stop_tx.try_send(());
                self.thread = Some(thread);
                self.state = ListenerState::Inert;
                Err(PlatformError::StartTimeout)
            }
        }
    }

    /// Unregister the hook and wait for the hook thread to exit.
    ///
    /// Safe to call more than once, and after a failed `start`.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::Release);

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Click hook thread panicked");
            }
            debug!("Click hook thread joined");
        }

        if self.state == ListenerState::Active {
            self.state = ListenerState::Stopped;
            info!("Click listener stopped");
        }
    }
}

impl Drop for ClickListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Claim this process's native hook backend.
///
/// Only one system-wide hook is registered per process lifetime: the second
/// call fails with `AlreadyRegistered`, even if the first listener stopped.
pub fn native_backend() -> PlatformResult<Box<dyn HookBackend>> {
    if NATIVE_HOOK_CLAIMED.swap(true, Ordering::SeqCst) {
        return Err(PlatformError::AlreadyRegistered);
    }
    platform_backend()
}

#[cfg(target_os = "windows")]
fn platform_backend() -> PlatformResult<Box<dyn HookBackend>> {
    Ok(Box::new(windows_native::LowLevelMouseHook))
}

#[cfg(target_os = "macos")]
fn platform_backend() -> PlatformResult<Box<dyn HookBackend>> {
    Ok(Box::new(macos::EventTapHook))
}

#[cfg(target_os = "linux")]
fn platform_backend() -> PlatformResult<Box<dyn HookBackend>> {
    Ok(Box::new(rdev_impl::RdevHook))
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn platform_backend() -> PlatformResult<Box<dyn HookBackend>> {
    Err(PlatformError::Unsupported)
}
