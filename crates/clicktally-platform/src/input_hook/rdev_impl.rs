//! rdev-based implementation for Linux click hooking.
//!
//! `rdev::listen` blocks for the rest of the process and offers no success
//! callback, so it runs on its own inner thread. Registration is considered
//! successful if it has not failed within a short grace period. On stop the
//! sink's active flag is already cleared by the listener, so the callback
//! forwards nothing; the X record context itself goes away with the process.

use super::{HookBackend, HookContext};
use crate::error::PlatformError;
use clicktally_core::MouseButton;
use crossbeam_channel::{bounded, select, RecvTimeoutError};
use rdev::{listen, Event, EventType};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// How long `listen` gets to fail before the hook counts as registered.
const REGISTRATION_GRACE: Duration = Duration::from_millis(300);

pub struct RdevHook;

fn map_button(button: rdev::Button) -> MouseButton {
    match button {
        rdev::Button::Left => MouseButton::Left,
        rdev::Button::Right => MouseButton::Right,
        rdev::Button::Middle => MouseButton::Middle,
        rdev::Button::Unknown(_) => MouseButton::Other,
    }
}

impl HookBackend for RdevHook {
    fn name(&self) -> &'static str {
        "rdev"
    }

    fn run(self: Box<Self>, ctx: HookContext) {
        info!("Click hook thread started (rdev)");

        let (err_tx, err_rx) = bounded::<String>(1);
        let sink = ctx.sink.clone();

        let spawned = thread::Builder::new()
            .name("clicktally-rdev".into())
            .spawn(move || {
                let callback = move |event: Event| {
                    if let EventType::ButtonPress(button) = event.event_type {
                        sink.emit(map_button(button));
                    }
                };
                if let Err(error) = listen(callback) {
                    let _ = err_tx.send(format!("{:?}", error));
                }
            });

        if let Err(e) = spawned {
            ctx.report_ready(Err(PlatformError::ThreadSpawn(e.to_string())));
            return;
        }

        match err_rx.recv_timeout(REGISTRATION_GRACE) {
            Ok(message) => {
                error!(%message, "rdev listen failed");
                ctx.report_ready(Err(PlatformError::PermissionDenied(message)));
                return;
            }
            Err(RecvTimeoutError::Disconnected) => {
                ctx.report_ready(Err(PlatformError::HookExited));
                return;
            }
            Err(RecvTimeoutError::Timeout) => ctx.report_ready(Ok(())),
        }

        select! {
            recv(ctx.stop_rx) -> _ => {
                info!("Click hook received stop signal");
            }
            recv(err_rx) -> msg => {
                if let Ok(message) = msg {
                    error!(%message, "rdev listener stopped unexpectedly");
                }
            }
        }

        info!("Click hook thread exiting");
    }
}
