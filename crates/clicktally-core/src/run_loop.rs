//! Consumer-side run loop: the only place session state is mutated.
//!
//! Three sources feed the loop: presentation commands, click notifications
//! from the hook thread, and the controller's ticker. Everything that happens
//! is published back as a `ControllerEvent`.

use crate::controller::Controller;
use crate::error::CoreError;
use crate::export::ExportRecord;
use crate::session::{Phase, SessionSnapshot};
use crate::Click;
use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};
use serde::Serialize;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Commands sent by the presentation layer.
#[derive(Debug, Clone)]
pub enum Command {
    /// Start or stop counting.
    Toggle,
    /// Choose the export destination.
    SetOutputFolder(PathBuf),
    /// Export the session. `folder` overrides the chosen output folder.
    Export {
        folder: Option<PathBuf>,
        comment: String,
    },
    /// Publish the current session as a `ControllerEvent::Snapshot`.
    Snapshot,
    /// Leave the loop.
    Shutdown,
}

/// Events emitted by the loop.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ControllerEvent {
    PhaseChanged { phase: Phase },
    ClickCounted { click_count: u64 },
    Ticked { elapsed_seconds: u64 },
    FolderSet { folder: PathBuf },
    Exported { path: PathBuf, record: ExportRecord },
    /// Export needs a folder. The presentation layer may ask the user and
    /// resend the export with one; the comment is echoed back for that.
    FolderRequired { comment: String },
    ExportFailed { message: String },
    Snapshot(SessionSnapshot),
}

pub struct CounterLoop {
    controller: Controller,
    clicks: Receiver<Click>,
    commands: Receiver<Command>,
    events: Sender<ControllerEvent>,
}

impl CounterLoop {
    pub fn new(
        controller: Controller,
        clicks: Receiver<Click>,
        commands: Receiver<Command>,
        events: Sender<ControllerEvent>,
    ) -> Self {
        Self {
            controller,
            clicks,
            commands,
            events,
        }
    }

    /// Spawn the loop on its own thread and return a handle to drive it.
    pub fn spawn(controller: Controller, clicks: Receiver<Click>) -> LoopHandle {
        let (cmd_tx, cmd_rx) = bounded(32);
        let (event_tx, event_rx) = unbounded();

        let counter_loop = CounterLoop::new(controller, clicks, cmd_rx, event_tx);
        let thread = thread::Builder::new()
            .name("clicktally-loop".into())
            .spawn(move || counter_loop.run());
        let thread = match thread {
            Ok(thread) => Some(thread),
            Err(e) => {
                // Dropping the loop closes both channels; callers see that.
                error!("Failed to spawn counter loop: {}", e);
                None
            }
        };

        LoopHandle {
            cmd_tx,
            event_rx,
            thread,
        }
    }

    /// Run until `Shutdown` or until the command channel closes.
    /// Returns the session as it was when the loop ended.
    pub fn run(mut self) -> SessionSnapshot {
        info!("Counter loop started");

        let commands = self.commands.clone();
        let mut clicks = self.clicks.clone();

        loop {
            // Re-read every pass: toggling swaps the ticker.
            let ticks = self.controller.ticks().clone();

            select! {
                recv(commands) -> msg => match msg {
                    Ok(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    Err(_) => {
                        debug!("Command channel closed");
                        break;
                    }
                },
                recv(clicks) -> msg => match msg {
                    Ok(_) => self.handle_click(),
                    Err(_) => {
                        // Listener stopped or never registered. Keep serving commands.
                        info!("Click source disconnected");
                        clicks = never();
                    }
                },
                recv(ticks) -> msg => {
                    if msg.is_ok() {
                        self.handle_tick();
                    }
                },
            }
        }

        let snapshot = self.controller.snapshot();
        info!(
            clicks = snapshot.click_count,
            seconds = snapshot.elapsed_seconds,
            "Counter loop exiting"
        );
        snapshot
    }

    /// Handle a command. Returns false if the loop should exit.
    fn handle_command(&mut self, cmd: Command) -> bool {
        debug!(?cmd, "handling command");

        match cmd {
            Command::Toggle => {
                let phase = self.controller.toggle_counting();
                self.emit(ControllerEvent::PhaseChanged { phase });
            }
            Command::SetOutputFolder(folder) => {
                self.controller.set_output_folder(folder.clone());
                self.emit(ControllerEvent::FolderSet { folder });
            }
            Command::Export { folder, comment } => self.handle_export(folder, comment),
            Command::Snapshot => {
                let snapshot = self.controller.snapshot();
                self.emit(ControllerEvent::Snapshot(snapshot));
            }
            Command::Shutdown => return false,
        }

        true
    }

    fn handle_export(&mut self, folder: Option<PathBuf>, comment: String) {
        match self.controller.export(folder, &comment) {
            Ok(receipt) => {
                self.emit(ControllerEvent::Exported {
                    path: receipt.path,
                    record: receipt.record,
                });
                self.emit(ControllerEvent::PhaseChanged {
                    phase: self.controller.session().phase(),
                });
            }
            Err(CoreError::NoFolderSelected) => {
                debug!("Export requested without an output folder");
                self.emit(ControllerEvent::FolderRequired { comment });
            }
            Err(e) => {
                warn!("Export failed: {}", e);
                self.emit(ControllerEvent::ExportFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    fn handle_click(&mut self) {
        if self.controller.on_notification() {
            let click_count = self.controller.session().click_count();
            self.emit(ControllerEvent::ClickCounted { click_count });
        }
    }

    fn handle_tick(&mut self) {
        if self.controller.on_tick() {
            let elapsed_seconds = self.controller.session().elapsed_seconds();
            self.emit(ControllerEvent::Ticked { elapsed_seconds });
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // A presentation layer that went away is not an error for the loop.
        let _ = self.events.send(event);
    }
}

/// Handle to a loop running on its own thread.
pub struct LoopHandle {
    cmd_tx: Sender<Command>,
    event_rx: Receiver<ControllerEvent>,
    thread: Option<JoinHandle<SessionSnapshot>>,
}

impl LoopHandle {
    /// Send a command to the loop.
    pub fn send(&self, cmd: Command) {
        if let Err(e) = self.cmd_tx.send(cmd) {
            warn!("Failed to send command to counter loop: {}", e);
        }
    }

    /// Receive the next event, waiting up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ControllerEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Another sender for the loop's commands, for a front-end thread.
    pub fn commands(&self) -> Sender<Command> {
        self.cmd_tx.clone()
    }

    /// Another receiver for the loop's events.
    ///
    /// It disconnects once the loop has exited.
    pub fn events(&self) -> Receiver<ControllerEvent> {
        self.event_rx.clone()
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Stop the loop and wait for it. Returns the final session.
    pub fn shutdown(self) -> Option<SessionSnapshot> {
        let _ = self.cmd_tx.send(Command::Shutdown);
        self.join()
    }

    /// Wait for the loop to end on its own, after some holder of
    /// `commands()` sent `Shutdown`.
    pub fn join(mut self) -> Option<SessionSnapshot> {
        self.thread.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = self.cmd_tx.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}
