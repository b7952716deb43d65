//! Counting controller: owns the session and gates click notifications.
//!
//! Clicks keep arriving from the hook while counting is paused. The gate is
//! here, at consumption time, so pausing never has to touch the OS hook.

use crate::error::{CoreError, CoreResult};
use crate::export::{CsvExporter, ExportRecord};
use crate::session::{Phase, SessionSnapshot, SessionState};
use crate::ticker::Ticker;
use crossbeam_channel::{never, Receiver};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a successful export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReceipt {
    pub path: PathBuf,
    pub record: ExportRecord,
}

pub struct Controller {
    session: SessionState,
    exporter: CsvExporter,
    tick_interval: Duration,
    ticker: Option<Ticker>,
    idle_ticks: Receiver<Instant>,
}

impl Controller {
    pub fn new(exporter: CsvExporter, tick_interval: Duration) -> Self {
        Self {
            session: SessionState::default(),
            exporter,
            tick_interval,
            ticker: None,
            idle_ticks: never(),
        }
    }

    pub fn with_output_folder(mut self, folder: Option<PathBuf>) -> Self {
        self.session = SessionState::new(folder);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Tick source to select on. Never fires while counting is off.
    pub fn ticks(&self) -> &Receiver<Instant> {
        match &self.ticker {
            Some(ticker) => ticker.receiver(),
            None => &self.idle_ticks,
        }
    }

    /// Flip counting on or off. Returns the new phase.
    pub fn toggle_counting(&mut self) -> Phase {
        if self.session.is_counting() {
            // Dropping the ticker joins its thread and discards pending ticks.
            self.ticker = None;
            self.session.set_phase(Phase::Paused);
            info!(
                clicks = self.session.click_count(),
                seconds = self.session.elapsed_seconds(),
                "Counting paused"
            );
        } else {
            self.ticker = Some(Ticker::start(self.tick_interval));
            self.session.set_phase(Phase::Counting);
            info!("Counting started");
        }
        self.session.phase()
    }

    /// Handle one click notification. Returns true if it was counted.
    pub fn on_notification(&mut self) -> bool {
        if !self.session.is_counting() {
            return false;
        }
        self.session.add_click();
        true
    }

    /// Advance elapsed time by one second.
    ///
    /// A tick that was already in flight when counting stopped is ignored.
    /// Returns true if the tick was applied.
    pub fn on_tick(&mut self) -> bool {
        if !self.session.is_counting() {
            debug!("Ignoring tick while not counting");
            return false;
        }
        self.session.add_second();
        true
    }

    pub fn set_output_folder(&mut self, folder: PathBuf) {
        info!(?folder, "Output folder set");
        self.session.set_output_folder(folder);
    }

    /// Write the session to CSV and start a fresh one.
    ///
    /// A supplied `folder` becomes the output folder. With no folder supplied
    /// and none chosen earlier this fails with `NoFolderSelected`. On any
    /// failure the session is left exactly as it was.
    pub fn export(&mut self, folder: Option<PathBuf>, comment: &str) -> CoreResult<ExportReceipt> {
        let target = match folder.or_else(|| self.session.output_folder().cloned()) {
            Some(target) => target,
            None => return Err(CoreError::NoFolderSelected),
        };

        let record = ExportRecord::now(
            self.session.click_count(),
            self.session.elapsed_seconds(),
            comment,
        );
        let path = self.exporter.append(&target, &record)?;

        self.session.set_output_folder(target);
        self.reset();

        Ok(ExportReceipt { path, record })
    }

    fn reset(&mut self) {
        self.ticker = None;
        self.session.reset();
        debug!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        // Long interval: tests drive on_tick by hand.
        Controller::new(CsvExporter::default(), Duration::from_secs(3600))
    }

    #[test]
    fn test_clicks_ignored_while_not_counting() {
        let mut c = controller();
        for _ in 0..10 {
            assert!(!c.on_notification());
        }
        assert_eq!(c.session().click_count(), 0);

        c.toggle_counting();
        c.toggle_counting();
        assert_eq!(c.session().phase(), Phase::Paused);
        for _ in 0..4 {
            c.on_notification();
        }
        assert_eq!(c.session().click_count(), 0);
    }

    #[test]
    fn test_clicks_counted_while_counting() {
        let mut c = controller();
        assert_eq!(c.toggle_counting(), Phase::Counting);
        for _ in 0..7 {
            assert!(c.on_notification());
        }
        assert_eq!(c.session().click_count(), 7);
    }

    #[test]
    fn test_ticks_only_while_counting() {
        let mut c = controller();
        assert!(!c.on_tick());

        c.toggle_counting();
        c.on_tick();
        c.on_tick();
        c.toggle_counting();
        // Stale tick after pause.
        assert!(!c.on_tick());
        c.toggle_counting();
        c.on_tick();

        assert_eq!(c.session().elapsed_seconds(), 3);
    }

    #[test]
    fn test_ticks_receiver_idle_when_paused() {
        let mut c = controller();
        assert!(c.ticks().try_recv().is_err());
        c.toggle_counting();
        c.toggle_counting();
        assert!(c
            .ticks()
            .recv_timeout(Duration::from_millis(20))
            .is_err());
    }

    #[test]
    fn test_export_without_folder_keeps_state() {
        let mut c = controller();
        c.toggle_counting();
        c.on_notification();
        c.on_tick();
        let before = c.snapshot();

        let err = c.export(None, "note").unwrap_err();

        assert!(matches!(err, CoreError::NoFolderSelected));
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn test_export_resets_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller();
        c.toggle_counting();
        for _ in 0..5 {
            c.on_notification();
        }
        for _ in 0..3 {
            c.on_tick();
        }
        c.toggle_counting();

        let receipt = c.export(Some(dir.path().to_path_buf()), "run one").unwrap();

        assert_eq!(receipt.record.clicks, 5);
        assert_eq!(receipt.record.duration_seconds, 3);
        assert_eq!(receipt.record.comment, "run one");
        assert_eq!(receipt.path, dir.path().join("click_data.csv"));

        let snap = c.snapshot();
        assert_eq!(
            (snap.click_count, snap.elapsed_seconds, snap.is_counting),
            (0, 0, false)
        );
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(snap.output_folder, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_export_while_counting_stops_counting() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller().with_output_folder(Some(dir.path().to_path_buf()));
        c.toggle_counting();
        c.on_notification();

        c.export(None, "").unwrap();

        assert!(!c.session().is_counting());
        assert!(!c.on_notification());
    }

    #[test]
    fn test_write_failure_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut c = controller();
        c.toggle_counting();
        c.on_notification();
        c.on_notification();
        let before = c.snapshot();

        let err = c.export(Some(missing), "x").unwrap_err();

        assert!(matches!(err, CoreError::WriteFailure { .. }));
        assert_eq!(c.snapshot(), before);
        assert!(c.session().is_counting());
    }
}
