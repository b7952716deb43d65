//! Session state owned by the controller.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Counting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Fresh session, nothing counted yet.
    #[default]
    Ready,
    /// Clicks and seconds are being counted.
    Counting,
    /// Counting was stopped; the tally is kept until export.
    Paused,
}

/// Mutable state of the current session.
///
/// Only the controller holds one of these, and only the consumer thread
/// touches it.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    click_count: u64,
    elapsed_seconds: u64,
    phase: Phase,
    output_folder: Option<PathBuf>,
}

impl SessionState {
    pub fn new(output_folder: Option<PathBuf>) -> Self {
        Self {
            output_folder,
            ..Self::default()
        }
    }

    pub fn click_count(&self) -> u64 {
        self.click_count
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_counting(&self) -> bool {
        self.phase == Phase::Counting
    }

    pub fn output_folder(&self) -> Option<&PathBuf> {
        self.output_folder.as_ref()
    }

    pub(crate) fn set_output_folder(&mut self, folder: PathBuf) {
        self.output_folder = Some(folder);
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn add_click(&mut self) {
        self.click_count = self.click_count.saturating_add(1);
    }

    pub(crate) fn add_second(&mut self) {
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
    }

    /// Back to a fresh session. The output folder is a destination, not part
    /// of the tally, so it survives.
    pub(crate) fn reset(&mut self) {
        self.click_count = 0;
        self.elapsed_seconds = 0;
        self.phase = Phase::Ready;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            click_count: self.click_count,
            elapsed_seconds: self.elapsed_seconds,
            is_counting: self.is_counting(),
            phase: self.phase,
            output_folder: self.output_folder.clone(),
        }
    }
}

/// Read-only copy of the session for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub click_count: u64,
    pub elapsed_seconds: u64,
    pub is_counting: bool,
    pub phase: Phase,
    pub output_folder: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_folder() {
        let mut state = SessionState::new(Some(PathBuf::from("/tmp/out")));
        state.set_phase(Phase::Counting);
        state.add_click();
        state.add_second();

        state.reset();

        let snap = state.snapshot();
        assert_eq!(snap.click_count, 0);
        assert_eq!(snap.elapsed_seconds, 0);
        assert!(!snap.is_counting);
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(snap.output_folder, Some(PathBuf::from("/tmp/out")));
    }
}
