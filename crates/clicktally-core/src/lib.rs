//! clicktally-core: session state + counting controller.
//!
//! Design goal: keep this crate UI-agnostic and platform-agnostic.
//! Platform specific I/O (the global mouse hook) lives in `clicktally-platform`;
//! this crate only consumes the `Click` notifications it produces.

mod controller;
mod error;
mod export;
mod run_loop;
mod session;
mod settings;
mod ticker;

pub use controller::{Controller, ExportReceipt};
pub use error::{CoreError, CoreResult, SettingsError, SettingsResult};
pub use export::{CsvExporter, ExportRecord, CSV_HEADERS};
pub use run_loop::{Command, ControllerEvent, CounterLoop, LoopHandle};
pub use session::{Phase, SessionSnapshot, SessionState};
pub use settings::{
    config_dir, ensure_config_dir, load_settings, load_settings_from, log_dir, save_settings,
    save_settings_to, settings_file_path, Settings,
};
pub use ticker::Ticker;

use serde::{Deserialize, Serialize};

/// One observed click, as delivered from the hook thread to the controller.
///
/// Deliberately carries nothing: the controller only needs to know that a
/// click happened, and it decides on its own whether to count it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Click;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// Side/extra buttons.
    Other,
}
