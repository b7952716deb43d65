//! Error types for clicktally-core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the counting controller.
///
/// None of these are fatal: the presentation layer shows them to the user
/// and the session carries on.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Export was requested but no destination folder is known.
    #[error("no output folder selected")]
    NoFolderSelected,
    /// The CSV record could not be written. Session state is kept.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors from loading or saving `settings.yaml`.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
