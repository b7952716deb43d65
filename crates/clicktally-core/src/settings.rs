//! User settings stored in `settings.yaml`.

use crate::error::SettingsResult;
use crate::MouseButton;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Shortest wait for hook registration; below this every start times out.
const MIN_STARTUP_TIMEOUT_MS: u64 = 100;

/// All fields are optional in the file - missing values use defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder exports go to when none is chosen interactively.
    pub output_folder: Option<PathBuf>,
    /// CSV file name inside the output folder.
    pub file_name: String,
    /// Elapsed-time tick interval. 1000 for real seconds.
    pub tick_interval_ms: u64,
    /// Capacity of the hook -> controller click channel.
    pub channel_capacity: usize,
    /// Which mouse buttons count as a click.
    pub count_buttons: Vec<MouseButton>,
    /// How long to wait for the OS hook to confirm registration.
    pub startup_timeout_ms: u64,
    /// Also write a daily rolling log file under the config directory.
    pub log_to_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_folder: None,
            file_name: "click_data.csv".into(),
            tick_interval_ms: 1000,
            channel_capacity: 1024,
            count_buttons: vec![MouseButton::Left],
            startup_timeout_ms: 2000,
            log_to_file: false,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms.max(MIN_STARTUP_TIMEOUT_MS))
    }
}

/// Platform configuration directory for clicktally.
pub fn config_dir() -> PathBuf {
    let base = dirs_next::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("clicktally")
}

pub fn log_dir() -> PathBuf {
    config_dir().join("logs")
}

pub fn settings_file_path() -> PathBuf {
    config_dir().join("settings.yaml")
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> SettingsResult<PathBuf> {
    let dir = config_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        info!(?dir, "Created config directory");
    }
    Ok(dir)
}

/// Load settings from the default location.
pub fn load_settings() -> SettingsResult<Settings> {
    load_settings_from(&settings_file_path())
}

/// Load settings from `path`.
///
/// A missing file yields defaults. An unreadable or invalid file is an
/// error; callers fall back to `Settings::default()` once they can report it.
pub fn load_settings_from(path: &Path) -> SettingsResult<Settings> {
    if !path.exists() {
        debug!(?path, "No settings file found, using defaults");
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)?;
    let settings = serde_yaml::from_str(&content)?;
    debug!(?path, "Loaded settings");
    Ok(settings)
}

/// Save settings to the default location.
pub fn save_settings(settings: &Settings) -> SettingsResult<PathBuf> {
    ensure_config_dir()?;
    let path = settings_file_path();
    save_settings_to(&path, settings)?;
    Ok(path)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> SettingsResult<()> {
    let content = serde_yaml::to_string(settings)?;
    fs::write(path, content)?;
    info!(?path, "Saved settings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "tick_interval_ms: 250\ncount_buttons: [left, right]\n").unwrap();

        let settings = load_settings_from(&path).unwrap();

        assert_eq!(settings.tick_interval(), Duration::from_millis(250));
        assert_eq!(
            settings.count_buttons,
            vec![MouseButton::Left, MouseButton::Right]
        );
        assert_eq!(settings.file_name, "click_data.csv");
        assert_eq!(settings.channel_capacity, 1024);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "tick_interval_ms: [not a number").unwrap();

        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Yaml(_)));
        assert!(err.to_string().starts_with("YAML error"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        let settings = Settings {
            output_folder: Some(dir.path().to_path_buf()),
            log_to_file: true,
            ..Settings::default()
        };

        save_settings_to(&path, &settings).unwrap();

        assert_eq!(load_settings_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_settings_from(&dir.path().join("nope.yaml")).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_durations_have_a_floor() {
        let settings = Settings {
            tick_interval_ms: 0,
            startup_timeout_ms: 0,
            ..Settings::default()
        };

        assert_eq!(settings.tick_interval(), Duration::from_millis(1));
        assert_eq!(settings.startup_timeout(), Duration::from_millis(100));
        assert_eq!(
            Settings::default().startup_timeout(),
            Duration::from_secs(2)
        );
    }
}
