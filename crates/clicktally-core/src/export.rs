//! CSV export of finished sessions.
//!
//! Policy: one file per output folder, append-only, header written once when
//! the file is created (or found empty). Comments are persisted.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Column headers, in file order.
pub const CSV_HEADERS: [&str; 4] = ["Timestamp", "Clicks", "Duration (seconds)", "Comments"];

/// One exported session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Clicks")]
    pub clicks: u64,
    #[serde(rename = "Duration (seconds)")]
    pub duration_seconds: u64,
    #[serde(rename = "Comments")]
    pub comment: String,
}

impl ExportRecord {
    /// Build a record stamped with the current local time.
    pub fn now(clicks: u64, duration_seconds: u64, comment: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            clicks,
            duration_seconds,
            comment: comment.into(),
        }
    }
}

/// Local wall-clock time as `YYYY-MM-DD HH:MM:SS`.
///
/// Falls back to UTC when the local offset cannot be determined.
fn current_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    now.format(&format).unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Appends records to `<folder>/<file_name>`.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    file_name: String,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new("click_data.csv")
    }
}

impl CsvExporter {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Target file for a given folder.
    pub fn path_in(&self, folder: &Path) -> PathBuf {
        folder.join(&self.file_name)
    }

    /// Append one record, writing the header first if the file is new.
    pub fn append(&self, folder: &Path, record: &ExportRecord) -> CoreResult<PathBuf> {
        let path = self.path_in(folder);
        self.write_record(&path, record)
            .map_err(|source| CoreError::WriteFailure {
                path: path.clone(),
                source,
            })?;

        info!(?path, clicks = record.clicks, seconds = record.duration_seconds, "Exported session");
        Ok(path)
    }

    fn write_record(&self, path: &Path, record: &ExportRecord) -> io::Result<()> {
        let needs_header = match fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(e),
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record).map_err(csv_to_io)?;
        writer.flush()?;

        debug!(?path, needs_header, "Wrote CSV record");
        Ok(())
    }
}

fn csv_to_io(err: csv::Error) -> io::Error {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(clicks: u64, secs: u64, comment: &str) -> ExportRecord {
        ExportRecord {
            timestamp: "2024-01-02 03:04:05".into(),
            clicks,
            duration_seconds: secs,
            comment: comment.into(),
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::default();

        exporter.append(dir.path(), &record(5, 3, "first")).unwrap();
        let path = exporter.append(dir.path(), &record(7, 9, "second")).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Timestamp,Clicks,Duration (seconds),Comments",
                "2024-01-02 03:04:05,5,3,first",
                "2024-01-02 03:04:05,7,9,second",
            ]
        );
    }

    #[test]
    fn test_comment_with_delimiters_is_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new("out.csv");

        let path = exporter
            .append(dir.path(), &record(1, 1, "left hand, then \"right\""))
            .unwrap();

        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADERS.to_vec());

        let rows: Vec<ExportRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![record(1, 1, "left hand, then \"right\"")]);
    }

    #[test]
    fn test_missing_folder_is_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = CsvExporter::default()
            .append(&missing, &record(1, 1, ""))
            .unwrap_err();

        assert!(matches!(err, CoreError::WriteFailure { .. }));
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = current_timestamp();
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[13..14], ":");
    }
}
