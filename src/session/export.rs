// Session export: JSON documents delivered as downloadable files
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::Result;
use crate::types::{GazeSample, RawMessage};

/// Header of an exported session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: Uuid,
    /// Unset when tracking never started
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: DateTime<Utc>,
    pub total_raw_messages: usize,
    pub total_points: usize,
    pub average_accuracy: f64,
}

/// Full session export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub session_info: SessionInfo,
    pub raw_messages: Vec<RawMessage>,
    pub gaze_points: Vec<GazeSample>,
}

/// Seconds-precision timestamp usable in file names, e.g. `2024-03-01T09-15-42`
pub fn filesystem_safe_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string().replace(':', "-")
}

/// Name of a full session export
pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("gaze-data-{}.json", filesystem_safe_timestamp(at))
}

/// Name of a raw-log-only export
pub fn raw_export_filename(at: DateTime<Utc>) -> String {
    format!("gazefilter-all-data-{}.json", filesystem_safe_timestamp(at))
}

/// Destination for exported documents
pub trait ExportSink {
    /// Store `contents` under `filename` and return where it went
    fn deliver(&mut self, filename: &str, contents: &str) -> Result<PathBuf>;
}

/// Writes exports into a directory, creating it on first use
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Export files already present in the directory, sorted by name
    pub fn list_exports(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut exports = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                let is_export = name.starts_with("gaze-data-") || name.starts_with("gazefilter-all-data-");
                if is_export && name.ends_with(".json") {
                    exports.push(path);
                }
            }
        }
        exports.sort();

        Ok(exports)
    }
}

impl ExportSink for DirectorySink {
    fn deliver(&mut self, filename: &str, contents: &str) -> Result<PathBuf> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let path = self.dir.join(filename);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_filenames() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 42).unwrap();

        assert_eq!(filesystem_safe_timestamp(at), "2024-03-01T09-15-42");
        assert_eq!(export_filename(at), "gaze-data-2024-03-01T09-15-42.json");
        assert_eq!(raw_export_filename(at), "gazefilter-all-data-2024-03-01T09-15-42.json");
    }

    #[test]
    fn test_document_keys_are_camel_case() {
        let document = ExportDocument {
            session_info: SessionInfo {
                session_id: Uuid::new_v4(),
                start_time: None,
                end_time: Utc::now(),
                total_raw_messages: 0,
                total_points: 1,
                average_accuracy: 90.0,
            },
            raw_messages: vec![],
            gaze_points: vec![GazeSample::new(1.0, 2.0, 90.0)],
        };

        let json = serde_json::to_value(&document).unwrap();
        assert!(json["sessionInfo"]["startTime"].is_null());
        assert_eq!(json["sessionInfo"]["totalPoints"], 1);
        assert_eq!(json["sessionInfo"]["averageAccuracy"], 90.0);
        assert!(json["rawMessages"].is_array());
        assert_eq!(json["gazePoints"][0]["x"], 1.0);
    }

    #[test]
    fn test_directory_sink_creates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(temp_dir.path().join("exports"));

        let path = sink.deliver("gaze-data-test.json", "{}").unwrap();

        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(sink.list_exports().unwrap(), vec![path]);
    }

    #[test]
    fn test_list_exports_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        let sink = DirectorySink::new(temp_dir.path());

        assert!(sink.list_exports().unwrap().is_empty());
        assert!(DirectorySink::new(temp_dir.path().join("missing"))
            .list_exports()
            .unwrap()
            .is_empty());
    }
}
