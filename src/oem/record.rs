//! Telemetry records extracted from OEM data sections

use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{io_err, Result};

/// A single time-stamped position taken from an OEM data row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Normalized epoch, or the raw token when it could not be normalized
    pub epoch: String,
    /// Position `[x, y, z]` in the units of the source file
    pub position: [f64; 3],
}

impl TelemetryRecord {
    /// Create a new record
    pub fn new(epoch: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            epoch: epoch.into(),
            position,
        }
    }

    /// Position as a column vector
    pub fn position_vector(&self) -> na::Vector3<f64> {
        na::Vector3::from(self.position)
    }

    /// Distance from the frame origin, in source units
    pub fn radius(&self) -> f64 {
        self.position_vector().norm()
    }
}

/// Records accumulated over every file of one run, in insertion order
///
/// Serializes as a bare JSON array of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryBatch {
    records: Vec<TelemetryRecord>,
}

impl TelemetryBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record
    pub fn push(&mut self, record: TelemetryRecord) {
        self.records.push(record);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// Consume the batch, returning its records
    pub fn into_records(self) -> Vec<TelemetryRecord> {
        self.records
    }

    /// Pretty-printed JSON document (two-space indent, no trailing newline)
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the batch as a pretty-printed JSON document
    ///
    /// The document is written to a temporary sibling first and renamed into
    /// place, so an interrupted write never leaves a truncated file at `path`.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let temp_path = path.with_extension("json.tmp");
        let written = self
            .write_json_to(&temp_path)
            .and_then(|()| fs::rename(&temp_path, path).map_err(|e| io_err(path, e)));

        if written.is_err() {
            // Best effort; the original error is the one worth reporting
            let _ = fs::remove_file(&temp_path);
        }
        written
    }

    fn write_json_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| io_err(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| io_err(path, e))?;
        Ok(())
    }
}

impl Extend<TelemetryRecord> for TelemetryBatch {
    fn extend<T: IntoIterator<Item = TelemetryRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

impl FromIterator<TelemetryRecord> for TelemetryBatch {
    fn from_iter<T: IntoIterator<Item = TelemetryRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TelemetryBatch {
    type Item = TelemetryRecord;
    type IntoIter = std::vec::IntoIter<TelemetryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn test_record_json_shape() {
        let record = TelemetryRecord::new("2021-01-01T00:00:00.000000Z", [1.0, 2.0, 3.0]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"epoch":"2021-01-01T00:00:00.000000Z","position":[1.0,2.0,3.0]}"#
        );
    }

    #[test]
    fn test_radius() {
        let record = TelemetryRecord::new("t", [3.0, 4.0, 12.0]);
        assert_relative_eq!(record.radius(), 13.0, epsilon = 1e-12);
        assert_relative_eq!(record.position_vector().y, 4.0);
    }

    #[test]
    fn test_batch_pretty_print() {
        let batch: TelemetryBatch = vec![TelemetryRecord::new("a", [1.5, -2.0, 3e3])]
            .into_iter()
            .collect();
        let expected = "[\n  {\n    \"epoch\": \"a\",\n    \"position\": [\n      1.5,\n      -2.0,\n      3000.0\n    ]\n  }\n]";
        assert_eq!(batch.to_json_string().unwrap(), expected);
    }

    #[test]
    fn test_empty_batch_serializes_to_empty_array() {
        assert_eq!(TelemetryBatch::new().to_json_string().unwrap(), "[]");
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp_dir = tempdir().unwrap();
        // A non-empty directory at the target makes the rename fail
        let path = temp_dir.path().join("out.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "").unwrap();

        let batch: TelemetryBatch = vec![TelemetryRecord::new("x", [1.0, 2.0, 3.0])]
            .into_iter()
            .collect();
        assert!(batch.write_json(&path).is_err());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_json_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("out.json");

        let mut batch = TelemetryBatch::new();
        batch.push(TelemetryRecord::new("x", [1.0, 2.0, 3.0]));
        batch.extend(vec![TelemetryRecord::new("y", [4.0, 5.0, 6.0])]);
        batch.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, batch.to_json_string().unwrap());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded: TelemetryBatch = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, batch);
        assert_eq!(loaded.len(), 2);
    }
}
