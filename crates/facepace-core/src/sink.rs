//! Result persistence
//!
//! The orchestrator hands every assembled result to a [`ResultSink`] as a flat
//! JSON map. Storage failures are reported back but never fail the request.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sink rejected record: {0}")]
    Rejected(String),
}

/// Durable storage for flat result records.
pub trait ResultSink: Send + Sync {
    fn store(&self, record: &Map<String, Value>) -> Result<(), SinkError>;
}

/// Appends one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    // Serializes appends from concurrent requests
    lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonLinesSink {
    fn store(&self, record: &Map<String, Value>) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Map<String, Value>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn store(&self, record: &Map<String, Value>) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn store(&self, _record: &Map<String, Value>) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(hr: f64) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("heart_rate".to_string(), Value::from(hr));
        map.insert("image_url".to_string(), Value::from("https://example.com/a.jpg"));
        map
    }

    #[test]
    fn test_json_lines_appends() {
        let dir = tempdir().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("results.jsonl"));
        sink.store(&record(61.0)).unwrap();
        sink.store(&record(72.5)).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Map<String, Value> = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["heart_rate"], 72.5);
    }

    #[test]
    fn test_json_lines_bad_path() {
        let sink = JsonLinesSink::new("/nonexistent/dir/results.jsonl");
        assert!(matches!(sink.store(&record(60.0)), Err(SinkError::Io(_))));
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.store(&record(60.0)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0]["heart_rate"], 60.0);
    }

    #[test]
    fn test_null_sink() {
        assert!(NullSink.store(&record(60.0)).is_ok());
    }
}
