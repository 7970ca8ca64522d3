//! JSON-Lines dataset reader

use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Streaming reader over a JSON-Lines dataset
///
/// Each line is one record: a JSON object of field name to value. Records
/// are read lazily so a large dataset never has to fit in memory.
#[derive(Debug)]
pub struct DatasetReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl DatasetReader {
    /// Open `<dir>/<name>.jsonl`. A missing or unreadable file fails the
    /// whole job with `SourceUnavailable`.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(format!("{}.jsonl", name));
        let file = File::open(&path).map_err(|e| {
            Error::source_unavailable(format!("Cannot open dataset {}: {}", path.display(), e))
        })?;

        Ok(Self {
            path,
            reader: BufReader::new(file),
        })
    }

    /// Dataset file path, for logging
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for DatasetReader {
    type Item = Result<Map<String, Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<Map<String, Value>>(trimmed).map_err(Error::from),
                    );
                }
                Err(e) => return Some(Err(Error::from(e))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_records_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"text":"hello","topic":"greeting"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"text":"bye","topic":"farewell"}}"#).unwrap();

        let reader = DatasetReader::open(dir.path(), "demo").unwrap();
        assert!(reader.path().ends_with("demo.jsonl"));
        let records: Vec<_> = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["text"], "hello");
    }

    #[test]
    fn test_missing_dataset_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatasetReader::open(dir.path(), "nope").unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable(_)));
    }

    #[test]
    fn test_malformed_line_yields_record_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"text":"ok"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let mut reader = DatasetReader::open(dir.path(), "bad").unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }
}
