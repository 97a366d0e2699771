//! On-disk storage helpers
//!
//! Every record (snapshot section, work document, alert) is one JSON file.
//! Writes go through a temp file and a rename so readers never observe a
//! half-written record.

pub mod lock;
pub mod paths;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use crate::error::{TrackerError, TrackerResult};

/// Serialize `value` as pretty JSON to `path` atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> TrackerResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Write to temp file first, then rename (atomic on POSIX)
    let tmp_file = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp_file)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    fs::rename(&tmp_file, path)?;
    Ok(())
}

/// Read a JSON record. Returns `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> TrackerResult<Option<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        TrackerError::Corrupt {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(Some(value))
}

/// List `*.json` files directly inside `dir`, sorted by name.
/// A missing directory yields an empty list.
pub fn list_json_files(dir: &Path) -> TrackerResult<Vec<std::path::PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        name: String,
        count: u32,
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("record.json");
        let record = Record {
            name: "a".to_string(),
            count: 3,
        };
        write_json_atomic(&path, &record).unwrap();
        let back: Option<Record> = read_json(&path).unwrap();
        assert_eq!(back, Some(record));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let back: Option<Record> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn test_read_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = read_json::<Record>(&path).unwrap_err();
        assert!(matches!(err, TrackerError::Corrupt { .. }));
    }

    #[test]
    fn test_list_json_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("skip.tmp"), "").unwrap();
        let files = list_json_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        assert!(list_json_files(&dir.path().join("missing")).unwrap().is_empty());
    }
}
