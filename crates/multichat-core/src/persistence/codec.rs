//! JSON encoding and atomic file I/O.
//!
//! # Atomic Write Strategy
//!
//! 1. Write to `{name}.tmp`
//! 2. Rename to `{name}`
//!
//! An interrupted write leaves the previous file intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{LoadError, LoadReport, StorageError};

/// Encode a value as pretty-printed JSON.
pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Decode a value from JSON.
pub fn decode<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    serde_json::from_str(json)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let temp = temp_path(path);
    fs::write(&temp, contents).map_err(|e| StorageError::io(&temp, e))?;
    fs::rename(&temp, path).map_err(|e| StorageError::io(path, e))?;

    Ok(())
}

/// Encode `value` and write it atomically to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let json = encode(value).map_err(|e| StorageError::json(path, e))?;
    write_atomic(path, &json)
}

/// Read and decode `path`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LoadError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LoadError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    decode(&contents).map(Some).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> Result<(), StorageError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// List `*.json` files directly inside `dir`.
///
/// Temp files (`*.json.tmp`) are skipped. A missing directory yields an
/// empty list.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LoadError::Read {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }

    Ok(files)
}

/// Decode every `*.json` file in `dir`, sorted by file name.
///
/// Each bad file is recorded in the report and skipped.
pub fn load_dir<T: DeserializeOwned>(dir: &Path) -> LoadReport<T> {
    let mut report = LoadReport::new();

    let mut files = match list_json_files(dir) {
        Ok(files) => files,
        Err(err) => {
            report.record_failure(err);
            return report;
        }
    };
    files.sort();

    for path in files {
        match read_json(&path) {
            Ok(Some(value)) => report.succeeded.push(value),
            // Removed between listing and reading.
            Ok(None) => {}
            Err(err) => report.record_failure(err),
        }
    }

    report
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Persona;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_creates_parents_and_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("a.json");

        write_atomic(&path, "{}").unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested").join("a.json.tmp").exists());
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let result: Option<Persona> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn read_malformed_file_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_json::<Persona>(&path).unwrap_err();

        assert!(matches!(err, LoadError::Decode { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn list_skips_temp_and_other_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("b.json.tmp"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub.json")).unwrap();

        let files = list_json_files(dir.path()).unwrap();

        assert_eq!(files, vec![dir.path().join("a.json")]);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        assert!(list_json_files(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn load_dir_skips_bad_files() {
        let dir = tempdir().unwrap();
        write_json(&dir.path().join("p-1.json"), &Persona::new("p-1", "Ash")).unwrap();
        fs::write(dir.path().join("p-2.json"), "{\"name\": 3}").unwrap();
        write_json(&dir.path().join("p-3.json"), &Persona::new("p-3", "Cedar")).unwrap();

        let report: LoadReport<Persona> = load_dir(dir.path());

        let names: Vec<_> = report.succeeded.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ash", "Cedar"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, dir.path().join("p-2.json"));
        assert!(!report.is_clean());
    }

    #[test]
    fn remove_helpers_tolerate_missing() {
        let dir = tempdir().unwrap();
        assert!(remove_file_if_exists(&dir.path().join("x.json")).is_ok());
        assert!(remove_dir_if_exists(&dir.path().join("x")).is_ok());
    }
}
