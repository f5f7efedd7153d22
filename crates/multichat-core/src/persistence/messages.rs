//! Positional message persistence.
//!
//! # File Structure
//!
//! ```text
//! <root>/messages/{conversation_id}/0.json
//! <root>/messages/{conversation_id}/1.json
//! ...
//! ```
//!
//! File names are positions, not message ids. Load order is the numeric
//! order of the file stems; a stem that does not parse as a number sorts
//! as 0. `save_messages` rewrites the whole directory, `append_message`
//! adds one file past the highest index.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::model::Message;
use crate::paths::validate_id;

use super::codec::{list_json_files, read_json, remove_dir_if_exists, write_json};
use super::error::{LoadReport, StorageError};

/// Directory holding the messages of conversation `conversation_id`.
pub fn message_dir(messages_root: &Path, conversation_id: &str) -> Result<PathBuf, StorageError> {
    validate_id(conversation_id)?;
    Ok(messages_root.join(conversation_id))
}

/// Numeric position encoded in a message file name.
pub fn message_file_index(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn clear_dir(dir: &Path) -> Result<(), StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    for entry in entries {
        let path = entry.map_err(|e| StorageError::io(dir, e))?.path();
        if path.is_dir() {
            remove_dir_if_exists(&path)?;
        } else {
            fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
        }
    }

    Ok(())
}

/// Replace every stored message of a conversation with `messages`.
///
/// All existing files in `dir` are deleted first, then the list is written
/// as `0.json..n-1.json` in order.
pub fn save_messages(dir: &Path, messages: &[Message]) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    clear_dir(dir)?;

    for (index, message) in messages.iter().enumerate() {
        write_json(&dir.join(format!("{index}.json")), message)?;
    }

    Ok(())
}

/// Index the next appended message will get.
pub fn next_message_index(dir: &Path) -> Result<u64, StorageError> {
    let files = list_json_files(dir)?;

    Ok(files
        .iter()
        .map(|p| message_file_index(p))
        .max()
        .map(|max| max + 1)
        .unwrap_or(0))
}

/// Append one message after the last stored one.
///
/// Returns the index it was written at. Reloading yields the same order as
/// a full `save_messages` of the extended list.
pub fn append_message(dir: &Path, message: &Message) -> Result<u64, StorageError> {
    let index = next_message_index(dir)?;
    write_json(&dir.join(format!("{index}.json")), message)?;
    Ok(index)
}

/// Load all messages of a conversation in positional order.
///
/// A missing directory yields an empty report.
pub fn load_messages(dir: &Path) -> LoadReport<Message> {
    let mut report = LoadReport::new();

    let mut files = match list_json_files(dir) {
        Ok(files) => files,
        Err(err) => {
            report.record_failure(err);
            return report;
        }
    };
    files.sort_by_key(|p| message_file_index(p));

    for path in files {
        match read_json(&path) {
            Ok(Some(message)) => report.succeeded.push(message),
            Ok(None) => {}
            Err(err) => report.record_failure(err),
        }
    }

    report
}

/// Delete the whole message directory of a conversation.
pub fn delete_messages(dir: &Path) -> Result<(), StorageError> {
    remove_dir_if_exists(dir)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Persona;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn message(n: i64) -> Message {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        Message::new(
            format!("m-{n}"),
            base + Duration::minutes(n),
            Persona::new("p-1", "Ash"),
            format!("message {n}"),
        )
    }

    fn ids(report: &LoadReport<Message>) -> Vec<&str> {
        report.succeeded.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn save_then_load_keeps_order() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();

        save_messages(&dir, &[message(0), message(1), message(2)]).unwrap();
        let loaded = load_messages(&dir);

        assert_eq!(ids(&loaded), vec!["m-0", "m-1", "m-2"]);
        assert!(loaded.is_clean());
    }

    #[test]
    fn save_fully_replaces_previous_files() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();

        save_messages(&dir, &[message(0), message(1), message(2)]).unwrap();
        save_messages(&dir, &[message(1)]).unwrap();

        assert_eq!(ids(&load_messages(&dir)), vec!["m-1"]);
        assert!(dir.join("0.json").exists());
        assert!(!dir.join("1.json").exists());
        assert!(!dir.join("2.json").exists());
    }

    #[test]
    fn save_empty_list_clears_directory() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();

        save_messages(&dir, &[message(0)]).unwrap();
        save_messages(&dir, &[]).unwrap();

        assert!(load_messages(&dir).succeeded.is_empty());
    }

    #[test]
    fn numeric_sort_not_lexical() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();
        let messages: Vec<_> = (0..12).map(message).collect();

        save_messages(&dir, &messages).unwrap();
        let loaded = load_messages(&dir);

        assert_eq!(loaded.succeeded, messages);
    }

    #[test]
    fn order_follows_file_names_not_timestamps() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();

        save_messages(&dir, &[message(5), message(1)]).unwrap();

        assert_eq!(ids(&load_messages(&dir)), vec!["m-5", "m-1"]);
    }

    #[test]
    fn unparsable_names_sort_as_zero() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();
        save_messages(&dir, &[message(0), message(1)]).unwrap();
        fs::rename(dir.join("1.json"), dir.join("stray.json")).unwrap();
        write_json(&dir.join("2.json"), &message(2)).unwrap();

        let loaded = load_messages(&dir);

        assert_eq!(loaded.succeeded.len(), 3);
        assert_eq!(loaded.succeeded[2].id, "m-2");
        assert_eq!(message_file_index(&dir.join("stray.json")), 0);
    }

    #[test]
    fn append_continues_after_last_index() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();

        assert_eq!(append_message(&dir, &message(0)).unwrap(), 0);
        save_messages(&dir, &[message(0), message(1)]).unwrap();
        assert_eq!(append_message(&dir, &message(2)).unwrap(), 2);

        assert_eq!(ids(&load_messages(&dir)), vec!["m-0", "m-1", "m-2"]);
    }

    #[test]
    fn corrupt_message_is_skipped() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();
        save_messages(&dir, &[message(0), message(1)]).unwrap();
        fs::write(dir.join("1.json"), "{").unwrap();

        let loaded = load_messages(&dir);

        assert_eq!(ids(&loaded), vec!["m-0"]);
        assert_eq!(loaded.failed.len(), 1);
    }

    #[test]
    fn missing_directory_is_empty() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "never-saved").unwrap();

        let loaded = load_messages(&dir);

        assert!(loaded.succeeded.is_empty());
        assert!(loaded.is_clean());
    }

    #[test]
    fn delete_messages_removes_directory() {
        let root = tempdir().unwrap();
        let dir = message_dir(root.path(), "c-1").unwrap();
        save_messages(&dir, &[message(0)]).unwrap();

        delete_messages(&dir).unwrap();

        assert!(!dir.exists());
    }

    #[test]
    fn message_dir_rejects_bad_ids() {
        let root = tempdir().unwrap();
        assert!(message_dir(root.path(), "..").is_err());
    }
}
