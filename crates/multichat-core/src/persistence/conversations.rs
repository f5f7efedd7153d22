//! Conversation file persistence.
//!
//! # File Structure
//!
//! ```text
//! <root>/conversations/{conversation_id}.json    # header only, no messages
//! ```
//!
//! Conversation files never carry messages. Whatever is in the `messages`
//! field on disk is ignored on load; the store attaches messages from
//! `messages/{conversation_id}/` instead.

use std::path::{Path, PathBuf};

use crate::model::Conversation;
use crate::paths::validate_id;

use super::codec::{load_dir, read_json, remove_file_if_exists, write_json};
use super::error::{LoadError, LoadReport, StorageError};

pub fn conversation_path(dir: &Path, id: &str) -> Result<PathBuf, StorageError> {
    validate_id(id)?;
    Ok(dir.join(format!("{id}.json")))
}

/// Save a conversation header (messages stripped).
pub fn save_conversation(dir: &Path, conversation: &Conversation) -> Result<(), StorageError> {
    write_json(
        &conversation_path(dir, &conversation.id)?,
        &conversation.header(),
    )
}

/// Load one conversation header. Messages are always empty.
pub fn load_conversation(dir: &Path, id: &str) -> Result<Option<Conversation>, LoadError> {
    let path = match conversation_path(dir, id) {
        Ok(path) => path,
        Err(_) => return Ok(None),
    };
    Ok(read_json::<Conversation>(&path)?.map(|c| c.header()))
}

/// Delete a conversation file. Missing files are not an error.
pub fn delete_conversation(dir: &Path, id: &str) -> Result<(), StorageError> {
    remove_file_if_exists(&conversation_path(dir, id)?)
}

pub fn conversation_exists(dir: &Path, id: &str) -> bool {
    conversation_path(dir, id)
        .map(|p| p.exists())
        .unwrap_or(false)
}

/// Load every conversation header in `dir`, sorted by file name.
pub fn load_all_conversations(dir: &Path) -> LoadReport<Conversation> {
    let mut report: LoadReport<Conversation> = load_dir(dir);
    report.succeeded = report.succeeded.iter().map(Conversation::header).collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Message, Persona};
    use chrono::Utc;
    use std::fs;
    use tempfile::tempdir;

    fn conversation_with_message() -> Conversation {
        Conversation::new("c-1", "Daily").with_message(Message::new(
            "m-1",
            Utc::now(),
            Persona::new("p-1", "Ash"),
            "hi",
        ))
    }

    #[test]
    fn saved_file_has_no_messages() {
        let dir = tempdir().unwrap();
        save_conversation(dir.path(), &conversation_with_message()).unwrap();

        let raw = fs::read_to_string(dir.path().join("c-1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["messages"], serde_json::json!([]));
        assert_eq!(value["name"], "Daily");
    }

    #[test]
    fn save_and_load_header() {
        let dir = tempdir().unwrap();
        let conversation = conversation_with_message();

        save_conversation(dir.path(), &conversation).unwrap();
        let loaded = load_conversation(dir.path(), "c-1").unwrap();

        assert_eq!(loaded, Some(conversation.header()));
    }

    #[test]
    fn embedded_messages_on_disk_are_ignored() {
        let dir = tempdir().unwrap();
        let json = serde_json::to_string(&conversation_with_message()).unwrap();
        fs::write(dir.path().join("c-1.json"), json).unwrap();

        let loaded = load_conversation(dir.path(), "c-1").unwrap().unwrap();
        assert!(loaded.messages.is_empty());

        let all = load_all_conversations(dir.path());
        assert!(all.succeeded[0].messages.is_empty());
    }

    #[test]
    fn missing_messages_field_is_accepted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c-1.json"), r#"{"id": "c-1", "name": "Daily"}"#).unwrap();

        let loaded = load_conversation(dir.path(), "c-1").unwrap();
        assert_eq!(loaded, Some(Conversation::new("c-1", "Daily")));
    }

    #[test]
    fn delete_conversation_removes_file() {
        let dir = tempdir().unwrap();
        save_conversation(dir.path(), &Conversation::new("c-1", "Daily")).unwrap();

        delete_conversation(dir.path(), "c-1").unwrap();

        assert!(!conversation_exists(dir.path(), "c-1"));
    }
}
