//! Selection pointer files.
//!
//! ```text
//! <root>/current_member.txt
//! <root>/current_conversation.txt
//! ```
//!
//! Each file holds a raw id with no JSON wrapping. An empty or blank file
//! means "no selection".

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::codec::write_atomic;
use super::error::{LoadError, StorageError};

pub const CURRENT_MEMBER_FILE: &str = "current_member.txt";
pub const CURRENT_CONVERSATION_FILE: &str = "current_conversation.txt";

/// Write a selection pointer. `None` writes an empty file.
pub fn save_pointer(path: &Path, id: Option<&str>) -> Result<(), StorageError> {
    write_atomic(path, id.unwrap_or(""))
}

/// Read a selection pointer. Missing and blank files are `None`.
pub fn load_pointer(path: &Path) -> Result<Option<String>, LoadError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let id = contents.trim();
            Ok((!id.is_empty()).then(|| id.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LoadError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pointer_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CURRENT_MEMBER_FILE);

        save_pointer(&path, Some("p-1")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "p-1");
        assert_eq!(load_pointer(&path).unwrap(), Some("p-1".to_string()));
    }

    #[test]
    fn none_writes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CURRENT_CONVERSATION_FILE);

        save_pointer(&path, None).unwrap();

        assert!(path.exists());
        assert_eq!(load_pointer(&path).unwrap(), None);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(load_pointer(&dir.path().join("nope.txt")).unwrap(), None);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CURRENT_MEMBER_FILE);
        fs::write(&path, "  p-2\n").unwrap();

        assert_eq!(load_pointer(&path).unwrap(), Some("p-2".to_string()));
    }
}
