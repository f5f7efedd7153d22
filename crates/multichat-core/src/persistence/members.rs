//! Member file persistence.
//!
//! # File Structure
//!
//! ```text
//! <root>/members/{member_id}.json
//! ```

use std::path::{Path, PathBuf};

use crate::model::Persona;
use crate::paths::validate_id;

use super::codec::{load_dir, read_json, remove_file_if_exists, write_json};
use super::error::{LoadError, LoadReport, StorageError};

/// Path of the file holding member `id`.
pub fn member_path(dir: &Path, id: &str) -> Result<PathBuf, StorageError> {
    validate_id(id)?;
    Ok(dir.join(format!("{id}.json")))
}

/// Save a member, overwriting any previous file for the same id.
pub fn save_member(dir: &Path, member: &Persona) -> Result<(), StorageError> {
    write_json(&member_path(dir, &member.id)?, member)
}

/// Load one member. `Ok(None)` when the file does not exist.
pub fn load_member(dir: &Path, id: &str) -> Result<Option<Persona>, LoadError> {
    match member_path(dir, id) {
        Ok(path) => read_json(&path),
        Err(_) => Ok(None),
    }
}

/// Delete a member file. Missing files are not an error.
pub fn delete_member(dir: &Path, id: &str) -> Result<(), StorageError> {
    remove_file_if_exists(&member_path(dir, id)?)
}

/// Check if a member file exists.
pub fn member_exists(dir: &Path, id: &str) -> bool {
    member_path(dir, id).map(|p| p.exists()).unwrap_or(false)
}

/// Load every member file in `dir`, sorted by file name.
pub fn load_all_members(dir: &Path) -> LoadReport<Persona> {
    load_dir(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrivacyLevel;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_member() {
        let dir = tempdir().unwrap();
        let member = Persona::new("p-1", "Ash")
            .with_tags(["calm"])
            .with_background_memory("likes rain")
            .with_privacy_level(PrivacyLevel::Private);

        save_member(dir.path(), &member).unwrap();
        let loaded = load_member(dir.path(), "p-1").unwrap();

        assert_eq!(loaded, Some(member));
    }

    #[test]
    fn empty_fields_round_trip() {
        let dir = tempdir().unwrap();
        let member = Persona::new("p-1", "");

        save_member(dir.path(), &member).unwrap();

        assert_eq!(load_member(dir.path(), "p-1").unwrap(), Some(member));
    }

    #[test]
    fn load_nonexistent_member() {
        let dir = tempdir().unwrap();
        assert_eq!(load_member(dir.path(), "nope").unwrap(), None);
    }

    #[test]
    fn load_with_invalid_id_is_absent() {
        let dir = tempdir().unwrap();
        assert_eq!(load_member(dir.path(), "../escape").unwrap(), None);
    }

    #[test]
    fn save_rejects_path_like_ids() {
        let dir = tempdir().unwrap();
        let result = save_member(dir.path(), &Persona::new("a/b", "Ash"));
        assert!(matches!(result, Err(StorageError::InvalidId(_))));
    }

    #[test]
    fn save_overwrites() {
        let dir = tempdir().unwrap();
        save_member(dir.path(), &Persona::new("p-1", "Ash")).unwrap();
        save_member(dir.path(), &Persona::new("p-1", "Birch")).unwrap();

        let loaded = load_member(dir.path(), "p-1").unwrap().unwrap();
        assert_eq!(loaded.name, "Birch");
        assert_eq!(load_all_members(dir.path()).succeeded.len(), 1);
    }

    #[test]
    fn delete_member_removes_file() {
        let dir = tempdir().unwrap();
        save_member(dir.path(), &Persona::new("p-1", "Ash")).unwrap();
        assert!(member_exists(dir.path(), "p-1"));

        delete_member(dir.path(), "p-1").unwrap();

        assert!(!member_exists(dir.path(), "p-1"));
        assert!(delete_member(dir.path(), "p-1").is_ok());
    }

    #[test]
    fn load_all_skips_corrupt_file() {
        let dir = tempdir().unwrap();
        save_member(dir.path(), &Persona::new("p-1", "Ash")).unwrap();
        fs::write(dir.path().join("p-2.json"), "garbage").unwrap();

        let report = load_all_members(dir.path());

        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed.len(), 1);
    }
}
