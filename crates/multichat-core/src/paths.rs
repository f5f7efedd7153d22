//! Locating the data directory and turning ids into safe file names.

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::persistence::StorageError;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "MULTICHAT_DATA_DIR";

/// Directory name created under the user's home directory.
pub const DEFAULT_DIR_NAME: &str = ".multichat";

/// Return the user's home directory path.
///
/// Uses HOME on Unix-like systems and USERPROFILE on Windows.
pub fn get_home_dir() -> Result<PathBuf, StorageError> {
    for var in ["HOME", "USERPROFILE"] {
        if let Ok(value) = env::var(var) {
            if !value.is_empty() {
                return Ok(PathBuf::from(value));
            }
        }
    }

    Err(StorageError::HomeDirUnavailable)
}

/// Resolve the data directory.
///
/// An explicit override wins, then `MULTICHAT_DATA_DIR`, then
/// `~/.multichat`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf, StorageError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }

    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    Ok(get_home_dir()?.join(DEFAULT_DIR_NAME))
}

/// Check that an entity id can be used as a single file or directory name.
///
/// Rejects empty ids, path separators, `.` and `..`.
pub fn validate_id(id: &str) -> Result<(), StorageError> {
    if id.is_empty() {
        return Err(StorageError::InvalidId(id.to_string()));
    }

    if id.contains(&['/', '\\'][..]) {
        return Err(StorageError::InvalidId(id.to_string()));
    }

    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::InvalidId(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous: Vec<_> = vars
            .iter()
            .map(|(name, _)| (name.to_string(), env::var(name).ok()))
            .collect();

        for (name, value) in vars {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }

        f();

        for (name, value) in previous {
            match value {
                Some(value) => env::set_var(&name, value),
                None => env::remove_var(&name),
            }
        }
    }

    #[test]
    fn get_home_dir_prefers_home() {
        with_env(
            &[("HOME", Some("/tmp/home")), ("USERPROFILE", Some("/tmp/profile"))],
            || {
                assert_eq!(get_home_dir().unwrap(), PathBuf::from("/tmp/home"));
            },
        );
    }

    #[test]
    fn get_home_dir_falls_back_to_userprofile() {
        with_env(&[("HOME", None), ("USERPROFILE", Some("/tmp/profile"))], || {
            assert_eq!(get_home_dir().unwrap(), PathBuf::from("/tmp/profile"));
        });
    }

    #[test]
    fn get_home_dir_errors_when_unset() {
        with_env(&[("HOME", None), ("USERPROFILE", None)], || {
            assert!(matches!(get_home_dir(), Err(StorageError::HomeDirUnavailable)));
        });
    }

    #[test]
    fn explicit_dir_wins() {
        with_env(&[(DATA_DIR_ENV, Some("/tmp/from-env"))], || {
            let dir = resolve_data_dir(Some(Path::new("/tmp/explicit"))).unwrap();
            assert_eq!(dir, PathBuf::from("/tmp/explicit"));
        });
    }

    #[test]
    fn env_dir_beats_home() {
        with_env(
            &[(DATA_DIR_ENV, Some("/tmp/from-env")), ("HOME", Some("/tmp/home"))],
            || {
                assert_eq!(resolve_data_dir(None).unwrap(), PathBuf::from("/tmp/from-env"));
            },
        );
    }

    #[test]
    fn home_dir_default() {
        with_env(&[(DATA_DIR_ENV, None), ("HOME", Some("/tmp/home"))], || {
            assert_eq!(
                resolve_data_dir(None).unwrap(),
                PathBuf::from("/tmp/home/.multichat")
            );
        });
    }

    #[test]
    fn validate_id_accepts_plain_names() {
        assert!(validate_id("c0ffee-1234").is_ok());
        assert!(validate_id("chat.v2").is_ok());
    }

    #[test]
    fn validate_id_rejects_traversal() {
        for bad in ["", ".", "..", "../etc", "a/b", "/abs", "a\\b"] {
            assert!(
                matches!(validate_id(bad), Err(StorageError::InvalidId(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }
}
