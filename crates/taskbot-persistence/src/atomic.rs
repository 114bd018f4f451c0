//! Crash-safe snapshot files.
//!
//! Snapshots are written to a temporary file in the target directory and
//! then renamed over the previous one, so a reader never sees a torn file.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PersistenceError, Result};

/// Serializes `value` as pretty JSON and atomically replaces `path` with it.
///
/// Missing parent directories are created.
pub fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| PersistenceError::DirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    let write_err = |source| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(&json).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Reads a snapshot, returning `None` when the file does not exist yet.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).map_err(|source| PersistenceError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(serde_json::from_str(&data)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Counter {
        name: String,
        value: i64,
    }

    #[test]
    fn test_write_snapshot_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/state/taskbot.json");

        let counter = Counter {
            name: "tasks".to_string(),
            value: 3,
        };
        write_snapshot(&path, &counter).unwrap();

        assert!(path.exists());
        let loaded: Option<Counter> = read_snapshot(&path).unwrap();
        assert_eq!(loaded, Some(counter));
    }

    #[test]
    fn test_write_snapshot_replaces_previous() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taskbot.json");

        for value in 1..=3 {
            let counter = Counter {
                name: "tasks".to_string(),
                value,
            };
            write_snapshot(&path, &counter).unwrap();
        }

        let loaded: Counter = read_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.value, 3);
    }

    #[test]
    fn test_read_snapshot_missing() {
        let dir = tempdir().unwrap();
        let loaded: Option<Counter> = read_snapshot(&dir.path().join("missing.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_read_snapshot_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let result: Result<Option<Counter>> = read_snapshot(&path);
        assert!(matches!(result, Err(PersistenceError::SerializeError(_))));
    }
}
