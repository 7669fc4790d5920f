//! Atomic file writes.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{PersistenceError, Result};

/// Write `bytes` to `path` via a temp file and rename, so readers never
/// observe a partially written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut file = File::create(&temp_path).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(bytes).map_err(|e| PersistenceError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;

    file.sync_all().map_err(|e| PersistenceError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| PersistenceError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Read a file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersistenceError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Turn an identifier into a file stem.
///
/// ASCII letters, digits, `-` and `_` are kept; every other byte becomes
/// `%XX`. Distinct keys always map to distinct stems.
pub(crate) fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("p1.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        assert!(read_optional(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("workflow-autosave-backup"), "workflow-autosave-backup");
        assert_eq!(file_stem("proj/../x y"), "proj%2F%2E%2E%2Fx%20y");
        assert_eq!(file_stem("..hidden"), "%2E%2Ehidden");
        assert_eq!(file_stem("café"), "caf%C3%A9");
    }

    #[test]
    fn test_file_stem_keeps_keys_apart() {
        assert_ne!(file_stem("acme survey"), file_stem("acme_survey"));
        assert_ne!(file_stem("a%20b"), file_stem("a b"));
    }
}
