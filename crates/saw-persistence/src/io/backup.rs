//! Local backup of the last snapshot.

use std::path::{Path, PathBuf};

use super::atomic::{file_stem, read_optional, write_atomic};
use crate::error::{PersistenceError, Result};

/// Key under which autosave mirrors the latest snapshot.
pub const BACKUP_KEY: &str = "workflow-autosave-backup";

/// String-keyed local storage, independent of the snapshot store.
pub trait LocalBackup: Send + Sync {
    fn write(&self, key: &str, value: &str) -> Result<()>;

    fn read(&self, key: &str) -> Result<Option<String>>;
}

/// Backup storing each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackup {
    dir: PathBuf,
}

impl FileBackup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

impl LocalBackup for FileBackup {
    fn write(&self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.path_for(key), value.as_bytes())
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        read_optional(&path)?
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|e| PersistenceError::Io {
                    operation: "read",
                    path: path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let backup = FileBackup::new(dir.path());
        backup.write(BACKUP_KEY, "{\"a\":1}").unwrap();
        backup.write(BACKUP_KEY, "{\"a\":2}").unwrap();
        assert_eq!(backup.read(BACKUP_KEY).unwrap().as_deref(), Some("{\"a\":2}"));
        assert!(dir.path().join("workflow-autosave-backup.json").exists());
    }

    #[test]
    fn test_missing_key() {
        let dir = tempdir().unwrap();
        let backup = FileBackup::new(dir.path());
        assert!(backup.read("nothing").unwrap().is_none());
    }
}
