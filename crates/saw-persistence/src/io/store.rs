//! Snapshot store: where the workflow position is persisted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use saw_model::{ProjectId, ProjectSnapshot, SNAPSHOT_SCHEMA_VERSION};

use super::atomic::{file_stem, read_optional, write_atomic};
use crate::error::{PersistenceError, Result};

/// Remote or local backend that stores project snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist the snapshot, replacing any previous one for the project.
    async fn save_project_snapshot(&self, snapshot: &ProjectSnapshot) -> Result<()>;

    /// Load the latest snapshot for a project, if one exists.
    async fn load_project_snapshot(&self, project_id: &ProjectId)
    -> Result<Option<ProjectSnapshot>>;
}

/// Snapshot store writing one JSON file per project into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the snapshot for `project_id`.
    pub fn path_for(&self, project_id: &ProjectId) -> PathBuf {
        self.dir
            .join(format!("{}.json", file_stem(project_id.as_str())))
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save_project_snapshot(&self, snapshot: &ProjectSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|source| PersistenceError::Serialization { source })?;
        let path = self.path_for(&snapshot.project_id);

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))??;

        tracing::info!(
            project = %snapshot.project_id,
            step = %snapshot.current_step,
            "Saved workflow snapshot to {}",
            path.display()
        );
        Ok(())
    }

    async fn load_project_snapshot(
        &self,
        project_id: &ProjectId,
    ) -> Result<Option<ProjectSnapshot>> {
        let path = self.path_for(project_id);
        let read_path = path.clone();
        let bytes = tokio::task::spawn_blocking(move || read_optional(&read_path))
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))??;

        let Some(bytes) = bytes else {
            tracing::debug!(project = %project_id, "No snapshot stored");
            return Ok(None);
        };

        let snapshot = decode_snapshot(&bytes, &path)?;
        if &snapshot.project_id != project_id {
            return Err(PersistenceError::ProjectMismatch {
                path,
                expected: project_id.to_string(),
                found: snapshot.project_id.to_string(),
            });
        }
        Ok(Some(snapshot))
    }
}

/// Parse a snapshot and reject ones written by a newer schema.
pub(crate) fn decode_snapshot(bytes: &[u8], path: &Path) -> Result<ProjectSnapshot> {
    let snapshot: ProjectSnapshot =
        serde_json::from_slice(bytes).map_err(|source| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            source,
        })?;

    if snapshot.schema_version > SNAPSHOT_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: snapshot.schema_version,
            max_supported: SNAPSHOT_SCHEMA_VERSION,
        });
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use saw_model::WorkflowStep;
    use tempfile::tempdir;

    use super::*;

    fn snapshot(id: &str) -> ProjectSnapshot {
        ProjectSnapshot::new(
            ProjectId::new(id).unwrap(),
            WorkflowStep::Grouping,
            BTreeSet::from([WorkflowStep::Upload, WorkflowStep::HealthCheck]),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let saved = snapshot("p1");

        store.save_project_snapshot(&saved).await.unwrap();
        let loaded = store
            .load_project_snapshot(&saved.project_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_load_unknown_project() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let id = ProjectId::new("missing").unwrap();
        assert!(store.load_project_snapshot(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_similar_ids_stay_separate() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store
            .save_project_snapshot(&snapshot("acme survey"))
            .await
            .unwrap();

        let other = ProjectId::new("acme_survey").unwrap();
        assert_ne!(store.path_for(&other), store.path_for(&snapshot("acme survey").project_id));
        assert!(store.load_project_snapshot(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_snapshot_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let wanted = ProjectId::new("p1").unwrap();
        let bytes = serde_json::to_vec(&snapshot("p2")).unwrap();
        std::fs::write(store.path_for(&wanted), bytes).unwrap();

        let err = store.load_project_snapshot(&wanted).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::ProjectMismatch { ref expected, ref found, .. }
                if expected == "p1" && found == "p2"
        ));
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut newer = snapshot("p1");
        newer.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        let bytes = serde_json::to_vec(&newer).unwrap();

        let err = decode_snapshot(&bytes, Path::new("p1.json")).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion { found, .. } if found == SNAPSHOT_SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let err = decode_snapshot(b"{\"project_id\":", Path::new("p1.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Deserialization { .. }));
    }
}
