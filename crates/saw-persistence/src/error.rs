//! Persistence error types.
//!
//! All persistence operations return structured errors that provide
//! user-friendly messages and optional remediation hints.

use std::path::PathBuf;

use thiserror::Error;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Failed to serialize snapshot")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Stored data could not be parsed.
    #[error("Failed to read snapshot at {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot written by a newer version.
    #[error("Snapshot version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion { found: u32, max_supported: u32 },

    /// The file for one project holds another project's snapshot.
    #[error("Snapshot at {path} belongs to project '{found}', not '{expected}'")]
    ProjectMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// A store backend reported a failure.
    #[error("Snapshot store unavailable: {0}")]
    Backend(String),

    /// A background save task died.
    #[error("Save task failed: {0}")]
    Task(String),
}

impl PersistenceError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the file to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::Serialization { .. } => {
                "An error occurred while saving the workflow progress.".to_string()
            }
            Self::Deserialization { path, .. } => {
                format!(
                    "The saved progress at {} could not be read. The file may be corrupted.",
                    path.display()
                )
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => {
                format!(
                    "This progress was saved by a newer version (snapshot version {found}, \
                    this version supports up to {max_supported})."
                )
            }
            Self::ProjectMismatch { path, expected, .. } => format!(
                "The saved progress at {} does not belong to project '{expected}'.",
                path.display()
            ),
            Self::Backend(_) | Self::Task(_) => {
                "Your progress could not be saved right now. Changes are kept and saving \
                will be retried."
                    .to_string()
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or choose a different state directory.".into())
            }
            Self::Deserialization { .. } | Self::ProjectMismatch { .. } => {
                Some("Restore from the local autosave backup if one exists.".into())
            }
            Self::UnsupportedVersion { .. } => Some("Update to the latest version.".into()),
            Self::Backend(_) => Some("Check your connection; saving resumes automatically.".into()),
            Self::Serialization { .. } | Self::Task(_) => None,
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
