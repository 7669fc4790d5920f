//! Error types for data profiling.

use thiserror::Error;

/// Errors raised on structurally malformed datasets.
///
/// An empty result (no columns, no issues) is never an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// A data row has more cells than the header declares.
    #[error("row {row} has {cells} cells but the header declares {columns} columns")]
    RaggedRow {
        row: usize,
        cells: usize,
        columns: usize,
    },

    /// Two header cells share the same name.
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A derived identifier failed validation.
    #[error(transparent)]
    Model(#[from] saw_model::ModelError),

    /// The dataset has rows but no header.
    #[error("dataset has {rows} rows but no header row")]
    MissingHeader { rows: usize },
}

/// Result type for profiling operations.
pub type Result<T> = std::result::Result<T, ProfileError>;
