//! Error types for suggestion engines and role persistence.

use saw_model::ModelError;
use thiserror::Error;

/// Errors raised by the grouping and role engines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SuggestError {
    /// The same variable id was supplied twice.
    #[error("variable '{0}' appears more than once in the input")]
    DuplicateVariable(String),

    /// Minimum confidence thresholds cannot be negative.
    #[error("minimum confidence must not be negative (got {0})")]
    NegativeThreshold(f32),

    /// A stored role tag list names the same target twice.
    #[error("more than one role tag stored for {0}")]
    DuplicateTag(String),

    /// A role assignment batch failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A model constructor rejected a derived value.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Rejection of one entry in a role assignment batch.
///
/// Nothing in the batch is stored when any entry is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The assignment has no target id.
    #[error("assignment {index} has no target id")]
    MissingTarget { index: usize },

    /// The role name is not one of the known research roles.
    #[error("assignment {index} uses unknown role '{role}'")]
    UnknownRole { index: usize, role: String },

    /// Confidence is outside `0.0..=1.0`.
    #[error("assignment {index} has confidence outside 0.0..=1.0")]
    InvalidConfidence { index: usize },
}

impl ValidationError {
    /// Position of the offending entry in the batch.
    pub fn index(&self) -> usize {
        match self {
            Self::MissingTarget { index }
            | Self::UnknownRole { index, .. }
            | Self::InvalidConfidence { index } => *index,
        }
    }

    /// Message suitable for display next to the offending row.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingTarget { .. } => "Pick a variable or group for this role.".to_string(),
            Self::UnknownRole { role, .. } => format!(
                "'{role}' is not a research role. Choose independent, dependent, mediator, \
                 moderator, control, latent or none."
            ),
            Self::InvalidConfidence { .. } => "The suggestion confidence is invalid.".to_string(),
        }
    }
}

/// Result type for suggestion operations.
pub type Result<T> = std::result::Result<T, SuggestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_index() {
        let err = ValidationError::UnknownRole {
            index: 3,
            role: "covariate".to_string(),
        };
        assert_eq!(err.index(), 3);
        assert!(err.user_message().contains("covariate"));
        assert_eq!(
            SuggestError::from(err).to_string(),
            "assignment 3 uses unknown role 'covariate'"
        );
    }
}
