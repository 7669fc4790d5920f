//! Validation errors for model constructors.

use thiserror::Error;

/// Errors raised when a model value fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// An identifier was empty after trimming.
    #[error("{kind} identifier must not be empty")]
    EmptyIdentifier { kind: &'static str },

    /// Role name is not one of the known research roles.
    #[error("unknown research role: '{0}'")]
    UnknownRole(String),

    /// Role tags cannot carry the `none` role.
    #[error("role 'none' cannot be stored as a tag")]
    NoneRole,

    /// A variable group needs at least one member.
    #[error("variable group '{0}' has no members")]
    EmptyGroup(String),

    /// A variable appears twice in the same group.
    #[error("variable '{variable}' appears more than once in group '{group}'")]
    DuplicateMember { group: String, variable: String },

    /// Confidence must lie in `0.0..=1.0`.
    #[error("confidence {0} is outside 0.0..=1.0")]
    ConfidenceOutOfRange(f32),

    /// Unknown workflow step name.
    #[error("unknown workflow step: '{0}'")]
    UnknownStep(String),

    /// Unknown analysis kind.
    #[error("unknown analysis kind: '{0}'")]
    UnknownAnalysis(String),
}

/// Result type for model construction.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Validates a confidence score.
pub(crate) fn check_confidence(confidence: f32) -> Result<f32> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(ModelError::ConfidenceOutOfRange(confidence))
    }
}
