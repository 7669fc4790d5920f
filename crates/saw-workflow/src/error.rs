//! Workflow error types.

use saw_model::{ModelError, WorkflowStep};
use saw_profile::ProfileError;
use saw_resilience::AnalyticsError;
use saw_suggest::SuggestError;
use thiserror::Error;

/// Errors raised while driving an analysis session.
///
/// Refused navigation is not an error; `navigate_to_step` returns `false`.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// An operation was invoked while a different step is active.
    #[error("the {expected} step is not active (current step: {current})")]
    WrongStep {
        expected: WorkflowStep,
        current: WorkflowStep,
    },

    /// An earlier step has not produced what this one needs.
    #[error("no {0} available yet")]
    MissingInput(&'static str),

    /// A group id that is not among the pending suggestions.
    #[error("no suggested group with id '{0}'")]
    UnknownGroup(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Suggest(#[from] SuggestError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl WorkflowError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::WrongStep { expected, current } => format!(
                "Finish the {} step before {}.",
                current.label(),
                expected.label()
            ),
            Self::MissingInput(what) => format!("There is no {what} yet."),
            Self::UnknownGroup(id) => format!("The group '{id}' is no longer suggested."),
            Self::Suggest(SuggestError::Validation(e)) => e.user_message(),
            Self::Analytics(e) => e.user_message().to_string(),
            Self::Profile(e) => format!("The dataset could not be profiled: {e}"),
            Self::Suggest(e) => e.to_string(),
            Self::Model(e) => e.to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::WrongStep { current, .. } => {
                Some(format!("Continue from the {} step.", current.label()))
            }
            Self::MissingInput(_) => Some("Complete the earlier steps first.".into()),
            Self::Analytics(e) => e.suggestion().map(str::to_string),
            Self::Profile(_) => Some("Check the header row and the column count of each row.".into()),
            Self::UnknownGroup(_) | Self::Suggest(_) | Self::Model(_) => None,
        }
    }

    /// Whether the error came from the remote engine rather than the input.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Analytics(_))
    }
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_step_message_names_current_step() {
        let err = WorkflowError::WrongStep {
            expected: WorkflowStep::Execution,
            current: WorkflowStep::Grouping,
        };
        assert_eq!(
            err.to_string(),
            "the execution step is not active (current step: grouping)"
        );
        assert!(err.user_message().contains("Variable Grouping"));
        assert!(!err.is_remote());
    }

    #[test]
    fn circuit_open_is_remote() {
        let err = WorkflowError::from(AnalyticsError::CircuitOpen { retry_at: None });
        assert!(err.is_remote());
        assert_eq!(
            err.user_message(),
            AnalyticsError::CircuitOpen { retry_at: None }.user_message()
        );
    }
}
