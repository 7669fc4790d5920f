//! Workflow steps of the guided analysis pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Number of steps in the workflow.
pub const TOTAL_STEPS: usize = 7;

/// One of the seven fixed stages of the guided analysis pipeline.
///
/// Steps are linearly ordered; `Upload` is the initial step and `Results`
/// is terminal.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStep {
    /// Dataset upload (initial step)
    #[default]
    Upload,

    /// Missing-data health check
    HealthCheck,

    /// Variable grouping
    Grouping,

    /// Demographic and role classification
    Demographic,

    /// Analysis configuration
    AnalysisSelection,

    /// Remote statistical execution
    Execution,

    /// Results (terminal step)
    Results,
}

impl WorkflowStep {
    /// All steps in workflow order.
    pub const ALL: [WorkflowStep; TOTAL_STEPS] = [
        Self::Upload,
        Self::HealthCheck,
        Self::Grouping,
        Self::Demographic,
        Self::AnalysisSelection,
        Self::Execution,
        Self::Results,
    ];

    /// The initial step.
    pub const INITIAL: WorkflowStep = Self::Upload;

    /// Get the index of this step (0-based).
    pub const fn index(self) -> usize {
        match self {
            Self::Upload => 0,
            Self::HealthCheck => 1,
            Self::Grouping => 2,
            Self::Demographic => 3,
            Self::AnalysisSelection => 4,
            Self::Execution => 5,
            Self::Results => 6,
        }
    }

    /// Create a step from its index.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < TOTAL_STEPS {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// The step after this one, `None` on the terminal step.
    pub const fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The step before this one, `None` on the initial step.
    pub const fn previous(self) -> Option<Self> {
        match self.index() {
            0 => None,
            i => Self::from_index(i - 1),
        }
    }

    /// Whether this is the terminal step.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Results)
    }

    /// Stable machine name (kebab-case).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::HealthCheck => "health-check",
            Self::Grouping => "grouping",
            Self::Demographic => "demographic",
            Self::AnalysisSelection => "analysis-selection",
            Self::Execution => "execution",
            Self::Results => "results",
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::HealthCheck => "Health Check",
            Self::Grouping => "Variable Grouping",
            Self::Demographic => "Demographics & Roles",
            Self::AnalysisSelection => "Analysis Selection",
            Self::Execution => "Execution",
            Self::Results => "Results",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStep {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ModelError::UnknownStep(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for step in WorkflowStep::ALL {
            assert_eq!(WorkflowStep::from_index(step.index()), Some(step));
        }
        assert_eq!(WorkflowStep::from_index(TOTAL_STEPS), None);
    }

    #[test]
    fn test_next_and_previous() {
        assert_eq!(WorkflowStep::Upload.previous(), None);
        assert_eq!(WorkflowStep::Upload.next(), Some(WorkflowStep::HealthCheck));
        assert_eq!(WorkflowStep::Results.next(), None);
        assert!(WorkflowStep::Results.is_terminal());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&WorkflowStep::AnalysisSelection).unwrap();
        assert_eq!(json, "\"analysis-selection\"");
        assert_eq!(
            "health-check".parse::<WorkflowStep>().unwrap(),
            WorkflowStep::HealthCheck
        );
        assert!("review".parse::<WorkflowStep>().is_err());
    }
}
