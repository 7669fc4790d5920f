//! Workflow snapshot exchanged with the persistence collaborator.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;
use crate::step::WorkflowStep;

/// Current schema version of [`ProjectSnapshot`].
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Persisted position of a project in the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub project_id: ProjectId,
    pub current_step: WorkflowStep,
    #[serde(default)]
    pub completed_steps: BTreeSet<WorkflowStep>,
    pub timestamp: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    SNAPSHOT_SCHEMA_VERSION
}

impl ProjectSnapshot {
    pub fn new(
        project_id: ProjectId,
        current_step: WorkflowStep,
        completed_steps: BTreeSet<WorkflowStep>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            project_id,
            current_step,
            completed_steps,
            timestamp,
        }
    }
}
