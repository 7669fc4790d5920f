//! Data model for the guided survey analysis workflow.
//!
//! Everything the workflow engines exchange is defined here as closed,
//! validated types:
//!
//! - `step` - the seven workflow steps
//! - `variable` / `group` / `role` - dataset variables, suggested groups, role tags
//! - `dataset` - parsed header + rows handed over by CSV ingestion
//! - `analysis` - configuration and results of the remote analysis
//! - `snapshot` - what autosave persists

#![deny(unsafe_code)]

mod analysis;
mod dataset;
mod error;
mod group;
mod ids;
mod role;
mod snapshot;
mod step;
mod variable;

pub use analysis::{AnalysisConfig, AnalysisKind, AnalysisResult};
pub use dataset::{CellValue, Dataset};
pub use error::{ModelError, Result};
pub use group::VariableGroup;
pub use ids::{GroupId, ProjectId, VariableId};
pub use role::{ResearchRole, RoleTag, RoleTarget};
pub use snapshot::{ProjectSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use step::{TOTAL_STEPS, WorkflowStep};
pub use variable::{DataType, DemographicType, SummaryStats, Variable};
