//! Workflow orchestration for guided survey analysis.
//!
//! - [`WorkflowStateMachine`] owns the current step, completed steps and
//!   the dirty flag, and notifies listeners on every step change
//! - [`AnalysisSession`] runs the profiling, suggestion and analytics
//!   engines in step order and advances the machine
//!
//! The state machine implements [`saw_persistence::SaveSource`], so an
//! `AutoSaveCoordinator` can snapshot it directly.

#![deny(unsafe_code)]

mod error;
mod listeners;
mod machine;
mod session;

pub use error::{Result, WorkflowError};
pub use listeners::{StepChange, Subscription};
pub use machine::{WorkflowState, WorkflowStateMachine, progress_percent};
pub use session::{AnalysisSession, SessionOptions, TargetSuggestion};
