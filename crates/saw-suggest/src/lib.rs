//! Suggestion engines for the grouping and role steps.
//!
//! - [`VariableGroupingEngine`] proposes multi-item groups from naming stems
//! - [`RoleSuggestionEngine`] proposes research roles with reasons
//! - [`RoleTagStore`] validates and persists role assignments
//! - [`Debouncer`] collapses bursts of edits into one recomputation
//! - [`DebouncedRoleSuggester`] reruns role suggestions once edits settle
//!
//! Engines are synchronous and side-effect free; only the debouncer needs
//! a tokio runtime.

mod debounce;
mod debounced;
mod error;
mod grouping;
mod role;
mod store;

pub use debounce::{DEFAULT_DEBOUNCE, Debouncer, SequenceToken, StalenessGuard};
pub use debounced::{DebouncedRoleSuggester, RoleEdit, RoleSubject, SuggestionUpdate};
pub use error::{Result, SuggestError, ValidationError};
pub use grouping::{GroupingOptions, VariableGroupingEngine};
pub use role::{RoleContext, RoleSuggestion, RoleSuggestionEngine};
pub use store::{PersistSummary, RoleAssignment, RoleTagStore, TargetKind};
