//! Auto-save functionality for the workflow.
//!
//! Provides:
//! - `DirtyTracker` - Tracks unsaved changes and in-flight saves
//! - `AutoSaveConfig` - User settings for auto-save behavior
//! - `AutoSaveCoordinator` - Saves snapshots on a timer or on demand

mod config;
mod coordinator;
mod tracker;

pub use config::AutoSaveConfig;
pub use coordinator::{
    AutoSaveCoordinator, AutoSaveEvent, AutoSaveHandle, SaveOutcome, SaveSkip, SaveSource,
};
pub use tracker::DirtyTracker;
