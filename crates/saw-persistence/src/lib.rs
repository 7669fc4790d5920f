//! Persistence for the survey analysis workflow.
//!
//! Keeps the workflow position safe between sessions:
//!
//! - **Dirty tracking** so only real changes are written
//! - **Auto-save** on a fixed interval, plus an explicit `save_now`
//! - **Atomic writes** (temp file + rename) for the file-backed stores
//! - **Local backup** of the last snapshot, written even when the store fails
//!
//! # Architecture
//!
//! - `autosave/` - `DirtyTracker`, `AutoSaveConfig`, `AutoSaveCoordinator`
//! - `io/` - `SnapshotStore`, `JsonFileStore`, `LocalBackup`, `FileBackup`
//! - `error.rs` - Error types with user-friendly messages

#![deny(unsafe_code)]

mod autosave;
mod error;
mod io;

pub use autosave::{
    AutoSaveConfig, AutoSaveCoordinator, AutoSaveEvent, AutoSaveHandle, DirtyTracker,
    SaveOutcome, SaveSkip, SaveSource,
};
pub use error::{PersistenceError, Result};
pub use io::{BACKUP_KEY, FileBackup, JsonFileStore, LocalBackup, SnapshotStore};
