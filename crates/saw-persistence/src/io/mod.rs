//! Storage backends for workflow snapshots.
//!
//! This module handles:
//! - Atomic JSON writes (temp file + rename)
//! - The `SnapshotStore` trait and its file-backed implementation
//! - The string-keyed local backup

mod atomic;
mod backup;
mod store;

pub use backup::{BACKUP_KEY, FileBackup, LocalBackup};
pub use store::{JsonFileStore, SnapshotStore};
