//! Dirty state tracking for auto-save.

use chrono::{DateTime, Utc};

/// Tracks unsaved changes to the workflow.
///
/// Used to decide whether a save is needed and to drive the "unsaved
/// changes" indicator. A change made while a save is in flight keeps the
/// tracker dirty after that save completes.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    /// Whether there are unsaved changes.
    dirty: bool,

    /// Bumped on every change.
    generation: u64,

    /// Generation captured when the in-flight save started.
    saving: Option<u64>,

    /// When the last save completed.
    last_saved_at: Option<DateTime<Utc>>,
}

impl DirtyTracker {
    /// Create a new tracker with no unsaved changes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are unsaved changes.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if a save is in progress.
    #[inline]
    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Mark the workflow as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.generation += 1;
    }

    /// Mark that a save has started. Returns false if one is already running.
    pub fn start_save(&mut self) -> bool {
        if self.saving.is_some() {
            return false;
        }
        self.saving = Some(self.generation);
        true
    }

    /// Mark that a save has completed successfully.
    pub fn save_complete(&mut self, at: DateTime<Utc>) {
        if self.saving.take() == Some(self.generation) {
            self.dirty = false;
        }
        self.last_saved_at = Some(at);
    }

    /// Mark that a save has failed. The tracker stays dirty.
    pub fn save_failed(&mut self) {
        self.saving = None;
    }

    /// Forget all state (new project).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
