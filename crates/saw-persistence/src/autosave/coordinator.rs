//! Periodic snapshot saving.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use saw_model::ProjectSnapshot;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::config::AutoSaveConfig;
use crate::error::{PersistenceError, Result};
use crate::io::{BACKUP_KEY, LocalBackup, SnapshotStore};

/// Why a save attempt produced no snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveSkip {
    /// Nothing changed since the last save.
    Clean,
    /// No project has been set yet.
    NoProject,
    /// Another save has not finished.
    InFlight,
}

/// The state autosave reads from and reports back to.
///
/// `prepare_save` marks the save as started when it returns a snapshot;
/// exactly one of `save_succeeded` / `save_failed` follows.
pub trait SaveSource: Send {
    fn prepare_save(&mut self) -> std::result::Result<ProjectSnapshot, SaveSkip>;

    fn save_succeeded(&mut self, at: DateTime<Utc>);

    fn save_failed(&mut self);
}

/// Result of one save attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { at: DateTime<Utc> },
    Clean,
    NoProject,
    InFlight,
    /// Auto-save is switched off (timer ticks only).
    Disabled,
}

impl From<SaveSkip> for SaveOutcome {
    fn from(skip: SaveSkip) -> Self {
        match skip {
            SaveSkip::Clean => Self::Clean,
            SaveSkip::NoProject => Self::NoProject,
            SaveSkip::InFlight => Self::InFlight,
        }
    }
}

/// Event reported by the background save loop.
#[derive(Debug)]
pub enum AutoSaveEvent {
    Saved { at: DateTime<Utc> },
    Failed(PersistenceError),
}

/// Saves dirty workflow state to a [`SnapshotStore`] and mirrors each
/// snapshot into an optional [`LocalBackup`].
pub struct AutoSaveCoordinator<S> {
    source: Arc<Mutex<S>>,
    store: Arc<dyn SnapshotStore>,
    backup: Option<Arc<dyn LocalBackup>>,
    config: AutoSaveConfig,
}

impl<S> Clone for AutoSaveCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            backup: self.backup.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> fmt::Debug for AutoSaveCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSaveCoordinator")
            .field("config", &self.config)
            .field("has_backup", &self.backup.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: SaveSource> AutoSaveCoordinator<S> {
    pub fn new(source: Arc<Mutex<S>>, store: Arc<dyn SnapshotStore>, config: AutoSaveConfig) -> Self {
        Self {
            source,
            store,
            backup: None,
            config,
        }
    }

    #[must_use]
    pub fn with_backup(mut self, backup: Arc<dyn LocalBackup>) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<Mutex<S>> {
        &self.source
    }

    /// One timer tick: saves if enabled and needed.
    pub async fn tick(&self) -> Result<SaveOutcome> {
        if !self.config.enabled {
            return Ok(SaveOutcome::Disabled);
        }
        self.save_now().await
    }

    /// Save immediately if there is something to save.
    ///
    /// A store failure leaves the state dirty and is returned; the local
    /// backup is written either way.
    pub async fn save_now(&self) -> Result<SaveOutcome> {
        let prepared = self.lock().prepare_save();
        let snapshot = match prepared {
            Ok(snapshot) => snapshot,
            Err(skip) => {
                tracing::trace!(?skip, "Autosave skipped");
                return Ok(skip.into());
            }
        };

        let result = self.store.save_project_snapshot(&snapshot).await;
        let outcome = match result {
            Ok(()) => {
                let at = Utc::now();
                self.lock().save_succeeded(at);
                tracing::info!(project = %snapshot.project_id, "Autosaved workflow");
                Ok(SaveOutcome::Saved { at })
            }
            Err(e) => {
                self.lock().save_failed();
                tracing::warn!(
                    project = %snapshot.project_id,
                    error = %e,
                    "Autosave failed; changes kept for the next attempt"
                );
                Err(e)
            }
        };

        self.write_backup(&snapshot);
        outcome
    }

    /// Start the periodic save loop. The first save happens one interval
    /// from now; stopping the handle flushes once more.
    pub fn spawn(self) -> AutoSaveHandle
    where
        S: 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let period = self.config.interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        forward(&event_tx, self.tick().await);
                    }
                    _ = &mut stop_rx => break,
                }
            }

            if self.config.enabled {
                forward(&event_tx, self.save_now().await);
            }
            tracing::debug!("Autosave loop stopped");
        });

        AutoSaveHandle {
            stop: Some(stop_tx),
            events: event_rx,
            task,
        }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_backup(&self, snapshot: &ProjectSnapshot) {
        let Some(backup) = &self.backup else {
            return;
        };
        let written = serde_json::to_string(snapshot)
            .map_err(|source| PersistenceError::Serialization { source })
            .and_then(|json| backup.write(BACKUP_KEY, &json));
        if let Err(e) = written {
            tracing::warn!(error = %e, "Could not write local autosave backup");
        }
    }
}

fn forward(events: &mpsc::UnboundedSender<AutoSaveEvent>, outcome: Result<SaveOutcome>) {
    let event = match outcome {
        Ok(SaveOutcome::Saved { at }) => AutoSaveEvent::Saved { at },
        Ok(_) => return,
        Err(e) => AutoSaveEvent::Failed(e),
    };
    // The receiver may already be gone.
    let _ = events.send(event);
}

/// Handle to a running save loop.
#[derive(Debug)]
pub struct AutoSaveHandle {
    stop: Option<oneshot::Sender<()>>,
    events: mpsc::UnboundedReceiver<AutoSaveEvent>,
    task: JoinHandle<()>,
}

impl AutoSaveHandle {
    /// Wait for the next save or failure.
    pub async fn next_event(&mut self) -> Option<AutoSaveEvent> {
        self.events.recv().await
    }

    /// Stop the loop after a final flush. Returns events not yet received.
    pub async fn stop(mut self) -> Result<Vec<AutoSaveEvent>> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.task)
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))?;

        let mut remaining = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            remaining.push(event);
        }
        Ok(remaining)
    }
}
