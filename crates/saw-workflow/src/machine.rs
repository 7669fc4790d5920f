//! The seven-step workflow state machine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use saw_model::{ProjectId, ProjectSnapshot, TOTAL_STEPS, WorkflowStep};
use saw_persistence::{DirtyTracker, SaveSkip, SaveSource};
use serde::Serialize;
use tracing::{debug, info};

use crate::listeners::{Listeners, StepChange, Subscription};

/// Rounded share of completed steps, 0-100.
pub fn progress_percent(completed: usize) -> u8 {
    let completed = completed.min(TOTAL_STEPS);
    (100.0 * completed as f64 / TOTAL_STEPS as f64).round() as u8
}

/// Read-only view of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    pub current_step: WorkflowStep,
    pub completed_steps: BTreeSet<WorkflowStep>,
    pub project_id: Option<ProjectId>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub is_dirty: bool,
    pub progress_percent: u8,
}

/// Tracks where a project is in the workflow and which steps are done.
///
/// A step is reachable when it is the first step, already completed, or
/// directly follows a completed step. Listeners run synchronously on the
/// caller's thread and must not call back into the machine.
#[derive(Debug, Default)]
pub struct WorkflowStateMachine {
    current_step: WorkflowStep,
    completed: BTreeSet<WorkflowStep>,
    project_id: Option<ProjectId>,
    tracker: DirtyTracker,
    listeners: Listeners,
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_project(project_id: ProjectId) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    pub fn current_step(&self) -> WorkflowStep {
        self.current_step
    }

    pub fn completed_steps(&self) -> &BTreeSet<WorkflowStep> {
        &self.completed
    }

    pub fn is_completed(&self, step: WorkflowStep) -> bool {
        self.completed.contains(&step)
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        self.project_id.as_ref()
    }

    pub fn progress_percent(&self) -> u8 {
        progress_percent(self.completed.len())
    }

    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.tracker.last_saved_at()
    }

    pub fn state(&self) -> WorkflowState {
        WorkflowState {
            current_step: self.current_step,
            completed_steps: self.completed.clone(),
            project_id: self.project_id.clone(),
            last_saved_at: self.tracker.last_saved_at(),
            is_dirty: self.tracker.is_dirty(),
            progress_percent: self.progress_percent(),
        }
    }

    pub fn set_project_id(&mut self, project_id: ProjectId) {
        if self.project_id.as_ref() != Some(&project_id) {
            self.project_id = Some(project_id);
            self.tracker.mark_dirty();
        }
    }

    pub fn mark_dirty(&mut self) {
        self.tracker.mark_dirty();
    }

    /// Register a step-change listener.
    pub fn subscribe(
        &self,
        listener: impl Fn(&StepChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(listener)
    }

    /// Jump to `step` without checking the navigation guard.
    pub fn set_current_step(&mut self, step: WorkflowStep) {
        if step == self.current_step {
            return;
        }
        let change = StepChange {
            from: self.current_step,
            to: step,
        };
        self.current_step = step;
        self.tracker.mark_dirty();
        info!(from = %change.from, to = %change.to, "workflow step changed");
        self.listeners.notify(&change);
    }

    /// Record `step` as completed. Completing twice changes nothing.
    pub fn mark_step_complete(&mut self, step: WorkflowStep) {
        if self.completed.insert(step) {
            self.tracker.mark_dirty();
            debug!(
                step = %step,
                progress = self.progress_percent(),
                "workflow step completed"
            );
        }
    }

    pub fn can_navigate_to(&self, step: WorkflowStep) -> bool {
        step.index() == 0
            || self.completed.contains(&step)
            || step
                .previous()
                .is_some_and(|previous| self.completed.contains(&previous))
    }

    /// Move to `step` if the guard allows it. Refusal leaves everything
    /// unchanged and notifies nobody.
    pub fn navigate_to_step(&mut self, step: WorkflowStep) -> bool {
        if !self.can_navigate_to(step) {
            debug!(
                current = %self.current_step,
                requested = %step,
                "navigation refused"
            );
            return false;
        }
        self.set_current_step(step);
        true
    }

    /// Complete the current step and advance. Returns whether the step
    /// changed; on the terminal step only the completion is recorded.
    pub fn complete_current_and_navigate(&mut self) -> bool {
        let current = self.current_step;
        self.mark_step_complete(current);
        match current.next() {
            Some(next) => {
                self.set_current_step(next);
                true
            }
            None => false,
        }
    }

    /// Back to a fresh workflow. Listeners stay registered and hear about
    /// the step change if there is one.
    pub fn reset(&mut self) {
        self.completed.clear();
        self.project_id = None;
        self.set_current_step(WorkflowStep::INITIAL);
        self.tracker.clear();
        info!("workflow reset");
    }

    /// Rebuild position and progress from a saved snapshot. The restored
    /// workflow is clean.
    pub fn restore(&mut self, snapshot: &ProjectSnapshot) {
        self.completed = snapshot.completed_steps.clone();
        self.project_id = Some(snapshot.project_id.clone());
        self.set_current_step(snapshot.current_step);
        self.tracker.clear();
        self.tracker.save_complete(snapshot.timestamp);
        info!(
            project = %snapshot.project_id,
            step = %snapshot.current_step,
            progress = self.progress_percent(),
            "workflow restored"
        );
    }

    pub fn snapshot(&self) -> Option<ProjectSnapshot> {
        let project_id = self.project_id.clone()?;
        Some(ProjectSnapshot::new(
            project_id,
            self.current_step,
            self.completed.clone(),
            Utc::now(),
        ))
    }
}

impl SaveSource for WorkflowStateMachine {
    fn prepare_save(&mut self) -> Result<ProjectSnapshot, SaveSkip> {
        if self.tracker.is_saving() {
            return Err(SaveSkip::InFlight);
        }
        if !self.tracker.is_dirty() {
            return Err(SaveSkip::Clean);
        }
        let snapshot = self.snapshot().ok_or(SaveSkip::NoProject)?;
        self.tracker.start_save();
        Ok(snapshot)
    }

    fn save_succeeded(&mut self, at: DateTime<Utc>) {
        self.tracker.save_complete(at);
    }

    fn save_failed(&mut self) {
        self.tracker.save_failed();
    }
}
