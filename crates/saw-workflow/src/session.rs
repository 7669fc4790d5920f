//! One project's pass through the workflow.
//!
//! [`AnalysisSession`] owns everything the steps produce and drives the
//! engines in step order. The state machine it advances is shared (behind
//! a mutex) with the autosave coordinator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use saw_model::{
    AnalysisConfig, AnalysisKind, AnalysisResult, Dataset, GroupId, ProjectId, RoleTag,
    RoleTarget, Variable, VariableGroup, WorkflowStep,
};
use saw_profile::{DataHealthAnalyzer, DemographicDetector, HealthReport, infer_variables};
use saw_resilience::AnalyticsEngine;
use saw_suggest::{
    GroupingOptions, PersistSummary, RoleAssignment, RoleContext, RoleSuggestion,
    RoleSuggestionEngine, RoleTagStore, VariableGroupingEngine,
};
use tracing::{info, warn};

use crate::error::{Result, WorkflowError};
use crate::machine::{WorkflowState, WorkflowStateMachine};

/// Tuning for the heuristic engines.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub grouping: GroupingOptions,
    pub demographic_confidence: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            grouping: GroupingOptions::default(),
            demographic_confidence: 0.5,
        }
    }
}

/// A role suggestion for one variable or group.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSuggestion {
    pub target: RoleTarget,
    pub suggestion: RoleSuggestion,
}

impl TargetSuggestion {
    /// The assignment that accepts this suggestion.
    pub fn to_assignment(&self) -> RoleAssignment {
        let role = self.suggestion.role.as_str();
        let assignment = match &self.target {
            RoleTarget::Variable(id) => RoleAssignment::variable(id.as_str(), role),
            RoleTarget::Group(id) => RoleAssignment::group(id.as_str(), role),
        };
        assignment.suggested(self.suggestion.confidence, self.suggestion.reasons.join("; "))
    }
}

pub struct AnalysisSession {
    workflow: Arc<Mutex<WorkflowStateMachine>>,
    engine: Arc<dyn AnalyticsEngine>,
    grouping: VariableGroupingEngine,
    demographics: DemographicDetector,
    role_engine: RoleSuggestionEngine,

    dataset: Option<Dataset>,
    variables: Vec<Variable>,
    health: Option<HealthReport>,
    suggested_groups: Vec<VariableGroup>,
    groups: Vec<VariableGroup>,
    role_suggestions: Vec<TargetSuggestion>,
    roles: RoleTagStore,
    analysis: Option<AnalysisConfig>,
    result: Option<AnalysisResult>,
}

impl AnalysisSession {
    pub fn new(
        project_id: ProjectId,
        engine: Arc<dyn AnalyticsEngine>,
        options: SessionOptions,
    ) -> Self {
        let workflow = Arc::new(Mutex::new(WorkflowStateMachine::for_project(project_id)));
        Self::with_workflow(workflow, engine, options)
    }

    /// Drive an existing (possibly restored) state machine.
    pub fn with_workflow(
        workflow: Arc<Mutex<WorkflowStateMachine>>,
        engine: Arc<dyn AnalyticsEngine>,
        options: SessionOptions,
    ) -> Self {
        Self {
            workflow,
            engine,
            grouping: VariableGroupingEngine::new(options.grouping),
            demographics: DemographicDetector::new(options.demographic_confidence),
            role_engine: RoleSuggestionEngine::new(),
            dataset: None,
            variables: Vec::new(),
            health: None,
            suggested_groups: Vec::new(),
            groups: Vec::new(),
            role_suggestions: Vec::new(),
            roles: RoleTagStore::new(),
            analysis: None,
            result: None,
        }
    }

    pub fn workflow(&self) -> &Arc<Mutex<WorkflowStateMachine>> {
        &self.workflow
    }

    pub fn state(&self) -> WorkflowState {
        self.machine().state()
    }

    pub fn current_step(&self) -> WorkflowStep {
        self.machine().current_step()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn health_report(&self) -> Option<&HealthReport> {
        self.health.as_ref()
    }

    /// Groups suggested but not yet accepted or rejected.
    pub fn suggested_groups(&self) -> &[VariableGroup] {
        &self.suggested_groups
    }

    /// Accepted groups.
    pub fn groups(&self) -> &[VariableGroup] {
        &self.groups
    }

    pub fn role_suggestions(&self) -> &[TargetSuggestion] {
        &self.role_suggestions
    }

    pub fn role_tags(&self) -> impl Iterator<Item = &RoleTag> {
        self.roles.tags()
    }

    pub fn analysis(&self) -> Option<&AnalysisConfig> {
        self.analysis.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Accept a parsed dataset and create one variable per column.
    ///
    /// Uploading again discards everything derived from the old dataset.
    pub fn upload(&mut self, dataset: Dataset) -> Result<&[Variable]> {
        self.require(WorkflowStep::Upload)?;
        let variables = infer_variables(&dataset)?;
        info!(
            columns = dataset.column_count(),
            rows = dataset.row_count(),
            "dataset uploaded"
        );

        self.clear_derived();
        self.variables = variables;
        self.dataset = Some(dataset);
        self.advance();
        Ok(&self.variables)
    }

    pub fn run_health_check(&mut self) -> Result<&HealthReport> {
        self.require(WorkflowStep::HealthCheck)?;
        let dataset = self
            .dataset
            .as_ref()
            .ok_or(WorkflowError::MissingInput("dataset"))?;
        let report = DataHealthAnalyzer::new().analyze(dataset)?;
        info!(
            columns = report.len(),
            affected = report.summary().affected_columns(),
            "health check finished"
        );
        self.advance();
        Ok(self.health.insert(report))
    }

    /// Compute group suggestions. Nothing is applied until accepted.
    pub fn run_grouping(&mut self) -> Result<&[VariableGroup]> {
        self.require(WorkflowStep::Grouping)?;
        if self.dataset.is_none() {
            return Err(WorkflowError::MissingInput("dataset"));
        }
        self.suggested_groups = self.grouping.suggest(&self.variables)?;
        self.groups.clear();
        info!(
            suggestions = self.suggested_groups.len(),
            "group suggestions ready"
        );
        Ok(&self.suggested_groups)
    }

    pub fn accept_group(&mut self, id: &GroupId) -> Result<&VariableGroup> {
        self.require(WorkflowStep::Grouping)?;
        let group = self.take_suggestion(id)?;
        // A variable belongs to at most one group.
        self.suggested_groups
            .retain(|other| !other.members().iter().any(|m| group.contains(m)));
        self.machine().mark_dirty();
        info!(group = %group.id(), members = group.len(), "group accepted");
        self.groups.push(group);
        Ok(&self.groups[self.groups.len() - 1])
    }

    pub fn reject_group(&mut self, id: &GroupId) -> Result<()> {
        self.require(WorkflowStep::Grouping)?;
        let group = self.take_suggestion(id)?;
        info!(group = %group.id(), "group rejected");
        Ok(())
    }

    /// Finish grouping; suggestions not accepted are dropped.
    pub fn confirm_groups(&mut self) -> Result<&[VariableGroup]> {
        self.require(WorkflowStep::Grouping)?;
        self.suggested_groups.clear();
        self.advance();
        Ok(&self.groups)
    }

    /// Detect demographics and suggest a role for every ungrouped variable
    /// and every accepted group.
    pub fn run_demographics(&mut self) -> Result<&[TargetSuggestion]> {
        self.require(WorkflowStep::Demographic)?;
        let detected = self.demographics.apply(&mut self.variables);

        let total = self.variables.len();
        let mut suggestions = Vec::new();
        for (position, variable) in self.variables.iter().enumerate() {
            if self.groups.iter().any(|g| g.contains(&variable.id)) {
                continue;
            }
            let context = RoleContext::for_variable(variable, position, total);
            let suggestion = self.role_engine.suggest_for_variable(variable, &context);
            if !suggestion.is_none() {
                suggestions.push(TargetSuggestion {
                    target: RoleTarget::Variable(variable.id.clone()),
                    suggestion,
                });
            }
        }
        for group in &self.groups {
            let context = RoleContext::for_group(group, &self.variables);
            let suggestion = self.role_engine.suggest_for_group(group, &context);
            if !suggestion.is_none() {
                suggestions.push(TargetSuggestion {
                    target: RoleTarget::Group(group.id().clone()),
                    suggestion,
                });
            }
        }

        info!(
            demographics = detected,
            role_suggestions = suggestions.len(),
            "demographic and role suggestions ready"
        );
        self.machine().mark_dirty();
        self.role_suggestions = suggestions;
        Ok(&self.role_suggestions)
    }

    /// Assignments accepting every current role suggestion.
    pub fn suggested_assignments(&self) -> Vec<RoleAssignment> {
        self.role_suggestions
            .iter()
            .map(TargetSuggestion::to_assignment)
            .collect()
    }

    /// Validate and store role assignments, then finish the step.
    pub fn assign_roles(&mut self, assignments: &[RoleAssignment]) -> Result<PersistSummary> {
        self.require(WorkflowStep::Demographic)?;
        let summary = self.roles.persist(assignments)?;
        self.advance();
        Ok(summary)
    }

    /// Configure the analysis. Without an explicit kind the one matching
    /// the assigned roles is chosen.
    pub fn select_analysis(&mut self, kind: Option<AnalysisKind>) -> Result<&AnalysisConfig> {
        self.require(WorkflowStep::AnalysisSelection)?;
        let project_id = self
            .machine()
            .project_id()
            .cloned()
            .ok_or(WorkflowError::MissingInput("project"))?;
        let kind = kind.unwrap_or_else(|| AnalysisKind::recommend(self.roles.tags()));

        let mut config = AnalysisConfig::new(project_id, kind);
        config.roles = self.roles.tags().cloned().collect();
        config.groups = self.groups.clone();
        info!(kind = %kind, roles = config.roles.len(), "analysis selected");

        self.result = None;
        self.advance();
        Ok(self.analysis.insert(config))
    }

    /// Submit the analysis to the engine.
    ///
    /// On failure the workflow stays on the execution step and the error
    /// is returned; calling again retries.
    pub async fn execute(&mut self) -> Result<&AnalysisResult> {
        self.require(WorkflowStep::Execution)?;
        let config = self
            .analysis
            .clone()
            .ok_or(WorkflowError::MissingInput("analysis configuration"))?;

        let engine = Arc::clone(&self.engine);
        let result = match engine.run_analysis(&config).await {
            Ok(result) => result,
            Err(e) => {
                warn!(kind = %config.kind, error = %e, "analysis execution failed");
                return Err(e.into());
            }
        };

        info!(analysis = %result.analysis_id, "analysis finished");
        self.advance();
        Ok(self.result.insert(result))
    }

    /// Show the results; marks the terminal step complete.
    pub fn results(&mut self) -> Result<&AnalysisResult> {
        self.require(WorkflowStep::Results)?;
        let result = self
            .result
            .as_ref()
            .ok_or(WorkflowError::MissingInput("analysis result"))?;
        self.advance();
        Ok(result)
    }

    fn machine(&self) -> MutexGuard<'_, WorkflowStateMachine> {
        self.workflow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require(&self, expected: WorkflowStep) -> Result<()> {
        let current = self.machine().current_step();
        if current == expected {
            Ok(())
        } else {
            Err(WorkflowError::WrongStep { expected, current })
        }
    }

    fn advance(&self) {
        self.machine().complete_current_and_navigate();
    }

    fn take_suggestion(&mut self, id: &GroupId) -> Result<VariableGroup> {
        let index = self
            .suggested_groups
            .iter()
            .position(|g| g.id() == id)
            .ok_or_else(|| WorkflowError::UnknownGroup(id.to_string()))?;
        Ok(self.suggested_groups.remove(index))
    }

    fn clear_derived(&mut self) {
        self.health = None;
        self.suggested_groups.clear();
        self.groups.clear();
        self.role_suggestions.clear();
        self.roles.clear();
        self.analysis = None;
        self.result = None;
    }
}
