use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{Instrument, debug, info, info_span, warn};

use saw_cli::ingest::read_dataset;
use saw_cli::settings::{Settings, default_state_dir};
use saw_cli::summary::{
    groups_table, health_table, result_table, role_suggestions_table, role_tags_table,
    workflow_table,
};
use saw_model::{AnalysisKind, Dataset, GroupId, ProjectId, ProjectSnapshot, VariableGroup};
use saw_persistence::{
    AutoSaveCoordinator, AutoSaveEvent, BACKUP_KEY, FileBackup, JsonFileStore, LocalBackup,
    SaveOutcome, SnapshotStore,
};
use saw_profile::{DataHealthAnalyzer, HealthReport, HealthStatus, infer_variables};
use saw_resilience::{AnalyticsClient, OfflineEngine};
use saw_suggest::{Debouncer, GroupingOptions, VariableGroupingEngine};
use saw_workflow::{
    AnalysisSession, StepChange, TargetSuggestion, WorkflowError, WorkflowState,
    WorkflowStateMachine,
};

use crate::cli::{DatasetArgs, GroupsArgs, ResumeArgs, RunArgs};

const SNAPSHOT_DIR: &str = "snapshots";
const BACKUP_DIR: &str = "backup";
const PREVIEW_PROJECT: &str = "preview";
const FLUSH_ATTEMPTS: u32 = 20;
const FLUSH_RETRY_DELAY: Duration = Duration::from_millis(25);

pub fn run_health(args: &DatasetArgs) -> Result<HealthReport> {
    let dataset = read_dataset(&args.csv)?;
    let report = DataHealthAnalyzer::new()
        .analyze(&dataset)
        .context("analyze missing data")?;
    Ok(report)
}

pub fn health_status_line(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Clean => "No missing data found.".to_string(),
        HealthStatus::IssuesFound { affected_columns } => {
            format!("{affected_columns} column(s) have missing data.")
        }
        HealthStatus::Unavailable { reason } => {
            format!("Missing-data analysis unavailable: {reason}")
        }
    }
}

pub fn run_groups(args: &GroupsArgs, settings: &Settings) -> Result<Vec<VariableGroup>> {
    let dataset = read_dataset(&args.dataset.csv)?;
    let variables = infer_variables(&dataset).context("infer variables")?;
    let min_confidence = args
        .min_confidence
        .unwrap_or(settings.suggestions.min_group_confidence);
    let engine = VariableGroupingEngine::new(GroupingOptions::new(min_confidence)?);
    let groups = engine.suggest(&variables).context("suggest groups")?;
    debug!(groups = groups.len(), min_confidence, "grouping finished");
    Ok(groups)
}

/// Role suggestions as the workflow would offer them, accepting every
/// suggested group. Nothing is saved and no analysis is submitted.
pub fn run_roles(args: &DatasetArgs, settings: &Settings) -> Result<Vec<TargetSuggestion>> {
    let dataset = read_dataset(&args.csv)?;
    preview_roles(dataset, settings)
}

pub fn preview_roles(dataset: Dataset, settings: &Settings) -> Result<Vec<TargetSuggestion>> {
    let mut session = AnalysisSession::new(
        ProjectId::new(PREVIEW_PROJECT)?,
        Arc::new(OfflineEngine),
        settings.suggestions.session_options()?,
    );

    session.upload(dataset)?;
    session.run_health_check()?;
    accept_all_groups(&mut session)?;
    Ok(session.run_demographics()?.to_vec())
}

/// Run every step for one dataset, saving progress under the state
/// folder. Returns `false` when the workflow stopped early.
pub async fn run_workflow(args: &RunArgs, settings: &Settings) -> Result<bool> {
    let project_id = ProjectId::new(args.project.as_str())?;
    let state_dir = resolve_state_dir(args.state_dir.as_deref())?;
    let dataset = read_dataset(&args.dataset.csv)?;

    let mut analytics = settings.analytics.clone();
    if let Some(url) = &args.engine_url {
        analytics.base_url.clone_from(url);
    }
    let client =
        AnalyticsClient::http(&analytics.client_config()).context("create analytics client")?;
    let mut session = AnalysisSession::new(
        project_id.clone(),
        Arc::new(client),
        settings.suggestions.session_options()?,
    );

    // =========================================================================
    // Autosave: timer loop plus a debounced save after each step change
    // =========================================================================
    let coordinator = AutoSaveCoordinator::new(
        Arc::clone(session.workflow()),
        Arc::new(JsonFileStore::new(state_dir.join(SNAPSHOT_DIR))),
        settings.autosave.clone(),
    )
    .with_backup(Arc::new(FileBackup::new(state_dir.join(BACKUP_DIR))));

    let saver = coordinator.clone();
    let debouncer = Arc::new(Debouncer::new(
        settings.suggestions.debounce(),
        move |change: StepChange, _token| {
            let saver = saver.clone();
            tokio::spawn(async move {
                if let Err(e) = saver.save_now().await {
                    warn!(step = %change.to, error = %e, "Save after step change failed");
                }
            });
        },
    ));
    let trigger = Arc::clone(&debouncer);
    let subscription = session
        .workflow()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .subscribe(move |change| {
            trigger.trigger(*change);
        });
    let finisher = coordinator.clone();
    let autosave = coordinator.spawn();

    let span = info_span!("run", project = %project_id);
    let outcome = drive(&mut session, args.analysis, dataset)
        .instrument(span)
        .await;

    debouncer.cancel();
    subscription.unsubscribe();
    let mut failures = 0usize;
    for event in autosave.stop().await? {
        if let AutoSaveEvent::Failed(e) = event {
            failures += 1;
            eprintln!("warning: {}", e.user_message());
        }
    }
    match flush(&finisher).await {
        Ok(outcome) => debug!(?outcome, "Final save"),
        Err(e) => {
            failures += 1;
            eprintln!("warning: {}", e.user_message());
        }
    }

    println!("\nWorkflow");
    println!("{}", workflow_table(&session.state()));
    if failures == 0 {
        println!("Progress saved under {}", state_dir.display());
    }

    match outcome {
        Ok(()) => Ok(true),
        Err(e) => {
            report_workflow_error(&e);
            Ok(false)
        }
    }
}

/// Restore a project's saved position, falling back to the local backup.
pub async fn run_resume(args: &ResumeArgs) -> Result<WorkflowState> {
    let project_id = ProjectId::new(args.project.as_str())?;
    let state_dir = resolve_state_dir(args.state_dir.as_deref())?;
    let store = JsonFileStore::new(state_dir.join(SNAPSHOT_DIR));

    let snapshot = match store.load_project_snapshot(&project_id).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => load_backup(&state_dir, &project_id)?
            .ok_or_else(|| anyhow!("no saved progress for project {project_id}"))?,
        Err(e) => {
            warn!(error = %e, "Saved snapshot unreadable, trying local backup");
            match load_backup(&state_dir, &project_id)? {
                Some(snapshot) => snapshot,
                None => return Err(anyhow!(e.user_message())),
            }
        }
    };

    let mut machine = WorkflowStateMachine::new();
    machine.restore(&snapshot);
    info!(project = %project_id, step = %machine.current_step(), "Restored workflow");
    Ok(machine.state())
}

async fn drive(
    session: &mut AnalysisSession,
    analysis: Option<AnalysisKind>,
    dataset: Dataset,
) -> saw_workflow::Result<()> {
    let variables = session.upload(dataset)?;
    println!("Loaded {} variables", variables.len());

    let report = session.run_health_check()?;
    println!("\nData health: {}", health_status_line(&report.status()));
    println!("{}", health_table(report));

    let groups = accept_all_groups(session)?;
    println!("\nVariable groups");
    println!("{}", groups_table(groups));

    let suggestions = session.run_demographics()?;
    println!("\nSuggested roles");
    println!("{}", role_suggestions_table(suggestions));

    let assignments = session.suggested_assignments();
    session.assign_roles(&assignments)?;
    println!("\nAssigned roles");
    println!("{}", role_tags_table(session.role_tags()));

    let config = session.select_analysis(analysis)?;
    println!(
        "\nRunning {} with {} role assignment(s)",
        config.kind.label(),
        config.roles.len()
    );

    session.execute().await?;
    let result = session.results()?;
    if !result.summary.is_empty() {
        println!("{}", result.summary);
    }
    println!("{}", result_table(result));
    for warning in &result.warnings {
        println!("note: {warning}");
    }
    Ok(())
}

/// Accept every group suggestion, then confirm the step.
fn accept_all_groups(session: &mut AnalysisSession) -> saw_workflow::Result<&[VariableGroup]> {
    let ids: Vec<GroupId> = session
        .run_grouping()?
        .iter()
        .map(|group| group.id().clone())
        .collect();
    for id in &ids {
        // Accepting a group drops suggestions that overlap it.
        if session.suggested_groups().iter().any(|g| g.id() == id) {
            session.accept_group(id)?;
        }
    }
    session.confirm_groups()
}

/// Save once more after the timer loop has stopped, waiting out a save
/// still running from a debounced trigger.
async fn flush(
    coordinator: &AutoSaveCoordinator<WorkflowStateMachine>,
) -> saw_persistence::Result<SaveOutcome> {
    let mut outcome = coordinator.save_now().await?;
    for _ in 1..FLUSH_ATTEMPTS {
        if outcome != SaveOutcome::InFlight {
            break;
        }
        tokio::time::sleep(FLUSH_RETRY_DELAY).await;
        outcome = coordinator.save_now().await?;
    }
    Ok(outcome)
}

fn load_backup(state_dir: &Path, project_id: &ProjectId) -> Result<Option<ProjectSnapshot>> {
    let backup = FileBackup::new(state_dir.join(BACKUP_DIR));
    let Some(json) = backup.read(BACKUP_KEY)? else {
        return Ok(None);
    };
    let snapshot: ProjectSnapshot =
        serde_json::from_str(&json).context("parse local autosave backup")?;
    if &snapshot.project_id != project_id {
        debug!(found = %snapshot.project_id, "Local backup belongs to another project");
        return Ok(None);
    }
    warn!(project = %project_id, "Restoring from local autosave backup");
    Ok(Some(snapshot))
}

fn resolve_state_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(default_state_dir)
        .context("could not determine a folder for saved progress; pass --state-dir")
}

fn report_workflow_error(error: &WorkflowError) {
    eprintln!("error: {}", error.user_message());
    if let Some(hint) = error.suggestion() {
        eprintln!("hint: {hint}");
    }
    if error.is_remote() {
        eprintln!("hint: the analysis service may recover shortly; run the command again.");
    }
}

#[cfg(test)]
mod tests {
    use saw_cli::ingest::parse_dataset;

    use super::*;

    #[test]
    fn preview_roles_needs_no_engine() {
        let csv = "age,gender,Q1_1,Q1_2,Q1_3\n34,female,4,5,4\n51,male,2,3,2\n27,female,5,5,4\n";
        let dataset = parse_dataset(csv.as_bytes()).unwrap();
        let mut settings = Settings::default();
        settings.analytics.base_url.clear();

        let suggestions = preview_roles(dataset, &settings).unwrap();
        assert!(!suggestions.is_empty());
    }
}
