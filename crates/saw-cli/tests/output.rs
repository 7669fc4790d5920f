use std::collections::BTreeSet;
use std::fs;

use chrono::Utc;
use saw_cli::ingest::{parse_dataset, read_dataset};
use saw_cli::settings::{Settings, load_settings_from};
use saw_cli::summary::{groups_table, health_table, workflow_table};
use saw_model::{ProjectId, ProjectSnapshot, WorkflowStep};
use saw_profile::{DataHealthAnalyzer, HealthStatus, infer_variables};
use saw_suggest::{GroupingOptions, VariableGroupingEngine};
use saw_workflow::WorkflowStateMachine;

const SURVEY_CSV: &str = "\
respondent_id,age,gender,Q1_1,Q1_2,Q1_3,overall_satisfaction
1,34,female,4,5,4,7
2,,male,3,,4,6
3,52,female,5,5,5,
4,41,,2,3,2,5
";

#[test]
fn default_settings_file() {
    let rendered = toml::to_string_pretty(&Settings::default()).unwrap();
    insta::assert_snapshot!(rendered, @r#"
    [autosave]
    enabled = true
    interval_secs = 30

    [analytics]
    base_url = "http://localhost:8080/api"
    timeout_secs = 30
    max_attempts = 3
    initial_delay_ms = 1000
    max_delay_ms = 30000
    backoff_multiplier = 2.0
    failure_threshold = 5
    success_threshold = 2
    reset_timeout_secs = 60

    [suggestions]
    min_group_confidence = 0.5
    demographic_confidence = 0.5
    debounce_ms = 300
    "#);
}

#[test]
fn settings_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(
        &path,
        "[autosave]\nenabled = false\n\n[suggestions]\ndebounce_ms = 50\n",
    )
    .unwrap();

    let settings = load_settings_from(&path);
    assert!(!settings.autosave.enabled);
    assert_eq!(settings.suggestions.debounce_ms, 50);
    assert_eq!(settings.analytics, Settings::default().analytics);
}

#[test]
fn missing_settings_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        load_settings_from(&dir.path().join("absent.toml")),
        Settings::default()
    );
}

#[test]
fn read_dataset_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let error = read_dataset(&dir.path().join("nope.csv")).unwrap_err();
    assert!(format!("{error:#}").contains("nope.csv"));
}

#[test]
fn health_of_survey_csv() {
    let dataset = parse_dataset(SURVEY_CSV.as_bytes()).unwrap();
    let report = DataHealthAnalyzer::new().analyze(&dataset).unwrap();

    assert_eq!(
        report.status(),
        HealthStatus::IssuesFound {
            affected_columns: 4
        }
    );
    // Every affected column has one blank in four rows.
    let worst = &report.entries()[0];
    assert_eq!(worst.missing_count, 1);
    assert_eq!(worst.total_count, 4);

    let mut table = health_table(&report);
    table.force_no_tty();
    let rendered = table.to_string();
    for header in ["Variable", "Missing", "Total", "Missing %", "Severity"] {
        assert!(rendered.contains(header), "missing header {header}");
    }
    assert!(rendered.contains("25.0"));
    assert!(rendered.contains("respondent_id"));
}

#[test]
fn likert_items_are_grouped() {
    let dataset = parse_dataset(SURVEY_CSV.as_bytes()).unwrap();
    let variables = infer_variables(&dataset).unwrap();
    let groups = VariableGroupingEngine::new(GroupingOptions::default())
        .suggest(&variables)
        .unwrap();

    let q1 = groups
        .iter()
        .find(|g| g.members().iter().any(|m| m.as_str() == "Q1_1"))
        .expect("Q1 items grouped");
    assert_eq!(q1.len(), 3);

    let mut table = groups_table(&groups);
    table.force_no_tty();
    assert!(table.to_string().contains("Q1_1, Q1_2, Q1_3"));
}

#[test]
fn workflow_table_marks_current_and_done_steps() {
    let snapshot = ProjectSnapshot::new(
        ProjectId::new("p1").unwrap(),
        WorkflowStep::Grouping,
        BTreeSet::from([WorkflowStep::Upload, WorkflowStep::HealthCheck]),
        Utc::now(),
    );
    let mut machine = WorkflowStateMachine::new();
    machine.restore(&snapshot);

    let mut table = workflow_table(&machine.state());
    table.force_no_tty();
    let rendered = table.to_string();

    let lines: Vec<&str> = rendered.lines().collect();
    let line_for = |label: &str| {
        lines
            .iter()
            .find(|line| line.contains(label))
            .copied()
            .unwrap_or_default()
    };
    assert!(line_for("Health Check").contains("done"));
    assert!(line_for("Variable Grouping").contains("current"));
    assert!(line_for("Results").contains('-'));
    assert_eq!(machine.state().progress_percent, 29);
}
