//! Table rendering for command output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use saw_model::{
    AnalysisResult, RoleTag, RoleTarget, VariableGroup, VariableId, WorkflowStep,
};
use saw_profile::{HealthReport, MissingSeverity};
use saw_workflow::{TargetSuggestion, WorkflowState};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn severity_cell(severity: MissingSeverity) -> Cell {
    let cell = Cell::new(severity.label());
    match severity {
        MissingSeverity::None => cell.fg(Color::Green),
        MissingSeverity::Minimal => cell,
        MissingSeverity::Moderate => cell.fg(Color::Yellow),
        MissingSeverity::Severe => cell.fg(Color::Red).add_attribute(Attribute::Bold),
    }
}

pub fn health_table(report: &HealthReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Variable"),
        header_cell("Missing"),
        header_cell("Total"),
        header_cell("Missing %"),
        header_cell("Severity"),
    ]);
    apply_table_style(&mut table);
    for entry in report.entries() {
        table.add_row(vec![
            Cell::new(&entry.variable),
            Cell::new(entry.missing_count),
            Cell::new(entry.total_count),
            Cell::new(format!("{:.1}", entry.percentage)),
            severity_cell(entry.severity()),
        ]);
    }
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    table
}

pub fn groups_table(groups: &[VariableGroup]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Group"),
        header_cell("Name"),
        header_cell("Members"),
        header_cell("Confidence"),
    ]);
    apply_table_style(&mut table);
    for group in groups {
        let members: Vec<&str> = group.members().iter().map(VariableId::as_str).collect();
        table.add_row(vec![
            Cell::new(group.id()),
            Cell::new(group.suggested_name()),
            Cell::new(members.join(", ")),
            Cell::new(format!("{:.2}", group.confidence())),
        ]);
    }
    align_column(&mut table, 3, CellAlignment::Right);
    table
}

fn target_label(target: &RoleTarget) -> String {
    match target {
        RoleTarget::Variable(id) => id.to_string(),
        RoleTarget::Group(id) => format!("{id} (group)"),
    }
}

pub fn role_suggestions_table(suggestions: &[TargetSuggestion]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Target"),
        header_cell("Role"),
        header_cell("Confidence"),
        header_cell("Why"),
    ]);
    apply_table_style(&mut table);
    for item in suggestions {
        table.add_row(vec![
            Cell::new(target_label(&item.target)),
            Cell::new(item.suggestion.role),
            Cell::new(format!("{:.2}", item.suggestion.confidence)),
            Cell::new(item.suggestion.reasons.join("; ")),
        ]);
    }
    align_column(&mut table, 2, CellAlignment::Right);
    table
}

pub fn role_tags_table<'a>(tags: impl IntoIterator<Item = &'a RoleTag>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Target"),
        header_cell("Role"),
        header_cell("Source"),
    ]);
    apply_table_style(&mut table);
    for tag in tags {
        let source = if tag.is_user_assigned() {
            Cell::new("user")
        } else {
            Cell::new("suggested").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(target_label(tag.target())),
            Cell::new(tag.role()),
            source,
        ]);
    }
    table
}

pub fn workflow_table(state: &WorkflowState) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Step"), header_cell("Status")]);
    apply_table_style(&mut table);
    for step in WorkflowStep::ALL {
        let status = if step == state.current_step {
            Cell::new("current").fg(Color::Cyan).add_attribute(Attribute::Bold)
        } else if state.completed_steps.contains(&step) {
            Cell::new("done").fg(Color::Green)
        } else {
            Cell::new("-").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(step.index() + 1),
            Cell::new(step.label()),
            status,
        ]);
    }
    align_column(&mut table, 0, CellAlignment::Right);
    table
}

pub fn result_table(result: &AnalysisResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Statistic"), header_cell("Value")]);
    apply_table_style(&mut table);
    for (name, value) in &result.statistics {
        table.add_row(vec![Cell::new(name), Cell::new(format!("{value:.4}"))]);
    }
    align_column(&mut table, 1, CellAlignment::Right);
    table
}

#[cfg(test)]
mod tests {
    use saw_model::{CellValue, Dataset};
    use saw_profile::DataHealthAnalyzer;

    use super::*;

    #[test]
    fn health_table_lists_worst_column_first() {
        let dataset = Dataset::new(
            vec!["age".into(), "comments".into()],
            vec![
                vec![CellValue::Number(30.0), CellValue::Null],
                vec![CellValue::Number(41.0), CellValue::from("ok")],
            ],
        );
        let report = DataHealthAnalyzer::new().analyze(&dataset).unwrap();
        let mut table = health_table(&report);
        table.force_no_tty();
        let rendered = table.to_string();
        let comments = rendered.find("comments").unwrap();
        let age = rendered.find("age").unwrap();
        assert!(comments < age);
        assert!(rendered.contains("50.0"));
    }
}
