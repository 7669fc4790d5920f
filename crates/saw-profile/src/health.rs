//! Missing-data health check.

use std::cmp::Ordering;
use std::fmt;

use saw_model::Dataset;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProfileError, Result};

/// Severity band of a column's missing-data percentage.
///
/// The band edges are a contract with report consumers:
/// `0` none, `(0, 5)` minimal, `[5, 20)` moderate, `>= 20` severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSeverity {
    None,
    Minimal,
    Moderate,
    Severe,
}

impl MissingSeverity {
    /// Upper bound (exclusive) of the minimal band.
    pub const MINIMAL_LIMIT: f64 = 5.0;
    /// Upper bound (exclusive) of the moderate band.
    pub const MODERATE_LIMIT: f64 = 20.0;

    pub fn from_percentage(percentage: f64) -> Self {
        if percentage <= 0.0 {
            Self::None
        } else if percentage < Self::MINIMAL_LIMIT {
            Self::Minimal
        } else if percentage < Self::MODERATE_LIMIT {
            Self::Moderate
        } else {
            Self::Severe
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Minimal => "Minimal",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }
}

impl fmt::Display for MissingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Missing-data profile of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry {
    /// Column name.
    pub variable: String,
    /// Position of the column in the header row.
    pub column_index: usize,
    pub missing_count: usize,
    pub total_count: usize,
    /// `missing / total * 100`, `0` when there are no rows.
    pub percentage: f64,
}

impl HealthEntry {
    pub fn severity(&self) -> MissingSeverity {
        MissingSeverity::from_percentage(self.percentage)
    }
}

/// Per-band counts across a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub none: usize,
    pub minimal: usize,
    pub moderate: usize,
    pub severe: usize,
    /// Missing cells over all cells, as a percentage.
    pub overall_percentage: f64,
}

impl HealthSummary {
    pub fn affected_columns(&self) -> usize {
        self.minimal + self.moderate + self.severe
    }
}

/// Outcome of a health check as presented to users.
///
/// `Unavailable` is distinct from `Clean`: an analysis that could not run
/// must never be reported as "nothing wrong".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    Clean,
    IssuesFound { affected_columns: usize },
    Unavailable { reason: String },
}

/// Per-variable missingness, in display order.
///
/// Derived on every run; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    entries: Vec<HealthEntry>,
}

impl HealthReport {
    /// Entries sorted by descending percentage, ties in column order.
    pub fn entries(&self) -> &[HealthEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, variable: &str) -> Option<&HealthEntry> {
        self.entries.iter().find(|e| e.variable == variable)
    }

    /// Entries restored to header order.
    pub fn in_column_order(&self) -> Vec<&HealthEntry> {
        let mut out: Vec<_> = self.entries.iter().collect();
        out.sort_by_key(|e| e.column_index);
        out
    }

    pub fn summary(&self) -> HealthSummary {
        let mut summary = HealthSummary::default();
        let mut missing = 0usize;
        let mut cells = 0usize;
        for entry in &self.entries {
            match entry.severity() {
                MissingSeverity::None => summary.none += 1,
                MissingSeverity::Minimal => summary.minimal += 1,
                MissingSeverity::Moderate => summary.moderate += 1,
                MissingSeverity::Severe => summary.severe += 1,
            }
            missing += entry.missing_count;
            cells += entry.total_count;
        }
        summary.overall_percentage = percentage(missing, cells);
        summary
    }

    pub fn status(&self) -> HealthStatus {
        let affected = self.summary().affected_columns();
        if affected == 0 {
            HealthStatus::Clean
        } else {
            HealthStatus::IssuesFound {
                affected_columns: affected,
            }
        }
    }
}

/// Computes per-column missingness for a dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataHealthAnalyzer;

impl DataHealthAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze every column of `dataset`.
    ///
    /// A dataset with no columns yields an empty report. Rows longer than
    /// the header are rejected.
    pub fn analyze(&self, dataset: &Dataset) -> Result<HealthReport> {
        let columns = dataset.column_count();
        if columns == 0 {
            if dataset.row_count() > 0 && dataset.rows.iter().any(|r| !r.is_empty()) {
                return Err(ProfileError::MissingHeader {
                    rows: dataset.row_count(),
                });
            }
            return Ok(HealthReport::default());
        }

        for (row, cells) in dataset.rows.iter().enumerate() {
            if cells.len() > columns {
                return Err(ProfileError::RaggedRow {
                    row,
                    cells: cells.len(),
                    columns,
                });
            }
        }

        let total = dataset.row_count();
        let mut entries: Vec<HealthEntry> = dataset
            .headers
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let missing = dataset.column(index).filter(|c| c.is_missing()).count();
                HealthEntry {
                    variable: name.clone(),
                    column_index: index,
                    missing_count: missing,
                    total_count: total,
                    percentage: percentage(missing, total),
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.percentage
                .partial_cmp(&a.percentage)
                .unwrap_or(Ordering::Equal)
                .then(a.column_index.cmp(&b.column_index))
        });

        debug!(columns, rows = total, "health check complete");
        Ok(HealthReport { entries })
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
