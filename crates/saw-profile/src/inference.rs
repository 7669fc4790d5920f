//! Variable inference at upload time.
//!
//! One [`Variable`] is created per header column. Type detection mirrors
//! how column hints are built for mapping suggestions: a column is numeric
//! (or a date) when more than 90% of its non-missing values parse as such.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate};
use saw_model::{DataType, Dataset, SummaryStats, Variable, VariableId};
use tracing::debug;

use crate::error::{ProfileError, Result};

/// Share of non-missing values that must parse for a type to be inferred.
const TYPE_THRESHOLD: f64 = 0.9;

/// At most this many distinct values always reads as categorical.
const CATEGORICAL_MAX_DISTINCT: usize = 10;

/// Unique-to-present ratio at or below which text reads as categorical.
const CATEGORICAL_MAX_RATIO: f64 = 0.5;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Build one variable per column of `dataset`.
///
/// Column order is preserved. Blank header names get a positional id
/// (`column_3`).
pub fn infer_variables(dataset: &Dataset) -> Result<Vec<Variable>> {
    let mut seen = HashSet::new();
    for name in &dataset.headers {
        let trimmed = name.trim();
        if !trimmed.is_empty() && !seen.insert(trimmed) {
            return Err(ProfileError::DuplicateColumn(trimmed.to_string()));
        }
    }

    let columns = dataset.column_count();
    if let Some((row, cells)) = dataset
        .rows
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() > columns)
    {
        return Err(ProfileError::RaggedRow {
            row,
            cells: cells.len(),
            columns,
        });
    }

    let variables: Vec<Variable> = dataset
        .headers
        .iter()
        .enumerate()
        .map(|(index, name)| infer_column(dataset, index, name))
        .collect::<Result<_>>()?;

    debug!(count = variables.len(), "inferred variables");
    Ok(variables)
}

fn infer_column(dataset: &Dataset, index: usize, name: &str) -> Result<Variable> {
    let mut missing = 0usize;
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    let mut numbers: Vec<f64> = Vec::new();
    let mut dates = 0usize;

    for cell in dataset.column(index) {
        let Some(text) = cell.as_text() else {
            missing += 1;
            continue;
        };
        if let Some(n) = cell.as_f64() {
            numbers.push(n);
        } else if looks_like_date(&text) {
            dates += 1;
        }
        distinct.insert(text);
    }

    let present = dataset.row_count() - missing;
    let data_type = classify(present, numbers.len(), dates, distinct.len());

    let column_name = match name.trim() {
        "" => format!("column_{}", index + 1),
        trimmed => trimmed.to_string(),
    };
    let id = VariableId::new(column_name.as_str())?;

    let mut variable = Variable::new(id, column_name.clone(), data_type);
    variable.display_name = humanize(&column_name);
    variable.missing_count = missing;
    variable.unique_count = distinct.len();
    if data_type == DataType::Numeric || data_type == DataType::Categorical {
        variable.stats = summary_stats(&numbers, present);
    }
    Ok(variable)
}

fn classify(present: usize, numeric: usize, dates: usize, distinct: usize) -> DataType {
    if present == 0 {
        return DataType::Text;
    }
    let share = |n: usize| n as f64 / present as f64;
    let categorical = distinct <= CATEGORICAL_MAX_DISTINCT
        || share(distinct) <= CATEGORICAL_MAX_RATIO;

    if share(numeric) > TYPE_THRESHOLD {
        // Low-cardinality integer codes (Likert items) stay numeric; the
        // grouping engine treats numeric and categorical as compatible.
        DataType::Numeric
    } else if share(dates) > TYPE_THRESHOLD {
        DataType::Date
    } else if categorical {
        DataType::Categorical
    } else {
        DataType::Text
    }
}

/// Stats require every present value to be numeric.
fn summary_stats(numbers: &[f64], present: usize) -> Option<SummaryStats> {
    if numbers.is_empty() || numbers.len() != present {
        return None;
    }
    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    Some(SummaryStats { min, max, mean })
}

fn looks_like_date(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
}

/// `q1_satisfaction` -> `Q1 Satisfaction`, `ageYears` -> `Age Years`.
pub fn humanize(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split an identifier into lowercase words on separators and camelCase.
pub fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in name.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
