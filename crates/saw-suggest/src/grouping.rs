//! Variable grouping suggestions.
//!
//! Variables are bucketed by a shared naming stem (`Q1_1`, `Q1_2` share
//! `Q1`; `sat_a`, `sat_b` share `sat`; `item1`, `item2` share `item`).
//! Inside a bucket only members with compatible data types are kept.
//! Confidence then grows with the member count and naming consistency.
//!
//! Suggestions are never applied automatically; the caller decides which
//! groups to accept.

use std::collections::{BTreeMap, HashSet};

use rapidfuzz::distance::jaro_winkler;
use saw_model::{DataType, GroupId, Variable, VariableGroup, VariableId};
use saw_profile::humanize;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SuggestError};

const SEPARATORS: [char; 4] = ['_', '.', '-', ' '];

const BASE_SCORE: f32 = 0.35;
const SIZE_STEP: f32 = 0.1;
const SIZE_CAP: f32 = 0.3;
const SIMILARITY_WEIGHT: f32 = 0.2;
const SEPARATOR_BONUS: f32 = 0.05;
const SEQUENCE_BONUS: f32 = 0.1;
const NO_CONFLICT_BONUS: f32 = 0.05;
const CONFLICT_PENALTY: f32 = 0.15;

/// Tuning for [`VariableGroupingEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupingOptions {
    min_confidence: f32,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

impl GroupingOptions {
    /// Options with a custom threshold. Negative thresholds are rejected.
    pub fn new(min_confidence: f32) -> Result<Self> {
        if min_confidence.is_nan() || min_confidence < 0.0 {
            return Err(SuggestError::NegativeThreshold(min_confidence));
        }
        Ok(Self { min_confidence })
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }
}

/// Suggests groups of related variables (multi-item scales).
#[derive(Debug, Clone, Default)]
pub struct VariableGroupingEngine {
    options: GroupingOptions,
}

impl VariableGroupingEngine {
    pub fn new(options: GroupingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GroupingOptions {
        &self.options
    }

    /// Suggest groups for `variables`, highest confidence first.
    ///
    /// Ungrouped variables are simply absent from the output. Demographic
    /// variables never take part. Every suggested group has at least two
    /// members and each variable appears in at most one group.
    pub fn suggest(&self, variables: &[Variable]) -> Result<Vec<VariableGroup>> {
        let mut seen = HashSet::new();
        for variable in variables {
            if !seen.insert(&variable.id) {
                return Err(SuggestError::DuplicateVariable(variable.id.to_string()));
            }
        }

        // key -> (display stem, members in dataset order)
        let mut buckets: BTreeMap<String, Bucket<'_>> = BTreeMap::new();
        for (position, variable) in variables.iter().enumerate() {
            if variable.is_demographic {
                continue;
            }
            let Some(parts) = split_stem(&variable.column_name) else {
                continue;
            };
            buckets
                .entry(parts.stem.to_lowercase())
                .or_insert_with(|| Bucket {
                    stem: parts.stem.to_string(),
                    first_position: position,
                    members: Vec::new(),
                })
                .members
                .push(Member { variable, parts });
        }

        let mut scored: Vec<(f32, usize, VariableGroup)> = Vec::new();
        for (key, bucket) in buckets {
            let Some((confidence, members)) = score_bucket(&bucket) else {
                continue;
            };
            if confidence < self.options.min_confidence {
                debug!(stem = %bucket.stem, confidence, "group below threshold");
                continue;
            }
            let group = VariableGroup::new(
                GroupId::new(format!("group_{key}"))?,
                members,
                humanize(&bucket.stem),
                confidence,
            )?;
            debug!(
                group = %group.id(),
                members = group.len(),
                confidence,
                "group suggested"
            );
            scored.push((confidence, bucket.first_position, group));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().map(|(_, _, group)| group).collect())
    }
}

struct Bucket<'a> {
    stem: String,
    first_position: usize,
    members: Vec<Member<'a>>,
}

struct Member<'a> {
    variable: &'a Variable,
    parts: NameParts<'a>,
}

/// Score a bucket. `None` when fewer than two compatible members remain.
fn score_bucket(bucket: &Bucket<'_>) -> Option<(f32, Vec<VariableId>)> {
    let anchor = dominant_type(&bucket.members)?;
    let kept: Vec<&Member<'_>> = bucket
        .members
        .iter()
        .filter(|m| m.variable.data_type.is_compatible_with(anchor))
        .collect();
    if kept.len() < 2 {
        return None;
    }
    let conflicts = bucket.members.len() - kept.len();

    let mut score = BASE_SCORE;
    score += (SIZE_STEP * (kept.len() - 1) as f32).min(SIZE_CAP);
    score += naming_similarity(&kept) * SIMILARITY_WEIGHT;

    let separator = kept[0].parts.separator;
    if kept.iter().all(|m| m.parts.separator == separator) {
        score += SEPARATOR_BONUS;
    }
    if is_sequential(&kept) {
        score += SEQUENCE_BONUS;
    }
    if conflicts == 0 {
        score += NO_CONFLICT_BONUS;
    } else {
        score -= CONFLICT_PENALTY;
    }

    let members = kept.iter().map(|m| m.variable.id.clone()).collect();
    Some((score.clamp(0.0, 1.0), members))
}

/// The data type compatible with the most members (first member wins ties).
fn dominant_type(members: &[Member<'_>]) -> Option<DataType> {
    let mut best: Option<(DataType, usize)> = None;
    for candidate in members.iter().map(|m| m.variable.data_type) {
        let count = members
            .iter()
            .filter(|m| m.variable.data_type.is_compatible_with(candidate))
            .count();
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((candidate, count));
        }
    }
    best.map(|(data_type, _)| data_type)
}

/// Mean Jaro-Winkler similarity of neighbouring member names.
fn naming_similarity(members: &[&Member<'_>]) -> f32 {
    let pairs: Vec<f64> = members
        .windows(2)
        .map(|pair| {
            let a = pair[0].variable.column_name.to_lowercase();
            let b = pair[1].variable.column_name.to_lowercase();
            jaro_winkler::similarity(a.chars(), b.chars())
        })
        .collect();
    if pairs.is_empty() {
        return 0.0;
    }
    (pairs.iter().sum::<f64>() / pairs.len() as f64) as f32
}

/// Suffixes form a gapless run (`1,2,3` or `a,b,c`), in any order.
fn is_sequential(members: &[&Member<'_>]) -> bool {
    let mut keys: Vec<u64> = Vec::with_capacity(members.len());
    for member in members {
        match member.parts.suffix {
            Suffix::Number(n) => keys.push(n),
            Suffix::Letter(c) => keys.push(u64::from(c)),
            Suffix::Mixed => return false,
        }
    }
    let numeric = matches!(members[0].parts.suffix, Suffix::Number(_));
    if members
        .iter()
        .any(|m| matches!(m.parts.suffix, Suffix::Number(_)) != numeric)
    {
        return false;
    }
    keys.sort_unstable();
    keys.windows(2).all(|w| w[1] == w[0] + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffix {
    Number(u64),
    Letter(char),
    /// Item code such as `2r` (reverse-scored item 2).
    Mixed,
}

#[derive(Debug, Clone, Copy)]
struct NameParts<'a> {
    stem: &'a str,
    suffix: Suffix,
    separator: Option<char>,
}

/// Split a column name into naming stem and item suffix.
fn split_stem(name: &str) -> Option<NameParts<'_>> {
    let name = name.trim();
    if let Some(pos) = name.rfind(SEPARATORS) {
        let stem = name[..pos].trim_end_matches(SEPARATORS);
        let separator = name[pos..].chars().next();
        if !stem.is_empty()
            && let Some(suffix) = parse_suffix(&name[pos + 1..])
        {
            return Some(NameParts {
                stem,
                suffix,
                separator,
            });
        }
    }

    let digits = name
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .count();
    if digits == 0 || digits > 4 {
        return None;
    }
    let (stem, tail) = name.split_at(name.len() - digits);
    if !stem.ends_with(char::is_alphabetic) {
        return None;
    }
    Some(NameParts {
        stem,
        suffix: Suffix::Number(tail.parse().ok()?),
        separator: None,
    })
}

fn parse_suffix(text: &str) -> Option<Suffix> {
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    let rest = &text[digits..];
    match (digits, rest.chars().count()) {
        (1..=4, 0) => text.parse().ok().map(Suffix::Number),
        (0, 1) => rest
            .chars()
            .next()
            .filter(char::is_ascii_alphabetic)
            .map(|c| Suffix::Letter(c.to_ascii_lowercase())),
        (1..=4, 1) if rest.chars().all(|c| c.is_ascii_alphabetic()) => Some(Suffix::Mixed),
        _ => None,
    }
}
