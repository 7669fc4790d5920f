//! Demographic classification of variables.
//!
//! Classification is keyword driven. A whole-word match on the variable
//! name is strong evidence; a substring match is weaker. Value profiles
//! nudge the score (an `age` column holding numbers in a human range is
//! more convincing than one holding free text).

use saw_model::{DataType, DemographicType, Variable};
use serde::{Deserialize, Serialize};

use crate::inference::split_words;

const WORD_MATCH: f32 = 0.8;
const SUBSTRING_MATCH: f32 = 0.55;
const PROFILE_BOOST: f32 = 0.15;
const PROFILE_PENALTY: f32 = 0.2;

/// A proposed demographic classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicSuggestion {
    pub demographic_type: DemographicType,
    pub confidence: f32,
    pub reason: String,
}

struct Keywords {
    kind: DemographicType,
    words: &'static [&'static str],
}

const KEYWORDS: &[Keywords] = &[
    Keywords {
        kind: DemographicType::Age,
        words: &["age", "yob", "birthyear", "dob"],
    },
    Keywords {
        kind: DemographicType::Gender,
        words: &["gender", "sex"],
    },
    Keywords {
        kind: DemographicType::Education,
        words: &["education", "schooling"],
    },
    Keywords {
        kind: DemographicType::Income,
        words: &["income", "salary", "earnings", "wage"],
    },
    Keywords {
        kind: DemographicType::Ethnicity,
        words: &["ethnicity", "race", "ethnic"],
    },
    Keywords {
        kind: DemographicType::Location,
        words: &["country", "city", "zip", "postcode", "region"],
    },
    Keywords {
        kind: DemographicType::MaritalStatus,
        words: &["marital", "married"],
    },
    Keywords {
        kind: DemographicType::Occupation,
        words: &["occupation", "job", "profession", "employment"],
    },
];

/// Detects demographic variables from names and value profiles.
#[derive(Debug, Clone)]
pub struct DemographicDetector {
    min_confidence: f32,
}

impl Default for DemographicDetector {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

impl DemographicDetector {
    pub fn new(min_confidence: f32) -> Self {
        Self {
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    /// Classify a single variable. `None` means "not demographic".
    pub fn classify(&self, variable: &Variable) -> Option<DemographicSuggestion> {
        let name = variable.effective_name().to_lowercase();
        let words = split_words(variable.effective_name());

        let mut best: Option<(DemographicType, f32, String)> = None;
        for entry in KEYWORDS {
            for keyword in entry.words {
                let (score, how) = if words.iter().any(|w| w == *keyword) {
                    (WORD_MATCH, "word")
                } else if keyword.len() >= 5 && name.contains(keyword) {
                    (SUBSTRING_MATCH, "fragment")
                } else {
                    continue;
                };
                if best.as_ref().is_none_or(|(_, s, _)| score > *s) {
                    best = Some((
                        entry.kind,
                        score,
                        format!("name contains the {how} '{keyword}'"),
                    ));
                }
            }
        }

        let (kind, mut confidence, mut reason) = best?;
        match profile_fit(kind, variable) {
            Fit::Good(why) => {
                confidence += PROFILE_BOOST;
                reason.push_str("; ");
                reason.push_str(why);
            }
            Fit::Poor(why) => {
                confidence -= PROFILE_PENALTY;
                reason.push_str("; ");
                reason.push_str(why);
            }
            Fit::Neutral => {}
        }
        let confidence = confidence.clamp(0.0, 1.0);
        if confidence < self.min_confidence {
            return None;
        }
        Some(DemographicSuggestion {
            demographic_type: kind,
            confidence,
            reason,
        })
    }

    /// Classify and apply suggestions in place. Returns how many changed.
    ///
    /// Variables already flagged demographic are left untouched.
    pub fn apply(&self, variables: &mut [Variable]) -> usize {
        let mut changed = 0;
        for variable in variables.iter_mut().filter(|v| !v.is_demographic) {
            if let Some(suggestion) = self.classify(variable) {
                tracing::debug!(
                    variable = %variable.id,
                    kind = suggestion.demographic_type.label(),
                    confidence = suggestion.confidence,
                    "demographic variable detected"
                );
                variable.set_demographic(suggestion.demographic_type);
                changed += 1;
            }
        }
        changed
    }
}

enum Fit {
    Good(&'static str),
    Poor(&'static str),
    Neutral,
}

fn profile_fit(kind: DemographicType, variable: &Variable) -> Fit {
    match kind {
        DemographicType::Age => match (variable.data_type, variable.stats) {
            (DataType::Numeric, Some(stats)) if stats.min >= 0.0 && stats.max <= 120.0 => {
                Fit::Good("values are in a plausible age range")
            }
            (DataType::Text, _) => Fit::Poor("values are free text"),
            _ => Fit::Neutral,
        },
        DemographicType::Gender | DemographicType::MaritalStatus => {
            if variable.unique_count > 0 && variable.unique_count <= 6 {
                Fit::Good("few distinct values")
            } else if variable.data_type == DataType::Text {
                Fit::Poor("values are free text")
            } else {
                Fit::Neutral
            }
        }
        _ => Fit::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use saw_model::{SummaryStats, VariableId};

    use super::*;

    fn var(name: &str, data_type: DataType) -> Variable {
        Variable::new(VariableId::new(name).unwrap(), name, data_type)
    }

    #[test]
    fn test_age_with_plausible_range() {
        let mut v = var("respondent_age", DataType::Numeric);
        v.stats = Some(SummaryStats {
            min: 18.0,
            max: 77.0,
            mean: 41.0,
        });
        let s = DemographicDetector::default().classify(&v).unwrap();
        assert_eq!(s.demographic_type, DemographicType::Age);
        assert!((s.confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_word_beats_fragment() {
        // "usage" contains "age" but is not the word "age".
        let v = var("app_usage", DataType::Numeric);
        assert!(DemographicDetector::default().classify(&v).is_none());
    }

    #[test]
    fn test_gender() {
        let mut v = var("Sex", DataType::Categorical);
        v.unique_count = 3;
        let s = DemographicDetector::default().classify(&v).unwrap();
        assert_eq!(s.demographic_type, DemographicType::Gender);
    }

    #[test]
    fn test_apply_skips_existing() {
        let mut vars = vec![var("income", DataType::Numeric), var("Q1_1", DataType::Numeric)];
        vars[0].set_demographic(DemographicType::Other);
        assert_eq!(DemographicDetector::default().apply(&mut vars), 0);
        assert_eq!(vars[0].demographic_type, Some(DemographicType::Other));
    }
}
