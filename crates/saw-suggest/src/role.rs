//! Research-role suggestions for variables and groups.
//!
//! Each signal votes for one role with a weight; votes for the same role
//! add up and the strongest role wins. The vote reasons are kept so the
//! suggestion can be explained next to the role picker.

use saw_model::{
    DataType, DemographicType, ResearchRole, RoleTag, RoleTarget, Variable, VariableGroup,
};
use saw_profile::split_words;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEMOGRAPHIC_WEIGHT: f32 = 0.85;
const KEYWORD_WEIGHT: f32 = 0.7;
const LATENT_BASE: f32 = 0.5;
const LATENT_STEP: f32 = 0.05;
const LATENT_CAP: f32 = 0.75;
const LAST_NUMERIC_WEIGHT: f32 = 0.3;

/// Name fragments per role. A word matches when it starts with a fragment.
const ROLE_KEYWORDS: &[(ResearchRole, &[&str])] = &[
    (
        ResearchRole::Dependent,
        &["outcome", "satisfaction", "intention", "performance", "score"],
    ),
    (
        ResearchRole::Independent,
        &["treatment", "condition", "group", "exposure"],
    ),
    (ResearchRole::Mediator, &["mediat", "engagement", "attitude"]),
    (ResearchRole::Moderator, &["moderat", "experience", "tenure"]),
];

/// Where the subject sits in the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleContext {
    /// 0-based position among all variables.
    pub position: usize,
    pub total_variables: usize,
    pub demographic_type: Option<DemographicType>,
    /// Number of members when the subject is a group.
    pub group_size: usize,
}

impl RoleContext {
    pub fn for_variable(variable: &Variable, position: usize, total_variables: usize) -> Self {
        Self {
            position,
            total_variables,
            demographic_type: variable
                .is_demographic
                .then_some(variable.demographic_type.unwrap_or(DemographicType::Other)),
            group_size: 0,
        }
    }

    /// Context for a group, positioned at its first member.
    pub fn for_group(group: &VariableGroup, variables: &[Variable]) -> Self {
        let position = variables
            .iter()
            .position(|v| group.contains(&v.id))
            .unwrap_or_default();
        Self {
            position,
            total_variables: variables.len(),
            demographic_type: None,
            group_size: group.len(),
        }
    }

    fn is_last(&self) -> bool {
        self.total_variables > 0 && self.position + 1 == self.total_variables
    }
}

/// A suggested role with its explanation.
///
/// `ResearchRole::None` means the engine has no suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSuggestion {
    pub role: ResearchRole,
    pub confidence: f32,
    pub reasons: Vec<String>,
}

impl RoleSuggestion {
    pub fn none() -> Self {
        Self {
            role: ResearchRole::None,
            confidence: 0.0,
            reasons: Vec::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.role.is_none()
    }

    /// Convert into a machine-suggested tag. `None` when there is no role.
    pub fn to_tag(&self, target: RoleTarget) -> Option<RoleTag> {
        let tag = RoleTag::new(target, self.role, false).ok()?;
        let tag = tag.with_confidence(self.confidence).ok()?;
        Some(tag.with_reason(self.reasons.join("; ")))
    }
}

/// Suggests research roles from names, demographics and structure.
#[derive(Debug, Clone, Default)]
pub struct RoleSuggestionEngine;

impl RoleSuggestionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn suggest_for_variable(
        &self,
        variable: &Variable,
        context: &RoleContext,
    ) -> RoleSuggestion {
        let suggestion =
            self.suggest(variable.effective_name(), Some(variable.data_type), context);
        debug!(
            variable = %variable.id,
            role = %suggestion.role,
            confidence = suggestion.confidence,
            "role suggestion"
        );
        suggestion
    }

    pub fn suggest_for_group(
        &self,
        group: &VariableGroup,
        context: &RoleContext,
    ) -> RoleSuggestion {
        let suggestion = self.suggest(group.suggested_name(), None, context);
        debug!(
            group = %group.id(),
            role = %suggestion.role,
            confidence = suggestion.confidence,
            "role suggestion"
        );
        suggestion
    }

    fn suggest(
        &self,
        name: &str,
        data_type: Option<DataType>,
        context: &RoleContext,
    ) -> RoleSuggestion {
        let mut votes = Votes::default();

        if let Some(kind) = context.demographic_type {
            votes.add(
                ResearchRole::Control,
                DEMOGRAPHIC_WEIGHT,
                format!("demographic variable ({})", kind.label()),
            );
        }

        let words = split_words(name);
        for (role, keywords) in ROLE_KEYWORDS {
            if let Some(keyword) = keywords
                .iter()
                .find(|k| words.iter().any(|w| w.starts_with(**k)))
            {
                votes.add(*role, KEYWORD_WEIGHT, format!("name mentions '{keyword}'"));
            }
        }

        if context.group_size >= 2 {
            let extra = LATENT_STEP * (context.group_size - 2) as f32;
            let weight = (LATENT_BASE + extra).min(LATENT_CAP);
            votes.add(
                ResearchRole::Latent,
                weight,
                format!("multi-item scale of {} items", context.group_size),
            );
        }

        if data_type == Some(DataType::Numeric) && context.is_last() {
            votes.add(
                ResearchRole::Dependent,
                LAST_NUMERIC_WEIGHT,
                "last numeric column".to_string(),
            );
        }

        votes.winner()
    }
}

#[derive(Default)]
struct Votes {
    entries: Vec<(ResearchRole, f32, Vec<String>)>,
}

impl Votes {
    fn add(&mut self, role: ResearchRole, weight: f32, reason: String) {
        match self.entries.iter_mut().find(|(r, _, _)| *r == role) {
            Some((_, total, reasons)) => {
                *total += weight;
                reasons.push(reason);
            }
            None => self.entries.push((role, weight, vec![reason])),
        }
    }

    /// Highest total wins; earlier votes win ties.
    fn winner(self) -> RoleSuggestion {
        let mut best: Option<(ResearchRole, f32, Vec<String>)> = None;
        for entry in self.entries {
            if best.as_ref().is_none_or(|(_, total, _)| entry.1 > *total) {
                best = Some(entry);
            }
        }
        match best {
            Some((role, total, reasons)) => RoleSuggestion {
                role,
                confidence: total.min(1.0),
                reasons,
            },
            None => RoleSuggestion::none(),
        }
    }
}
