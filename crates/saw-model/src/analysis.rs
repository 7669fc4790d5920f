//! Analysis configuration and results exchanged with the remote engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::group::VariableGroup;
use crate::ids::ProjectId;
use crate::role::{ResearchRole, RoleTag};

/// Statistical analysis offered at the selection step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    #[default]
    Descriptive,
    Correlation,
    Regression,
    Mediation,
    Moderation,
    FactorAnalysis,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 6] = [
        Self::Descriptive,
        Self::Correlation,
        Self::Regression,
        Self::Mediation,
        Self::Moderation,
        Self::FactorAnalysis,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Descriptive => "descriptive",
            Self::Correlation => "correlation",
            Self::Regression => "regression",
            Self::Mediation => "mediation",
            Self::Moderation => "moderation",
            Self::FactorAnalysis => "factor-analysis",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Descriptive => "Descriptive statistics",
            Self::Correlation => "Correlation",
            Self::Regression => "Regression",
            Self::Mediation => "Mediation analysis",
            Self::Moderation => "Moderation analysis",
            Self::FactorAnalysis => "Factor analysis",
        }
    }

    /// Pick the analysis that fits the assigned roles best.
    ///
    /// Mediators and moderators take precedence over a plain regression.
    pub fn recommend<'a>(tags: impl IntoIterator<Item = &'a RoleTag>) -> Self {
        let mut has = BTreeMap::new();
        for tag in tags {
            *has.entry(tag.role().as_str()).or_insert(0usize) += 1;
        }
        let count = |role: ResearchRole| has.get(role.as_str()).copied().unwrap_or(0);

        let predictors = count(ResearchRole::Independent) > 0;
        let outcome = count(ResearchRole::Dependent) > 0;
        if predictors && outcome && count(ResearchRole::Mediator) > 0 {
            Self::Mediation
        } else if predictors && outcome && count(ResearchRole::Moderator) > 0 {
            Self::Moderation
        } else if predictors && outcome {
            Self::Regression
        } else if count(ResearchRole::Latent) > 0 {
            Self::FactorAnalysis
        } else if count(ResearchRole::Dependent) + count(ResearchRole::Independent) >= 2 {
            Self::Correlation
        } else {
            Self::Descriptive
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownAnalysis(s.to_string()))
    }
}

/// Request body submitted to the analytics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub project_id: ProjectId,
    pub kind: AnalysisKind,
    #[serde(default)]
    pub roles: Vec<RoleTag>,
    #[serde(default)]
    pub groups: Vec<VariableGroup>,
}

impl AnalysisConfig {
    pub fn new(project_id: ProjectId, kind: AnalysisKind) -> Self {
        Self {
            project_id,
            kind,
            roles: Vec::new(),
            groups: Vec::new(),
        }
    }
}

/// Response body returned by the analytics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub kind: AnalysisKind,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub statistics: BTreeMap<String, f64>,
    #[serde(default)]
    pub warnings: Vec<String>,
}
