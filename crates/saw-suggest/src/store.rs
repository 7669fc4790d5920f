//! Role tag persistence.
//!
//! The store holds at most one tag per target. A `none` role is stored as
//! the absence of a tag, never as a tag.

use std::collections::BTreeMap;

use saw_model::{GroupId, ResearchRole, RoleTag, RoleTarget, VariableId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SuggestError, ValidationError};

/// Kind of entity a role assignment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Variable,
    Group,
}

/// An unvalidated role assignment as submitted by the user (or accepted
/// from a suggestion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub kind: TargetKind,
    pub target_id: String,
    /// Role name, e.g. `"independent"` or `"none"`.
    pub role: String,
    #[serde(default = "default_user_assigned")]
    pub is_user_assigned: bool,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_user_assigned() -> bool {
    true
}

impl RoleAssignment {
    pub fn variable(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self::user(TargetKind::Variable, id.into(), role.into())
    }

    pub fn group(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self::user(TargetKind::Group, id.into(), role.into())
    }

    fn user(kind: TargetKind, target_id: String, role: String) -> Self {
        Self {
            kind,
            target_id,
            role,
            is_user_assigned: true,
            confidence: None,
            reason: None,
        }
    }

    /// Mark as an accepted machine suggestion.
    pub fn suggested(mut self, confidence: f32, reason: impl Into<String>) -> Self {
        self.is_user_assigned = false;
        self.confidence = Some(confidence);
        self.reason = Some(reason.into());
        self
    }

    fn validate(&self, index: usize) -> std::result::Result<Validated, ValidationError> {
        let id = self.target_id.as_str();
        let target = match self.kind {
            TargetKind::Variable => VariableId::new(id).map(RoleTarget::Variable),
            TargetKind::Group => GroupId::new(id).map(RoleTarget::Group),
        }
        .map_err(|_| ValidationError::MissingTarget { index })?;

        let unknown = || ValidationError::UnknownRole {
            index,
            role: self.role.clone(),
        };
        let role: ResearchRole = self.role.parse().map_err(|_| unknown())?;
        if role.is_none() {
            return Ok(Validated::Clear(target));
        }

        let mut tag =
            RoleTag::new(target, role, self.is_user_assigned).map_err(|_| unknown())?;
        if let Some(confidence) = self.confidence {
            tag = tag
                .with_confidence(confidence)
                .map_err(|_| ValidationError::InvalidConfidence { index })?;
        }
        if let Some(reason) = &self.reason {
            tag = tag.with_reason(reason.clone());
        }
        Ok(Validated::Store(tag))
    }
}

enum Validated {
    Store(RoleTag),
    Clear(RoleTarget),
}

/// Counts from one [`RoleTagStore::persist`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub stored: usize,
    pub removed: usize,
}

/// Role tags keyed by target.
///
/// Loading a stored list validates every tag and rejects a target that
/// appears twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RoleTag>", into = "Vec<RoleTag>")]
pub struct RoleTagStore {
    tags: BTreeMap<RoleTarget, RoleTag>,
}

impl RoleTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and apply a batch of assignments.
    ///
    /// Every entry is validated before anything changes; one bad entry
    /// rejects the whole batch. Roles other than `none` replace the
    /// target's tag, `none` removes it. When a target appears twice the
    /// later entry wins.
    pub fn persist(&mut self, assignments: &[RoleAssignment]) -> Result<PersistSummary> {
        let validated = assignments
            .iter()
            .enumerate()
            .map(|(index, assignment)| assignment.validate(index))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut summary = PersistSummary::default();
        for entry in validated {
            match entry {
                Validated::Store(tag) => {
                    self.tags.insert(tag.target().clone(), tag);
                    summary.stored += 1;
                }
                Validated::Clear(target) => {
                    if self.tags.remove(&target).is_some() {
                        summary.removed += 1;
                    }
                }
            }
        }
        info!(
            stored = summary.stored,
            removed = summary.removed,
            total = self.tags.len(),
            "role tags persisted"
        );
        Ok(summary)
    }

    pub fn get(&self, target: &RoleTarget) -> Option<&RoleTag> {
        self.tags.get(target)
    }

    /// Role of `target`; `None` when untagged.
    pub fn role_of(&self, target: &RoleTarget) -> ResearchRole {
        self.get(target).map(RoleTag::role).unwrap_or_default()
    }

    pub fn tags(&self) -> impl Iterator<Item = &RoleTag> {
        self.tags.values()
    }

    pub fn remove(&mut self, target: &RoleTarget) -> Option<RoleTag> {
        self.tags.remove(target)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

impl TryFrom<Vec<RoleTag>> for RoleTagStore {
    type Error = SuggestError;

    fn try_from(list: Vec<RoleTag>) -> Result<Self> {
        let mut tags = BTreeMap::new();
        for tag in list {
            let target = tag.target().clone();
            if tags.insert(target.clone(), tag).is_some() {
                return Err(SuggestError::DuplicateTag(target.to_string()));
            }
        }
        Ok(Self { tags })
    }
}

impl From<RoleTagStore> for Vec<RoleTag> {
    fn from(store: RoleTagStore) -> Self {
        store.tags.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str) -> RoleTarget {
        RoleTarget::Variable(VariableId::new(id).unwrap())
    }

    #[test]
    fn test_none_is_absence() {
        let mut store = RoleTagStore::new();
        let summary = store
            .persist(&[
                RoleAssignment::variable("v1", "independent"),
                RoleAssignment::variable("v2", "none"),
            ])
            .unwrap();
        assert_eq!(summary, PersistSummary { stored: 1, removed: 0 });
        assert_eq!(store.len(), 1);
        assert_eq!(store.role_of(&target("v1")), ResearchRole::Independent);
        assert!(store.get(&target("v2")).is_none());

        store.persist(&[RoleAssignment::variable("v1", "none")]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_role_rejects_batch() {
        let mut store = RoleTagStore::new();
        let err = store
            .persist(&[
                RoleAssignment::variable("v1", "dependent"),
                RoleAssignment::variable("v2", "covariate"),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            SuggestError::Validation(ValidationError::UnknownRole {
                index: 1,
                role: "covariate".to_string(),
            })
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_target() {
        let mut store = RoleTagStore::new();
        let err = store
            .persist(&[RoleAssignment::group("  ", "latent")])
            .unwrap_err();
        assert_eq!(
            err,
            SuggestError::Validation(ValidationError::MissingTarget { index: 0 })
        );
    }

    #[test]
    fn test_one_tag_per_target() {
        let mut store = RoleTagStore::new();
        store
            .persist(&[
                RoleAssignment::variable("v1", "mediator"),
                RoleAssignment::variable("v1", "Moderator")
                    .suggested(0.7, "name mentions 'tenure'"),
            ])
            .unwrap();
        assert_eq!(store.len(), 1);
        let tag = store.get(&target("v1")).unwrap();
        assert_eq!(tag.role(), ResearchRole::Moderator);
        assert!(!tag.is_user_assigned());
        assert_eq!(tag.confidence(), Some(0.7));
    }

    #[test]
    fn test_stored_none_tag_rejected_on_load() {
        let stored = r#"[{"target":{"kind":"variable","id":"v2"},"role":"none","is_user_assigned":false,"confidence":7.5,"reason":null}]"#;
        assert!(serde_json::from_str::<RoleTagStore>(stored).is_err());
    }

    #[test]
    fn test_load_round_trip_and_duplicates() {
        let mut store = RoleTagStore::new();
        store
            .persist(&[
                RoleAssignment::variable("v1", "independent"),
                RoleAssignment::group("g1", "latent").suggested(0.6, "3 items"),
            ])
            .unwrap();
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(serde_json::from_str::<RoleTagStore>(&json).unwrap(), store);

        let tag = r#"{"target":{"kind":"variable","id":"v1"},"role":"control","is_user_assigned":true}"#;
        let twice = format!("[{tag},{tag}]");
        let err = serde_json::from_str::<RoleTagStore>(&twice).unwrap_err();
        assert!(err.to_string().contains("variable:v1"));
    }
}
