//! Variable groups (multi-item scales and similar clusters).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result, check_confidence};
use crate::ids::{GroupId, VariableId};

/// A cluster of related variables, e.g. the items of one Likert scale.
///
/// Members are ordered, non-empty, and unique within the group. Stored
/// groups are checked again on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVariableGroup")]
pub struct VariableGroup {
    id: GroupId,
    members: Vec<VariableId>,
    suggested_name: String,
    confidence: f32,
}

impl VariableGroup {
    pub fn new(
        id: GroupId,
        members: Vec<VariableId>,
        suggested_name: impl Into<String>,
        confidence: f32,
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(ModelError::EmptyGroup(id.to_string()));
        }
        let mut seen = BTreeSet::new();
        for member in &members {
            if !seen.insert(member) {
                return Err(ModelError::DuplicateMember {
                    group: id.to_string(),
                    variable: member.to_string(),
                });
            }
        }
        Ok(Self {
            id,
            members,
            suggested_name: suggested_name.into(),
            confidence: check_confidence(confidence)?,
        })
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn members(&self) -> &[VariableId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, variable: &VariableId) -> bool {
        self.members.contains(variable)
    }

    pub fn suggested_name(&self) -> &str {
        &self.suggested_name
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Rename the group (user edit).
    pub fn rename(&mut self, name: impl Into<String>) {
        self.suggested_name = name.into();
    }

    /// Remove a member. Refuses to remove the last one.
    pub fn remove_member(&mut self, variable: &VariableId) -> Result<bool> {
        let Some(pos) = self.members.iter().position(|m| m == variable) else {
            return Ok(false);
        };
        if self.members.len() == 1 {
            return Err(ModelError::EmptyGroup(self.id.to_string()));
        }
        self.members.remove(pos);
        Ok(true)
    }
}

#[derive(Deserialize)]
struct RawVariableGroup {
    id: GroupId,
    members: Vec<VariableId>,
    suggested_name: String,
    confidence: f32,
}

impl TryFrom<RawVariableGroup> for VariableGroup {
    type Error = ModelError;

    fn try_from(raw: RawVariableGroup) -> Result<Self> {
        Self::new(raw.id, raw.members, raw.suggested_name, raw.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vid(s: &str) -> VariableId {
        VariableId::new(s).unwrap()
    }

    #[test]
    fn rejects_empty_and_duplicate_members() {
        let gid = GroupId::new("g1").unwrap();
        assert!(matches!(
            VariableGroup::new(gid.clone(), vec![], "Q1", 0.5),
            Err(ModelError::EmptyGroup(_))
        ));
        assert!(matches!(
            VariableGroup::new(gid, vec![vid("a"), vid("a")], "Q1", 0.5),
            Err(ModelError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn remove_member_keeps_group_non_empty() {
        let mut group = VariableGroup::new(
            GroupId::new("g1").unwrap(),
            vec![vid("a"), vid("b")],
            "Scale",
            0.8,
        )
        .unwrap();
        assert!(group.remove_member(&vid("a")).unwrap());
        assert!(!group.remove_member(&vid("zzz")).unwrap());
        assert!(group.remove_member(&vid("b")).is_err());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn stored_group_is_validated() {
        let group = VariableGroup::new(
            GroupId::new("g1").unwrap(),
            vec![vid("Q1_1"), vid("Q1_2")],
            "Q1",
            0.9,
        )
        .unwrap();
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(serde_json::from_str::<VariableGroup>(&json).unwrap(), group);

        let empty = r#"{"id":"g1","members":[],"suggested_name":"Q1","confidence":0.9}"#;
        assert!(serde_json::from_str::<VariableGroup>(empty).is_err());

        let twice = r#"{"id":"g1","members":["a","a"],"suggested_name":"Q1","confidence":0.9}"#;
        let err = serde_json::from_str::<VariableGroup>(twice).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
