//! Research roles and role tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result, check_confidence};
use crate::ids::{GroupId, VariableId};

/// Research-design role of a variable or group.
///
/// `None` means "no role" and is never stored as a tag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchRole {
    #[default]
    None,
    Independent,
    Dependent,
    Mediator,
    Moderator,
    Control,
    Latent,
}

impl ResearchRole {
    /// Every role that can be persisted.
    pub const ASSIGNABLE: [ResearchRole; 6] = [
        Self::Independent,
        Self::Dependent,
        Self::Mediator,
        Self::Moderator,
        Self::Control,
        Self::Latent,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Independent => "independent",
            Self::Dependent => "dependent",
            Self::Mediator => "mediator",
            Self::Moderator => "moderator",
            Self::Control => "control",
            Self::Latent => "latent",
        }
    }

    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ResearchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResearchRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "independent" => Ok(Self::Independent),
            "dependent" => Ok(Self::Dependent),
            "mediator" => Ok(Self::Mediator),
            "moderator" => Ok(Self::Moderator),
            "control" => Ok(Self::Control),
            "latent" => Ok(Self::Latent),
            _ => Err(ModelError::UnknownRole(s.to_string())),
        }
    }
}

/// What a role tag is attached to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RoleTarget {
    Variable(VariableId),
    Group(GroupId),
}

impl fmt::Display for RoleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(id) => write!(f, "variable:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// A persisted role assignment.
///
/// Deserialization goes through [`RoleTag::new`], so a stored `none` role
/// or an out-of-range confidence is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRoleTag")]
pub struct RoleTag {
    target: RoleTarget,
    role: ResearchRole,
    is_user_assigned: bool,
    confidence: Option<f32>,
    reason: Option<String>,
}

impl RoleTag {
    /// Create a tag. Fails for `ResearchRole::None`.
    pub fn new(target: RoleTarget, role: ResearchRole, is_user_assigned: bool) -> Result<Self> {
        if role.is_none() {
            return Err(ModelError::NoneRole);
        }
        Ok(Self {
            target,
            role,
            is_user_assigned,
            confidence: None,
            reason: None,
        })
    }

    /// Attach a suggestion confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Result<Self> {
        self.confidence = Some(check_confidence(confidence)?);
        Ok(self)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn target(&self) -> &RoleTarget {
        &self.target
    }

    pub fn role(&self) -> ResearchRole {
        self.role
    }

    pub fn is_user_assigned(&self) -> bool {
        self.is_user_assigned
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

#[derive(Deserialize)]
struct RawRoleTag {
    target: RoleTarget,
    role: ResearchRole,
    is_user_assigned: bool,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reason: Option<String>,
}

impl TryFrom<RawRoleTag> for RoleTag {
    type Error = ModelError;

    fn try_from(raw: RawRoleTag) -> Result<Self> {
        let mut tag = Self::new(raw.target, raw.role, raw.is_user_assigned)?;
        if let Some(confidence) = raw.confidence {
            tag = tag.with_confidence(confidence)?;
        }
        tag.reason = raw.reason;
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roles() {
        assert_eq!(
            "Independent".parse::<ResearchRole>().unwrap(),
            ResearchRole::Independent
        );
        assert_eq!(
            "covariate".parse::<ResearchRole>(),
            Err(ModelError::UnknownRole("covariate".to_string()))
        );
    }

    #[test]
    fn none_role_is_not_a_tag() {
        let target = RoleTarget::Variable(VariableId::new("v1").unwrap());
        assert_eq!(
            RoleTag::new(target, ResearchRole::None, true),
            Err(ModelError::NoneRole)
        );
    }

    #[test]
    fn target_serializes_tagged() {
        let target = RoleTarget::Group(GroupId::new("g1").unwrap());
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, r#"{"kind":"group","id":"g1"}"#);
    }

    #[test]
    fn tag_json_goes_through_constructor() {
        let tag = RoleTag::new(
            RoleTarget::Variable(VariableId::new("v1").unwrap()),
            ResearchRole::Dependent,
            false,
        )
        .unwrap()
        .with_confidence(0.75)
        .unwrap()
        .with_reason("last numeric column");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(serde_json::from_str::<RoleTag>(&json).unwrap(), tag);

        let none_role = r#"{"target":{"kind":"variable","id":"v2"},"role":"none","is_user_assigned":true}"#;
        let err = serde_json::from_str::<RoleTag>(none_role).unwrap_err();
        assert!(err.to_string().contains("role 'none'"));

        let wild = r#"{"target":{"kind":"variable","id":"v2"},"role":"latent","is_user_assigned":false,"confidence":7.5}"#;
        assert!(serde_json::from_str::<RoleTag>(wild).is_err());
    }
}
