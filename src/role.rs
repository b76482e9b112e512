use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

/// RoleLevel
///
/// The capability tier of an identity. The discriminants are the numeric levels stored
/// in `auth_users.user_role`, and the derived ordering follows them: a higher level is a
/// superset of every lower one, so authorization is always an ordinal comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoleLevel {
    Viewer = 1,
    User = 2,
    Contributor = 3,
    Admin = 4,
}

/// RawRole
///
/// A role value as it is found in storage or in token claims, before it has been mapped.
/// Untagged so that any JSON value deserializes into one of the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRole {
    Number(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<i32> for RawRole {
    fn from(value: i32) -> Self {
        RawRole::Number(i64::from(value))
    }
}

impl From<i64> for RawRole {
    fn from(value: i64) -> Self {
        RawRole::Number(value)
    }
}

impl From<&str> for RawRole {
    fn from(value: &str) -> Self {
        RawRole::Text(value.to_string())
    }
}

impl RoleLevel {
    /// The level assigned to anything that cannot be mapped: the lowest authenticated tier
    /// a registered account actually receives.
    pub const DEFAULT: RoleLevel = RoleLevel::User;

    pub const ALL: [RoleLevel; 4] = [
        RoleLevel::Viewer,
        RoleLevel::User,
        RoleLevel::Contributor,
        RoleLevel::Admin,
    ];

    pub fn level(self) -> i32 {
        self as i32
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(RoleLevel::Viewer),
            2 => Some(RoleLevel::User),
            3 => Some(RoleLevel::Contributor),
            4 => Some(RoleLevel::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoleLevel::Viewer => "viewer",
            RoleLevel::User => "user",
            RoleLevel::Contributor => "contributor",
            RoleLevel::Admin => "admin",
        }
    }

    /// parse
    ///
    /// Strict parsing of a textual role: a numeric level ("4") or a role name matched
    /// case-insensitively ("Admin"). Returns `None` for anything else, which lets write
    /// paths reject malformed input instead of silently downgrading it.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(level) = trimmed.parse::<i64>() {
            return Self::from_level(level);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "viewer" => Some(RoleLevel::Viewer),
            "user" => Some(RoleLevel::User),
            "contributor" => Some(RoleLevel::Contributor),
            "admin" => Some(RoleLevel::Admin),
            _ => None,
        }
    }

    /// parse_raw
    ///
    /// Strict counterpart of [`RoleLevel::map`] for an already-deserialized raw value.
    pub fn parse_raw(raw: &RawRole) -> Option<Self> {
        match raw {
            RawRole::Number(level) => Self::from_level(*level),
            RawRole::Float(level) if level.fract() == 0.0 => Self::from_level(*level as i64),
            RawRole::Float(_) => None,
            RawRole::Text(text) => Self::parse(text),
            RawRole::Other(_) => None,
        }
    }

    /// map
    ///
    /// Total mapping from a stored role to a capability tier. Every input, including
    /// `None`, out-of-range numbers and unknown names, resolves to a level; unmappable
    /// values fall back to [`RoleLevel::DEFAULT`].
    pub fn map(raw: Option<RawRole>) -> Self {
        raw.as_ref()
            .and_then(Self::parse_raw)
            .unwrap_or(Self::DEFAULT)
    }

    pub fn satisfies(self, required: RoleLevel) -> bool {
        self >= required
    }
}

impl Default for RoleLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<RoleLevel> for i32 {
    fn from(role: RoleLevel) -> Self {
        role.level()
    }
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
