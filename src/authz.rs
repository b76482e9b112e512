use crate::{models::Identity, role::RoleLevel};

/// Denial
///
/// Why the gate refused a request. `Unauthenticated` renders as 401, `InsufficientRole`
/// as 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    InsufficientRole {
        required: RoleLevel,
        actual: RoleLevel,
    },
}

/// Verdict
///
/// Result of the authorization gate. Request-scoped and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(Denial),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    /// Converts the verdict into a `Result` so callers can short-circuit with `?`.
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Verdict::Allowed => Ok(()),
            Verdict::Denied(denial) => Err(denial),
        }
    }
}

/// authorize
///
/// The authorization gate. A missing `required` level marks a public resource, which is
/// always allowed. Otherwise an identity must be present and its mapped role must be at
/// least `required` by ordinal comparison. Pure: identical inputs give identical verdicts.
pub fn authorize(identity: Option<&Identity>, required: Option<RoleLevel>) -> Verdict {
    let Some(required) = required else {
        return Verdict::Allowed;
    };
    let Some(identity) = identity else {
        return Verdict::Denied(Denial::Unauthenticated);
    };

    let actual = identity.role_level();
    if actual.satisfies(required) {
        Verdict::Allowed
    } else {
        Verdict::Denied(Denial::InsufficientRole { required, actual })
    }
}
