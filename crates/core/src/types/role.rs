//! User roles stored on profile documents.

use serde::{Deserialize, Serialize};

/// Role of a signed-in user.
///
/// Only the exact value `"admin"` grants [`Role::Admin`]. Anything else,
/// including a missing or malformed field, is [`Role::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular customer.
    #[default]
    User,
    /// Store administrator.
    Admin,
}

impl Role {
    /// Interpret the raw `role` field of a profile document.
    #[must_use]
    pub fn from_field(value: Option<&str>) -> Self {
        match value {
            Some("admin") => Self::Admin,
            _ => Self::User,
        }
    }

    /// Value written to profile documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exact_admin_is_admin() {
        assert_eq!(Role::from_field(Some("admin")), Role::Admin);
        assert_eq!(Role::from_field(Some("Admin")), Role::User);
        assert_eq!(Role::from_field(Some(" admin")), Role::User);
        assert_eq!(Role::from_field(Some("user")), Role::User);
        assert_eq!(Role::from_field(Some("")), Role::User);
        assert_eq!(Role::from_field(None), Role::User);
    }

    #[test]
    fn test_as_str_round_trips() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::from_field(Some(role.as_str())), role);
        }
    }
}
