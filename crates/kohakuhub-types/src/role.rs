//! Namespace membership roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's role within a namespace (an organization, or a user's own
/// personal namespace).
///
/// Ordered `Visitor < Member < Admin < SuperAdmin`: every operation that
/// requires "at least member" is satisfied by member, admin, or
/// super-admin, never by visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceRole {
    /// Not a member; read access only, subject to repository visibility.
    Visitor,
    /// A regular member: can push to repositories the namespace grants write to.
    Member,
    /// Can manage membership and repository settings.
    Admin,
    /// Full control, including deleting the namespace itself.
    SuperAdmin,
}

impl NamespaceRole {
    /// Returns true if this role grants at least `required`.
    #[must_use]
    pub fn has(&self, required: NamespaceRole) -> bool {
        *self >= required
    }

    /// Parses a role from its lowercase, snake_case name.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "visitor" => Some(NamespaceRole::Visitor),
            "member" => Some(NamespaceRole::Member),
            "admin" => Some(NamespaceRole::Admin),
            "super_admin" | "super-admin" | "superadmin" => Some(NamespaceRole::SuperAdmin),
            _ => None,
        }
    }
}

impl Default for NamespaceRole {
    fn default() -> Self {
        NamespaceRole::Visitor
    }
}

impl fmt::Display for NamespaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NamespaceRole::Visitor => "visitor",
            NamespaceRole::Member => "member",
            NamespaceRole::Admin => "admin",
            NamespaceRole::SuperAdmin => "super_admin",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(NamespaceRole::Visitor < NamespaceRole::Member);
        assert!(NamespaceRole::Member < NamespaceRole::Admin);
        assert!(NamespaceRole::Admin < NamespaceRole::SuperAdmin);
    }

    #[test]
    fn has_is_reflexive_and_monotonic() {
        assert!(NamespaceRole::SuperAdmin.has(NamespaceRole::Admin));
        assert!(NamespaceRole::Admin.has(NamespaceRole::Admin));
        assert!(!NamespaceRole::Member.has(NamespaceRole::Admin));
        assert!(NamespaceRole::Visitor.has(NamespaceRole::Visitor));
    }

    #[test]
    fn from_str_round_trips_display() {
        for role in [
            NamespaceRole::Visitor,
            NamespaceRole::Member,
            NamespaceRole::Admin,
            NamespaceRole::SuperAdmin,
        ] {
            assert_eq!(NamespaceRole::from_str(&role.to_string()), Some(role));
        }
    }

    #[test]
    fn unknown_role_is_none() {
        assert_eq!(NamespaceRole::from_str("owner"), None);
    }
}
