//! Repository-level permission levels and the namespace/visibility matrix
//! that computes them (spec §3 "Namespace", §4.8).

use kohakuhub_types::NamespaceRole;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The effective access level an actor has on a repository.
///
/// Ordered `None < Read < Write < Delete`: every check that requires "at
/// least write" is satisfied by write or delete, never by read alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoPermission {
    /// No access at all (private repo, unauthenticated or unrelated actor).
    None,
    /// Can clone/fetch/resolve/download.
    Read,
    /// Can additionally commit and upload LFS objects.
    Write,
    /// Can additionally delete the repository.
    Delete,
}

impl RepoPermission {
    /// Returns true if this permission grants at least `required`.
    #[must_use]
    pub fn has(&self, required: RepoPermission) -> bool {
        *self >= required
    }
}

impl fmt::Display for RepoPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepoPermission::None => "none",
            RepoPermission::Read => "read",
            RepoPermission::Write => "write",
            RepoPermission::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// Computes the effective [`RepoPermission`] an actor has on a repository.
///
/// `actor` is the authenticated identity's username, if any. `namespace`
/// is the repository's owning namespace (a user or organization login).
/// `namespace_role` is the actor's role in that namespace, if they are a
/// member. `private` is the repository's visibility.
///
/// This is the matrix from spec §4.8:
/// - Owner of the user namespace: full (`Delete`).
/// - Organization role: `visitor` = read, `member` = read+write,
///   `admin`/`super_admin` = read+write+delete.
/// - Public repo: anonymous read allowed regardless of the above.
#[must_use]
pub fn effective_permission(
    actor: Option<&str>,
    namespace: &str,
    namespace_role: Option<NamespaceRole>,
    private: bool,
) -> RepoPermission {
    let is_namespace_owner = actor.is_some_and(|a| a.eq_ignore_ascii_case(namespace));
    if is_namespace_owner {
        return RepoPermission::Delete;
    }

    let from_role = match namespace_role {
        Some(NamespaceRole::SuperAdmin | NamespaceRole::Admin) => RepoPermission::Delete,
        Some(NamespaceRole::Member) => RepoPermission::Write,
        Some(NamespaceRole::Visitor) => RepoPermission::Read,
        None => RepoPermission::None,
    };

    if !private && from_role < RepoPermission::Read {
        RepoPermission::Read
    } else {
        from_role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(RepoPermission::None < RepoPermission::Read);
        assert!(RepoPermission::Read < RepoPermission::Write);
        assert!(RepoPermission::Write < RepoPermission::Delete);
    }

    #[test]
    fn namespace_owner_has_full_control() {
        let perm = effective_permission(Some("alice"), "alice", None, true);
        assert_eq!(perm, RepoPermission::Delete);
    }

    #[test]
    fn anonymous_read_on_public_repo() {
        let perm = effective_permission(None, "alice", None, false);
        assert_eq!(perm, RepoPermission::Read);
    }

    #[test]
    fn anonymous_denied_on_private_repo() {
        let perm = effective_permission(None, "alice", None, true);
        assert_eq!(perm, RepoPermission::None);
    }

    #[test]
    fn org_visitor_is_read_only() {
        let perm = effective_permission(Some("bob"), "acme", Some(NamespaceRole::Visitor), true);
        assert_eq!(perm, RepoPermission::Read);
    }

    #[test]
    fn org_member_can_write_not_delete() {
        let perm = effective_permission(Some("bob"), "acme", Some(NamespaceRole::Member), true);
        assert_eq!(perm, RepoPermission::Write);
        assert!(!perm.has(RepoPermission::Delete));
    }

    #[test]
    fn org_admin_can_delete() {
        let perm = effective_permission(Some("bob"), "acme", Some(NamespaceRole::Admin), true);
        assert_eq!(perm, RepoPermission::Delete);
    }

    #[test]
    fn non_member_on_public_org_repo_still_reads() {
        let perm = effective_permission(Some("carol"), "acme", None, false);
        assert_eq!(perm, RepoPermission::Read);
    }

    #[test]
    fn non_member_on_private_org_repo_has_none() {
        let perm = effective_permission(Some("carol"), "acme", None, true);
        assert_eq!(perm, RepoPermission::None);
    }
}
