//! Organizations: the other kind of namespace (spec §3 "Namespace").
//!
//! An organization shares the flat namespace with users; its members
//! carry a [`NamespaceRole`] ordered `visitor < member < admin <
//! super_admin`, used by [`crate::permission::effective_permission`] to
//! decide repository access.

use kohakuhub_types::NamespaceRole;
use serde::{Deserialize, Serialize};

/// A member of an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgMember {
    /// The member's username.
    pub user: String,
    /// Role within the organization.
    pub role: NamespaceRole,
    /// When the member was added (Unix timestamp).
    pub added_at: u64,
    /// Who added this member.
    pub added_by: String,
}

impl OrgMember {
    /// Creates a new organization member.
    #[must_use]
    pub fn new(user: String, role: NamespaceRole, added_by: String, now: u64) -> Self {
        Self {
            user,
            role,
            added_at: now,
            added_by,
        }
    }
}

/// An organization: a namespace owned collectively by its admin members
/// rather than by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique organization id.
    pub id: u64,
    /// Unique organization login, shared with the user namespace.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// The creator's username.
    pub created_by: String,
    /// Organization members.
    pub members: Vec<OrgMember>,
    /// When the organization was created (Unix timestamp).
    pub created_at: u64,
    /// When the organization was last updated (Unix timestamp).
    pub updated_at: u64,
}

impl Organization {
    /// Creates a new organization, with its creator as the founding
    /// super-admin.
    #[must_use]
    pub fn new(id: u64, name: String, display_name: String, created_by: String, now: u64) -> Self {
        let founder = OrgMember::new(created_by.clone(), NamespaceRole::SuperAdmin, created_by.clone(), now);
        Self {
            id,
            name,
            display_name,
            created_by,
            members: vec![founder],
            created_at: now,
            updated_at: now,
        }
    }

    /// Gets a member by username.
    #[must_use]
    pub fn get_member(&self, user: &str) -> Option<&OrgMember> {
        self.members.iter().find(|m| m.user.eq_ignore_ascii_case(user))
    }

    /// Returns the member's role, if they belong to the organization.
    #[must_use]
    pub fn role_of(&self, user: &str) -> Option<NamespaceRole> {
        self.get_member(user).map(|m| m.role)
    }

    /// Adds a member; returns false if they already belong.
    pub fn add_member(&mut self, member: OrgMember) -> bool {
        if self.get_member(&member.user).is_some() {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Removes a member. Refuses to remove the last super-admin, since
    /// that would leave the organization without anyone able to manage
    /// it or delete it (spec §3: delete requires ≥ admin).
    pub fn remove_member(&mut self, user: &str) -> Result<bool, &'static str> {
        if let Some(member) = self.get_member(user) {
            if member.role == NamespaceRole::SuperAdmin && self.super_admin_count() <= 1 {
                return Err("cannot remove last super-admin");
            }
        }
        let before = self.members.len();
        self.members.retain(|m| !m.user.eq_ignore_ascii_case(user));
        Ok(self.members.len() < before)
    }

    /// Updates a member's role, refusing to demote the last super-admin.
    pub fn update_member_role(&mut self, user: &str, new_role: NamespaceRole) -> Result<bool, &'static str> {
        if let Some(member) = self.get_member(user) {
            if member.role == NamespaceRole::SuperAdmin
                && new_role != NamespaceRole::SuperAdmin
                && self.super_admin_count() <= 1
            {
                return Err("cannot demote last super-admin");
            }
        }
        for member in &mut self.members {
            if member.user.eq_ignore_ascii_case(user) {
                member.role = new_role;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn super_admin_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.role == NamespaceRole::SuperAdmin)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn founder_is_super_admin() {
        let org = Organization::new(1, "acme".into(), "Acme".into(), "alice".into(), 0);
        assert_eq!(org.role_of("alice"), Some(NamespaceRole::SuperAdmin));
    }

    #[test]
    fn add_and_query_member() {
        let mut org = Organization::new(1, "acme".into(), "Acme".into(), "alice".into(), 0);
        assert!(org.add_member(OrgMember::new("bob".into(), NamespaceRole::Member, "alice".into(), 1)));
        assert_eq!(org.role_of("bob"), Some(NamespaceRole::Member));
        assert!(!org.add_member(OrgMember::new("bob".into(), NamespaceRole::Admin, "alice".into(), 2)));
    }

    #[test]
    fn cannot_remove_last_super_admin() {
        let mut org = Organization::new(1, "acme".into(), "Acme".into(), "alice".into(), 0);
        assert!(org.remove_member("alice").is_err());
    }

    #[test]
    fn can_remove_super_admin_when_another_remains() {
        let mut org = Organization::new(1, "acme".into(), "Acme".into(), "alice".into(), 0);
        org.add_member(OrgMember::new("bob".into(), NamespaceRole::SuperAdmin, "alice".into(), 1));
        assert!(org.remove_member("alice").unwrap());
    }

    #[test]
    fn cannot_demote_last_super_admin() {
        let mut org = Organization::new(1, "acme".into(), "Acme".into(), "alice".into(), 0);
        assert!(org
            .update_member_role("alice", NamespaceRole::Admin)
            .is_err());
    }

    #[test]
    fn unknown_member_has_no_role() {
        let org = Organization::new(1, "acme".into(), "Acme".into(), "alice".into(), 0);
        assert_eq!(org.role_of("mallory"), None);
    }
}
