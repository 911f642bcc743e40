//! In-memory organization membership store plus identity resolution
//! primitives (session/bearer/basic-auth → user, token hashing).
//!
//! Organizations themselves are process-local state here (mirroring
//! `guts-auth`'s original `AuthStore` shape); the committed user/session/
//! token rows this crate's callers check against live in `kohakuhub-db`.
//! This crate owns only the *rules* (role ordering, permission matrix,
//! token hashing scheme) that both the DB-backed server and an in-memory
//! test double must agree on.

use crate::error::{AuthError, Result};
use crate::organization::{OrgMember, Organization};
use kohakuhub_types::NamespaceRole;
use parking_lot::RwLock;
use sha3::{Digest, Sha3_512};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe in-memory store of organizations and their membership.
#[derive(Debug, Default)]
pub struct AuthStore {
    next_id: AtomicU64,
    organizations: RwLock<HashMap<u64, Organization>>,
    org_name_index: RwLock<HashMap<String, u64>>,
}

impl AuthStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Creates a new organization with `created_by` as founding super-admin.
    pub fn create_organization(
        &self,
        name: String,
        display_name: String,
        created_by: String,
        now: u64,
    ) -> Result<Organization> {
        if self.org_name_index.read().contains_key(&name.to_lowercase()) {
            return Err(AuthError::AlreadyExists(format!("organization '{name}'")));
        }
        let id = self.next_id();
        let org = Organization::new(id, name.clone(), display_name, created_by, now);
        self.organizations.write().insert(id, org.clone());
        self.org_name_index.write().insert(name.to_lowercase(), id);
        Ok(org)
    }

    /// Looks up an organization by id.
    #[must_use]
    pub fn get_organization(&self, id: u64) -> Option<Organization> {
        self.organizations.read().get(&id).cloned()
    }

    /// Looks up an organization by its login name (case-insensitive).
    #[must_use]
    pub fn get_organization_by_name(&self, name: &str) -> Option<Organization> {
        let id = self.org_name_index.read().get(&name.to_lowercase()).copied()?;
        self.get_organization(id)
    }

    /// Lists every organization a user belongs to.
    #[must_use]
    pub fn list_user_organizations(&self, user: &str) -> Vec<Organization> {
        self.organizations
            .read()
            .values()
            .filter(|org| org.get_member(user).is_some())
            .cloned()
            .collect()
    }

    /// Deletes an organization and its name-index entry.
    pub fn delete_organization(&self, id: u64) -> Result<()> {
        let mut orgs = self.organizations.write();
        let org = orgs
            .remove(&id)
            .ok_or_else(|| AuthError::NotFound(format!("organization {id}")))?;
        self.org_name_index.write().remove(&org.name.to_lowercase());
        Ok(())
    }

    /// Adds a member to an organization.
    pub fn add_org_member(&self, org_id: u64, member: OrgMember) -> Result<()> {
        let mut orgs = self.organizations.write();
        let org = orgs
            .get_mut(&org_id)
            .ok_or_else(|| AuthError::NotFound(format!("organization {org_id}")))?;
        if !org.add_member(member.clone()) {
            return Err(AuthError::AlreadyExists(format!("member '{}'", member.user)));
        }
        Ok(())
    }

    /// Removes a member from an organization.
    pub fn remove_org_member(&self, org_id: u64, user: &str) -> Result<()> {
        let mut orgs = self.organizations.write();
        let org = orgs
            .get_mut(&org_id)
            .ok_or_else(|| AuthError::NotFound(format!("organization {org_id}")))?;
        org.remove_member(user).map_err(|_| AuthError::LastAdmin)?;
        Ok(())
    }

    /// Updates a member's role within an organization.
    pub fn update_org_member_role(&self, org_id: u64, user: &str, role: NamespaceRole) -> Result<()> {
        let mut orgs = self.organizations.write();
        let org = orgs
            .get_mut(&org_id)
            .ok_or_else(|| AuthError::NotFound(format!("organization {org_id}")))?;
        org.update_member_role(user, role).map_err(|_| AuthError::LastAdmin)?;
        Ok(())
    }

    /// Returns the caller's role in `namespace`, if `namespace` names an
    /// organization the caller belongs to. `None` if `namespace` is a
    /// user's personal namespace (handled separately by
    /// `effective_permission`'s namespace-owner check) or the caller is
    /// not a member.
    #[must_use]
    pub fn role_in_namespace(&self, actor: &str, namespace: &str) -> Option<NamespaceRole> {
        self.get_organization_by_name(namespace)?.role_of(actor)
    }
}

/// Hashes a bearer/LFS token the way it is stored and compared: SHA3-512
/// of the raw secret, hex-encoded (spec §3 "Session / Token / User").
#[must_use]
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha3_512::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// A 32-byte (64 hex character) random token, generated for new personal
/// access tokens and LFS credentials.
#[must_use]
pub fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_lookup_organization() {
        let store = AuthStore::new();
        let org = store
            .create_organization("acme".into(), "Acme".into(), "alice".into(), 0)
            .unwrap();
        assert_eq!(store.get_organization(org.id).unwrap().name, "acme");
        assert_eq!(store.get_organization_by_name("ACME").unwrap().id, org.id);
    }

    #[test]
    fn duplicate_name_rejected() {
        let store = AuthStore::new();
        store
            .create_organization("acme".into(), "Acme".into(), "alice".into(), 0)
            .unwrap();
        assert!(store
            .create_organization("Acme".into(), "Acme Inc".into(), "bob".into(), 1)
            .is_err());
    }

    #[test]
    fn role_in_namespace_reflects_membership() {
        let store = AuthStore::new();
        let org = store
            .create_organization("acme".into(), "Acme".into(), "alice".into(), 0)
            .unwrap();
        store
            .add_org_member(org.id, OrgMember::new("bob".into(), NamespaceRole::Member, "alice".into(), 1))
            .unwrap();
        assert_eq!(store.role_in_namespace("bob", "acme"), Some(NamespaceRole::Member));
        assert_eq!(store.role_in_namespace("mallory", "acme"), None);
    }

    #[test]
    fn token_hash_is_deterministic_and_not_reversible_lookalike() {
        let h1 = hash_token("secret");
        let h2 = hash_token("secret");
        assert_eq!(h1, h2);
        assert_ne!(h1, "secret");
        assert_eq!(h1.len(), 128);
    }

    #[test]
    fn generated_tokens_are_unique_and_64_hex_chars() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
