//! Namespace roles, repository permission matrix, and token hashing for
//! KohakuHub (spec §3 "Namespace", §4.8 "Auth & Permissions").
//!
//! This crate has no notion of HTTP, sessions-as-rows, or the database;
//! it owns the *rules* — role ordering, the permission matrix, and the
//! token hashing scheme — that `kohakuhub-db` and `kohakuhub-api` both
//! build on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod organization;
mod permission;
mod store;

pub use error::{AuthError, Result};
pub use organization::{OrgMember, Organization};
pub use permission::{effective_permission, RepoPermission};
pub use store::{generate_token, hash_token, AuthStore};

pub use kohakuhub_types::NamespaceRole;
