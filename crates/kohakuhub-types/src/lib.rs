//! Shared identifiers and error types used throughout KohakuHub.
//!
//! This crate has no knowledge of storage, networking, or the database; it
//! exists so that every other crate agrees on what an object id, a content
//! hash, and a repository identifier mean.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod content_hash;
mod error;
mod oid;
mod repo;
mod role;

pub use content_hash::ContentHash;
pub use error::{Result, TypesError};
pub use oid::Oid;
pub use repo::{RepoType, RepositoryId};
pub use role::NamespaceRole;
