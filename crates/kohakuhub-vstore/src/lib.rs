//! The versioned-store bridge (spec §4.7): an async interface abstracting
//! the underlying LakeFS-like object store that owns path -> physical
//! address mappings per `(repo, ref)` and the commit DAG.
//!
//! Grounded on `guts-storage`'s ref/object model (`refs.rs`, `store.rs`),
//! generalized from git-specific object ids to the spec's path/commit
//! shapes and widened with pagination, diff, and tag immutability.

mod error;
mod memory;
mod store;
mod types;

pub use error::{Result, VstoreError};
pub use memory::MemoryVersionedStore;
pub use store::VersionedStore;
pub use types::{
    ChangeType, CommitMeta, DiffEntry, ObjectMeta, Page, PathType, PhysicalAddress, RefEntry,
    RefKind,
};
