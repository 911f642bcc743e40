//! The versioned-store bridge trait (spec §4.7).

use crate::types::{CommitMeta, DiffEntry, ObjectMeta, Page, PhysicalAddress, RefEntry};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A thin async interface over a LakeFS-like versioned object store:
/// path -> physical-address mappings per `(repo, ref)`, plus a commit
/// DAG. Safe to call concurrently from many request tasks; implementations
/// serialize `commit` calls per `(repo, branch)` only to the extent the
/// underlying store requires (spec §4.7, §5 "Ordering guarantees").
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Idempotent: calling twice on an existing repo is a no-op.
    async fn create_repo(&self, repo_key: &str) -> Result<()>;

    async fn delete_repo(&self, repo_key: &str) -> Result<()>;

    /// Lists every branch and tag the repository currently has, each
    /// resolved to the commit id it points to (spec §4.3 ref
    /// advertisement order: callers sort `HEAD` first, then
    /// `refs/heads/*`, then `refs/tags/*`).
    async fn list_refs(&self, repo_key: &str) -> Result<Vec<RefEntry>>;

    async fn list_objects(
        &self,
        repo_key: &str,
        reference: &str,
        after: Option<&str>,
        amount: usize,
    ) -> Result<Page<ObjectMeta>>;

    async fn stat_object(&self, repo_key: &str, reference: &str, path: &str) -> Result<ObjectMeta>;

    /// Streams bytes for objects stored inline. Objects linked to a
    /// physical address outside the versioned store (LFS blobs) return
    /// [`crate::VstoreError::NotInline`]; fetch those directly from the
    /// blob store using the address from [`Self::stat_object`].
    async fn get_object(&self, repo_key: &str, reference: &str, path: &str) -> Result<Bytes>;

    /// Uploads `bytes` and stages them on `branch`, to be published by
    /// the next [`Self::commit`].
    async fn put_object(&self, repo_key: &str, branch: &str, path: &str, bytes: Bytes) -> Result<ObjectMeta>;

    /// Attaches an existing blob to `path` without copying bytes.
    async fn link_physical_address(
        &self,
        repo_key: &str,
        branch: &str,
        path: &str,
        physical_address: PhysicalAddress,
        checksum: &str,
        size: u64,
    ) -> Result<()>;

    /// Marks `path` for deletion in the next commit.
    async fn delete_object(&self, repo_key: &str, branch: &str, path: &str) -> Result<()>;

    /// Atomically publishes every staged change on `branch` since its
    /// current tip. Returns `Conflict` if another commit landed on the
    /// same branch since staging began (spec §5 "linearizable").
    async fn commit(
        &self,
        repo_key: &str,
        branch: &str,
        message: &str,
        description: Option<&str>,
    ) -> Result<CommitMeta>;

    async fn get_commit(&self, repo_key: &str, commit_id: &str) -> Result<CommitMeta>;

    async fn list_commits(
        &self,
        repo_key: &str,
        branch: &str,
        after: Option<&str>,
        amount: usize,
    ) -> Result<Page<CommitMeta>>;

    async fn diff(&self, repo_key: &str, left: &str, right: &str) -> Result<Vec<DiffEntry>>;

    async fn create_branch(&self, repo_key: &str, branch: &str, source_ref: &str) -> Result<()>;

    async fn delete_branch(&self, repo_key: &str, branch: &str) -> Result<()>;

    /// Tags are immutable once created.
    async fn create_tag(&self, repo_key: &str, tag: &str, source_ref: &str) -> Result<()>;

    async fn delete_tag(&self, repo_key: &str, tag: &str) -> Result<()>;
}
