//! S3-compatible blob storage for KohakuHub.
//!
//! Every LFS object lives at the content-addressed key
//! `lfs/<sha256[0:2]>/<sha256[2:4]>/<sha256>` (see
//! [`kohakuhub_types::ContentHash::lfs_key`]); regular (non-LFS) file
//! bytes are written by the versioned-store bridge into per-repo
//! namespaces that are opaque to this crate. This crate only knows how
//! to put/get/delete bytes by key and how to mint presigned URLs —
//! everything content-addressed or repo-shaped lives one layer up.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod s3;

pub use error::{BlobStoreError, Result};
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// One part of a presigned multipart upload.
#[derive(Debug, Clone)]
pub struct PresignedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// The presigned PUT URL for this part.
    pub href: String,
}

/// An S3-compatible object store holding raw bytes under opaque keys.
///
/// Keys are never rewritten once written (spec §4.4: "Keys are
/// write-once"); callers are responsible for choosing content-addressed
/// keys where dedup matters.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `data` to `key`, overwriting nothing (callers must not
    /// call this twice for the same content-addressed key; see
    /// [`BlobStore::exists`]).
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Downloads the full contents of `key`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Returns true if an object exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Returns the size in bytes of the object at `key`, if it exists.
    async fn size(&self, key: &str) -> Result<Option<u64>>;

    /// Deletes the object at `key`. Idempotent: deleting a missing key
    /// is not an error (garbage collection calls this best-effort).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Mints a presigned GET URL for `key`, valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String>;

    /// Mints a presigned PUT URL for `key`, valid for `expires_in`.
    async fn presign_put(&self, key: &str, expires_in: Duration) -> Result<String>;

    /// Begins a multipart upload for `key`, returning an upload id.
    async fn create_multipart_upload(&self, key: &str) -> Result<String>;

    /// Mints presigned PUT URLs for `part_count` parts of an in-progress
    /// multipart upload.
    async fn presign_multipart_parts(
        &self,
        key: &str,
        upload_id: &str,
        part_count: u32,
        expires_in: Duration,
    ) -> Result<Vec<PresignedPart>>;

    /// Completes a multipart upload once the client has `PUT` every
    /// part and reports their ETags.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<(u32, String)>,
    ) -> Result<()>;

    /// Aborts an in-progress multipart upload (cleanup on client failure).
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()>;
}
