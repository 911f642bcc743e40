//! An in-memory [`BlobStore`] test double.

use crate::{BlobStore, BlobStoreError, PresignedPart, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// An in-memory blob store for unit and integration tests. Presigned
/// URLs are fake `memory://<key>?...` strings a test harness can parse
/// back into a key rather than real HTTP URLs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
    multipart: RwLock<HashMap<String, Vec<Option<Bytes>>>>,
}

impl MemoryBlobStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.objects.write().insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(key))
    }

    async fn size(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.objects.read().get(key).map(|b| b.len() as u64))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        Ok(format!("memory://{key}?op=get&expires_in={}", expires_in.as_secs()))
    }

    async fn presign_put(&self, key: &str, expires_in: Duration) -> Result<String> {
        Ok(format!("memory://{key}?op=put&expires_in={}", expires_in.as_secs()))
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<String> {
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.multipart
            .write()
            .insert(format!("{key}#{upload_id}"), Vec::new());
        Ok(upload_id)
    }

    async fn presign_multipart_parts(
        &self,
        key: &str,
        upload_id: &str,
        part_count: u32,
        expires_in: Duration,
    ) -> Result<Vec<PresignedPart>> {
        Ok((1..=part_count)
            .map(|part_number| PresignedPart {
                part_number,
                href: format!(
                    "memory://{key}?op=put&upload_id={upload_id}&part={part_number}&expires_in={}",
                    expires_in.as_secs()
                ),
            })
            .collect())
    }

    async fn complete_multipart_upload(&self, key: &str, upload_id: &str, parts: Vec<(u32, String)>) -> Result<()> {
        let composite_key = format!("{key}#{upload_id}");
        self.multipart
            .write()
            .remove(&composite_key)
            .ok_or_else(|| BlobStoreError::Backend(format!("unknown multipart upload {upload_id}")))?;
        // The in-memory double has no real part bytes to stitch together;
        // it only validates that the caller completed with the parts it
        // was told about, mirroring a real backend's contract.
        if parts.is_empty() {
            return Err(BlobStoreError::Backend("no parts reported".into()));
        }
        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        self.multipart.write().remove(&format!("{key}#{upload_id}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = MemoryBlobStore::new();
        store.put("lfs/ab/cd/abcd", Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(store.get("lfs/ab/cd/abcd").await.unwrap(), Bytes::from_static(b"hello"));
        assert!(store.exists("lfs/ab/cd/abcd").await.unwrap());
        assert_eq!(store.size("lfs/ab/cd/abcd").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn missing_key_errors() {
        let store = MemoryBlobStore::new();
        assert!(store.get("nope").await.is_err());
        assert!(!store.exists("nope").await.unwrap());
        assert_eq!(store.size("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.delete("nope").await.unwrap();
        store.put("k", Bytes::from_static(b"x")).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn multipart_lifecycle() {
        let store = MemoryBlobStore::new();
        let upload_id = store.create_multipart_upload("big.bin").await.unwrap();
        let parts = store
            .presign_multipart_parts("big.bin", &upload_id, 3, Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(parts.len(), 3);
        store
            .complete_multipart_upload(
                "big.bin",
                &upload_id,
                vec![(1, "etag1".into()), (2, "etag2".into()), (3, "etag3".into())],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn completing_unknown_upload_fails() {
        let store = MemoryBlobStore::new();
        assert!(store
            .complete_multipart_upload("k", "bogus", vec![(1, "e".into())])
            .await
            .is_err());
    }
}
