//! Physical blob reclamation (spec §4.4 "Garbage collection").
//!
//! `kohakuhub-db::lfs_gc_candidates` decides which oids are safe to
//! reclaim; this module only knows how to turn an oid into a blob store
//! key and delete it.

use crate::{validate_oid, Result};
use kohakuhub_blobstore::BlobStore;
use kohakuhub_types::ContentHash;

/// Deletes the blob for `oid`, if present. Idempotent — deleting an
/// already-gone object is not an error, since GC may be retried after a
/// partial failure.
pub async fn delete_object(blobstore: &dyn BlobStore, oid: &str) -> Result<()> {
    validate_oid(oid)?;
    let key = ContentHash::from_hex(oid)
        .map_err(|_| crate::LfsError::InvalidOid(oid.to_string()))?
        .lfs_key();
    blobstore.delete(&key).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kohakuhub_blobstore::MemoryBlobStore;

    #[tokio::test]
    async fn delete_removes_the_blob() {
        let store = MemoryBlobStore::new();
        let data = b"gc me".to_vec();
        let oid = ContentHash::compute(&data).to_hex();
        let key = ContentHash::from_hex(&oid).unwrap().lfs_key();
        store.put(&key, data.into()).await.unwrap();
        assert!(store.exists(&key).await.unwrap());

        delete_object(&store, &oid).await.unwrap();
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn delete_of_missing_object_is_not_an_error() {
        let store = MemoryBlobStore::new();
        let oid = ContentHash::compute(b"never existed").to_hex();
        assert!(delete_object(&store, &oid).await.is_ok());
    }
}
