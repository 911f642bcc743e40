//! The LFS "verify" hook (spec §4.4): confirms a client's PUT actually
//! landed before the hub treats the upload as durable.

use crate::{validate_oid, LfsError, Result, VerifyRequest};
use kohakuhub_blobstore::BlobStore;
use kohakuhub_types::ContentHash;

/// Confirms that `req.oid` exists in the blob store with exactly
/// `req.size` bytes. Returns [`LfsError::NotFound`] if the object is
/// missing and [`LfsError::SizeMismatch`] if it's present but the wrong
/// size — both distinct failures the caller maps to different HTTP
/// statuses.
pub async fn verify_object(blobstore: &dyn BlobStore, req: &VerifyRequest) -> Result<()> {
    validate_oid(&req.oid)?;
    let key = ContentHash::from_hex(&req.oid)
        .map_err(|_| LfsError::InvalidOid(req.oid.clone()))?
        .lfs_key();

    match blobstore.size(&key).await? {
        None => Err(LfsError::NotFound(req.oid.clone())),
        Some(actual) if actual as i64 != req.size => Err(LfsError::SizeMismatch {
            expected: req.size,
            actual: actual as i64,
        }),
        Some(_) => Ok(()),
    }
}
