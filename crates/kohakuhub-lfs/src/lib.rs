//! Git LFS Batch API, verify hook, and content-addressed garbage
//! collection for KohakuHub (spec §4.4).
//!
//! This crate knows the LFS wire shapes and how to turn a batch request
//! into presigned actions against a [`kohakuhub_blobstore::BlobStore`];
//! it has no notion of repositories, commits, or the database — those
//! live in `kohakuhub-commit` and `kohakuhub-db`, which call into this
//! crate with already-resolved oids.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod error;
mod gc;
mod types;
mod verify;

pub use batch::handle_batch;
pub use error::{LfsError, Result};
pub use gc::delete_object;
pub use types::{
    Action, Actions, BatchObjectRequest, BatchObjectResponse, BatchOperation, BatchRequest,
    BatchResponse, ObjectError, VerifyRequest,
};
pub use verify::verify_object;

/// Validates that `oid` is a 64-character lowercase hex SHA-256 string.
pub(crate) fn validate_oid(oid: &str) -> Result<()> {
    if oid.len() != 64 || !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(LfsError::InvalidOid(oid.to_string()));
    }
    Ok(())
}
