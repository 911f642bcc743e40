//! Git object representation shared by the commit engine and the Smart
//! HTTP server.
//!
//! This crate knows how to build, compress, and hold git objects in
//! memory; it has no opinion on where they ultimately live (that is
//! `kohakuhub-vstore`'s and `kohakuhub-blobstore`'s job).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod object;
mod store;

pub use error::{Result, StorageError};
pub use object::{GitObject, ObjectType};
pub use store::ObjectStore;
