//! Git protocol support for KohakuHub's Smart HTTP server.
//!
//! This crate implements pkt-line framing, the pack file format, and
//! upload-pack negotiation, letting standard git clients `clone`/`fetch`
//! a repository whose objects are synthesized on the fly from versioned
//! store state. Push (`git-receive-pack`) is intentionally not
//! implemented; see [`protocol`]'s module doc.

mod error;
mod pack;
mod pktline;
mod protocol;
mod tree;

pub use error::GitError;
pub use pack::{PackBuilder, PackParser};
pub use pktline::{PktLine, PktLineReader, PktLineWriter};
pub use protocol::{advertise_refs, receive_pack_not_supported, upload_pack, RefAdvertisement, WantHave};
pub use tree::{build_tree, parse_tree, TreeEntry};

/// Result type for git protocol operations.
pub type Result<T> = std::result::Result<T, GitError>;
