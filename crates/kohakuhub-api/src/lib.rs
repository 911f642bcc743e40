//! # kohakuhub-api
//!
//! The HTTP surface of KohakuHub: the HF-compatible REST API (repo
//! CRUD, the NDJSON commit protocol, tree/resolve endpoints), the Git
//! Smart HTTP v1 server, and the Git LFS Batch API, all mounted on one
//! [`AppState`](state::AppState).
//!
//! This crate owns routing, identity resolution, and the error
//! envelope; it has no notion of how a commit is applied or how a pack
//! file is built — that lives in `kohakuhub-commit` and `kohakuhub-git`,
//! which handlers call into once a request is authenticated and
//! authorized.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handlers;
mod identity;
mod router;
mod state;
mod types;
mod validation;

pub use error::{ApiError, Result};
pub use identity::Identity;
pub use router::create_router;
pub use state::{AppState, HubConfig};

/// API version advertised in the Git Smart HTTP `agent=` capability and
/// wherever else the server identifies itself.
pub const API_VERSION: &str = "v1";
