//! The commit engine: NDJSON commit parsing and application (spec
//! §4.1), preupload routing (§4.2), resolve/download (§4.5), tree
//! listing (§4.6), and the git object synthesis Smart HTTP rides on
//! (§4.3).
//!
//! Every other HTTP-facing concern — authentication, the
//! `X-Error-Code` envelope, routing — lives in `kohakuhub-api`, which
//! calls into this crate once it already has a `RepositoryRow` and an
//! authorization decision in hand.

mod engine;
mod error;
mod git_sync;
mod listing;
mod ndjson;
mod pointer;
mod preupload;
mod resolve;

pub use engine::{repo_key, CommitContext, CommitEngine, CommitOutcome, EffectiveLfsConfig};
pub use error::{CommitError, Result};
pub use git_sync::sync_repo;
pub use listing::{list_tree, paths_info, EntryType, LfsInfo, TreeEntry};
pub use ndjson::{parse_ndjson_operations, CommitHeader, CommitRequest, Operation};
pub use pointer::render as render_lfs_pointer;
pub use preupload::{decide as decide_preupload, PreuploadDecision, PreuploadFile, UploadMode};
pub use resolve::{resolve, resolve_commit_id, DownloadAction, DownloadInfo};
