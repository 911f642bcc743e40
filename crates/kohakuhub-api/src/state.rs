//! Shared application state threaded through every handler.

use std::sync::Arc;
use std::time::Duration;

use kohakuhub_blobstore::BlobStore;
use kohakuhub_db::Db;
use kohakuhub_vstore::VersionedStore;

/// Hub-wide configuration the API layer needs at request time.
///
/// Built by `kohakuhub-server` from its own `AppConfig` and handed to
/// [`AppState::new`]; kept separate from `AppConfig` so the API crate
/// doesn't depend on the server crate's config parsing.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Public base URL used to build `url`/`commitUrl` fields in responses.
    pub base_url: String,
    /// Default per-namespace quota for namespaces with no explicit override.
    pub default_quota_bytes: Option<i64>,
    /// File size, in bytes, above which a write is routed to LFS absent a
    /// repo-level override.
    pub lfs_threshold_bytes: i64,
    /// How many historical LFS object versions per path survive GC.
    pub lfs_keep_versions: u32,
    /// Whether a commit triggers inline LFS GC after writing.
    pub lfs_auto_gc: bool,
    /// Chunk size used when a large LFS upload is split into multipart parts.
    pub lfs_chunk_size: u64,
    /// Validity window for presigned blob URLs.
    pub presign_expiry: Duration,
    /// Validity window for a freshly created session cookie.
    pub session_ttl: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            default_quota_bytes: None,
            lfs_threshold_bytes: 10_000_000,
            lfs_keep_versions: 5,
            lfs_auto_gc: true,
            lfs_chunk_size: 64 * 1024 * 1024,
            presign_expiry: Duration::from_secs(3600),
            session_ttl: Duration::from_secs(60 * 60 * 24 * 30),
        }
    }
}

/// Application state shared across every request.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub vstore: Arc<dyn VersionedStore>,
    pub blobstore: Arc<dyn BlobStore>,
    pub config: HubConfig,
}

impl AppState {
    #[must_use]
    pub fn new(db: Db, vstore: Arc<dyn VersionedStore>, blobstore: Arc<dyn BlobStore>, config: HubConfig) -> Self {
        Self { db, vstore, blobstore, config }
    }
}
