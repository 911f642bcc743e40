//! Resolve/download (spec §4.5): serves a single file at a revision,
//! either inline or as a redirect to a presigned blob-store URL, with
//! the header set clients use for caching and LFS linkage.

use crate::error::Result;
use bytes::Bytes;
use kohakuhub_blobstore::BlobStore;
use kohakuhub_vstore::{PhysicalAddress, VersionedStore};
use std::time::Duration;

/// How the caller should actually get the bytes to the client.
#[derive(Debug, Clone)]
pub enum DownloadAction {
    /// Stream these bytes directly (small, non-LFS files).
    Inline(Bytes),
    /// Redirect the client here (LFS-backed files; spec §4.5 "302").
    Redirect {
        url: String,
        linked_etag: String,
        linked_size: u64,
    },
}

/// Everything needed to answer a resolve HEAD/GET request.
#[derive(Debug, Clone)]
pub struct DownloadInfo {
    pub size: u64,
    /// `ETag` header value — the file's content hash.
    pub etag: String,
    /// `X-Repo-Commit` header value — the commit id `revision` resolved to.
    pub repo_commit: String,
    pub action: DownloadAction,
}

/// Resolves a branch/tag/commit-id `revision` to the commit id it names,
/// for the `X-Repo-Commit` header. Tries `revision` as a literal commit
/// id first, then falls back to treating it as a branch name.
pub async fn resolve_commit_id(
    vstore: &dyn VersionedStore,
    repo_key: &str,
    revision: &str,
) -> Result<String> {
    if let Ok(meta) = vstore.get_commit(repo_key, revision).await {
        return Ok(meta.commit_id);
    }
    let page = vstore.list_commits(repo_key, revision, None, 1).await?;
    let commit_id = page
        .items
        .into_iter()
        .next()
        .map(|c| c.commit_id)
        .unwrap_or_else(|| revision.to_string());
    Ok(commit_id)
}

/// Resolves `path` at `revision` into a [`DownloadInfo`]. `want_body`
/// controls whether inline bytes are actually fetched (skip for HEAD
/// requests, which only need headers).
pub async fn resolve(
    vstore: &dyn VersionedStore,
    blobstore: &dyn BlobStore,
    repo_key: &str,
    revision: &str,
    path: &str,
    want_body: bool,
    presign_expiry: Duration,
) -> Result<DownloadInfo> {
    let meta = vstore.stat_object(repo_key, revision, path).await?;
    let repo_commit = resolve_commit_id(vstore, repo_key, revision).await?;

    let action = match &meta.physical_address {
        PhysicalAddress::Inline => {
            let bytes = if want_body {
                vstore.get_object(repo_key, revision, path).await?
            } else {
                Bytes::new()
            };
            DownloadAction::Inline(bytes)
        }
        PhysicalAddress::Linked(key) => {
            let url = blobstore.presign_get(key, presign_expiry).await?;
            DownloadAction::Redirect {
                url,
                linked_etag: meta.checksum.clone(),
                linked_size: meta.size,
            }
        }
    };

    Ok(DownloadInfo { size: meta.size, etag: meta.checksum, repo_commit, action })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kohakuhub_blobstore::MemoryBlobStore;
    use kohakuhub_vstore::MemoryVersionedStore;

    async fn seed() -> (MemoryVersionedStore, MemoryBlobStore, String) {
        let vstore = MemoryVersionedStore::new();
        let blobstore = MemoryBlobStore::new();
        let repo_key = "model/alice/demo".to_string();
        vstore.create_repo(&repo_key).await.unwrap();
        vstore
            .put_object(&repo_key, "main", "readme.md", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        vstore.commit(&repo_key, "main", "init", None).await.unwrap();
        (vstore, blobstore, repo_key)
    }

    #[tokio::test]
    async fn inline_file_resolves_with_body() {
        let (vstore, blobstore, repo_key) = seed().await;
        let info = resolve(&vstore, &blobstore, &repo_key, "main", "readme.md", true, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(info.size, 5);
        match info.action {
            DownloadAction::Inline(bytes) => assert_eq!(&bytes[..], b"hello"),
            _ => panic!("expected inline"),
        }
    }

    #[tokio::test]
    async fn head_request_skips_body_fetch() {
        let (vstore, blobstore, repo_key) = seed().await;
        let info = resolve(&vstore, &blobstore, &repo_key, "main", "readme.md", false, Duration::from_secs(60))
            .await
            .unwrap();
        match info.action {
            DownloadAction::Inline(bytes) => assert!(bytes.is_empty()),
            _ => panic!("expected inline"),
        }
    }

    #[tokio::test]
    async fn linked_file_resolves_to_redirect() {
        let (vstore, blobstore, repo_key) = seed().await;
        blobstore.put("lfs/ab/cd/abcd", Bytes::from_static(b"big")).await.unwrap();
        vstore
            .link_physical_address(
                &repo_key,
                "main",
                "model.bin",
                PhysicalAddress::Linked("lfs/ab/cd/abcd".into()),
                "abcd",
                3,
            )
            .await
            .unwrap();
        vstore.commit(&repo_key, "main", "add model", None).await.unwrap();

        let info = resolve(&vstore, &blobstore, &repo_key, "main", "model.bin", true, Duration::from_secs(60))
            .await
            .unwrap();
        match info.action {
            DownloadAction::Redirect { linked_size, linked_etag, .. } => {
                assert_eq!(linked_size, 3);
                assert_eq!(linked_etag, "abcd");
            }
            _ => panic!("expected redirect"),
        }
    }
}
