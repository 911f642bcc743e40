//! Tree listing and paths-info (spec §4.6): directory listings and
//! batch path lookups, both reporting the git blob sha a client would
//! see over Smart HTTP for the same path.

use crate::error::Result;
use crate::pointer;
use kohakuhub_types::Oid;
use kohakuhub_vstore::{ObjectMeta, Page, PathType, PhysicalAddress, VersionedStore};

/// One entry in a tree listing or paths-info response.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub path: String,
    pub entry_type: EntryType,
    pub size: u64,
    /// Git blob sha1 — of the LFS pointer file for linked objects, of
    /// the raw content for inline ones. `None` for directories.
    pub oid: Option<String>,
    pub lfs: Option<LfsInfo>,
}

/// File-vs-directory, matching [`kohakuhub_vstore::PathType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// LFS linkage details surfaced for LFS-backed files.
#[derive(Debug, Clone)]
pub struct LfsInfo {
    pub oid: String,
    pub size: u64,
}

async fn to_entry(vstore: &dyn VersionedStore, repo_key: &str, revision: &str, meta: ObjectMeta) -> Result<TreeEntry> {
    if meta.path_type == PathType::Directory {
        return Ok(TreeEntry {
            path: meta.path,
            entry_type: EntryType::Directory,
            size: 0,
            oid: None,
            lfs: None,
        });
    }

    let (oid, lfs) = match &meta.physical_address {
        PhysicalAddress::Linked(_) => {
            let pointer = pointer::render(&meta.checksum, meta.size);
            let oid = Oid::hash_object("blob", &pointer).to_hex();
            (Some(oid), Some(LfsInfo { oid: meta.checksum.clone(), size: meta.size }))
        }
        PhysicalAddress::Inline => {
            let bytes = vstore.get_object(repo_key, revision, &meta.path).await?;
            (Some(Oid::hash_object("blob", &bytes).to_hex()), None)
        }
    };

    Ok(TreeEntry { path: meta.path, entry_type: EntryType::File, size: meta.size, oid, lfs })
}

/// Lists one page of `path`'s contents at `revision` (spec §4.6).
///
/// `path` empty means the repo root. When `recursive` is false, a path
/// two or more segments below `path` collapses into a single
/// [`EntryType::Directory`] entry rather than one row per descendant
/// file — [`VersionedStore::list_objects`] only ever yields files, so
/// this function is what actually synthesizes directory rows.
pub async fn list_tree(
    vstore: &dyn VersionedStore,
    repo_key: &str,
    revision: &str,
    path: &str,
    recursive: bool,
    after: Option<&str>,
    limit: usize,
) -> Result<(Vec<TreeEntry>, Option<String>)> {
    let prefix = if path.is_empty() { String::new() } else { format!("{}/", path.trim_matches('/')) };

    let mut matching = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let Page { items, next_cursor } = vstore.list_objects(repo_key, revision, cursor.as_deref(), 1000).await?;
        let exhausted = next_cursor.is_none();
        for meta in items {
            if meta.path.starts_with(&prefix) {
                cursor = Some(meta.path.clone());
                matching.push(meta);
            } else {
                cursor = Some(meta.path.clone());
            }
        }
        if exhausted {
            break;
        }
    }

    // One row per direct child: a bare file, or the collapsed name of a
    // subdirectory the first time one of its descendants is seen.
    let mut seen_dirs = std::collections::BTreeSet::new();
    let mut rows: Vec<(String, Option<ObjectMeta>)> = Vec::new();
    for meta in matching {
        let rel = &meta.path[prefix.len()..];
        if rel.is_empty() {
            continue;
        }
        match rel.find('/') {
            Some(idx) if !recursive => {
                let dir_name = &rel[..idx];
                if seen_dirs.insert(dir_name.to_string()) {
                    rows.push((format!("{prefix}{dir_name}"), None));
                }
            }
            _ => rows.push((meta.path.clone(), Some(meta))),
        }
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let start = match after {
        Some(cur) => rows.partition_point(|(p, _)| p.as_str() <= cur),
        None => 0,
    };
    let page = &rows[start..(start + limit).min(rows.len())];

    let mut entries = Vec::with_capacity(page.len());
    for (disp_path, meta) in page {
        entries.push(match meta {
            Some(meta) => to_entry(vstore, repo_key, revision, meta.clone()).await?,
            None => TreeEntry { path: disp_path.clone(), entry_type: EntryType::Directory, size: 0, oid: None, lfs: None },
        });
    }

    let next_cursor = if start + entries.len() < rows.len() { page.last().map(|(p, _)| p.clone()) } else { None };
    Ok((entries, next_cursor))
}

/// Looks up metadata for an explicit list of paths at `revision`, spec
/// §4.6 "paths-info" — unlike `list_tree`, missing paths are simply
/// omitted rather than surfacing an error for the whole batch.
pub async fn paths_info(
    vstore: &dyn VersionedStore,
    repo_key: &str,
    revision: &str,
    paths: &[String],
) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        match vstore.stat_object(repo_key, revision, path).await {
            Ok(meta) => entries.push(to_entry(vstore, repo_key, revision, meta).await?),
            Err(kohakuhub_vstore::VstoreError::PathNotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use kohakuhub_vstore::MemoryVersionedStore;

    async fn seeded() -> (MemoryVersionedStore, String) {
        let vstore = MemoryVersionedStore::new();
        let repo_key = "model/alice/demo".to_string();
        vstore.create_repo(&repo_key).await.unwrap();
        vstore
            .put_object(&repo_key, "main", "dir/a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        vstore
            .put_object(&repo_key, "main", "dir/b.txt", Bytes::from_static(b"world"))
            .await
            .unwrap();
        vstore.commit(&repo_key, "main", "init", None).await.unwrap();
        (vstore, repo_key)
    }

    #[tokio::test]
    async fn recursive_tree_lists_files_with_git_blob_oid() {
        let (vstore, repo_key) = seeded().await;
        let (entries, _) = list_tree(&vstore, &repo_key, "main", "", true, None, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        let a = entries.iter().find(|e| e.path == "dir/a.txt").unwrap();
        assert_eq!(a.oid.as_deref(), Some(Oid::hash_object("blob", b"hello").to_hex().as_str()));
    }

    #[tokio::test]
    async fn non_recursive_root_listing_collapses_subdirectories() {
        let (vstore, repo_key) = seeded().await;
        vstore.put_object(&repo_key, "main", "README.md", Bytes::from_static(b"top level")).await.unwrap();
        vstore.commit(&repo_key, "main", "add readme", None).await.unwrap();

        let (entries, _) = list_tree(&vstore, &repo_key, "main", "", false, None, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        let dir = entries.iter().find(|e| e.path == "dir").unwrap();
        assert_eq!(dir.entry_type, EntryType::Directory);
        let readme = entries.iter().find(|e| e.path == "README.md").unwrap();
        assert_eq!(readme.entry_type, EntryType::File);
    }

    #[tokio::test]
    async fn non_recursive_listing_scopes_to_a_path() {
        let (vstore, repo_key) = seeded().await;
        let (entries, _) = list_tree(&vstore, &repo_key, "main", "dir", false, None, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.entry_type == EntryType::File));
        assert!(entries.iter().any(|e| e.path == "dir/a.txt"));
    }

    #[tokio::test]
    async fn paths_info_skips_missing_paths() {
        let (vstore, repo_key) = seeded().await;
        let result = paths_info(
            &vstore,
            &repo_key,
            "main",
            &["dir/a.txt".to_string(), "does/not/exist".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].path, "dir/a.txt");
    }
}
