//! An in-process [`VersionedStore`] test double: a single-node, in-memory
//! stand-in for a LakeFS-like backend, sufficient for unit tests and for
//! running the hub without an external versioned-store dependency.

use crate::types::{
    ChangeType, CommitMeta, DiffEntry, ObjectMeta, Page, PathType, PhysicalAddress, RefEntry, RefKind,
};
use crate::{Result, VersionedStore, VstoreError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use kohakuhub_types::ContentHash;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
struct CommitRecord {
    meta: CommitMeta,
    snapshot: Arc<HashMap<String, ObjectMeta>>,
    blobs: Arc<HashMap<String, Bytes>>,
}

#[derive(Clone, Default)]
struct Staging {
    base_commit: Option<String>,
    snapshot: HashMap<String, ObjectMeta>,
    blobs: HashMap<String, Bytes>,
}

#[derive(Default)]
struct RepoState {
    branches: HashMap<String, Option<String>>,
    tags: HashMap<String, String>,
    commits: HashMap<String, CommitRecord>,
    staging: HashMap<String, Staging>,
    next_commit_seq: u64,
}

impl RepoState {
    fn resolve_ref(&self, reference: &str) -> Result<Option<String>> {
        if let Some(tip) = self.branches.get(reference) {
            return Ok(tip.clone());
        }
        if let Some(commit_id) = self.tags.get(reference) {
            return Ok(Some(commit_id.clone()));
        }
        if self.commits.contains_key(reference) {
            return Ok(Some(reference.to_string()));
        }
        Err(VstoreError::RefNotFound(reference.to_string()))
    }

    fn snapshot_at(&self, reference: &str) -> Result<Arc<HashMap<String, ObjectMeta>>> {
        match self.resolve_ref(reference)? {
            Some(commit_id) => Ok(self
                .commits
                .get(&commit_id)
                .map(|c| c.snapshot.clone())
                .unwrap_or_default()),
            None => Ok(Arc::new(HashMap::new())),
        }
    }

    fn blobs_at(&self, reference: &str) -> Result<Arc<HashMap<String, Bytes>>> {
        match self.resolve_ref(reference)? {
            Some(commit_id) => Ok(self
                .commits
                .get(&commit_id)
                .map(|c| c.blobs.clone())
                .unwrap_or_default()),
            None => Ok(Arc::new(HashMap::new())),
        }
    }

    fn staging_for(&mut self, branch: &str) -> Result<&mut Staging> {
        if !self.branches.contains_key(branch) {
            return Err(VstoreError::RefNotFound(branch.to_string()));
        }
        if !self.staging.contains_key(branch) {
            let base_commit = self.branches.get(branch).cloned().flatten();
            let snapshot = self.snapshot_at(branch)?.as_ref().clone();
            let blobs = self.blobs_at(branch)?.as_ref().clone();
            self.staging.insert(
                branch.to_string(),
                Staging { base_commit, snapshot, blobs },
            );
        }
        Ok(self.staging.get_mut(branch).unwrap())
    }
}

/// An in-memory [`VersionedStore`].
#[derive(Default)]
pub struct MemoryVersionedStore {
    repos: RwLock<HashMap<String, RepoState>>,
}

impl MemoryVersionedStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionedStore for MemoryVersionedStore {
    async fn create_repo(&self, repo_key: &str) -> Result<()> {
        let mut repos = self.repos.write();
        repos.entry(repo_key.to_string()).or_insert_with(|| {
            let mut state = RepoState::default();
            state.branches.insert("main".to_string(), None);
            state
        });
        Ok(())
    }

    async fn delete_repo(&self, repo_key: &str) -> Result<()> {
        self.repos.write().remove(repo_key);
        Ok(())
    }

    async fn list_refs(&self, repo_key: &str) -> Result<Vec<RefEntry>> {
        let repos = self.repos.read();
        let repo = repos.get(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let mut refs: Vec<RefEntry> = repo
            .branches
            .iter()
            .map(|(name, tip)| RefEntry { kind: RefKind::Branch, name: name.clone(), commit_id: tip.clone() })
            .collect();
        refs.extend(repo.tags.iter().map(|(name, tip)| RefEntry {
            kind: RefKind::Tag,
            name: name.clone(),
            commit_id: Some(tip.clone()),
        }));
        Ok(refs)
    }

    async fn list_objects(
        &self,
        repo_key: &str,
        reference: &str,
        after: Option<&str>,
        amount: usize,
    ) -> Result<Page<ObjectMeta>> {
        let repos = self.repos.read();
        let repo = repos.get(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let snapshot = repo.snapshot_at(reference)?;
        let mut paths: Vec<&String> = snapshot.keys().collect();
        paths.sort();
        let start = match after {
            Some(cursor) => paths.partition_point(|p| p.as_str() <= cursor),
            None => 0,
        };
        let page: Vec<ObjectMeta> = paths[start..]
            .iter()
            .take(amount)
            .map(|p| snapshot.get(*p).unwrap().clone())
            .collect();
        let next_cursor = if start + page.len() < paths.len() {
            page.last().map(|o| o.path.clone())
        } else {
            None
        };
        Ok(Page { items: page, next_cursor })
    }

    async fn stat_object(&self, repo_key: &str, reference: &str, path: &str) -> Result<ObjectMeta> {
        let repos = self.repos.read();
        let repo = repos.get(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let snapshot = repo.snapshot_at(reference)?;
        snapshot.get(path).cloned().ok_or_else(|| VstoreError::PathNotFound(path.to_string()))
    }

    async fn get_object(&self, repo_key: &str, reference: &str, path: &str) -> Result<Bytes> {
        let repos = self.repos.read();
        let repo = repos.get(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let snapshot = repo.snapshot_at(reference)?;
        let meta = snapshot.get(path).ok_or_else(|| VstoreError::PathNotFound(path.to_string()))?;
        if meta.physical_address != PhysicalAddress::Inline {
            return Err(VstoreError::NotInline(path.to_string()));
        }
        let blobs = repo.blobs_at(reference)?;
        blobs.get(path).cloned().ok_or_else(|| VstoreError::PathNotFound(path.to_string()))
    }

    async fn put_object(&self, repo_key: &str, branch: &str, path: &str, bytes: Bytes) -> Result<ObjectMeta> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let checksum = ContentHash::compute(&bytes).to_hex();
        let meta = ObjectMeta {
            path: path.to_string(),
            size: bytes.len() as u64,
            checksum,
            path_type: PathType::File,
            physical_address: PhysicalAddress::Inline,
        };
        let staging = repo.staging_for(branch)?;
        staging.snapshot.insert(path.to_string(), meta.clone());
        staging.blobs.insert(path.to_string(), bytes);
        Ok(meta)
    }

    async fn link_physical_address(
        &self,
        repo_key: &str,
        branch: &str,
        path: &str,
        physical_address: PhysicalAddress,
        checksum: &str,
        size: u64,
    ) -> Result<()> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let meta = ObjectMeta {
            path: path.to_string(),
            size,
            checksum: checksum.to_string(),
            path_type: PathType::File,
            physical_address,
        };
        let staging = repo.staging_for(branch)?;
        staging.snapshot.insert(path.to_string(), meta);
        staging.blobs.remove(path);
        Ok(())
    }

    async fn delete_object(&self, repo_key: &str, branch: &str, path: &str) -> Result<()> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let staging = repo.staging_for(branch)?;
        staging.snapshot.remove(path);
        staging.blobs.remove(path);
        Ok(())
    }

    async fn commit(
        &self,
        repo_key: &str,
        branch: &str,
        message: &str,
        description: Option<&str>,
    ) -> Result<CommitMeta> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        if !repo.branches.contains_key(branch) {
            return Err(VstoreError::RefNotFound(branch.to_string()));
        }
        let current_tip = repo.branches.get(branch).cloned().flatten();
        let Some(staging) = repo.staging.remove(branch) else {
            // Nothing staged: a no-op commit still gets a new DB row
            // upstream, but the versioned store has nothing new to record.
            return Err(VstoreError::Conflict(format!("no staged changes on {branch}")));
        };
        if staging.base_commit != current_tip {
            // Someone else committed on this branch since we started
            // staging; restore nothing (staging already removed) and let
            // the caller re-stage against the new tip.
            return Err(VstoreError::Conflict(branch.to_string()));
        }

        repo.next_commit_seq += 1;
        let commit_id = format!("{:012x}", repo.next_commit_seq);
        let meta = CommitMeta {
            commit_id: commit_id.clone(),
            branch: branch.to_string(),
            message: message.to_string(),
            description: description.map(str::to_string),
            parent: current_tip,
            created_at: Utc::now(),
        };
        repo.commits.insert(
            commit_id.clone(),
            CommitRecord {
                meta: meta.clone(),
                snapshot: Arc::new(staging.snapshot),
                blobs: Arc::new(staging.blobs),
            },
        );
        repo.branches.insert(branch.to_string(), Some(commit_id));
        Ok(meta)
    }

    async fn get_commit(&self, repo_key: &str, commit_id: &str) -> Result<CommitMeta> {
        let repos = self.repos.read();
        let repo = repos.get(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        repo.commits
            .get(commit_id)
            .map(|c| c.meta.clone())
            .ok_or_else(|| VstoreError::CommitNotFound(commit_id.to_string()))
    }

    async fn list_commits(
        &self,
        repo_key: &str,
        branch: &str,
        after: Option<&str>,
        amount: usize,
    ) -> Result<Page<CommitMeta>> {
        let repos = self.repos.read();
        let repo = repos.get(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let mut chain = Vec::new();
        let mut cursor = repo.branches.get(branch).cloned().flatten();
        while let Some(commit_id) = cursor {
            let Some(record) = repo.commits.get(&commit_id) else { break };
            chain.push(record.meta.clone());
            cursor = record.meta.parent.clone();
        }
        let start = match after {
            Some(after_id) => chain.iter().position(|c| c.commit_id == after_id).map(|i| i + 1).unwrap_or(chain.len()),
            None => 0,
        };
        let items: Vec<CommitMeta> = chain[start..].iter().take(amount).cloned().collect();
        let next_cursor = if start + items.len() < chain.len() {
            items.last().map(|c| c.commit_id.clone())
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }

    async fn diff(&self, repo_key: &str, left: &str, right: &str) -> Result<Vec<DiffEntry>> {
        let repos = self.repos.read();
        let repo = repos.get(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        let left_snapshot = repo.snapshot_at(left)?;
        let right_snapshot = repo.snapshot_at(right)?;
        let mut entries = Vec::new();
        for (path, right_meta) in right_snapshot.iter() {
            match left_snapshot.get(path) {
                None => entries.push(DiffEntry { path: path.clone(), change: ChangeType::Added }),
                Some(left_meta) if left_meta.checksum != right_meta.checksum => {
                    entries.push(DiffEntry { path: path.clone(), change: ChangeType::Modified })
                }
                _ => {}
            }
        }
        for path in left_snapshot.keys() {
            if !right_snapshot.contains_key(path) {
                entries.push(DiffEntry { path: path.clone(), change: ChangeType::Removed });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn create_branch(&self, repo_key: &str, branch: &str, source_ref: &str) -> Result<()> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        if repo.branches.contains_key(branch) {
            return Err(VstoreError::RefAlreadyExists(branch.to_string()));
        }
        let tip = repo.resolve_ref(source_ref)?;
        repo.branches.insert(branch.to_string(), tip);
        Ok(())
    }

    async fn delete_branch(&self, repo_key: &str, branch: &str) -> Result<()> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        repo.branches
            .remove(branch)
            .map(|_| ())
            .ok_or_else(|| VstoreError::RefNotFound(branch.to_string()))?;
        repo.staging.remove(branch);
        Ok(())
    }

    async fn create_tag(&self, repo_key: &str, tag: &str, source_ref: &str) -> Result<()> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        if repo.tags.contains_key(tag) {
            return Err(VstoreError::RefAlreadyExists(tag.to_string()));
        }
        let tip = repo
            .resolve_ref(source_ref)?
            .ok_or_else(|| VstoreError::RefNotFound(format!("{source_ref} has no commits yet")))?;
        repo.tags.insert(tag.to_string(), tip);
        Ok(())
    }

    async fn delete_tag(&self, repo_key: &str, tag: &str) -> Result<()> {
        let mut repos = self.repos.write();
        let repo = repos.get_mut(repo_key).ok_or_else(|| VstoreError::RepoNotFound(repo_key.to_string()))?;
        // Tags are immutable once created, but deleting the ref entirely
        // (not reassigning it) is still permitted.
        repo.tags
            .remove(tag)
            .map(|_| ())
            .ok_or_else(|| VstoreError::RefNotFound(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_commit_is_visible_on_branch() {
        let store = MemoryVersionedStore::new();
        store.create_repo("models/alice/demo").await.unwrap();
        store
            .put_object("models/alice/demo", "main", "README.md", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        let commit = store
            .commit("models/alice/demo", "main", "initial commit", None)
            .await
            .unwrap();
        assert!(commit.parent.is_none());

        let meta = store.stat_object("models/alice/demo", "main", "README.md").await.unwrap();
        assert_eq!(meta.size, 2);
        let bytes = store.get_object("models/alice/demo", "main", "README.md").await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn committing_with_nothing_freshly_staged_conflicts() {
        let store = MemoryVersionedStore::new();
        store.create_repo("models/alice/demo").await.unwrap();
        store
            .put_object("models/alice/demo", "main", "a.txt", Bytes::from_static(b"a"))
            .await
            .unwrap();
        store.commit("models/alice/demo", "main", "first", None).await.unwrap();

        // Nothing was staged since the last commit consumed it; a second
        // commit call has nothing new to publish and must not silently
        // produce a duplicate commit.
        assert!(matches!(
            store.commit("models/alice/demo", "main", "second", None).await,
            Err(VstoreError::Conflict(_))
        ));

        // Staging a fresh write against the current tip and committing
        // again succeeds normally.
        store
            .put_object("models/alice/demo", "main", "b.txt", Bytes::from_static(b"b"))
            .await
            .unwrap();
        let second = store.commit("models/alice/demo", "main", "second", None).await.unwrap();
        assert_eq!(second.parent.as_deref(), Some("000000000001"));
    }

    #[tokio::test]
    async fn linked_object_is_not_fetchable_inline() {
        let store = MemoryVersionedStore::new();
        store.create_repo("models/alice/demo").await.unwrap();
        store
            .link_physical_address(
                "models/alice/demo",
                "main",
                "weights.bin",
                PhysicalAddress::Linked("lfs/ab/cd/abcd".to_string()),
                "abcd",
                1024,
            )
            .await
            .unwrap();
        store.commit("models/alice/demo", "main", "link lfs file", None).await.unwrap();

        let meta = store.stat_object("models/alice/demo", "main", "weights.bin").await.unwrap();
        assert_eq!(meta.physical_address, PhysicalAddress::Linked("lfs/ab/cd/abcd".to_string()));
        assert!(matches!(
            store.get_object("models/alice/demo", "main", "weights.bin").await,
            Err(VstoreError::NotInline(_))
        ));
    }

    #[tokio::test]
    async fn diff_reports_added_modified_removed() {
        let store = MemoryVersionedStore::new();
        store.create_repo("models/alice/demo").await.unwrap();
        store.put_object("models/alice/demo", "main", "a.txt", Bytes::from_static(b"1")).await.unwrap();
        store.put_object("models/alice/demo", "main", "b.txt", Bytes::from_static(b"1")).await.unwrap();
        let c1 = store.commit("models/alice/demo", "main", "c1", None).await.unwrap();

        store.put_object("models/alice/demo", "main", "a.txt", Bytes::from_static(b"2")).await.unwrap();
        store.delete_object("models/alice/demo", "main", "b.txt").await.unwrap();
        store.put_object("models/alice/demo", "main", "c.txt", Bytes::from_static(b"3")).await.unwrap();
        let c2 = store.commit("models/alice/demo", "main", "c2", None).await.unwrap();

        let diff = store.diff("models/alice/demo", &c1.commit_id, &c2.commit_id).await.unwrap();
        assert_eq!(diff.len(), 3);
        assert!(diff.iter().any(|e| e.path == "a.txt" && e.change == ChangeType::Modified));
        assert!(diff.iter().any(|e| e.path == "b.txt" && e.change == ChangeType::Removed));
        assert!(diff.iter().any(|e| e.path == "c.txt" && e.change == ChangeType::Added));
    }

    #[tokio::test]
    async fn tags_are_immutable_once_created() {
        let store = MemoryVersionedStore::new();
        store.create_repo("models/alice/demo").await.unwrap();
        store.put_object("models/alice/demo", "main", "a.txt", Bytes::from_static(b"1")).await.unwrap();
        store.commit("models/alice/demo", "main", "c1", None).await.unwrap();
        store.create_tag("models/alice/demo", "v1", "main").await.unwrap();
        assert!(matches!(
            store.create_tag("models/alice/demo", "v1", "main").await,
            Err(VstoreError::RefAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn list_refs_returns_every_branch_and_tag() {
        let store = MemoryVersionedStore::new();
        store.create_repo("models/alice/demo").await.unwrap();

        let refs = store.list_refs("models/alice/demo").await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, RefKind::Branch);
        assert_eq!(refs[0].name, "main");
        assert_eq!(refs[0].commit_id, None);

        store.put_object("models/alice/demo", "main", "a.txt", Bytes::from_static(b"1")).await.unwrap();
        let commit = store.commit("models/alice/demo", "main", "c1", None).await.unwrap();
        store.create_branch("models/alice/demo", "dev", "main").await.unwrap();
        store.create_tag("models/alice/demo", "v1", "main").await.unwrap();

        let mut refs = store.list_refs("models/alice/demo").await.unwrap();
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(refs.len(), 3);

        let dev = refs.iter().find(|r| r.name == "dev").unwrap();
        assert_eq!(dev.kind, RefKind::Branch);
        assert_eq!(dev.commit_id.as_deref(), Some(commit.commit_id.as_str()));

        let main = refs.iter().find(|r| r.name == "main").unwrap();
        assert_eq!(main.kind, RefKind::Branch);
        assert_eq!(main.commit_id.as_deref(), Some(commit.commit_id.as_str()));

        let tag = refs.iter().find(|r| r.name == "v1").unwrap();
        assert_eq!(tag.kind, RefKind::Tag);
        assert_eq!(tag.commit_id.as_deref(), Some(commit.commit_id.as_str()));
    }
}
