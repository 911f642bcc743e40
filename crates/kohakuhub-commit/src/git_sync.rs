//! Bridges versioned-store content into synthesized git objects for the
//! Smart HTTP server (spec §4.3): turns each ref's current snapshot into
//! a blob/tree/commit graph inside a request-scoped [`ObjectStore`], the
//! way `kohakuhub_git::upload_pack` expects to find them.

use crate::error::Result;
use crate::pointer;
use bytes::Bytes;
use kohakuhub_git::{build_tree, RefAdvertisement, TreeEntry as GitTreeEntry};
use kohakuhub_storage::{GitObject, ObjectStore};
use kohakuhub_types::Oid;
use kohakuhub_vstore::{ObjectMeta, PhysicalAddress, RefKind, VersionedStore};
use std::collections::{BTreeMap, HashMap};

/// Username substituted for a commit whose author row can't be found
/// (e.g. the author's account was since deleted). Keeps commit synthesis
/// total rather than failing the whole clone over one missing join.
const UNKNOWN_AUTHOR: &str = "unknown";

/// Size at which a synthesized git blob is rendered as an LFS pointer
/// instead of the file's real bytes, independent of a repository's
/// commit-time LFS threshold (`EffectiveLfsConfig`): a file can be
/// small enough to have been committed inline yet still too large to
/// usefully inline into a synthesized tree.
const LFS_POINTER_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// Synthesizes one git commit per ref the repository currently has,
/// returning the populated object store plus everything `advertise_refs`
/// needs: the chosen `HEAD` commit and the sorted-by-caller-not-required
/// advertisement list.
///
/// `commit_authors` maps versioned-store commit id to the author's
/// username (spec §4.3: `"<username> <noreply@hub.local> <unix-ts>
/// +0000"`) — the versioned store's own `CommitMeta` carries no author,
/// authorship lives in `kohakuhub-db`'s `commits` table, so callers with
/// a `Db` handle should populate this from `Db::list_commit_authors`
/// before calling in.
///
/// Each synthesized commit is a single root commit over its ref's full
/// current snapshot — the versioned store's own commit DAG (spec §4.7)
/// isn't translated into a parallel git ancestry, so history exposed
/// over Smart HTTP is "what this ref looks like right now", not a real
/// past. That is enough to satisfy `git clone`/`git fetch`, which is all
/// [`kohakuhub_git`] implements (it has no `receive-pack` support to push
/// history back into either graph).
pub async fn sync_repo(
    vstore: &dyn VersionedStore,
    repo_key: &str,
    commit_authors: &HashMap<String, String>,
) -> Result<(ObjectStore, Option<Oid>, Vec<RefAdvertisement>)> {
    let store = ObjectStore::new();
    let refs = vstore.list_refs(repo_key).await?;

    let mut advertisements = Vec::with_capacity(refs.len());
    for r in &refs {
        let Some(commit_id) = &r.commit_id else {
            continue; // a branch with no commits yet has nothing to advertise
        };
        let full_name = match r.kind {
            RefKind::Branch => format!("refs/heads/{}", r.name),
            RefKind::Tag => format!("refs/tags/{}", r.name),
        };
        let author = commit_authors.get(commit_id).map(String::as_str).unwrap_or(UNKNOWN_AUTHOR);
        let commit_oid = sync_commit(vstore, &store, repo_key, commit_id, author).await?;
        advertisements.push(RefAdvertisement { id: commit_oid, name: full_name });
    }

    let head = advertisements
        .iter()
        .find(|a| a.name == "refs/heads/main")
        .map(|a| a.id)
        .or_else(|| {
            let mut heads: Vec<&RefAdvertisement> =
                advertisements.iter().filter(|a| a.name.starts_with("refs/heads/")).collect();
            heads.sort_by(|a, b| a.name.cmp(&b.name));
            heads.first().map(|a| a.id)
        });

    Ok((store, head, advertisements))
}

async fn sync_commit(
    vstore: &dyn VersionedStore,
    store: &ObjectStore,
    repo_key: &str,
    commit_id: &str,
    author: &str,
) -> Result<Oid> {
    let meta = vstore.get_commit(repo_key, commit_id).await?;

    let mut files = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let page = vstore.list_objects(repo_key, commit_id, after.as_deref(), 1000).await?;
        let exhausted = page.next_cursor.is_none();
        after = page.next_cursor;
        files.extend(page.items);
        if exhausted {
            break;
        }
    }

    let root_id = build_directory_tree(vstore, store, repo_key, commit_id, files).await?;

    let timestamp = meta.created_at.timestamp();
    let identity = format!("{author} <noreply@hub.local> {timestamp} +0000");
    let message = match meta.description.as_deref() {
        Some(desc) if !desc.is_empty() => format!("{}\n\n{desc}\n", meta.message),
        _ => format!("{}\n", meta.message),
    };
    let commit = GitObject::commit(&root_id, &[], &identity, &identity, &message);
    Ok(store.put(commit))
}

/// A flat file list, nested back into directories the way git trees
/// require, keyed by path component so sibling entries land under the
/// same subtree regardless of listing order.
enum Node {
    File(Oid),
    Dir(BTreeMap<String, Node>),
}

async fn build_directory_tree(
    vstore: &dyn VersionedStore,
    store: &ObjectStore,
    repo_key: &str,
    reference: &str,
    files: Vec<ObjectMeta>,
) -> Result<Oid> {
    let mut root: BTreeMap<String, Node> = BTreeMap::new();
    let mut has_gitattributes = false;
    let mut lfs_extensions: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

    for meta in &files {
        if meta.path == ".gitattributes" {
            has_gitattributes = true;
        }
        if renders_as_lfs_pointer(meta) {
            if let Some(ext) = meta.path.rsplit('.').next().filter(|e| *e != meta.path) {
                lfs_extensions.insert(ext.to_string());
            }
        }
    }

    for meta in files {
        let blob_id = blob_id_for(vstore, store, repo_key, reference, &meta).await?;
        insert_path(&mut root, &meta.path, blob_id);
    }

    if !has_gitattributes && !lfs_extensions.is_empty() {
        let attrs = synthesize_gitattributes(&lfs_extensions);
        let blob_id = store.put_blob(Bytes::from(attrs));
        insert_path(&mut root, ".gitattributes", blob_id);
    }

    Ok(materialize(store, root))
}

/// Renders the root `.gitattributes` that marks every extension seen on
/// an LFS-linked path as LFS-filtered (spec §4.3), so a client that
/// clones over Smart HTTP knows to fetch those blobs through LFS rather
/// than treat the pointer text as the real file content.
fn synthesize_gitattributes(extensions: &std::collections::BTreeSet<String>) -> Vec<u8> {
    let mut out = String::new();
    for ext in extensions {
        out.push_str(&format!("*.{ext} filter=lfs diff=lfs merge=lfs -text\n"));
    }
    out.into_bytes()
}

/// Whether `meta` should be rendered as an LFS pointer blob rather than
/// its real bytes: either it's already linked to external storage, or
/// it's large enough that inlining it into the synthesized tree isn't
/// worthwhile even though it was small enough to commit inline.
fn renders_as_lfs_pointer(meta: &ObjectMeta) -> bool {
    meta.size >= LFS_POINTER_THRESHOLD_BYTES || matches!(meta.physical_address, PhysicalAddress::Linked(_))
}

async fn blob_id_for(
    vstore: &dyn VersionedStore,
    store: &ObjectStore,
    repo_key: &str,
    reference: &str,
    meta: &ObjectMeta,
) -> Result<Oid> {
    let bytes: Bytes = if renders_as_lfs_pointer(meta) {
        Bytes::from(pointer::render(&meta.checksum, meta.size))
    } else {
        vstore.get_object(repo_key, reference, &meta.path).await?
    };
    Ok(store.put_blob(bytes))
}

fn insert_path(dir: &mut BTreeMap<String, Node>, path: &str, blob_id: Oid) {
    let components: Vec<&str> = path.split('/').collect();
    insert_components(dir, &components, blob_id);
}

fn insert_components(dir: &mut BTreeMap<String, Node>, components: &[&str], blob_id: Oid) {
    match components {
        [] => {}
        [name] => {
            dir.insert((*name).to_string(), Node::File(blob_id));
        }
        [name, rest @ ..] => {
            let entry = dir.entry((*name).to_string()).or_insert_with(|| Node::Dir(BTreeMap::new()));
            if let Node::Dir(subdir) = entry {
                insert_components(subdir, rest, blob_id);
            }
        }
    }
}

fn materialize(store: &ObjectStore, dir: BTreeMap<String, Node>) -> Oid {
    let mut entries = Vec::with_capacity(dir.len());
    for (name, node) in dir {
        match node {
            Node::File(blob_id) => entries.push(GitTreeEntry::file(name, blob_id)),
            Node::Dir(sub) => {
                let sub_id = materialize(store, sub);
                entries.push(GitTreeEntry::tree(name, sub_id));
            }
        }
    }
    store.put(build_tree(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kohakuhub_vstore::MemoryVersionedStore;

    async fn seeded() -> (MemoryVersionedStore, String, String) {
        let vstore = MemoryVersionedStore::new();
        let repo_key = "model/alice/demo".to_string();
        vstore.create_repo(&repo_key).await.unwrap();
        vstore
            .put_object(&repo_key, "main", "README.md", Bytes::from_static(b"hello\n"))
            .await
            .unwrap();
        vstore
            .put_object(&repo_key, "main", "src/lib.rs", Bytes::from_static(b"fn main() {}\n"))
            .await
            .unwrap();
        let commit = vstore.commit(&repo_key, "main", "init", None).await.unwrap();
        (vstore, repo_key, commit.commit_id)
    }

    #[tokio::test]
    async fn synthesizes_a_commit_reachable_from_head() {
        let (vstore, repo_key, commit_id) = seeded().await;
        let authors = HashMap::from([(commit_id, "alice".to_string())]);
        let (store, head, refs) = sync_repo(&vstore, &repo_key, &authors).await.unwrap();

        let head = head.expect("main has a commit");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "refs/heads/main");
        assert_eq!(refs[0].id, head);

        let commit = store.get(&head).unwrap();
        assert_eq!(commit.object_type, kohakuhub_storage::ObjectType::Commit);
        let text = String::from_utf8_lossy(&commit.data);
        assert!(text.contains("init"));
        assert!(text.contains("author alice <noreply@hub.local>"));

        let tree_line = text.lines().next().unwrap();
        let tree_id = Oid::from_hex(tree_line.strip_prefix("tree ").unwrap()).unwrap();
        let tree = store.get(&tree_id).unwrap();
        let entries = kohakuhub_git::parse_tree(&tree.data).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.name == "README.md" && e.mode == "100644"));
        assert!(entries.iter().any(|e| e.name == "src" && e.mode == "40000"));
    }

    #[tokio::test]
    async fn lfs_linked_files_synthesize_to_their_pointer_blob() {
        let (vstore, repo_key, _) = seeded().await;
        vstore
            .link_physical_address(
                &repo_key,
                "main",
                "weights.bin",
                PhysicalAddress::Linked("lfs/ab/cd/abcd".to_string()),
                "abcd",
                1024,
            )
            .await
            .unwrap();
        vstore.commit(&repo_key, "main", "add weights", None).await.unwrap();

        let (store, head, _) = sync_repo(&vstore, &repo_key, &HashMap::new()).await.unwrap();
        let head = head.unwrap();
        let commit = store.get(&head).unwrap();
        let text = String::from_utf8_lossy(&commit.data);
        let tree_id = Oid::from_hex(text.lines().next().unwrap().strip_prefix("tree ").unwrap()).unwrap();
        let entries = kohakuhub_git::parse_tree(&store.get(&tree_id).unwrap().data).unwrap();
        let weights = entries.iter().find(|e| e.name == "weights.bin").unwrap();

        let expected_blob = GitObject::blob(pointer::render("abcd", 1024));
        assert_eq!(weights.id, expected_blob.id);
        assert!(store.contains(&weights.id));
    }

    #[tokio::test]
    async fn synthesizes_gitattributes_for_lfs_extensions() {
        let (vstore, repo_key, _) = seeded().await;
        vstore
            .link_physical_address(
                &repo_key,
                "main",
                "weights.bin",
                PhysicalAddress::Linked("lfs/ab/cd/abcd".to_string()),
                "abcd",
                1024,
            )
            .await
            .unwrap();
        vstore.commit(&repo_key, "main", "add weights", None).await.unwrap();

        let (store, head, _) = sync_repo(&vstore, &repo_key, &HashMap::new()).await.unwrap();
        let head = head.unwrap();
        let commit = store.get(&head).unwrap();
        let text = String::from_utf8_lossy(&commit.data);
        let tree_id = Oid::from_hex(text.lines().next().unwrap().strip_prefix("tree ").unwrap()).unwrap();
        let entries = kohakuhub_git::parse_tree(&store.get(&tree_id).unwrap().data).unwrap();
        let attrs_entry = entries.iter().find(|e| e.name == ".gitattributes").unwrap();
        let attrs = store.get(&attrs_entry.id).unwrap();
        assert_eq!(
            String::from_utf8_lossy(&attrs.data),
            "*.bin filter=lfs diff=lfs merge=lfs -text\n"
        );
    }

    #[tokio::test]
    async fn existing_gitattributes_is_not_overwritten() {
        let (vstore, repo_key, _) = seeded().await;
        vstore
            .put_object(&repo_key, "main", ".gitattributes", Bytes::from_static(b"custom\n"))
            .await
            .unwrap();
        vstore
            .link_physical_address(
                &repo_key,
                "main",
                "weights.bin",
                PhysicalAddress::Linked("lfs/ab/cd/abcd".to_string()),
                "abcd",
                1024,
            )
            .await
            .unwrap();
        vstore.commit(&repo_key, "main", "add weights", None).await.unwrap();

        let (store, head, _) = sync_repo(&vstore, &repo_key, &HashMap::new()).await.unwrap();
        let head = head.unwrap();
        let commit = store.get(&head).unwrap();
        let text = String::from_utf8_lossy(&commit.data);
        let tree_id = Oid::from_hex(text.lines().next().unwrap().strip_prefix("tree ").unwrap()).unwrap();
        let entries = kohakuhub_git::parse_tree(&store.get(&tree_id).unwrap().data).unwrap();
        let attrs_entry = entries.iter().find(|e| e.name == ".gitattributes").unwrap();
        let attrs = store.get(&attrs_entry.id).unwrap();
        assert_eq!(String::from_utf8_lossy(&attrs.data), "custom\n");
    }

    #[tokio::test]
    async fn empty_branch_is_not_advertised() {
        let vstore = MemoryVersionedStore::new();
        vstore.create_repo("model/alice/fresh").await.unwrap();
        let (_, head, refs) = sync_repo(&vstore, "model/alice/fresh", &HashMap::new()).await.unwrap();
        assert!(head.is_none());
        assert!(refs.is_empty());
    }

    #[tokio::test]
    async fn head_prefers_main_over_other_branches() {
        let (vstore, repo_key, _) = seeded().await;
        vstore.create_branch(&repo_key, "dev", "main").await.unwrap();
        vstore.put_object(&repo_key, "dev", "extra.txt", Bytes::from_static(b"x")).await.unwrap();
        vstore.commit(&repo_key, "dev", "dev work", None).await.unwrap();

        let (_, head, refs) = sync_repo(&vstore, &repo_key, &HashMap::new()).await.unwrap();
        let main_oid = refs.iter().find(|r| r.name == "refs/heads/main").unwrap().id;
        assert_eq!(head, Some(main_oid));
    }
}
