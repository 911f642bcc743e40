//! Shapes shared by every [`crate::VersionedStore`] implementation (spec §4.7).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    File,
    Directory,
}

/// Where an object's bytes actually live. `Inline` means the versioned
/// store itself holds them (the common case for small, non-LFS files);
/// `Linked` points at a content-addressed key in the shared blob bucket
/// (spec §4.1 step 5, `lfsFile`/`copyFile` operations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalAddress {
    Inline,
    Linked(String),
}

#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub path: String,
    pub size: u64,
    pub checksum: String,
    pub path_type: PathType,
    pub physical_address: PhysicalAddress,
}

#[derive(Debug, Clone)]
pub struct CommitMeta {
    pub commit_id: String,
    pub branch: String,
    pub message: String,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub path: String,
    pub change: ChangeType,
}

/// A page of paginated results plus the cursor to pass as `after` for
/// the next page; `None` means this was the last page.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// A branch, tag, or the special `HEAD` pointer, as listed for Git Smart
/// HTTP ref advertisement (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Branch,
    Tag,
}

/// One ref a repository currently has, with the commit id it resolves
/// to (`None` for a branch with no commits yet, e.g. a fresh `main`).
#[derive(Debug, Clone)]
pub struct RefEntry {
    pub kind: RefKind,
    pub name: String,
    pub commit_id: Option<String>,
}
