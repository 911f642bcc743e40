//! Binary tree object encoding and decoding.
//!
//! A tree object's content is a flat concatenation of entries, each
//! `"<mode> <name>\0"` followed by the entry's 20 raw `Oid` bytes. There
//! are no separators between entries. Entries must be sorted the way git
//! sorts them: by name, except each tree entry's name is compared as if
//! it had a trailing `/` (so `"foo"` the blob sorts before `"foo"` the
//! directory, which git address as `"foo/"`).

use crate::{GitError, Result};
use bytes::{Bytes, BytesMut};
use kohakuhub_storage::GitObject;
use kohakuhub_types::Oid;

/// A single entry in a tree: a named pointer to a blob, subtree, or
/// (rarely) a submodule gitlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// The entry's git file mode, e.g. `100644` for a regular file,
    /// `100755` for an executable, `120000` for a symlink, `40000` for a
    /// subtree, `160000` for a gitlink.
    pub mode: &'static str,
    /// The entry's name within its parent tree (no path separators).
    pub name: String,
    /// The id of the blob or subtree this entry points to.
    pub id: Oid,
}

impl TreeEntry {
    /// A regular file entry.
    #[must_use]
    pub fn file(name: impl Into<String>, id: Oid) -> Self {
        Self {
            mode: "100644",
            name: name.into(),
            id,
        }
    }

    /// An executable file entry.
    #[must_use]
    pub fn executable(name: impl Into<String>, id: Oid) -> Self {
        Self {
            mode: "100755",
            name: name.into(),
            id,
        }
    }

    /// A subtree (directory) entry.
    #[must_use]
    pub fn tree(name: impl Into<String>, id: Oid) -> Self {
        Self {
            mode: "40000",
            name: name.into(),
            id,
        }
    }

    fn is_tree(&self) -> bool {
        self.mode == "40000"
    }

    fn sort_key(&self) -> Vec<u8> {
        let mut key = self.name.as_bytes().to_vec();
        if self.is_tree() {
            key.push(b'/');
        }
        key
    }
}

/// Builds a tree [`GitObject`] from entries, sorting them into git's
/// required order first.
#[must_use]
pub fn build_tree(mut entries: Vec<TreeEntry>) -> GitObject {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut buf = BytesMut::new();
    for entry in &entries {
        buf.extend_from_slice(entry.mode.as_bytes());
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(entry.name.as_bytes());
        buf.extend_from_slice(b"\0");
        buf.extend_from_slice(entry.id.as_bytes());
    }

    GitObject::tree(Bytes::from(buf))
}

/// Parses a tree object's content back into its entries.
pub fn parse_tree(data: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let space = data[pos..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| GitError::InvalidPack("malformed tree entry: missing mode".into()))?;
        let mode_str = std::str::from_utf8(&data[pos..pos + space])
            .map_err(|_| GitError::InvalidPack("non-utf8 tree mode".into()))?;
        let mode: &'static str = match mode_str {
            "100644" => "100644",
            "100755" => "100755",
            "120000" => "120000",
            "40000" => "40000",
            "160000" => "160000",
            other => return Err(GitError::InvalidPack(format!("unknown tree mode: {other}"))),
        };
        pos += space + 1;

        let nul = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| GitError::InvalidPack("malformed tree entry: missing name terminator".into()))?;
        let name = String::from_utf8_lossy(&data[pos..pos + nul]).into_owned();
        pos += nul + 1;

        if pos + 20 > data.len() {
            return Err(GitError::InvalidPack("truncated tree entry id".into()));
        }
        let id = Oid::from_bytes(data[pos..pos + 20].try_into().unwrap());
        pos += 20;

        entries.push(TreeEntry { mode, name, id });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_parse_roundtrip() {
        let blob_id = Oid::hash_object("blob", b"hello\n");
        let entries = vec![
            TreeEntry::file("README.md", blob_id),
            TreeEntry::tree("src", Oid::hash_object("tree", b"")),
        ];
        let tree = build_tree(entries.clone());
        let parsed = parse_tree(&tree.data).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "README.md");
        assert_eq!(parsed[1].name, "src");
    }

    #[test]
    fn blob_sorts_before_samename_directory() {
        let a = TreeEntry::file("foo", Oid::hash_object("blob", b"a"));
        let b = TreeEntry::tree("foo", Oid::hash_object("tree", b""));
        let tree = build_tree(vec![b.clone(), a.clone()]);
        let parsed = parse_tree(&tree.data).unwrap();
        assert_eq!(parsed[0].mode, "100644");
        assert_eq!(parsed[1].mode, "40000");
    }

    #[test]
    fn dotted_name_sorts_before_directory_of_same_prefix() {
        let dotted = TreeEntry::file("lib.rs", Oid::hash_object("blob", b"a"));
        let dir = TreeEntry::tree("lib", Oid::hash_object("tree", b""));
        let tree = build_tree(vec![dir.clone(), dotted.clone()]);
        let parsed = parse_tree(&tree.data).unwrap();
        assert_eq!(parsed[0].name, "lib.rs");
        assert_eq!(parsed[1].name, "lib");
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"99999 x\0");
        buf.extend_from_slice(&[0u8; 20]);
        assert!(parse_tree(&buf).is_err());
    }
}
