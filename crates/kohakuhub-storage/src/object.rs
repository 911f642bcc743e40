//! Git object types and constructors.

use bytes::Bytes;
use kohakuhub_types::Oid;

/// Git object kind, as it appears in an object's header and in a pack's
/// type/size varint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit object.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectType {
    /// Returns the string representation used in a git object header.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses an object type from its header string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            other => Err(crate::StorageError::InvalidObject(format!(
                "unknown object type: {other}"
            ))),
        }
    }

    /// Returns the type code used in the pack file varint header.
    #[must_use]
    pub fn pack_type(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
        }
    }

    /// Parses an object type from a pack file type code.
    pub fn from_pack_type(code: u8) -> crate::Result<Self> {
        match code {
            1 => Ok(Self::Commit),
            2 => Ok(Self::Tree),
            3 => Ok(Self::Blob),
            4 => Ok(Self::Tag),
            other => Err(crate::StorageError::InvalidObject(format!(
                "unknown pack type code: {other}"
            ))),
        }
    }
}

/// A git object (blob, tree, commit, or tag) held in memory, uncompressed.
#[derive(Debug, Clone)]
pub struct GitObject {
    /// The object's id (SHA-1 hash of its header + content).
    pub id: Oid,
    /// The type of object.
    pub object_type: ObjectType,
    /// The raw object content (without the `"<type> <len>\0"` header).
    pub data: Bytes,
}

impl GitObject {
    /// Creates a new git object, computing its id from the content.
    #[must_use]
    pub fn new(object_type: ObjectType, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = Oid::hash_object(object_type.as_str(), &data);
        Self {
            id,
            object_type,
            data,
        }
    }

    /// Creates a blob object from file content.
    #[must_use]
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::new(ObjectType::Blob, content)
    }

    /// Creates a tree object from pre-sorted, pre-encoded tree entry bytes.
    ///
    /// Callers are responsible for producing entries already sorted in
    /// git's tree order (see `kohakuhub_git::tree`), since the tree's
    /// `Oid` depends on that exact byte layout.
    #[must_use]
    pub fn tree(entries: impl Into<Bytes>) -> Self {
        Self::new(ObjectType::Tree, entries)
    }

    /// Creates a commit object in git's text format.
    #[must_use]
    pub fn commit(tree_id: &Oid, parents: &[Oid], author: &str, committer: &str, message: &str) -> Self {
        let mut content = format!("tree {tree_id}\n");
        for parent in parents {
            content.push_str(&format!("parent {parent}\n"));
        }
        content.push_str(&format!("author {author}\n"));
        content.push_str(&format!("committer {committer}\n"));
        content.push_str(&format!("\n{message}"));
        Self::new(ObjectType::Commit, content.into_bytes())
    }

    /// Returns the size of the object's content, in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_hash_matches_known_git_sha1() {
        let obj = GitObject::blob(b"hello\n".to_vec());
        assert_eq!(obj.id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn empty_blob_hash() {
        let obj = GitObject::blob(b"".to_vec());
        assert_eq!(obj.size(), 0);
        assert_eq!(obj.id.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn object_type_roundtrips_through_header_string() {
        for ot in [ObjectType::Blob, ObjectType::Tree, ObjectType::Commit, ObjectType::Tag] {
            assert_eq!(ObjectType::parse(ot.as_str()).unwrap(), ot);
        }
    }

    #[test]
    fn object_type_roundtrips_through_pack_code() {
        for ot in [ObjectType::Commit, ObjectType::Tree, ObjectType::Blob, ObjectType::Tag] {
            assert_eq!(ObjectType::from_pack_type(ot.pack_type()).unwrap(), ot);
        }
    }

    #[test]
    fn rejects_unknown_type_and_code() {
        assert!(ObjectType::parse("widget").is_err());
        assert!(ObjectType::from_pack_type(0).is_err());
        assert!(ObjectType::from_pack_type(5).is_err());
    }

    #[test]
    fn commit_without_parents_omits_parent_line() {
        let tree_id = Oid::hash_object("tree", b"");
        let obj = GitObject::commit(&tree_id, &[], "a <a@x> 0 +0000", "a <a@x> 0 +0000", "msg");
        let content = String::from_utf8_lossy(&obj.data);
        assert!(!content.contains("parent"));
    }

    #[test]
    fn commit_with_two_parents_lists_both_in_order() {
        let tree_id = Oid::hash_object("tree", b"");
        let p1 = Oid::hash_object("commit", b"one");
        let p2 = Oid::hash_object("commit", b"two");
        let obj = GitObject::commit(&tree_id, &[p1, p2], "a <a@x>", "a <a@x>", "merge");
        let content = String::from_utf8_lossy(&obj.data);
        let p1_pos = content.find(&format!("parent {p1}")).unwrap();
        let p2_pos = content.find(&format!("parent {p2}")).unwrap();
        assert!(p1_pos < p2_pos);
    }
}
