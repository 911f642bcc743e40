//! In-memory scratch object store used while synthesizing a pack.

use crate::{GitObject, ObjectType, Result, StorageError};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use kohakuhub_types::Oid;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory, content-addressed cache of git objects.
///
/// `kohakuhub-git` uses one of these per Smart HTTP upload-pack request: as
/// it walks commits synthesized from the versioned store, it materializes
/// each commit/tree/blob into a `GitObject` here so the pack writer can
/// stream them without recomputing ids mid-walk. It is not a persistence
/// layer — nothing here survives past a single request.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: RwLock<HashMap<Oid, GitObject>>,
}

impl ObjectStore {
    /// Creates a new empty object store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object and returns its id.
    pub fn put(&self, object: GitObject) -> Oid {
        let id = object.id;
        self.objects.write().insert(id, object);
        id
    }

    /// Retrieves an object by id.
    pub fn get(&self, id: &Oid) -> Result<GitObject> {
        self.objects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(id.to_hex()))
    }

    /// Checks if an object exists.
    #[must_use]
    pub fn contains(&self, id: &Oid) -> bool {
        self.objects.read().contains_key(id)
    }

    /// Returns the number of objects in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Lists all object ids currently held.
    #[must_use]
    pub fn list_objects(&self) -> Vec<Oid> {
        self.objects.read().keys().copied().collect()
    }

    /// Stores a blob and returns its id.
    pub fn put_blob(&self, content: impl Into<Bytes>) -> Oid {
        self.put(GitObject::blob(content))
    }

    /// Compresses an object into the format git writes to loose objects and
    /// packs: `zlib("<type> <len>\0<content>")`.
    pub fn compress(object: &GitObject) -> Result<Vec<u8>> {
        use std::io::Write;
        let header = format!("{} {}\0", object.object_type.as_str(), object.data.len());
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(header.as_bytes())
            .map_err(|e| StorageError::Compression(e.to_string()))?;
        encoder
            .write_all(&object.data)
            .map_err(|e| StorageError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| StorageError::Compression(e.to_string()))
    }

    /// Reverses [`ObjectStore::compress`].
    pub fn decompress(compressed: &[u8]) -> Result<GitObject> {
        use std::io::Read;
        let mut decoder = ZlibDecoder::new(compressed);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| StorageError::Compression(e.to_string()))?;

        let null_pos = decompressed
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| StorageError::InvalidObject("missing null byte in header".to_string()))?;

        let header = String::from_utf8_lossy(&decompressed[..null_pos]);
        let parts: Vec<&str> = header.split(' ').collect();
        if parts.len() != 2 {
            return Err(StorageError::InvalidObject(format!("invalid header: {header}")));
        }

        let object_type = ObjectType::parse(parts[0])?;
        parts[1]
            .parse::<usize>()
            .map_err(|_| StorageError::InvalidObject("invalid size".to_string()))?;

        let data = Bytes::from(decompressed[null_pos + 1..].to_vec());
        Ok(GitObject::new(object_type, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get_roundtrip() {
        let store = ObjectStore::new();
        let blob = GitObject::blob(b"Hello, World!".to_vec());
        let id = blob.id;
        store.put(blob);
        let retrieved = store.get(&id).unwrap();
        assert_eq!(retrieved.data.as_ref(), b"Hello, World!");
    }

    #[test]
    fn compression_roundtrip() {
        let original = GitObject::blob(b"Hello, World!".to_vec());
        let compressed = ObjectStore::compress(&original).unwrap();
        let decompressed = ObjectStore::decompress(&compressed).unwrap();
        assert_eq!(original.id, decompressed.id);
        assert_eq!(original.object_type, decompressed.object_type);
        assert_eq!(original.data, decompressed.data);
    }

    #[test]
    fn missing_object_errors() {
        let store = ObjectStore::new();
        let bogus = Oid::hash_object("blob", b"never stored");
        assert!(store.get(&bogus).is_err());
        assert!(!store.contains(&bogus));
    }

    #[test]
    fn len_and_is_empty_track_insertions() {
        let store = ObjectStore::new();
        assert!(store.is_empty());
        store.put_blob(b"a".to_vec());
        store.put_blob(b"b".to_vec());
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }
}
