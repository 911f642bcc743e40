//! Content-addressed dedup key.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// The SHA-256 digest of a file's raw bytes, used as the dedup key across
/// the whole hub: two files with identical content, in any repository,
/// share a `ContentHash` and therefore a single physical blob.
///
/// This is deliberately a different hash than [`crate::Oid`] (git's SHA-1
/// object id over `"<type> <len>\0<content>"`): the two serve different
/// purposes and must not be conflated. A file's `ContentHash` never changes
/// across commits; its `Oid` as a git blob is stable too, but the two ids
/// are computed over different preimages and are not interchangeable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Computes the content hash of `data`.
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Wraps a raw 32-byte digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte digest.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parses a 64-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, crate::TypesError> {
        if s.len() != 64 {
            return Err(crate::TypesError::InvalidContentHash(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| crate::TypesError::InvalidContentHash(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// Renders as a 64-character lowercase hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the content-addressed LFS storage key
    /// `lfs/<oid[0:2]>/<oid[2:4]>/<oid>` for this hash.
    #[must_use]
    pub fn lfs_key(&self) -> String {
        let hex = self.to_hex();
        format!("lfs/{}/{}/{}", &hex[0..2], &hex[2..4], hex)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}…)", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentHash::from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let a = ContentHash::compute(b"same bytes");
        let b = ContentHash::compute(b"same bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_differs() {
        let a = ContentHash::compute(b"a");
        let b = ContentHash::compute(b"b");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrip() {
        let h = ContentHash::compute(b"round trip");
        assert_eq!(ContentHash::from_hex(&h.to_hex()).unwrap(), h);
    }

    #[test]
    fn lfs_key_layout() {
        let h = ContentHash::from_hex(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85",
        )
        .unwrap();
        assert_eq!(
            h.lfs_key(),
            "lfs/e3/b0/e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn debug_truncates() {
        let h = ContentHash::compute(b"x");
        let debug = format!("{h:?}");
        assert!(debug.starts_with("ContentHash("));
        assert!(debug.len() < 40);
    }
}
