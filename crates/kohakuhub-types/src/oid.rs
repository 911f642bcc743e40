//! Git object identifiers.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;

/// A git object id: the 20-byte SHA-1 hash of a git object's header + content.
///
/// This is distinct from [`crate::ContentHash`], which is the SHA-256 key
/// used for cross-repository blob deduplication. Two different files with
/// identical bytes dedup to the same `ContentHash`; the same bytes committed
/// as a git blob in two different repositories still hash to the same `Oid`,
/// since `Oid` only depends on the object's type and content, never its
/// location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid([u8; 20]);

impl Oid {
    /// The all-zero id git uses to mean "no object" (e.g. the old-oid of a
    /// branch-create command, or an empty repository's `HEAD` advertisement).
    pub const ZERO: Oid = Oid([0u8; 20]);

    /// Wraps a raw 20-byte digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 20-byte digest.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parses a 40-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, crate::TypesError> {
        if s.len() != 40 {
            return Err(crate::TypesError::InvalidOid(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| crate::TypesError::InvalidOid(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// Renders as a 40-character lowercase hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns true if this is the all-zero sentinel id.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Computes the id of a git object given its type tag and raw content,
    /// hashing `"<type> <len>\0<content>"` the way `git hash-object` does.
    #[must_use]
    pub fn hash_object(object_type: &str, content: &[u8]) -> Self {
        let header = format!("{object_type} {}\0", content.len());
        let mut hasher = Sha1::new();
        hasher.update(header.as_bytes());
        hasher.update(content);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Oid::from_hex(&s).map_err(de::Error::custom)
    }
}

impl TryFrom<&[u8]> for Oid {
    type Error = crate::TypesError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 20] = value
            .try_into()
            .map_err(|_| crate::TypesError::InvalidOid(hex::encode(value)))?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_object_matches_known_git_blob_sha1() {
        assert_eq!(
            Oid::hash_object("blob", b"hello\n").to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
        assert_eq!(
            Oid::hash_object("blob", b"").to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn hex_roundtrip() {
        let oid = Oid::hash_object("blob", b"round trip");
        let hex = oid.to_hex();
        assert_eq!(Oid::from_hex(&hex).unwrap(), oid);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(Oid::from_hex("not-hex").is_err());
        assert!(Oid::from_hex("abcd").is_err());
    }

    #[test]
    fn zero_is_zero() {
        assert!(Oid::ZERO.is_zero());
        assert!(!Oid::hash_object("blob", b"x").is_zero());
    }

    #[test]
    fn serde_roundtrip() {
        let oid = Oid::hash_object("blob", b"serde");
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, format!("\"{}\"", oid.to_hex()));
        let back: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
    }
}
