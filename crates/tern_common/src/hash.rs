//! Content and structural hashing for change detection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3, used as a source fingerprint.
///
/// Two source files with the same `ContentHash` are assumed to have identical
/// content. Any byte-level edit, including comments and whitespace, changes it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A 256-bit digest of a compiled type's externally observable shape.
///
/// Only ever compared for equality. Edits that do not change what other units
/// can observe (method bodies, debug data) leave it unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructuralHash([u8; 32]);

impl StructuralHash {
    /// Wraps a finished 32-byte digest.
    pub fn new(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for StructuralHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for StructuralHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StructuralHash({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_deterministic() {
        let a = ContentHash::from_bytes(b"class A {}");
        let b = ContentHash::from_bytes(b"class A {}");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_sees_comment_edits() {
        let a = ContentHash::from_bytes(b"class A {}");
        let b = ContentHash::from_bytes(b"class A {} // note");
        assert_ne!(a, b);
    }

    #[test]
    fn content_hash_display_is_hex() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn structural_hash_display_and_debug() {
        let h = StructuralHash::new([0xab; 32]);
        assert_eq!(format!("{h}").len(), 64);
        assert_eq!(format!("{h:?}"), "StructuralHash(abababab..)");
        assert_eq!(h.as_bytes()[31], 0xab);
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::from_bytes(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);

        let s = StructuralHash::new([7; 32]);
        let json = serde_json::to_string(&s).unwrap();
        let back: StructuralHash = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
