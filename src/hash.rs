//! Integrity utilities: CRC-32 for frame payloads, SHA-256 for state
//! fingerprints.
//!
//! The content hash is the bridge between the codec and the protocol: a
//! stream's state hash is the SHA-256 of the canonicalizer's output under the
//! pinned [`CanonOptions::hashing`](crate::CanonOptions::hashing) profile, so
//! "a patch may only be applied to the state it was computed against" reduces
//! to comparing two hashes.
//!
//! ## Usage
//!
//! ```rust
//! use glyph::{content_hash, glyph};
//!
//! let a = glyph!({ "b": 1, "a": 2 });
//! let b = glyph!({ "a": 2, "b": 1 });
//! // Structural equality up to key order means identical fingerprints.
//! assert_eq!(content_hash(&a), content_hash(&b));
//! ```

use crate::{canonicalize_with_options, CanonOptions, Error, Result, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// CRC-32 of a byte slice, as carried in the `crc=` frame attribute.
#[inline]
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// A 32-byte content hash with the `sha256:<64-hex>` text form used by the
/// `base=` frame attribute.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseHash([u8; 32]);

impl BaseHash {
    /// Wraps a raw digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        BaseHash(bytes)
    }

    /// The raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for BaseHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BaseHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseHash({})", self)
    }
}

impl FromStr for BaseHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("sha256:")
            .ok_or_else(|| Error::frame("base hash must name its algorithm (sha256:...)"))?;
        let raw = hex::decode(digits).map_err(|e| Error::frame(format!("invalid base hex: {}", e)))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| Error::frame("base hash must be 32 bytes"))?;
        Ok(BaseHash(bytes))
    }
}

/// SHA-256 fingerprint of a value's canonical form.
///
/// Always computed under the pinned hashing profile (tabular and schema
/// modes off) so both ends of a stream agree regardless of display options.
#[must_use]
pub fn content_hash(value: &Value) -> BaseHash {
    let text = canonicalize_with_options(value, &CanonOptions::hashing());
    let digest = Sha256::digest(text.as_bytes());
    BaseHash(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph;

    #[test]
    fn test_crc32_known_value() {
        // CRC-32 (IEEE) of "123456789".
        assert_eq!(crc32(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn test_base_hash_text_round_trip() {
        let hash = content_hash(&glyph!({ "a": 1 }));
        let text = hash.to_string();
        assert!(text.starts_with("sha256:"));
        assert_eq!(text.len(), "sha256:".len() + 64);
        assert_eq!(BaseHash::from_str(&text).unwrap(), hash);
    }

    #[test]
    fn test_base_hash_rejects_bad_text() {
        assert!(BaseHash::from_str("md5:abcd").is_err());
        assert!(BaseHash::from_str("sha256:zz").is_err());
        assert!(BaseHash::from_str("sha256:abcd").is_err());
    }

    #[test]
    fn test_content_hash_ignores_display_options() {
        // The hash profile is pinned, so values whose *display* differs
        // (tabular vs bracketed) still fingerprint identically.
        let rows = glyph!([{ "id": 1 }, { "id": 2 }, { "id": 3 }]);
        let via_parse = crate::parse(&crate::canonicalize(&rows)).unwrap();
        assert_eq!(content_hash(&rows), content_hash(&via_parse));
    }

    #[test]
    fn test_content_hash_changes_with_state() {
        let a = glyph!({ "n": 1 });
        let b = glyph!({ "n": 2 });
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
