use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::REF_SIZE;

/// Content-addressed reference to a chunk or a chunk tree.
///
/// A `ContentRef` is produced by the store when data is written and is the
/// only handle used to read it back. Equality is byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentRef([u8; REF_SIZE]);

impl ContentRef {
    /// Wrap a pre-computed digest.
    pub const fn from_hash(hash: [u8; REF_SIZE]) -> Self {
        Self(hash)
    }

    /// The zero reference (all zeros). Marks "no content", e.g. on the
    /// manifest root entry.
    pub const fn zero() -> Self {
        Self([0u8; REF_SIZE])
    }

    /// Returns `true` if this is the zero reference.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; REF_SIZE]
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; REF_SIZE] {
        &self.0
    }

    /// Build a reference from a slice that must be exactly [`REF_SIZE`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; REF_SIZE] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: REF_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentRef({})", self.short_hex())
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; REF_SIZE]> for ContentRef {
    fn from(bytes: [u8; REF_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ContentRef {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
