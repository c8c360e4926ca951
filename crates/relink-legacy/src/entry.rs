use relink_types::{ContentRef, CHUNK_SIZE, REF_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{LegacyError, LegacyResult};

/// Size of an encoded [`LegacyEntry`].
pub const ENTRY_SIZE: usize = 2 * REF_SIZE;

/// A legacy file entry: the file's data tree plus its metadata blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LegacyEntry {
    reference: ContentRef,
    metadata: ContentRef,
}

impl LegacyEntry {
    pub fn new(reference: ContentRef, metadata: ContentRef) -> Self {
        Self {
            reference,
            metadata,
        }
    }

    /// Root of the file's data tree.
    pub fn reference(&self) -> ContentRef {
        self.reference
    }

    /// Root of the metadata blob.
    pub fn metadata(&self) -> ContentRef {
        self.metadata
    }

    /// Decode the fixed `reference || metadata` layout.
    pub fn decode(bytes: &[u8]) -> LegacyResult<Self> {
        if bytes.len() != ENTRY_SIZE {
            return Err(LegacyError::MalformedEntry {
                expected: ENTRY_SIZE,
                actual: bytes.len(),
            });
        }
        let (reference, metadata) = bytes.split_at(REF_SIZE);
        // Both halves are exactly REF_SIZE after the length check.
        let reference = ContentRef::from_slice(reference).map_err(|_| LegacyError::MalformedEntry {
            expected: ENTRY_SIZE,
            actual: bytes.len(),
        })?;
        let metadata = ContentRef::from_slice(metadata).map_err(|_| LegacyError::MalformedEntry {
            expected: ENTRY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self {
            reference,
            metadata,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENTRY_SIZE);
        out.extend_from_slice(self.reference.as_bytes());
        out.extend_from_slice(self.metadata.as_bytes());
        out
    }
}

/// Metadata blob attached to a legacy entry.
///
/// Unknown fields are ignored on decode; a missing MIME type decodes as an
/// empty string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub filename: String,
    #[serde(rename = "mimetype", default)]
    pub mime_type: String,
}

impl Metadata {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Decode a metadata blob. Blobs larger than one chunk are rejected.
    pub fn decode(bytes: &[u8]) -> LegacyResult<Self> {
        if bytes.len() > CHUNK_SIZE {
            return Err(LegacyError::Oversized {
                what: "metadata",
                size: bytes.len() as u64,
                limit: CHUNK_SIZE,
            });
        }
        serde_json::from_slice(bytes).map_err(|e| LegacyError::MalformedMetadata(e.to_string()))
    }

    pub fn encode(&self) -> LegacyResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LegacyError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> LegacyEntry {
        LegacyEntry::new(ContentRef::from_hash([1; 32]), ContentRef::from_hash([2; 32]))
    }

    #[test]
    fn entry_layout() {
        let bytes = sample_entry().encode();
        assert_eq!(bytes.len(), ENTRY_SIZE);
        assert_eq!(&bytes[..32], &[1u8; 32]);
        assert_eq!(&bytes[32..], &[2u8; 32]);
    }

    #[test]
    fn entry_decode_is_pure() {
        let bytes = sample_entry().encode();
        let first = LegacyEntry::decode(&bytes).unwrap();
        let second = LegacyEntry::decode(&bytes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, sample_entry());
    }

    #[test]
    fn entry_rejects_short_record() {
        let err = LegacyEntry::decode(&[0u8; 32]).unwrap_err();
        assert!(matches!(
            err,
            LegacyError::MalformedEntry {
                expected: 64,
                actual: 32
            }
        ));
    }

    #[test]
    fn entry_rejects_long_record() {
        // encrypted references doubled the record size; not supported
        let err = LegacyEntry::decode(&[0u8; 128]).unwrap_err();
        assert!(matches!(err, LegacyError::MalformedEntry { actual: 128, .. }));
    }

    #[test]
    fn metadata_decodes_wire_names() {
        let raw = br#"{"filename":"simple.txt","mimetype":"text/plain; charset=utf-8"}"#;
        let m = Metadata::decode(raw).unwrap();
        assert_eq!(m.filename, "simple.txt");
        assert_eq!(m.mime_type, "text/plain; charset=utf-8");
    }

    #[test]
    fn metadata_ignores_extension_fields() {
        let raw = br#"{"filename":"a.tar","mimetype":"application/x-tar","size":10,"created":1}"#;
        let m = Metadata::decode(raw).unwrap();
        assert_eq!(m, Metadata::new("a.tar", "application/x-tar"));
    }

    #[test]
    fn metadata_without_mime_type() {
        let m = Metadata::decode(br#"{"filename":"x"}"#).unwrap();
        assert_eq!(m.mime_type, "");
    }

    #[test]
    fn metadata_rejects_garbage() {
        let err = Metadata::decode(b"not json").unwrap_err();
        assert!(matches!(err, LegacyError::MalformedMetadata(_)));
    }

    #[test]
    fn metadata_rejects_missing_filename() {
        let err = Metadata::decode(br#"{"mimetype":"text/plain"}"#).unwrap_err();
        assert!(matches!(err, LegacyError::MalformedMetadata(_)));
    }

    #[test]
    fn metadata_rejects_oversized_blob() {
        let big = format!(r#"{{"filename":"{}"}}"#, "a".repeat(CHUNK_SIZE));
        let err = Metadata::decode(big.as_bytes()).unwrap_err();
        assert!(matches!(err, LegacyError::Oversized { what: "metadata", .. }));
    }

    #[test]
    fn metadata_encode_uses_wire_names() {
        let bytes = Metadata::new("b.jpeg", "image/jpeg").encode().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["filename"], "b.jpeg");
        assert_eq!(json["mimetype"], "image/jpeg");
    }
}
