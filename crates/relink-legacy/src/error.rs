/// Errors from decoding legacy records.
#[derive(Debug, thiserror::Error)]
pub enum LegacyError {
    /// Entry record has the wrong length.
    #[error("malformed entry: expected {expected} bytes, got {actual}")]
    MalformedEntry { expected: usize, actual: usize },

    /// Metadata blob is not valid JSON of the expected shape.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// A record is larger than the layout allows.
    #[error("{what} of {size} bytes exceeds the {limit} byte limit")]
    Oversized {
        what: &'static str,
        size: u64,
        limit: usize,
    },

    /// Trie node bytes could not be decoded or violate the trie structure.
    #[error("malformed trie node: {0}")]
    MalformedNode(String),

    /// No node exists at the requested path.
    #[error("path not found in legacy trie: {0}")]
    PathNotFound(String),

    /// Encoding a record failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for legacy decoding.
pub type LegacyResult<T> = Result<T, LegacyError>;
