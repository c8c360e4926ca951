use relink_types::ContentRef;

/// Errors from chunk store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested chunk was not found.
    #[error("chunk not found: {0}")]
    NotFound(ContentRef),

    /// Chunk bytes do not hash to the requested address, or the chunk
    /// structure is inconsistent.
    #[error("invalid chunk {address}: {reason}")]
    InvalidChunk { address: ContentRef, reason: String },

    /// A bounded read would exceed its byte ceiling.
    #[error("content of {size} bytes exceeds read limit of {limit} bytes")]
    LimitExceeded { limit: usize, size: u64 },

    /// The remote node rejected or failed a request.
    #[error("remote store error: {0}")]
    Remote(String),

    /// Transport failure talking to a remote node.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Attempted to write a chunk with a zero address.
    #[error("cannot store chunk with zero address")]
    ZeroAddress,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
