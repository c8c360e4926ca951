use std::io;
use std::path::PathBuf;

/// Errors produced by the chunk index and the exporter.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The source is not a chunk index directory.
    #[error("invalid source {}: {reason}", path.display())]
    InvalidSource { path: PathBuf, reason: String },

    /// A record in the index log failed its length or CRC check.
    #[error("index corrupted at offset {offset}: {reason}")]
    IndexCorrupted { offset: u64, reason: String },

    #[error("index is opened read-only")]
    ReadOnly,

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type ExportResult<T> = Result<T, ExportError>;
