use relink_store::StoreError;

/// Errors from building or reading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("duplicate path: {0}")]
    DuplicatePath(String),

    /// A file would sit where a directory already is, or the reverse.
    #[error("path {path} conflicts with existing {existing}")]
    PathConflict { path: String, existing: String },

    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("path not found in manifest: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type ManifestResult<T> = Result<T, ManifestError>;
