use relink_legacy::LegacyError;
use relink_manifest::ManifestError;
use relink_store::StoreError;

/// Errors surfaced by a repair.
#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error("legacy decode error: {0}")]
    Legacy(#[from] LegacyError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// The caller cancelled the repair before it finished.
    #[error("repair cancelled")]
    Cancelled,

    #[error("legacy path is not valid UTF-8: {0:?}")]
    InvalidPath(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The walk task ended abnormally.
    #[error("walk task failed: {0}")]
    Task(String),
}

impl RepairError {
    /// `true` when the repair stopped because it was cancelled, as opposed
    /// to failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type RepairResult<T> = Result<T, RepairError>;
