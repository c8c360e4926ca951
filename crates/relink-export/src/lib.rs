//! Export of a local chunk index.
//!
//! The [`ChunkIndex`] is an append-only, checksummed record log kept in a
//! directory next to a node's data. [`export`] streams every record into a
//! tar archive, in address order, behind a version marker entry:
//!
//! ```text
//! .swarm-export-version   "1"
//! 00a1...                 chunk bytes
//! 03f7...                 chunk bytes
//! ```

pub mod error;
pub mod exporter;
pub mod index;
pub mod progress;

pub use error::{ExportError, ExportResult};
pub use exporter::{export, ExportConfig, ExportSummary, CURRENT_VERSION, DEFAULT_DESTINATION, VERSION_ENTRY};
pub use index::{ChunkIndex, IndexRecord, OpenMode, INDEX_FILE};
pub use progress::{ExportProgress, NoopProgress};
