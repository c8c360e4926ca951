//! Repair of legacy uploads.
//!
//! A [`Repairer`] reads content written in the legacy layout and rebuilds it
//! as a current manifest, reusing every content reference as-is. Nothing is
//! re-chunked; only entries, metadata and directory structure are rewritten.
//!
//! # Entry points
//!
//! - [`Repairer::file_repair`] -- one legacy entry becomes a manifest with a
//!   single file that is also the site's index document.
//! - [`Repairer::directory_repair`] -- a legacy trie is walked by a producer
//!   task while the caller's task adds every file to the new manifest.
//!
//! Both take a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and report one progress message per migrated file.

pub mod config;
pub mod error;
pub mod progress;
pub mod repairer;

#[cfg(test)]
mod testutil;

pub use config::RepairConfig;
pub use error::{RepairError, RepairResult};
pub use progress::{NoopUpdater, ProgressUpdater};
pub use repairer::{PathEntry, Repairer};
