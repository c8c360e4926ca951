//! Readers for content written in the legacy layout.
//!
//! Legacy uploads wrap every file in an *entry*: a fixed 64-byte record that
//! points at the file's data tree and at a separate JSON metadata blob.
//! Directories are a path trie whose leaves point at such entries, with the
//! site settings (index and error documents) kept on the node at `/`.
//!
//! ```text
//! entry -> content reference -> file bytes
//!       |
//!       |-> metadata reference -> {"filename": .., "mimetype": ..}
//! ```
//!
//! Everything here is pure decoding; fetching bytes from a store is left to
//! the caller.

pub mod entry;
pub mod error;
pub mod node;

pub use entry::{LegacyEntry, Metadata, ENTRY_SIZE};
pub use error::{LegacyError, LegacyResult};
pub use node::{Fork, LegacyNode, Walker, MAX_DEPTH};
