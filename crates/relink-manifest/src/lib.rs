//! The current manifest format.
//!
//! A manifest maps paths to content references plus a small metadata map.
//! It is persisted as one JSON node per directory, much like a tree object:
//!
//! ```text
//! top node     {"root": {...}, "entries": [a.txt, b.jpeg, c/]}
//!   c/         {"entries": [d.tar, f/]}
//!     c/f/     {"entries": [g.txt]}
//! ```
//!
//! The top node also carries the root entry (path `/`), which holds the
//! site settings and a zero reference.
//!
//! [`Manifest`] accumulates entries and writes them in one go;
//! [`ManifestReader`] resolves paths against a stored manifest.

pub mod builder;
pub mod error;
pub mod keys;
pub mod node;
pub mod reader;

pub use builder::Manifest;
pub use error::{ManifestError, ManifestResult};
pub use node::{ManifestEntry, ManifestNode, NodeEntry, NodeKind};
pub use reader::ManifestReader;
