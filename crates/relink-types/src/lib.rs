//! Foundation types for relink.
//!
//! Every other relink crate depends on `relink-types`. It defines the
//! content reference used to address chunks and chunk trees, and the chunk
//! geometry shared by the store, the legacy decoders and the manifest.
//!
//! # Key Types
//!
//! - [`ContentRef`] - 32-byte digest identifying a chunk or chunk tree
//! - [`TypeError`] - parse failures for references

pub mod error;
pub mod reference;

pub use error::TypeError;
pub use reference::ContentRef;

/// Maximum payload carried by a single chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Length of the little-endian span prefix on every chunk.
pub const SPAN_SIZE: usize = 8;

/// Length of a [`ContentRef`] in bytes.
pub const REF_SIZE: usize = 32;

/// Number of child references an intermediate chunk can hold.
pub const BRANCHES: usize = CHUNK_SIZE / REF_SIZE;
