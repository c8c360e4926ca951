//! Content-addressed chunk storage for relink.
//!
//! All data relink reads or writes lives in a chunk store: fixed-size chunks
//! addressed by the BLAKE3 hash of their bytes. Larger blobs are split into a
//! tree of chunks whose root reference stands for the whole blob.
//!
//! # Backends
//!
//! All backends implement the [`ChunkStore`] trait:
//!
//! - [`InMemoryChunkStore`] -- `HashMap`-based store for tests and embedding
//! - [`HttpChunkStore`] -- remote node reached over its `/chunks` API
//!
//! # Blobs
//!
//! [`LoadSave`] sits on top of a backend and turns byte blobs into chunk
//! trees and back. Its bounded reader ([`LoadSave::load_limited`]) refuses to
//! join more than a fixed number of bytes.
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written (content-addressing guarantees this).
//! 2. Every chunk read back through [`LoadSave`] is verified against its address.
//! 3. Concurrent reads and writes are safe; backends synchronise internally.
//! 4. Put options (pin, encrypt) are passed through to the backend untouched.

pub mod chunk;
pub mod error;
pub mod http;
pub mod loadsave;
pub mod memory;
pub mod traits;

pub use chunk::{Chunk, ChunkHasher};
pub use error::{StoreError, StoreResult};
pub use http::{ApiConfig, HttpChunkStore};
pub use loadsave::LoadSave;
pub use memory::InMemoryChunkStore;
pub use traits::{ChunkStore, PutOptions};
