use async_trait::async_trait;
use relink_types::ContentRef;

use crate::chunk::Chunk;
use crate::error::StoreResult;

/// Options passed through to the backend on every write.
///
/// The store layer never interprets these; they describe how the backend
/// should retain (`pin`) or protect (`encrypt`) the written content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Ask the backend to exclude the chunk from garbage collection.
    pub pin: bool,
    /// Ask the backend to encrypt the upload.
    pub encrypt: bool,
}

/// Content-addressed chunk store.
///
/// All implementations must satisfy these invariants:
/// - Chunks are immutable once written. The same bytes always produce the
///   same address.
/// - `get` returns [`StoreError::NotFound`](crate::StoreError::NotFound)
///   for unknown addresses rather than an empty chunk.
/// - Concurrent calls are safe: a reader task and a writer task may share
///   one store.
/// - All transport errors are propagated, never silently ignored.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Read a chunk by address.
    async fn get(&self, address: &ContentRef) -> StoreResult<Chunk>;

    /// Write a chunk and return its address.
    ///
    /// Writing a chunk that already exists is a no-op apart from applying
    /// `options` (a later pinned write pins an existing chunk).
    async fn put(&self, options: PutOptions, chunk: &Chunk) -> StoreResult<ContentRef>;

    /// Check whether a chunk exists.
    async fn has(&self, address: &ContentRef) -> StoreResult<bool>;
}
