use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use relink_types::ContentRef;

use crate::chunk::Chunk;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ChunkStore, PutOptions};

/// In-memory, HashMap-based chunk store.
///
/// Intended for tests and embedding. Chunks are held behind a `RwLock` for
/// safe concurrent access and cloned on read/write. Pinned writes are
/// recorded so callers can inspect what a run would have retained.
pub struct InMemoryChunkStore {
    chunks: RwLock<HashMap<ContentRef, Vec<u8>>>,
    pins: RwLock<HashSet<ContentRef>>,
}

impl InMemoryChunkStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            pins: RwLock::new(HashSet::new()),
        }
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of pinned chunk addresses.
    pub fn pinned(&self) -> Vec<ContentRef> {
        let pins = self.pins.read().expect("lock poisoned");
        let mut addrs: Vec<ContentRef> = pins.iter().copied().collect();
        addrs.sort();
        addrs
    }

    /// Returns `true` if the chunk was written with `pin` set.
    pub fn is_pinned(&self, address: &ContentRef) -> bool {
        self.pins.read().expect("lock poisoned").contains(address)
    }

    /// Sorted list of all chunk addresses in the store.
    pub fn all_addresses(&self) -> Vec<ContentRef> {
        let map = self.chunks.read().expect("lock poisoned");
        let mut addrs: Vec<ContentRef> = map.keys().copied().collect();
        addrs.sort();
        addrs
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn get(&self, address: &ContentRef) -> StoreResult<Chunk> {
        let data = {
            let map = self.chunks.read().expect("lock poisoned");
            map.get(address).cloned()
        };
        match data {
            Some(data) => Chunk::from_parts(*address, data),
            None => Err(StoreError::NotFound(*address)),
        }
    }

    async fn put(&self, options: PutOptions, chunk: &Chunk) -> StoreResult<ContentRef> {
        let address = chunk.address();
        if address.is_zero() {
            return Err(StoreError::ZeroAddress);
        }
        self.chunks
            .write()
            .expect("lock poisoned")
            .entry(address)
            .or_insert_with(|| chunk.data().to_vec());
        if options.pin {
            self.pins.write().expect("lock poisoned").insert(address);
        }
        Ok(address)
    }

    async fn has(&self, address: &ContentRef) -> StoreResult<bool> {
        Ok(self.chunks.read().expect("lock poisoned").contains_key(address))
    }
}

impl std::fmt::Debug for InMemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChunkStore")
            .field("chunk_count", &self.len())
            .field("pinned", &self.pins.read().expect("lock poisoned").len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn put_then_get() {
        let store = InMemoryChunkStore::new();
        let chunk = Chunk::new(5, b"hello");
        let addr = store.put(PutOptions::default(), &chunk).await.unwrap();
        assert_eq!(addr, chunk.address());

        let read = store.get(&addr).await.unwrap();
        assert_eq!(read, chunk);
        assert!(store.has(&addr).await.unwrap());
    }

    #[tokio::test]
    async fn missing_chunk_is_not_found() {
        let store = InMemoryChunkStore::new();
        let addr = ContentRef::from_hash([3; 32]);
        let err = store.get(&addr).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(a) if a == addr));
        assert!(!store.has(&addr).await.unwrap());
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = InMemoryChunkStore::new();
        let chunk = Chunk::new(3, b"abc");
        store.put(PutOptions::default(), &chunk).await.unwrap();
        store.put(PutOptions::default(), &chunk).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn pins_are_recorded() {
        let store = InMemoryChunkStore::new();
        let plain = Chunk::new(1, b"a");
        let pinned = Chunk::new(1, b"b");
        let opts = PutOptions {
            pin: true,
            encrypt: false,
        };

        store.put(PutOptions::default(), &plain).await.unwrap();
        store.put(opts, &pinned).await.unwrap();

        assert!(!store.is_pinned(&plain.address()));
        assert!(store.is_pinned(&pinned.address()));
        assert_eq!(store.pinned(), vec![pinned.address()]);
    }

    #[tokio::test]
    async fn pinned_rewrite_pins_existing_chunk() {
        let store = InMemoryChunkStore::new();
        let chunk = Chunk::new(1, b"a");
        store.put(PutOptions::default(), &chunk).await.unwrap();
        store
            .put(PutOptions { pin: true, encrypt: false }, &chunk)
            .await
            .unwrap();
        assert!(store.is_pinned(&chunk.address()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_writers() {
        let store = Arc::new(InMemoryChunkStore::new());
        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let chunk = Chunk::new(1, &[i]);
                store.put(PutOptions::default(), &chunk).await.unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.len(), 8);
        assert_eq!(store.all_addresses().len(), 8);
    }

    #[test]
    fn debug_shows_counts() {
        let store = InMemoryChunkStore::new();
        let dbg = format!("{store:?}");
        assert!(dbg.contains("chunk_count"));
    }
}
