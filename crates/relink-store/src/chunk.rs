use relink_types::{ContentRef, CHUNK_SIZE, REF_SIZE, SPAN_SIZE};

use crate::error::{StoreError, StoreResult};

/// Domain-separated BLAKE3 hasher for chunk addresses.
///
/// The domain tag is prepended to every hash computation so that chunk
/// addresses never collide with digests computed for other purposes.
pub struct ChunkHasher {
    domain: &'static str,
}

impl ChunkHasher {
    /// Hasher used for every chunk address.
    pub const CHUNK: Self = Self {
        domain: "relink-chunk-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentRef {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentRef::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected address.
    pub fn verify(&self, data: &[u8], expected: &ContentRef) -> bool {
        self.hash(data) == *expected
    }
}

/// A single stored chunk: `span (u64 LE) || payload`.
///
/// The span is the number of data bytes covered by the chunk. A chunk whose
/// span fits in [`CHUNK_SIZE`] is a data chunk and its payload is the data
/// itself; any larger span marks an intermediate chunk whose payload is a
/// list of child references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    address: ContentRef,
    data: Vec<u8>,
}

impl Chunk {
    /// Build a chunk from a span and payload, computing its address.
    pub fn new(span: u64, payload: &[u8]) -> Self {
        let mut data = Vec::with_capacity(SPAN_SIZE + payload.len());
        data.extend_from_slice(&span.to_le_bytes());
        data.extend_from_slice(payload);
        let address = ChunkHasher::CHUNK.hash(&data);
        Self { address, data }
    }

    /// Wrap bytes received from a backend under the address they were
    /// requested with. Use [`Chunk::verify`] before trusting the contents.
    pub fn from_parts(address: ContentRef, data: Vec<u8>) -> StoreResult<Self> {
        if data.len() < SPAN_SIZE || data.len() > SPAN_SIZE + CHUNK_SIZE {
            return Err(StoreError::InvalidChunk {
                address,
                reason: format!("chunk length {} out of range", data.len()),
            });
        }
        Ok(Self { address, data })
    }

    /// The chunk's content address.
    pub fn address(&self) -> ContentRef {
        self.address
    }

    /// Full chunk bytes, span prefix included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of data bytes covered by this chunk's subtree.
    pub fn span(&self) -> u64 {
        let mut span = [0u8; SPAN_SIZE];
        span.copy_from_slice(&self.data[..SPAN_SIZE]);
        u64::from_le_bytes(span)
    }

    /// Chunk payload without the span prefix.
    pub fn payload(&self) -> &[u8] {
        &self.data[SPAN_SIZE..]
    }

    /// Returns `true` for data chunks, `false` for intermediate chunks.
    pub fn is_data(&self) -> bool {
        self.span() <= CHUNK_SIZE as u64
    }

    /// Child references of an intermediate chunk.
    pub fn children(&self) -> StoreResult<Vec<ContentRef>> {
        let payload = self.payload();
        if self.is_data() || payload.is_empty() || payload.len() % REF_SIZE != 0 {
            return Err(StoreError::InvalidChunk {
                address: self.address,
                reason: format!("payload of {} bytes is not a reference list", payload.len()),
            });
        }
        payload
            .chunks(REF_SIZE)
            .map(|raw| {
                ContentRef::from_slice(raw).map_err(|e| StoreError::InvalidChunk {
                    address: self.address,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Check that the chunk bytes hash to its address.
    pub fn verify(&self) -> StoreResult<()> {
        if ChunkHasher::CHUNK.verify(&self.data, &self.address) {
            Ok(())
        } else {
            Err(StoreError::InvalidChunk {
                address: self.address,
                reason: format!("content hashes to {}", ChunkHasher::CHUNK.hash(&self.data)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_deterministic() {
        let a = Chunk::new(5, b"hello");
        let b = Chunk::new(5, b"hello");
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn span_is_part_of_the_address() {
        let a = Chunk::new(5, b"hello");
        let b = Chunk::new(6, b"hello");
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn span_and_payload_accessors() {
        let chunk = Chunk::new(11, b"hello world");
        assert_eq!(chunk.span(), 11);
        assert_eq!(chunk.payload(), b"hello world");
        assert_eq!(chunk.data().len(), SPAN_SIZE + 11);
        assert!(chunk.is_data());
    }

    #[test]
    fn intermediate_children() {
        let left = Chunk::new(CHUNK_SIZE as u64, &[1u8; CHUNK_SIZE]);
        let right = Chunk::new(3, b"end");
        let mut payload = Vec::new();
        payload.extend_from_slice(left.address().as_bytes());
        payload.extend_from_slice(right.address().as_bytes());
        let parent = Chunk::new(CHUNK_SIZE as u64 + 3, &payload);

        assert!(!parent.is_data());
        assert_eq!(parent.children().unwrap(), vec![left.address(), right.address()]);
    }

    #[test]
    fn data_chunk_has_no_children() {
        let chunk = Chunk::new(3, b"abc");
        assert!(matches!(chunk.children(), Err(StoreError::InvalidChunk { .. })));
    }

    #[test]
    fn verify_detects_tampering() {
        let chunk = Chunk::new(4, b"data");
        assert!(chunk.verify().is_ok());

        let forged = Chunk::from_parts(chunk.address(), Chunk::new(4, b"evil").data().to_vec()).unwrap();
        assert!(matches!(forged.verify(), Err(StoreError::InvalidChunk { .. })));
    }

    #[test]
    fn from_parts_rejects_short_data() {
        let err = Chunk::from_parts(ContentRef::zero(), vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidChunk { .. }));
    }

    #[test]
    fn hasher_differs_from_plain_blake3() {
        let raw = *blake3::hash(b"x").as_bytes();
        assert_ne!(ChunkHasher::CHUNK.hash(b"x").as_bytes(), &raw);
    }
}
