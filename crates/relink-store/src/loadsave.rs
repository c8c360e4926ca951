use std::sync::Arc;

use relink_types::{ContentRef, BRANCHES, CHUNK_SIZE};
use tracing::trace;

use crate::chunk::Chunk;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ChunkStore, PutOptions};

/// Saves byte blobs as chunk trees and loads them back.
///
/// Saving splits the blob into [`CHUNK_SIZE`] data chunks and then builds
/// intermediate levels of up to [`BRANCHES`] references each until a single
/// root remains. Loading walks the tree left to right and verifies every
/// chunk against its address.
#[derive(Clone)]
pub struct LoadSave {
    store: Arc<dyn ChunkStore>,
    options: PutOptions,
}

impl LoadSave {
    /// Create a load/save handle writing with the given options.
    pub fn new(store: Arc<dyn ChunkStore>, options: PutOptions) -> Self {
        Self { store, options }
    }

    /// The options applied to every write.
    pub fn options(&self) -> PutOptions {
        self.options
    }

    /// The underlying chunk store.
    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Split `data` into a chunk tree and return its root reference.
    pub async fn save(&self, data: &[u8]) -> StoreResult<ContentRef> {
        if data.is_empty() {
            return self.store.put(self.options, &Chunk::new(0, &[])).await;
        }

        let mut level = Vec::with_capacity(data.len().div_ceil(CHUNK_SIZE));
        for piece in data.chunks(CHUNK_SIZE) {
            let chunk = Chunk::new(piece.len() as u64, piece);
            let address = self.store.put(self.options, &chunk).await?;
            level.push((address, piece.len() as u64));
        }

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(BRANCHES));
            for group in level.chunks(BRANCHES) {
                // A lone trailing reference moves up as-is; wrapping it could
                // produce an intermediate chunk with a data-sized span.
                if group.len() == 1 {
                    next.push(group[0]);
                    continue;
                }
                let span: u64 = group.iter().map(|(_, span)| span).sum();
                let mut payload = Vec::with_capacity(group.len() * relink_types::REF_SIZE);
                for (address, _) in group {
                    payload.extend_from_slice(address.as_bytes());
                }
                let chunk = Chunk::new(span, &payload);
                let address = self.store.put(self.options, &chunk).await?;
                next.push((address, span));
            }
            level = next;
        }

        let (root, span) = level[0];
        trace!(%root, span, "saved chunk tree");
        Ok(root)
    }

    /// Join the chunk tree rooted at `root` into a byte vector.
    pub async fn load(&self, root: &ContentRef) -> StoreResult<Vec<u8>> {
        self.join(root, None).await
    }

    /// Join the chunk tree rooted at `root`, failing with
    /// [`StoreError::LimitExceeded`] if it holds more than `limit` bytes.
    ///
    /// The span is checked on the root chunk before any further chunk is
    /// fetched.
    pub async fn load_limited(&self, root: &ContentRef, limit: usize) -> StoreResult<Vec<u8>> {
        self.join(root, Some(limit)).await
    }

    async fn fetch(&self, address: &ContentRef) -> StoreResult<Chunk> {
        let chunk = self.store.get(address).await?;
        chunk.verify()?;
        Ok(chunk)
    }

    async fn join(&self, root: &ContentRef, limit: Option<usize>) -> StoreResult<Vec<u8>> {
        let root_chunk = self.fetch(root).await?;
        let total = root_chunk.span();
        if let Some(limit) = limit {
            if total > limit as u64 {
                return Err(StoreError::LimitExceeded { limit, size: total });
            }
        }

        // The span is unverified until the whole tree is joined.
        let reserve = total.min((CHUNK_SIZE * BRANCHES) as u64);
        let mut out = Vec::with_capacity(usize::try_from(reserve).unwrap_or(0));
        let mut pending = Vec::new();
        expand(root_chunk, &mut pending, &mut out)?;
        while let Some((address, ceiling)) = pending.pop() {
            let chunk = self.fetch(&address).await?;
            if chunk.span() > ceiling {
                return Err(StoreError::InvalidChunk {
                    address,
                    reason: format!(
                        "span {} exceeds the {ceiling} bytes its parent allows",
                        chunk.span()
                    ),
                });
            }
            expand(chunk, &mut pending, &mut out)?;
            if out.len() as u64 > total {
                break;
            }
        }

        if out.len() as u64 != total {
            return Err(StoreError::InvalidChunk {
                address: *root,
                reason: format!("tree spans {total} bytes but joined {}", out.len()),
            });
        }
        Ok(out)
    }
}

/// Largest span a child of an intermediate chunk with `span` may cover,
/// or `None` when no tree of [`BRANCHES`]-wide levels reaches `span`.
fn child_capacity(span: u64) -> Option<u64> {
    let mut capacity = CHUNK_SIZE as u64;
    loop {
        let level = capacity.checked_mul(BRANCHES as u64)?;
        if span <= level {
            return Some(capacity);
        }
        capacity = level;
    }
}

/// Append a data chunk's payload to `out`, or queue an intermediate chunk's
/// children so that they pop in left-to-right order.
fn expand(
    chunk: Chunk,
    pending: &mut Vec<(ContentRef, u64)>,
    out: &mut Vec<u8>,
) -> StoreResult<()> {
    if chunk.is_data() {
        if chunk.payload().len() as u64 != chunk.span() {
            return Err(StoreError::InvalidChunk {
                address: chunk.address(),
                reason: format!(
                    "data chunk spans {} bytes but carries {}",
                    chunk.span(),
                    chunk.payload().len()
                ),
            });
        }
        out.extend_from_slice(chunk.payload());
        return Ok(());
    }
    let children = chunk.children()?;
    let capacity = child_capacity(chunk.span())
        .and_then(|per_child| per_child.checked_mul(children.len() as u64).map(|all| (per_child, all)));
    let per_child = match capacity {
        Some((per_child, all)) if chunk.span() <= all => per_child,
        _ => {
            return Err(StoreError::InvalidChunk {
                address: chunk.address(),
                reason: format!(
                    "span {} cannot be covered by {} children",
                    chunk.span(),
                    children.len()
                ),
            })
        }
    };
    pending.extend(children.into_iter().rev().map(|child| (child, per_child)));
    Ok(())
}

impl std::fmt::Debug for LoadSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSave")
            .field("options", &self.options)
            .finish()
    }
}
