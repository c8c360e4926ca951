//! Manifest builder.
//!
//! The [`Manifest`] keeps a `BTreeMap<String, ManifestEntry>` of file paths
//! and turns it into directory nodes only when [`Manifest::store`] is called.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use relink_store::LoadSave;
use relink_types::ContentRef;
use tracing::{debug, trace};

use crate::error::{ManifestError, ManifestResult};
use crate::keys::ROOT_PATH;
use crate::node::{ManifestEntry, ManifestNode, NodeEntry, NodeKind};

/// Accumulates path entries for a new manifest.
///
/// Insertion order does not matter; paths are unique. The manifest is owned
/// by a single builder and consumed by [`store`](Self::store).
pub struct Manifest {
    loadsave: LoadSave,
    /// Entry at [`ROOT_PATH`], written onto the top node.
    root: Option<ManifestEntry>,
    /// File entries keyed by full path.
    entries: BTreeMap<String, ManifestEntry>,
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest")
            .field("root", &self.root)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Manifest {
    /// Create an empty manifest persisted through `loadsave`.
    pub fn new(loadsave: LoadSave) -> Self {
        Self {
            loadsave,
            root: None,
            entries: BTreeMap::new(),
        }
    }

    /// Number of file entries (the root entry is not counted).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> Option<&ManifestEntry> {
        self.root.as_ref()
    }

    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        if path == ROOT_PATH {
            return self.root.as_ref();
        }
        self.entries.get(path)
    }

    /// Add an entry at `path`.
    ///
    /// `"/"` sets the root entry. Any other path must be relative with
    /// non-empty segments. Adding a path twice is a
    /// [`DuplicatePath`](ManifestError::DuplicatePath) error, and a file
    /// cannot share its path with a directory.
    pub fn add(
        &mut self,
        path: &str,
        reference: ContentRef,
        metadata: BTreeMap<String, String>,
    ) -> ManifestResult<()> {
        let entry = ManifestEntry::new(reference, metadata);
        if path == ROOT_PATH {
            if self.root.is_some() {
                return Err(ManifestError::DuplicatePath(path.to_string()));
            }
            self.root = Some(entry);
            return Ok(());
        }

        validate_path(path)?;
        if self.entries.contains_key(path) {
            return Err(ManifestError::DuplicatePath(path.to_string()));
        }
        // An ancestor directory must not already be a file.
        for (i, _) in path.match_indices('/') {
            let ancestor = &path[..i];
            if self.entries.contains_key(ancestor) {
                return Err(ManifestError::PathConflict {
                    path: path.to_string(),
                    existing: ancestor.to_string(),
                });
            }
        }
        // And the path itself must not already be a directory.
        let dir_prefix = format!("{path}/");
        if let Some((existing, _)) = self.entries.range(dir_prefix.clone()..).next() {
            if existing.starts_with(&dir_prefix) {
                return Err(ManifestError::PathConflict {
                    path: path.to_string(),
                    existing: existing.clone(),
                });
            }
        }

        trace!(path, reference = %entry.reference.short_hex(), "manifest add");
        self.entries.insert(path.to_string(), entry);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Persist every directory node, deepest first, and return the top
    /// node's reference.
    pub async fn store(self) -> ManifestResult<ContentRef> {
        let mut dirs: BTreeMap<String, Vec<NodeEntry>> = BTreeMap::new();
        dirs.insert(String::new(), Vec::new());
        for (path, entry) in &self.entries {
            for (i, _) in path.match_indices('/') {
                dirs.entry(path[..i].to_string()).or_default();
            }
            let (dir, name) = split_parent(path);
            dirs.entry(dir.to_string()).or_default().push(NodeEntry {
                name: name.to_string(),
                kind: NodeKind::File {
                    reference: entry.reference,
                    metadata: entry.metadata.clone(),
                },
            });
        }

        let mut order: Vec<String> = dirs.keys().cloned().collect();
        order.sort_by_key(|dir| Reverse(depth(dir)));

        let mut written = 0usize;
        for dir in order {
            let mut entries = dirs.remove(&dir).unwrap_or_default();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            let node = ManifestNode {
                root: if dir.is_empty() { self.root.clone() } else { None },
                entries,
            };
            let reference = self.loadsave.save(&node.encode()?).await?;
            written += 1;

            if dir.is_empty() {
                debug!(
                    files = self.entries.len(),
                    directories = written,
                    %reference,
                    "manifest stored"
                );
                return Ok(reference);
            }
            let (parent, name) = split_parent(&dir);
            dirs.entry(parent.to_string()).or_default().push(NodeEntry {
                name: name.to_string(),
                kind: NodeKind::Directory { reference },
            });
        }

        // The top directory has depth 0 and is always processed last.
        Err(ManifestError::NotFound(ROOT_PATH.to_string()))
    }
}

/// Check that `path` is relative, has no empty segments and no trailing
/// slash.
pub(crate) fn validate_path(path: &str) -> ManifestResult<()> {
    if path.is_empty() || path.split('/').any(str::is_empty) {
        return Err(ManifestError::InvalidPath(path.to_string()));
    }
    Ok(())
}

fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

fn depth(dir: &str) -> usize {
    if dir.is_empty() {
        0
    } else {
        dir.matches('/').count() + 1
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relink_store::{InMemoryChunkStore, PutOptions};

    use super::*;
    use crate::keys::*;
    use crate::reader::ManifestReader;

    fn r(b: u8) -> ContentRef {
        ContentRef::from_hash([b; 32])
    }

    fn make() -> (Arc<InMemoryChunkStore>, Manifest) {
        let store = Arc::new(InMemoryChunkStore::new());
        let ls = LoadSave::new(store.clone(), PutOptions::default());
        (store, Manifest::new(ls))
    }

    fn file_meta(name: &str, mime: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (ENTRY_FILENAME.to_string(), name.to_string()),
            (ENTRY_CONTENT_TYPE.to_string(), mime.to_string()),
        ])
    }

    #[test]
    fn new_manifest_is_empty() {
        let (_, m) = make();
        assert!(m.is_empty());
        assert!(m.root().is_none());
    }

    #[test]
    fn duplicate_path_rejected() {
        let (_, mut m) = make();
        m.add("a.txt", r(1), BTreeMap::new()).unwrap();
        let err = m.add("a.txt", r(2), BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicatePath(p) if p == "a.txt"));
        assert_eq!(m.get("a.txt").unwrap().reference, r(1));
    }

    #[test]
    fn root_added_once() {
        let (_, mut m) = make();
        m.add(ROOT_PATH, ContentRef::zero(), BTreeMap::new()).unwrap();
        assert!(matches!(
            m.add(ROOT_PATH, ContentRef::zero(), BTreeMap::new()),
            Err(ManifestError::DuplicatePath(_))
        ));
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn invalid_paths_rejected() {
        let (_, mut m) = make();
        for bad in ["", "/abs", "trailing/", "a//b"] {
            assert!(
                matches!(
                    m.add(bad, r(1), BTreeMap::new()),
                    Err(ManifestError::InvalidPath(_))
                ),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn file_directory_conflicts() {
        let (_, mut m) = make();
        m.add("c/d.tar", r(1), BTreeMap::new()).unwrap();
        assert!(matches!(
            m.add("c", r(2), BTreeMap::new()),
            Err(ManifestError::PathConflict { existing, .. }) if existing == "c/d.tar"
        ));
        m.add("x", r(3), BTreeMap::new()).unwrap();
        assert!(matches!(
            m.add("x/y", r(4), BTreeMap::new()),
            Err(ManifestError::PathConflict { existing, .. }) if existing == "x"
        ));
        // shared prefix without a separator is fine
        m.add("c.txt", r(5), BTreeMap::new()).unwrap();
    }

    #[tokio::test]
    async fn store_and_lookup() {
        let (store, mut m) = make();
        let mut site = BTreeMap::new();
        site.insert(WEBSITE_INDEX_DOCUMENT.to_string(), "b.jpeg".to_string());
        m.add(ROOT_PATH, ContentRef::zero(), site).unwrap();
        m.add("c/f/g.txt", r(5), file_meta("g.txt", "text/plain")).unwrap();
        m.add("a.txt", r(1), file_meta("a.txt", "text/plain")).unwrap();
        m.add("c/d.tar", r(3), file_meta("d.tar", "application/x-tar"))
            .unwrap();
        m.add("b.jpeg", r(2), file_meta("b.jpeg", "image/jpeg")).unwrap();

        let loadsave = LoadSave::new(store.clone(), PutOptions::default());
        let reference = m.store().await.unwrap();
        // three directory nodes: top, c, c/f
        assert_eq!(store.len(), 3);

        let reader = ManifestReader::open(loadsave, &reference).await.unwrap();
        let root = reader.lookup(ROOT_PATH).await.unwrap();
        assert!(root.reference.is_zero());
        assert_eq!(root.get(WEBSITE_INDEX_DOCUMENT), Some("b.jpeg"));

        let g = reader.lookup("c/f/g.txt").await.unwrap();
        assert_eq!(g.reference, r(5));
        assert_eq!(g.get(ENTRY_FILENAME), Some("g.txt"));
        assert_eq!(reader.lookup("c/d.tar").await.unwrap().reference, r(3));
    }

    #[tokio::test]
    async fn store_is_deterministic() {
        let (_, mut a) = make();
        let (_, mut b) = make();
        a.add("x/1", r(1), BTreeMap::new()).unwrap();
        a.add("y", r(2), BTreeMap::new()).unwrap();
        b.add("y", r(2), BTreeMap::new()).unwrap();
        b.add("x/1", r(1), BTreeMap::new()).unwrap();
        assert_eq!(a.store().await.unwrap(), b.store().await.unwrap());
    }

    #[tokio::test]
    async fn empty_manifest_stores_top_node() {
        let (store, m) = make();
        m.store().await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn pinned_store_pins_nodes() {
        let store = Arc::new(InMemoryChunkStore::new());
        let ls = LoadSave::new(
            store.clone(),
            PutOptions {
                pin: true,
                encrypt: false,
            },
        );
        let mut m = Manifest::new(ls);
        m.add("a/b", r(1), BTreeMap::new()).unwrap();
        m.store().await.unwrap();
        assert_eq!(store.pinned().len(), 2);
    }
}
