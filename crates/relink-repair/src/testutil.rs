//! Builders for legacy-layout fixtures.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::RngCore;
use relink_legacy::{LegacyEntry, LegacyNode, Metadata};
use relink_manifest::keys::{WEBSITE_ERROR_DOCUMENT, WEBSITE_INDEX_DOCUMENT};
use relink_store::{InMemoryChunkStore, LoadSave, PutOptions};
use relink_types::ContentRef;

pub(crate) struct FixtureFile {
    pub path: &'static str,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl FixtureFile {
    pub fn random(path: &'static str, mime_type: &'static str, len: usize) -> Self {
        let mut data = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut data);
        Self {
            path,
            mime_type,
            data,
        }
    }

    pub fn filename(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }
}

/// A legacy upload in an in-memory store.
pub(crate) struct Fixture {
    pub store: Arc<InMemoryChunkStore>,
    pub loadsave: LoadSave,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryChunkStore::new());
        let loadsave = LoadSave::new(store.clone(), PutOptions::default());
        Self { store, loadsave }
    }

    /// Upload a file the legacy way. Returns `(entry, content)` references.
    pub async fn upload_file(&self, file: &FixtureFile) -> (ContentRef, ContentRef) {
        let content = self.loadsave.save(&file.data).await.unwrap();
        let metadata = Metadata::new(file.filename(), file.mime_type).encode().unwrap();
        let metadata = self.loadsave.save(&metadata).await.unwrap();
        let entry = LegacyEntry::new(content, metadata).encode();
        (self.loadsave.save(&entry).await.unwrap(), content)
    }

    /// Upload a directory as a legacy trie with site settings on `/`.
    /// Returns the trie reference and each path's content reference.
    pub async fn upload_dir(
        &self,
        files: &[FixtureFile],
        index: &str,
        error: &str,
    ) -> (ContentRef, BTreeMap<String, ContentRef>) {
        let mut root = LegacyNode::empty();
        let mut site = BTreeMap::new();
        if !index.is_empty() {
            site.insert(WEBSITE_INDEX_DOCUMENT.to_string(), index.to_string());
        }
        if !error.is_empty() {
            site.insert(WEBSITE_ERROR_DOCUMENT.to_string(), error.to_string());
        }
        root.insert(b"/", None, site);

        let mut contents = BTreeMap::new();
        for file in files {
            let (entry, content) = self.upload_file(file).await;
            root.insert(file.path.as_bytes(), Some(entry), BTreeMap::new());
            contents.insert(file.path.to_string(), content);
        }
        let reference = self.loadsave.save(&root.encode().unwrap()).await.unwrap();
        (reference, contents)
    }

    /// Save raw bytes as-is.
    pub async fn save(&self, data: &[u8]) -> ContentRef {
        self.loadsave.save(data).await.unwrap()
    }
}

/// The directory layout used across repair tests.
pub(crate) fn sample_dir() -> Vec<FixtureFile> {
    use relink_types::CHUNK_SIZE;
    vec![
        FixtureFile::random("a.txt", "text/plain; charset=utf-8", 100),
        FixtureFile::random("b.jpeg", "image/jpeg", CHUNK_SIZE * 3 + 5),
        FixtureFile::random("c/d.tar", "application/x-tar", CHUNK_SIZE * 2),
        FixtureFile::random("c/e.jpeg", "image/jpeg", 700),
        FixtureFile::random("c/f/g.txt", "text/plain; charset=utf-8", 12),
        FixtureFile::random("c/f/h.jpeg", "image/jpeg", CHUNK_SIZE + 1),
    ]
}
