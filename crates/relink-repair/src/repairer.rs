use std::collections::BTreeMap;
use std::sync::Arc;

use relink_legacy::{LegacyEntry, LegacyError, LegacyNode, Metadata};
use relink_manifest::keys::{ENTRY_CONTENT_TYPE, ENTRY_FILENAME, ROOT_PATH, WEBSITE_INDEX_DOCUMENT};
use relink_manifest::Manifest;
use relink_store::{ChunkStore, HttpChunkStore, LoadSave, StoreError};
use relink_types::{ContentRef, CHUNK_SIZE};
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RepairConfig;
use crate::error::{RepairError, RepairResult};
use crate::progress::ProgressUpdater;

/// One legacy file handed from the walk task to the manifest builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    pub path: String,
    pub reference: ContentRef,
    pub filename: String,
    pub mime_type: String,
}

/// Rebuilds legacy uploads as current manifests.
pub struct Repairer {
    loadsave: LoadSave,
    updater: Arc<dyn ProgressUpdater>,
}

impl std::fmt::Debug for Repairer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repairer")
            .field("loadsave", &self.loadsave)
            .finish()
    }
}

impl Repairer {
    /// Repair through `store`, writing with the config's pin and encrypt
    /// flags.
    pub fn new(
        store: Arc<dyn ChunkStore>,
        config: &RepairConfig,
        updater: Arc<dyn ProgressUpdater>,
    ) -> Self {
        Self {
            loadsave: LoadSave::new(store, config.put_options()),
            updater,
        }
    }

    /// Repair against the node API named in `config`.
    pub fn connect(config: &RepairConfig, updater: Arc<dyn ProgressUpdater>) -> RepairResult<Self> {
        config.validate()?;
        let store = HttpChunkStore::new(&config.api)?;
        debug!(api = %config.api.base_url(), pin = config.pin, encrypt = config.encrypt, "repairer connected");
        Ok(Self::new(Arc::new(store), config, updater))
    }

    // ---------------------------------------------------------------
    // Single file
    // ---------------------------------------------------------------

    /// Migrate one legacy file entry.
    ///
    /// The new manifest holds the file under its original name and names it
    /// as the site index document.
    pub async fn file_repair(
        &self,
        cancel: &CancellationToken,
        reference: &ContentRef,
    ) -> RepairResult<ContentRef> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(%reference, "file repair cancelled");
                Err(RepairError::Cancelled)
            }
            result = self.repair_file(reference) => result,
        }
    }

    async fn repair_file(&self, reference: &ContentRef) -> RepairResult<ContentRef> {
        let (entry, metadata) = read_file_entry(&self.loadsave, reference).await?;
        self.report(&metadata.filename);

        let mut manifest = Manifest::new(self.loadsave.clone());
        let site = BTreeMap::from([(
            WEBSITE_INDEX_DOCUMENT.to_string(),
            metadata.filename.clone(),
        )]);
        manifest.add(ROOT_PATH, ContentRef::zero(), site)?;
        manifest.add(
            &metadata.filename,
            entry.reference(),
            file_metadata(&metadata.filename, &metadata.mime_type),
        )?;
        let root = manifest.store().await?;
        info!(old = %reference, new = %root, file = %metadata.filename, "file repaired");
        Ok(root)
    }

    // ---------------------------------------------------------------
    // Directory
    // ---------------------------------------------------------------

    /// Migrate a legacy directory trie.
    ///
    /// A spawned task walks the trie and decodes each file's entry and
    /// metadata, handing them over one at a time. This task adds them to the
    /// new manifest in walk order and stores it once the walk completes.
    /// The first error from either side, or cancellation, aborts the repair
    /// without producing a reference.
    pub async fn directory_repair(
        &self,
        cancel: &CancellationToken,
        reference: &ContentRef,
    ) -> RepairResult<ContentRef> {
        if cancel.is_cancelled() {
            return Err(RepairError::Cancelled);
        }
        let root = LegacyNode::load(&self.loadsave.load(reference).await?)?;
        let site = root.lookup_path(ROOT_PATH.as_bytes())?.metadata().clone();
        debug!(%reference, files = root.leaf_count(), "walking legacy directory");

        let mut manifest = Manifest::new(self.loadsave.clone());
        manifest.add(ROOT_PATH, ContentRef::zero(), site)?;

        let (data_tx, mut data_rx) = mpsc::channel(1);
        let (err_tx, mut err_rx) = oneshot::channel();
        let producer = tokio::spawn(walk_files(root, self.loadsave.clone(), data_tx, err_tx));
        let _abort = AbortOnDrop(producer.abort_handle());

        let mut err_open = true;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(%reference, added = manifest.len(), "directory repair cancelled");
                    return Err(RepairError::Cancelled);
                }
                next = data_rx.recv() => match next {
                    Some(file) => {
                        self.report(&file.filename);
                        manifest.add(
                            &file.path,
                            file.reference,
                            file_metadata(&file.filename, &file.mime_type),
                        )?;
                    }
                    None => break,
                },
                result = &mut err_rx, if err_open => {
                    err_open = false;
                    if let Ok(err) = result {
                        return Err(err);
                    }
                }
            }
        }

        // The walk stores its error before closing the data channel.
        if err_open {
            if let Ok(err) = err_rx.try_recv() {
                return Err(err);
            }
        }
        producer
            .await
            .map_err(|e| RepairError::Task(e.to_string()))?;

        let files = manifest.len();
        let root = manifest.store().await?;
        info!(old = %reference, new = %root, files, "directory repaired");
        Ok(root)
    }

    fn report(&self, filename: &str) {
        debug!(filename, "updating reference");
        self.updater
            .update(&format!("Updating reference for file {filename}"));
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Walk task: send every file of `root`, then report at most one error.
async fn walk_files(
    root: LegacyNode,
    loadsave: LoadSave,
    data: mpsc::Sender<PathEntry>,
    error: oneshot::Sender<RepairError>,
) {
    if let Err(err) = send_files(&root, &loadsave, &data).await {
        // The receiver is gone only if the repair already ended.
        let _ = error.send(err);
    }
    drop(data);
}

async fn send_files(
    root: &LegacyNode,
    loadsave: &LoadSave,
    data: &mpsc::Sender<PathEntry>,
) -> RepairResult<()> {
    for (path, node) in root.iter() {
        let Some(entry_ref) = node.entry() else {
            continue;
        };
        let path = String::from_utf8(path)
            .map_err(|e| RepairError::InvalidPath(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;
        let (entry, metadata) = read_file_entry(loadsave, &entry_ref).await?;
        let file = PathEntry {
            path,
            reference: entry.reference(),
            filename: metadata.filename,
            mime_type: metadata.mime_type,
        };
        if data.send(file).await.is_err() {
            // Consumer stopped; nothing left to report.
            return Ok(());
        }
    }
    Ok(())
}

/// Read and decode a legacy entry and its metadata, each capped at one
/// chunk.
async fn read_file_entry(
    loadsave: &LoadSave,
    reference: &ContentRef,
) -> RepairResult<(LegacyEntry, Metadata)> {
    let entry = LegacyEntry::decode(&read_record(loadsave, reference, "entry").await?)?;
    let metadata = Metadata::decode(&read_record(loadsave, &entry.metadata(), "metadata").await?)?;
    Ok((entry, metadata))
}

async fn read_record(
    loadsave: &LoadSave,
    reference: &ContentRef,
    what: &'static str,
) -> RepairResult<Vec<u8>> {
    loadsave
        .load_limited(reference, CHUNK_SIZE)
        .await
        .map_err(|e| match e {
            StoreError::LimitExceeded { limit, size } => {
                LegacyError::Oversized { what, size, limit }.into()
            }
            other => other.into(),
        })
}

fn file_metadata(filename: &str, mime_type: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (ENTRY_FILENAME.to_string(), filename.to_string()),
        (ENTRY_CONTENT_TYPE.to_string(), mime_type.to_string()),
    ])
}
