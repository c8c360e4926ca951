use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ExportResult;
use crate::index::{ChunkIndex, OpenMode};
use crate::progress::ExportProgress;

/// Name of the first archive entry.
pub const VERSION_ENTRY: &str = ".swarm-export-version";

/// Payload of the version entry.
pub const CURRENT_VERSION: &str = "1";

/// Archive written when no destination is configured.
pub const DEFAULT_DESTINATION: &str = "swarm-exportdb.tar";

const ENTRY_MODE: u32 = 0o644;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Archive file to create. Overwritten if it exists.
    pub destination: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from(DEFAULT_DESTINATION),
        }
    }
}

/// Outcome of a finished export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub total: usize,
    pub exported: usize,
    pub destination: PathBuf,
}

/// Write every record of the chunk index at `source` to a tar archive.
///
/// The archive starts with [`VERSION_ENTRY`], followed by one entry per
/// record in address order, named by the lowercase hex address. `progress`
/// sees `(0, total)` first and then `(n, total)` after the n-th record.
/// The index and the archive file are closed on every return path.
pub fn export(
    source: &Path,
    config: &ExportConfig,
    progress: &dyn ExportProgress,
) -> ExportResult<ExportSummary> {
    let index = ChunkIndex::open(source, OpenMode::ReadOnly)?;
    let total = index.count();
    debug!(source = %source.display(), destination = %config.destination.display(), total, "exporting chunk index");

    let file = File::create(&config.destination)?;
    let mut archive = tar::Builder::new(BufWriter::new(file));
    append_entry(&mut archive, VERSION_ENTRY, CURRENT_VERSION.as_bytes())?;
    progress.update(0, total);

    let mut exported = 0usize;
    index.iterate(|record| {
        append_entry(&mut archive, &hex::encode(&record.address), &record.data)?;
        exported += 1;
        progress.update(exported, total);
        Ok(())
    })?;

    let mut writer = archive.into_inner()?;
    writer.flush()?;

    info!(exported, destination = %config.destination.display(), "export complete");
    Ok(ExportSummary {
        total,
        exported,
        destination: config.destination.clone(),
    })
}

fn append_entry<W: Write>(archive: &mut tar::Builder<W>, name: &str, data: &[u8]) -> ExportResult<()> {
    let mut header = tar::Header::new_ustar();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(ENTRY_MODE);
    archive.append_data(&mut header, name, data)?;
    Ok(())
}
