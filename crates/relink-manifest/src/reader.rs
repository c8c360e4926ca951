use relink_store::LoadSave;
use relink_types::ContentRef;

use crate::builder::validate_path;
use crate::error::{ManifestError, ManifestResult};
use crate::keys::ROOT_PATH;
use crate::node::{ManifestEntry, ManifestNode, NodeKind};

/// Read access to a stored manifest.
#[derive(Debug)]
pub struct ManifestReader {
    loadsave: LoadSave,
    top: ManifestNode,
}

impl ManifestReader {
    /// Load the top node of the manifest at `reference`.
    pub async fn open(loadsave: LoadSave, reference: &ContentRef) -> ManifestResult<Self> {
        let top = ManifestNode::decode(&loadsave.load(reference).await?)?;
        Ok(Self { loadsave, top })
    }

    /// The root entry, if the manifest has one.
    pub fn root(&self) -> Option<&ManifestEntry> {
        self.top.root.as_ref()
    }

    /// Resolve a file path. `"/"` resolves to the root entry.
    pub async fn lookup(&self, path: &str) -> ManifestResult<ManifestEntry> {
        let not_found = || ManifestError::NotFound(path.to_string());
        if path == ROOT_PATH {
            return self.root().cloned().ok_or_else(not_found);
        }
        validate_path(path)?;

        let mut segments = path.split('/').peekable();
        let mut loaded: Option<ManifestNode> = None;
        while let Some(name) = segments.next() {
            let node = loaded.as_ref().unwrap_or(&self.top);
            match (node.child(name), segments.peek()) {
                (Some(NodeKind::File { reference, metadata }), None) => {
                    return Ok(ManifestEntry::new(*reference, metadata.clone()));
                }
                (Some(NodeKind::Directory { reference }), Some(_)) => {
                    let reference = *reference;
                    loaded = Some(self.node(&reference).await?);
                }
                _ => return Err(not_found()),
            }
        }
        Err(not_found())
    }

    /// Every file in the manifest with its full path, in path order.
    pub async fn list(&self) -> ManifestResult<Vec<(String, ManifestEntry)>> {
        let mut out = Vec::new();
        let mut pending = vec![(String::new(), self.top.clone())];
        while let Some((dir, node)) = pending.pop() {
            for child in node.entries {
                let path = if dir.is_empty() {
                    child.name
                } else {
                    format!("{dir}/{}", child.name)
                };
                match child.kind {
                    NodeKind::File {
                        reference,
                        metadata,
                    } => out.push((path, ManifestEntry::new(reference, metadata))),
                    NodeKind::Directory { reference } => {
                        pending.push((path, self.node(&reference).await?));
                    }
                }
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    async fn node(&self, reference: &ContentRef) -> ManifestResult<ManifestNode> {
        ManifestNode::decode(&self.loadsave.load(reference).await?)
    }
}
