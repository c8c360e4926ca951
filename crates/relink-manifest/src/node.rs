use std::collections::BTreeMap;

use relink_types::ContentRef;
use serde::{Deserialize, Serialize};

use crate::error::{ManifestError, ManifestResult};

/// A resolved manifest entry: a reference plus its metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(with = "hex_ref")]
    pub reference: ContentRef,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ManifestEntry {
    pub fn new(reference: ContentRef, metadata: BTreeMap<String, String>) -> Self {
        Self {
            reference,
            metadata,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// One persisted directory node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Present on the top node only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<ManifestEntry>,
    /// Sorted by name.
    pub entries: Vec<NodeEntry>,
}

/// A named child of a directory node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    File {
        #[serde(with = "hex_ref")]
        reference: ContentRef,
        #[serde(default)]
        metadata: BTreeMap<String, String>,
    },
    Directory {
        #[serde(with = "hex_ref")]
        reference: ContentRef,
    },
}

impl ManifestNode {
    pub fn encode(&self) -> ManifestResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ManifestError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> ManifestResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ManifestError::Serialization(e.to_string()))
    }

    /// Find a child by name. Entries are sorted, so this is a binary search.
    pub fn child(&self, name: &str) -> Option<&NodeKind> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i].kind)
    }
}

/// References are written as lowercase hex in manifest JSON.
mod hex_ref {
    use relink_types::ContentRef;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(r: &ContentRef, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&r.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ContentRef, D::Error> {
        let s = String::deserialize(d)?;
        ContentRef::from_hex(&s).map_err(D::Error::custom)
    }
}
