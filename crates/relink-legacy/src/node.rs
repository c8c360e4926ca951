//! The legacy path trie.
//!
//! Paths are stored in a prefix-compressed trie: each fork edge carries a
//! byte string prefix and is keyed by that prefix's first byte. A node that
//! carries its own entry reference is a file; every other node is a
//! directory-like fork.
//!
//! On disk the trie is a flat table of nodes in pre-order, each fork edge
//! naming its child by table index. Children always come after their
//! parent, so a table is decoded and rebuilt without recursion.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use relink_types::ContentRef;
use serde::{Deserialize, Serialize};

use crate::error::{LegacyError, LegacyResult};

/// Deepest trie accepted by [`LegacyNode::load`], counted in edges from
/// the root.
pub const MAX_DEPTH: usize = 1024;

/// One node of the legacy trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegacyNode {
    /// A file without children.
    Leaf {
        entry: ContentRef,
        metadata: BTreeMap<String, String>,
    },
    /// An internal node. It may still carry an entry when a file path is a
    /// strict prefix of another path.
    Fork {
        entry: Option<ContentRef>,
        metadata: BTreeMap<String, String>,
        forks: BTreeMap<u8, Fork>,
    },
}

/// A compressed edge to a child node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fork {
    pub prefix: Vec<u8>,
    pub node: LegacyNode,
}

impl Default for LegacyNode {
    fn default() -> Self {
        Self::empty()
    }
}

impl LegacyNode {
    /// An empty fork, the root of a new trie.
    pub fn empty() -> Self {
        Self::Fork {
            entry: None,
            metadata: BTreeMap::new(),
            forks: BTreeMap::new(),
        }
    }

    fn value(entry: Option<ContentRef>, metadata: BTreeMap<String, String>) -> Self {
        match entry {
            Some(entry) => Self::Leaf { entry, metadata },
            None => Self::Fork {
                entry: None,
                metadata,
                forks: BTreeMap::new(),
            },
        }
    }

    /// Decode a trie from its stored node table and check its structure.
    ///
    /// Tables that are not a single tree rooted at index 0, or that nest
    /// deeper than [`MAX_DEPTH`], are rejected.
    pub fn load(bytes: &[u8]) -> LegacyResult<Self> {
        let table: Vec<StoredNode> =
            bincode::deserialize(bytes).map_err(|e| LegacyError::MalformedNode(e.to_string()))?;
        check_table(&table)?;

        let mut built: Vec<Option<LegacyNode>> = Vec::with_capacity(table.len());
        built.resize_with(table.len(), || None);
        for (index, stored) in table.into_iter().enumerate().rev() {
            let node = match (stored.leaf, stored.entry) {
                (true, Some(entry)) => Self::Leaf {
                    entry,
                    metadata: stored.metadata,
                },
                (true, None) => return Err(malformed(index, "leaf without an entry")),
                (false, entry) => {
                    let mut forks = BTreeMap::new();
                    for edge in stored.forks {
                        let node = built[edge.child as usize]
                            .take()
                            .ok_or_else(|| malformed(index, "child decoded twice"))?;
                        forks.insert(
                            edge.key,
                            Fork {
                                prefix: edge.prefix,
                                node,
                            },
                        );
                    }
                    Self::Fork {
                        entry,
                        metadata: stored.metadata,
                        forks,
                    }
                }
            };
            built[index] = Some(node);
        }
        built
            .first_mut()
            .and_then(Option::take)
            .ok_or_else(|| LegacyError::MalformedNode("empty node table".into()))
    }

    /// Encode the trie as a pre-order node table.
    pub fn encode(&self) -> LegacyResult<Vec<u8>> {
        let mut table: Vec<StoredNode> = Vec::new();
        let mut stack: Vec<(&LegacyNode, Option<(usize, u8, &[u8])>)> = vec![(self, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = table.len();
            if let Some((parent, key, prefix)) = parent {
                let child = u32::try_from(index)
                    .map_err(|_| LegacyError::Serialization("trie has too many nodes".into()))?;
                table[parent].forks.push(StoredFork {
                    key,
                    prefix: prefix.to_vec(),
                    child,
                });
            }
            table.push(StoredNode {
                leaf: matches!(node, Self::Leaf { .. }),
                entry: node.entry(),
                metadata: node.metadata().clone(),
                forks: Vec::new(),
            });
            for (key, fork) in node.forks().into_iter().flatten().rev() {
                stack.push((&fork.node, Some((index, *key, fork.prefix.as_slice()))));
            }
        }
        bincode::serialize(&table).map_err(|e| LegacyError::Serialization(e.to_string()))
    }

    /// The node's own entry reference, if it has one.
    pub fn entry(&self) -> Option<ContentRef> {
        match self {
            Self::Leaf { entry, .. } => Some(*entry),
            Self::Fork { entry, .. } => *entry,
        }
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        match self {
            Self::Leaf { metadata, .. } | Self::Fork { metadata, .. } => metadata,
        }
    }

    /// Child edges, or `None` for a leaf.
    pub fn forks(&self) -> Option<&BTreeMap<u8, Fork>> {
        match self {
            Self::Leaf { .. } => None,
            Self::Fork { forks, .. } => Some(forks),
        }
    }

    /// A node is a file when it carries its own entry.
    pub fn is_leaf(&self) -> bool {
        self.entry().is_some()
    }

    /// Resolve `path` by descending the fork edges. The empty path is the
    /// node itself.
    pub fn lookup_path(&self, path: &[u8]) -> LegacyResult<&LegacyNode> {
        let not_found = || LegacyError::PathNotFound(String::from_utf8_lossy(path).into_owned());
        let mut node = self;
        let mut rest = path;
        while let Some(first) = rest.first() {
            let fork = node
                .forks()
                .and_then(|forks| forks.get(first))
                .ok_or_else(not_found)?;
            rest = rest.strip_prefix(fork.prefix.as_slice()).ok_or_else(not_found)?;
            node = &fork.node;
        }
        Ok(node)
    }

    /// Depth-first, pre-order iterator over `(path, node)` pairs with
    /// children in ascending key order. The root is yielded first with an
    /// empty path.
    pub fn iter(&self) -> Walker<'_> {
        Walker {
            stack: vec![(Vec::new(), self)],
        }
    }

    /// Visit every node in [`iter`](Self::iter) order, stopping at the first
    /// error returned by `visit`.
    pub fn walk<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &LegacyNode) -> Result<(), E>,
    {
        for (path, node) in self.iter() {
            visit(&path, node)?;
        }
        Ok(())
    }

    /// Number of file nodes in the trie.
    pub fn leaf_count(&self) -> usize {
        self.iter().filter(|(_, node)| node.is_leaf()).count()
    }

    /// Set the value at `path`, splitting edges as needed. An existing value
    /// at the same path is replaced.
    pub fn insert(
        &mut self,
        path: &[u8],
        entry: Option<ContentRef>,
        metadata: BTreeMap<String, String>,
    ) {
        let Some(&first) = path.first() else {
            self.set_value(entry, metadata);
            return;
        };
        let fork = match self.forks_mut().entry(first) {
            Entry::Vacant(slot) => {
                slot.insert(Fork {
                    prefix: path.to_vec(),
                    node: Self::value(entry, metadata),
                });
                return;
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        let common = common_prefix_len(&fork.prefix, path);
        if common == fork.prefix.len() {
            fork.node.insert(&path[common..], entry, metadata);
            return;
        }

        // Split the edge at the shared prefix.
        let old = std::mem::replace(
            fork,
            Fork {
                prefix: path[..common].to_vec(),
                node: Self::empty(),
            },
        );
        let mut middle = Self::empty();
        middle.forks_mut().insert(
            old.prefix[common],
            Fork {
                prefix: old.prefix[common..].to_vec(),
                node: old.node,
            },
        );
        middle.insert(&path[common..], entry, metadata);
        fork.node = middle;
    }

    fn set_value(&mut self, new_entry: Option<ContentRef>, new_metadata: BTreeMap<String, String>) {
        match self {
            Self::Fork { forks, .. } if forks.is_empty() => {
                *self = Self::value(new_entry, new_metadata);
            }
            Self::Fork {
                entry, metadata, ..
            } => {
                *entry = new_entry;
                *metadata = new_metadata;
            }
            Self::Leaf { .. } => *self = Self::value(new_entry, new_metadata),
        }
    }

    fn forks_mut(&mut self) -> &mut BTreeMap<u8, Fork> {
        if let Self::Leaf { entry, metadata } = self {
            *self = Self::Fork {
                entry: Some(*entry),
                metadata: std::mem::take(metadata),
                forks: BTreeMap::new(),
            };
        }
        match self {
            Self::Fork { forks, .. } => forks,
            Self::Leaf { .. } => unreachable!("leaf converted to fork above"),
        }
    }
}

/// Stored form of one trie node.
#[derive(Serialize, Deserialize)]
struct StoredNode {
    leaf: bool,
    entry: Option<ContentRef>,
    metadata: BTreeMap<String, String>,
    forks: Vec<StoredFork>,
}

#[derive(Serialize, Deserialize)]
struct StoredFork {
    key: u8,
    prefix: Vec<u8>,
    child: u32,
}

fn malformed(index: usize, reason: &str) -> LegacyError {
    LegacyError::MalformedNode(format!("node {index}: {reason}"))
}

/// Every node but the root must be the child of exactly one earlier node,
/// edges must be keyed by their first prefix byte in ascending order, and
/// no node may sit deeper than [`MAX_DEPTH`].
fn check_table(table: &[StoredNode]) -> LegacyResult<()> {
    let mut depth = vec![0usize; table.len()];
    let mut referenced = vec![false; table.len()];
    for (index, stored) in table.iter().enumerate() {
        if stored.leaf && !stored.forks.is_empty() {
            return Err(malformed(index, "leaf with child edges"));
        }
        let mut previous = None;
        for edge in &stored.forks {
            if edge.prefix.first() != Some(&edge.key) {
                return Err(malformed(
                    index,
                    &format!(
                        "edge {:#04x} has prefix {:?}",
                        edge.key,
                        String::from_utf8_lossy(&edge.prefix)
                    ),
                ));
            }
            if previous >= Some(edge.key) {
                return Err(malformed(index, "edges out of order"));
            }
            previous = Some(edge.key);

            let child = edge.child as usize;
            if child <= index || child >= table.len() || referenced[child] {
                return Err(malformed(index, &format!("bad child index {child}")));
            }
            referenced[child] = true;
            depth[child] = depth[index] + 1;
            if depth[child] > MAX_DEPTH {
                return Err(malformed(
                    child,
                    &format!("trie nests deeper than {MAX_DEPTH} edges"),
                ));
            }
        }
    }
    if let Some(orphan) = referenced.iter().skip(1).position(|seen| !seen) {
        return Err(malformed(orphan + 1, "not reachable from the root"));
    }
    Ok(())
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Iterator returned by [`LegacyNode::iter`].
pub struct Walker<'a> {
    stack: Vec<(Vec<u8>, &'a LegacyNode)>,
}

impl<'a> Iterator for Walker<'a> {
    type Item = (Vec<u8>, &'a LegacyNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        if let Some(forks) = node.forks() {
            for fork in forks.values().rev() {
                let mut child = path.clone();
                child.extend_from_slice(&fork.prefix);
                self.stack.push((child, &fork.node));
            }
        }
        Some((path, node))
    }
}
