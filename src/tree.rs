//! Immutable search tree compiled from a sorted [`KeyTable`].
//!
//! Nodes live in a single arena and refer to their children by [`NodeId`].
//! The root is always `NodeId::ROOT` and is always a branch.

use smallvec::SmallVec;

use crate::keys::{KeyId, KeyTable};

// =============================================================================
// Configuration
// =============================================================================

/// Shortest shared run collapsed into a stem node. A one-byte run costs the
/// same as a single-edge branch.
const MIN_STEM_RUN: usize = 2;

// =============================================================================
// Nodes
// =============================================================================

/// Index of a node in the tree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub byte: u8,
    pub child: NodeId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// One edge per distinct next byte, sorted by byte.
    ///
    /// `key_id` is set when a key ends here. Outside of prune mode an endpoint
    /// may also have edges leading to the longer keys it prefixes.
    Branch {
        edges: SmallVec<[Edge; 4]>,
        key_id: Option<KeyId>,
    },
    /// A run of bytes shared by every key below, matched as a whole before
    /// the walk continues at `next`. Never contains an endpoint.
    Stem { run: Box<[u8]>, next: NodeId },
}

impl Node {
    fn empty_branch() -> Self {
        Node::Branch {
            edges: SmallVec::new(),
            key_id: None,
        }
    }
}

// =============================================================================
// SearchTree
// =============================================================================

pub struct SearchTree {
    nodes: Vec<Node>,
    live_keys: usize,
    stems: usize,
    longest_key_len: usize,
}

/// Pending branch: keys `live[low..high]` share their first `depth` bytes.
#[derive(Clone, Copy)]
struct BuildFrame {
    node: NodeId,
    low: usize,
    high: usize,
    depth: usize,
}

impl SearchTree {
    /// Compile `table`, leaving out masked keys when `prune_masked` is set.
    pub fn build(table: &KeyTable, prune_masked: bool) -> Self {
        let excluded = if prune_masked {
            table.detect_masking().masked_set(table.count())
        } else {
            vec![false; table.count()]
        };
        Self::build_excluding(table, &excluded)
    }

    /// Compile every entry of `table` whose flag in `excluded` is clear.
    pub(crate) fn build_excluding(table: &KeyTable, excluded: &[bool]) -> Self {
        debug_assert_eq!(excluded.len(), table.count());
        debug_assert!(table.count() <= KeyId::MAX as usize);

        let live: Vec<KeyId> = (0..table.count())
            .filter(|&i| !excluded[i])
            .map(|i| i as KeyId)
            .collect();
        let longest_key_len = live.iter().map(|&id| table.key(id).len()).max().unwrap_or(0);

        let mut tree = Self {
            nodes: vec![Node::empty_branch()],
            live_keys: live.len(),
            stems: 0,
            longest_key_len,
        };

        let key_at = |i: usize| table.key(live[i]);

        let mut stack = vec![BuildFrame {
            node: NodeId::ROOT,
            low: 0,
            high: live.len(),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            let BuildFrame {
                node,
                mut low,
                high,
                depth,
            } = frame;

            // Sorting puts the one key that ends here (if any) first.
            let mut key_id = None;
            if low < high && key_at(low).len() == depth {
                key_id = Some(live[low]);
                low += 1;
            }

            let mut edges: SmallVec<[Edge; 4]> = SmallVec::new();
            let mut start = low;
            while start < high {
                let byte = key_at(start)[depth];
                let mut end = start + 1;
                while end < high && key_at(end)[depth] == byte {
                    end += 1;
                }

                // Every key in a sorted range shares the common prefix of the
                // range's first and last keys.
                let shared = common_prefix_len(key_at(start), key_at(end - 1));
                let run = shared - (depth + 1);

                let child = if run >= MIN_STEM_RUN {
                    let next = tree.push(Node::empty_branch());
                    stack.push(BuildFrame {
                        node: next,
                        low: start,
                        high: end,
                        depth: shared,
                    });
                    tree.stems += 1;
                    tree.push(Node::Stem {
                        run: Box::from(&key_at(start)[depth + 1..shared]),
                        next,
                    })
                } else {
                    let child = tree.push(Node::empty_branch());
                    stack.push(BuildFrame {
                        node: child,
                        low: start,
                        high: end,
                        depth: depth + 1,
                    });
                    child
                };

                edges.push(Edge { byte, child });
                start = end;
            }

            tree.nodes[node.index()] = Node::Branch { edges, key_id };
        }

        tracing::debug!(
            nodes = tree.nodes.len(),
            stems = tree.stems,
            live_keys = tree.live_keys,
            longest_key_len = tree.longest_key_len,
            "Search tree built"
        );

        tree
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn stem_count(&self) -> usize {
        self.stems
    }

    /// Number of keys reachable in the tree.
    pub fn live_keys(&self) -> usize {
        self.live_keys
    }

    /// Length of the longest reachable key.
    pub fn longest_key_len(&self) -> usize {
        self.longest_key_len
    }

    /// Every reachable key with its id, in sorted key order.
    pub fn keys(&self) -> Vec<(Vec<u8>, KeyId)> {
        let mut out = Vec::with_capacity(self.live_keys);
        // (node, parent path length, edge byte)
        let mut stack: Vec<(NodeId, usize, Option<u8>)> = vec![(NodeId::ROOT, 0, None)];
        let mut path: Vec<u8> = Vec::new();

        while let Some((id, path_len, byte)) = stack.pop() {
            path.truncate(path_len);
            path.extend(byte);
            match self.node(id) {
                Node::Branch { edges, key_id } => {
                    if let Some(k) = key_id {
                        out.push((path.clone(), *k));
                    }
                    for e in edges.iter().rev() {
                        stack.push((e.child, path.len(), Some(e.byte)));
                    }
                }
                Node::Stem { run, next } => {
                    path.extend_from_slice(run);
                    stack.push((*next, path.len(), None));
                }
            }
        }
        out
    }
}

impl std::fmt::Debug for SearchTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTree")
            .field("nodes", &self.nodes.len())
            .field("stems", &self.stems)
            .field("live_keys", &self.live_keys)
            .field("longest_key_len", &self.longest_key_len)
            .finish()
    }
}

#[inline]
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
