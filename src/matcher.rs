//! Longest-match walk over a [`SearchTree`].

use crate::keys::KeyId;
use crate::tree::{Node, SearchTree};

/// A key found at the start of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub key_id: KeyId,
    /// Bytes consumed from the window, equal to the key length.
    pub len: usize,
}

impl SearchTree {
    /// Find the longest key that is a prefix of `window[..max_len]`.
    ///
    /// The walk records every endpoint it passes and keeps the deepest one,
    /// so it never has to backtrack into a shorter key.
    pub fn match_at(&self, window: &[u8], max_len: usize) -> Option<Match> {
        let input = &window[..window.len().min(max_len)];

        let mut best = None;
        let mut node = self.root();
        let mut depth = 0usize;

        loop {
            match self.node(node) {
                Node::Branch { edges, key_id } => {
                    if let Some(key_id) = *key_id {
                        best = Some(Match { key_id, len: depth });
                    }
                    let Some(&byte) = input.get(depth) else {
                        break;
                    };
                    match edges.binary_search_by_key(&byte, |e| e.byte) {
                        Ok(i) => {
                            node = edges[i].child;
                            depth += 1;
                        }
                        Err(_) => break,
                    }
                }
                Node::Stem { run, next } => {
                    let end = depth + run.len();
                    if input.get(depth..end) != Some(&run[..]) {
                        break;
                    }
                    node = *next;
                    depth = end;
                }
            }
        }

        best
    }
}
