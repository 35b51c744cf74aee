//! # whiplace
//!
//! Streaming multi-key substitution over byte streams.
//!
//! Given a set of (key, value) byte strings, the engine scans an input stream
//! and replaces every occurrence of the longest key starting at the current
//! position with its value. Bytes that start no key are copied through. A
//! replaced region is never rescanned.
//!
//! Keys are compiled once into an arena-allocated search tree; the stream is
//! read through a bounded look-ahead buffer, so memory use does not depend on
//! the input size.
//!
//! ## Example
//!
//! ```rust
//! use whiplace::build_engine;
//!
//! let engine = build_engine(vec![("good", "bad"), ("hear", "listen")], true).unwrap();
//!
//! let mut out: Vec<u8> = Vec::new();
//! engine.run(b"good to hear".as_slice(), &mut out).unwrap();
//! assert_eq!(out, b"bad to listen");
//! ```
//!
//! ## Masking
//!
//! A key is *masked* when a shorter key of the set is a prefix of it. With
//! pruning enabled (the default), masked keys are dropped before the tree is
//! built, so the shorter key always wins. Without pruning every key is kept and
//! the longest one matches. Either way [`Engine::masking_report`] lists every
//! masked key.

pub mod error;
pub mod keys;
pub mod loader;
pub mod matcher;
pub mod scanner;
pub mod tree;

pub use error::{EngineError, Result};
pub use keys::{KeyEntry, KeyId, KeyTable, Masking, MaskingReport};
pub use matcher::Match;
pub use scanner::{ScanStats, StreamCursor, StreamScanner, DEFAULT_BUFFER_CAPACITY};
pub use tree::{Node, NodeId, SearchTree};

use std::io::{Read, Write};

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct Config {
    /// Drop masked keys before building the tree.
    pub prune_masked: bool,
    /// Look-ahead buffer size in bytes. `None` picks
    /// [`DEFAULT_BUFFER_CAPACITY`], raised to twice the longest key if needed.
    pub buffer_capacity: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prune_masked: true,
            buffer_capacity: None,
        }
    }
}

/// Build an engine with the default buffer size.
pub fn build_engine<I, K, V>(pairs: I, prune_masked: bool) -> Result<Engine>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<Vec<u8>>,
    V: Into<Vec<u8>>,
{
    Engine::with_config(
        pairs,
        Config {
            prune_masked,
            ..Config::default()
        },
    )
}

/// A compiled key set, ready to scan any number of streams.
#[derive(Debug)]
pub struct Engine {
    keys: KeyTable,
    tree: SearchTree,
    report: MaskingReport,
    buffer_capacity: usize,
    pruned: bool,
}

impl Engine {
    pub fn with_config<I, K, V>(pairs: I, config: Config) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        Self::from_table(KeyTable::new(pairs)?, config)
    }

    pub fn from_table(keys: KeyTable, config: Config) -> Result<Self> {
        let report = keys.detect_masking();
        let excluded = if config.prune_masked {
            report.masked_set(keys.count())
        } else {
            vec![false; keys.count()]
        };
        let tree = SearchTree::build_excluding(&keys, &excluded);

        let required = scanner::min_capacity(tree.longest_key_len());
        let buffer_capacity = match config.buffer_capacity {
            Some(capacity) if capacity < required => {
                return Err(EngineError::BufferTooSmall { capacity, required });
            }
            Some(capacity) => capacity,
            None => DEFAULT_BUFFER_CAPACITY.max(required),
        };

        if config.prune_masked && !report.is_empty() {
            tracing::debug!(pruned = report.len(), "Masked keys pruned");
            for (masked, masking) in report.pairs(&keys) {
                tracing::debug!(
                    masked = %String::from_utf8_lossy(masked),
                    masking = %String::from_utf8_lossy(masking),
                    "Pruned masked key"
                );
            }
        }

        Ok(Self {
            keys,
            tree,
            report,
            buffer_capacity,
            pruned: config.prune_masked,
        })
    }

    /// Every masked key of the table, whether or not it was pruned.
    pub fn masking_report(&self) -> &MaskingReport {
        &self.report
    }

    /// Substitute `input` into `output`.
    pub fn run<R: Read, W: Write>(&self, input: R, output: W) -> Result<()> {
        self.run_with_stats(input, output).map(|_| ())
    }

    pub fn run_with_stats<R: Read, W: Write>(&self, input: R, output: W) -> Result<ScanStats> {
        self.scanner(input, output)?.run()
    }

    /// A scanner over `input` sharing this engine's tree.
    pub fn scanner<R: Read, W: Write>(&self, input: R, output: W) -> Result<StreamScanner<'_, R, W>> {
        StreamScanner::new(&self.tree, &self.keys, input, output, self.buffer_capacity)
    }

    /// Substitute an in-memory buffer.
    pub fn replace(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        self.run(input, &mut out)?;
        Ok(out)
    }

    #[inline]
    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    #[inline]
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    #[inline]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Whether masked keys were left out of the tree.
    #[inline]
    pub fn is_pruned(&self) -> bool {
        self.pruned
    }
}


#[cfg(test)]
mod proptests;
