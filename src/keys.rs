//! Sorted key table and prefix-masking detection.
//!
//! The table owns every (key, value) pair handed to the engine, sorted by
//! byte-lexicographic key order. Sorting groups every key that starts with a
//! given key `A` into one contiguous run directly after `A`, which is what both
//! duplicate detection and masking detection rely on.

use crate::error::{EngineError, Result};

/// Index of an entry in a [`KeyTable`]'s sorted order.
pub type KeyId = u32;

/// A single substitution rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: Vec<u8>,
    /// Replacement bytes. Empty means the key is deleted from the stream.
    pub value: Vec<u8>,
}

/// Deduplicated (key, value) pairs in sorted key order.
#[derive(Clone, Debug)]
pub struct KeyTable {
    entries: Vec<KeyEntry>,
    longest_key_len: usize,
}

impl KeyTable {
    /// Sort and validate raw pairs.
    ///
    /// Fails with [`EngineError::InvalidKey`] on an empty pair sequence or a
    /// zero-length key, and with [`EngineError::DuplicateKey`] when two keys
    /// are byte-identical.
    pub fn new<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        let mut entries: Vec<KeyEntry> = pairs
            .into_iter()
            .map(|(k, v)| KeyEntry {
                key: k.into(),
                value: v.into(),
            })
            .collect();

        if entries.is_empty() {
            return Err(EngineError::InvalidKey("no keys supplied".into()));
        }
        if let Some(pos) = entries.iter().position(|e| e.key.is_empty()) {
            return Err(EngineError::InvalidKey(format!(
                "key #{} is empty",
                pos + 1
            )));
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));

        if let Some(w) = entries.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(EngineError::DuplicateKey(w[0].key.clone()));
        }

        let longest_key_len = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
        tracing::debug!(keys = entries.len(), longest_key_len, "Key table sorted");

        Ok(Self {
            entries,
            longest_key_len,
        })
    }

    /// Build from parallel key and value sequences.
    pub fn from_columns<K, V>(keys: Vec<K>, values: Vec<V>) -> Result<Self>
    where
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        if keys.len() != values.len() {
            return Err(EngineError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        Self::new(keys.into_iter().zip(values))
    }

    #[inline]
    pub fn sorted_entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entry(&self, id: KeyId) -> &KeyEntry {
        &self.entries[id as usize]
    }

    #[inline]
    pub fn key(&self, id: KeyId) -> &[u8] {
        &self.entries[id as usize].key
    }

    #[inline]
    pub fn value(&self, id: KeyId) -> &[u8] {
        &self.entries[id as usize].value
    }

    pub fn longest_key_len(&self) -> usize {
        self.longest_key_len
    }

    /// Find every key that has a shorter key of the table as a proper prefix.
    ///
    /// Each masked key is reported once, paired with its shortest prefix in
    /// the table. A key that is itself masked is not scanned as a masker:
    /// anything it prefixes is already covered by its own, shorter prefix.
    pub fn detect_masking(&self) -> MaskingReport {
        let n = self.entries.len();
        let mut masked_by: Vec<Option<KeyId>> = vec![None; n];

        for i in 0..n {
            if masked_by[i].is_some() {
                continue;
            }
            let prefix = &self.entries[i].key;
            // Keys starting with `prefix` form one run right after it.
            for j in (i + 1)..n {
                if !self.entries[j].key.starts_with(prefix) {
                    break;
                }
                if masked_by[j].is_none() {
                    masked_by[j] = Some(i as KeyId);
                }
            }
        }

        let pairs: Vec<Masking> = masked_by
            .into_iter()
            .enumerate()
            .filter_map(|(masked, masking)| {
                masking.map(|masking| Masking {
                    masked: masked as KeyId,
                    masking,
                })
            })
            .collect();

        if !pairs.is_empty() {
            tracing::debug!(masked = pairs.len(), "Masked keys detected");
        }
        MaskingReport { pairs }
    }
}

/// `masking` is a proper prefix of `masked`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Masking {
    pub masked: KeyId,
    pub masking: KeyId,
}

/// Masking relationships in a [`KeyTable`], ordered by masked index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaskingReport {
    pairs: Vec<Masking>,
}

impl MaskingReport {
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Masking> + '_ {
        self.pairs.iter().copied()
    }

    pub fn contains(&self, masked: KeyId, masking: KeyId) -> bool {
        self.pairs
            .binary_search_by_key(&masked, |m| m.masked)
            .map(|i| self.pairs[i].masking == masking)
            .unwrap_or(false)
    }

    /// Resolve the report against the table it was computed from, yielding
    /// `(masked_key, masking_key)`.
    pub fn pairs<'a>(&'a self, table: &'a KeyTable) -> impl Iterator<Item = (&'a [u8], &'a [u8])> {
        self.pairs
            .iter()
            .map(move |m| (table.key(m.masked), table.key(m.masking)))
    }

    /// One flag per table entry, set for masked keys.
    pub fn masked_set(&self, count: usize) -> Vec<bool> {
        let mut set = vec![false; count];
        for m in &self.pairs {
            set[m.masked as usize] = true;
        }
        set
    }
}
