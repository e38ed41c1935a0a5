//! Chained hash index for key-based aggregation.
//!
//! Records are deduplicated by `id` as they are inserted: a record whose key
//! is already present is folded into the stored aggregate with
//! [`Record::combine`], otherwise it becomes a new entry.
//!
//! # Layout
//!
//! ```text
//!  buckets (Vec<Option<usize>>)        entries (Vec<Entry>, arena)
//! ┌──────────────────────┐            ┌──────────────────────────┐
//! │ 0: Some(2)           │───────────►│ 0: rec id=7    next=None │
//! │ 1: None              │            │ 1: rec id=3    next=Some(0)
//! │ 2: Some(1)           │───────────►│ 2: rec id=19   next=None │
//! │ ...                  │            │ ...                      │
//! └──────────────────────┘            └──────────────────────────┘
//! ```
//!
//! Chains thread through the arena by index. Growing the bucket array only
//! rewrites the `next` links; record payloads never move.

use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::record::Record;

const FNV_OFFSET: u64 = 2_166_136_261;
const FNV_PRIME: u64 = 16_777_619;

/// FNV-1a over the little-endian bytes of the key.
#[inline(always)]
fn hash_key(key: i64) -> u64 {
    let mut h = FNV_OFFSET;
    for byte in key.to_le_bytes() {
        h = (h ^ byte as u64).wrapping_mul(FNV_PRIME);
    }
    h
}

/// Sizing knobs for a [`KeyIndex`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IndexConfig {
    /// Smallest bucket array ever allocated.
    pub min_buckets: usize,
    /// Bucket array never grows past this.
    pub max_buckets: usize,
    /// Entries per bucket allowed before the array doubles.
    pub load_factor: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_buckets: 16,
            max_buckets: 1_000_000,
            load_factor: 0.6,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_buckets == 0 {
            return Err(Error::InvalidArgument(
                "min_buckets must be at least 1".to_string(),
            ));
        }
        if self.min_buckets > self.max_buckets {
            return Err(Error::InvalidArgument(format!(
                "min_buckets {} exceeds max_buckets {}",
                self.min_buckets, self.max_buckets
            )));
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "load_factor {} is outside (0, 1]",
                self.load_factor
            )));
        }
        Ok(())
    }

    /// Initial bucket count for `expected` elements: doubles up from
    /// `min_buckets` until the load factor would hold, stopping at half of
    /// `max_buckets` so there is room left to grow.
    fn initial_buckets(&self, expected: usize) -> usize {
        let target = expected as f64 / self.load_factor;
        let mut buckets = self.min_buckets;
        while (buckets as f64) < target && buckets < self.max_buckets / 2 {
            buckets *= 2;
        }
        buckets.clamp(self.min_buckets, self.max_buckets)
    }
}

struct Entry {
    record: Record,
    next: Option<usize>,
}

fn alloc_buckets(len: usize) -> Result<Vec<Option<usize>>> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(len).map_err(|_| {
        error!(buckets = len, "bucket array allocation failed");
        Error::OutOfMemory {
            context: "allocating the bucket array",
        }
    })?;
    buckets.resize(len, None);
    Ok(buckets)
}

/// Resizable map from `id` to the aggregate of every record inserted under
/// that id.
pub struct KeyIndex {
    buckets: Vec<Option<usize>>,
    entries: Vec<Entry>,
    config: IndexConfig,
}

impl KeyIndex {
    /// Creates an empty index sized for `expected` records with the default
    /// [`IndexConfig`].
    pub fn new(expected: usize) -> Result<Self> {
        Self::with_config(expected, IndexConfig::default())
    }

    pub fn with_config(expected: usize, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let buckets = config.initial_buckets(expected);
        debug!(expected, buckets, "creating key index");
        Ok(Self {
            buckets: alloc_buckets(buckets)?,
            entries: Vec::new(),
            config,
        })
    }

    /// Number of distinct keys stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Current occupancy: stored keys per bucket.
    #[cfg(test)]
    fn load(&self) -> f64 {
        self.entries.len() as f64 / self.buckets.len() as f64
    }

    #[inline(always)]
    fn bucket_of(&self, key: i64) -> usize {
        (hash_key(key) % self.buckets.len() as u64) as usize
    }

    /// Inserts `record`, merging it into the existing aggregate for its id
    /// when there is one.
    ///
    /// Admitting a new key first grows the bucket array if the key would
    /// push occupancy past the load factor. On `OutOfMemory` the index is
    /// still safe to drop but should not be used further.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        let mut bucket = self.bucket_of(record.id);

        let mut cursor = self.buckets[bucket];
        while let Some(i) = cursor {
            let entry = &mut self.entries[i];
            if entry.record.id == record.id {
                entry.record.combine(&record);
                return Ok(());
            }
            cursor = entry.next;
        }

        if (self.entries.len() + 1) as f64 / self.buckets.len() as f64 > self.config.load_factor
            && self.grow()?
        {
            bucket = self.bucket_of(record.id);
        }

        self.entries.try_reserve(1).map_err(|_| {
            error!(len = self.entries.len(), "chain entry allocation failed");
            Error::OutOfMemory {
                context: "adding a chain entry",
            }
        })?;
        let index = self.entries.len();
        self.entries.push(Entry {
            record,
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = Some(index);
        Ok(())
    }

    /// Doubles the bucket array (up to `max_buckets`) and re-threads every
    /// entry. Returns whether the array actually changed size.
    fn grow(&mut self) -> Result<bool> {
        let old = self.buckets.len();
        let new = old.saturating_mul(2).min(self.config.max_buckets);
        if new <= old {
            warn!(
                buckets = old,
                len = self.entries.len(),
                "bucket array at its ceiling, load factor will be exceeded"
            );
            return Ok(false);
        }

        let mut buckets = alloc_buckets(new)?;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            let slot = (hash_key(entry.record.id) % new as u64) as usize;
            entry.next = buckets[slot];
            buckets[slot] = Some(i);
        }
        self.buckets = buckets;
        debug!(from = old, to = new, len = self.entries.len(), "grew key index");
        Ok(true)
    }

    /// Consumes the index and returns every aggregated record exactly once,
    /// in bucket and chain order.
    pub fn drain(self) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        out.try_reserve_exact(self.entries.len()).map_err(|_| {
            error!(len = self.entries.len(), "result allocation failed");
            Error::OutOfMemory {
                context: "materializing the drained records",
            }
        })?;
        for head in &self.buckets {
            let mut cursor = *head;
            while let Some(i) = cursor {
                let entry = &self.entries[i];
                out.push(entry.record);
                cursor = entry.next;
            }
        }
        debug_assert_eq!(out.len(), self.entries.len());
        debug!(len = out.len(), "drained key index");
        Ok(out)
    }
}
