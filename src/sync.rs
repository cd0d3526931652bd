//! The boundary to the remote register memory.
//!
//! The filter core never talks to the remote store itself. Callers read a
//! [`RegisterSnapshot`] through a [`RegisterStore`] adapter, hand it to
//! [`crate::CuckooFilter::delta`], and apply the returned [`DeltaEntry`]
//! list back through the same adapter. Applying a delta is a sequence of
//! independent single-cell writes with no atomicity across entries; a
//! partial application is repaired by the next reconciliation round.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

/// Indexed read/write access to one remote register memory.
///
/// Implemented by transport adapters (consumed, never implemented, by the
/// filter core). Retry, timeout, and backoff policy live behind this trait;
/// the core propagates adapter errors untouched.
pub trait RegisterStore {
    /// Adapter-specific failure type.
    type Error: std::error::Error;

    /// Read every cell of a named register region, in bucket-index order.
    fn read_all(&mut self, region: &str) -> Result<Vec<u32>, Self::Error>;

    /// Write a single cell of a named register region.
    fn write_cell(&mut self, region: &str, index: usize, value: u32) -> Result<(), Self::Error>;
}

/// Fixed mapping from filter table index to remote region name.
///
/// Order is significant: table `j` maps to the `j`-th region supplied at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMap {
    regions: Vec<String>,
}

impl RegionMap {
    /// Build a map from region names in table order.
    pub fn new<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            regions: regions.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of mapped tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region name for a table index, if mapped.
    #[must_use]
    pub fn region(&self, table: usize) -> Option<&str> {
        self.regions.get(table).map(String::as_str)
    }
}

/// An observed read of the remote memory: one value per (table, bucket).
///
/// A snapshot cannot distinguish an Empty cell from a literal zero value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSnapshot {
    cells: Vec<Vec<u32>>,
}

impl RegisterSnapshot {
    /// Wrap raw per-region reads, outer index = table, inner index = bucket.
    #[must_use]
    pub fn new(cells: Vec<Vec<u32>>) -> Self {
        Self { cells }
    }

    /// Number of tables in the snapshot.
    #[must_use]
    pub fn tables(&self) -> usize {
        self.cells.len()
    }

    /// Cells of one table, in bucket order.
    #[must_use]
    pub fn table(&self, table: usize) -> Option<&[u32]> {
        self.cells.get(table).map(Vec::as_slice)
    }

    /// One observed cell value.
    #[must_use]
    pub fn get(&self, table: usize, bucket: usize) -> Option<u32> {
        self.cells.get(table)?.get(bucket).copied()
    }
}

/// A corrective write: "remote cell (table, bucket) must become `value`".
///
/// `value` is the decoded fingerprint; the filter's internal ×4 wire
/// encoding never crosses this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaEntry {
    /// Filter table index, selecting the remote region.
    pub table: usize,
    /// Bucket index, the cell address within the region.
    pub bucket: usize,
    /// Fingerprint value the cell must hold.
    pub value: u32,
}

/// Failures while moving snapshots or deltas across the store boundary.
#[derive(Error, Debug)]
pub enum SyncError<E: std::error::Error> {
    /// A delta entry named a table with no mapped region.
    #[error("no region mapped for table {0}")]
    UnmappedTable(usize),

    /// A region read returned the wrong number of cells.
    #[error("region {region:?} returned {got} cells, expected {expected}")]
    ShortRead {
        /// Region that was read.
        region: String,
        /// Cells expected (one per bucket).
        expected: usize,
        /// Cells actually returned.
        got: usize,
    },

    /// The adapter failed; propagated untouched.
    #[error(transparent)]
    Store(E),
}

/// Read a full snapshot: one `read_all` per mapped region, in table order.
pub fn read_snapshot<S: RegisterStore>(
    store: &mut S,
    map: &RegionMap,
    buckets: usize,
) -> Result<RegisterSnapshot, SyncError<S::Error>> {
    let mut cells = Vec::with_capacity(map.len());
    for table in 0..map.len() {
        let region = map.region(table).ok_or(SyncError::UnmappedTable(table))?;
        let values = store.read_all(region).map_err(SyncError::Store)?;
        if values.len() != buckets {
            return Err(SyncError::ShortRead {
                region: region.to_string(),
                expected: buckets,
                got: values.len(),
            });
        }
        cells.push(values);
    }
    Ok(RegisterSnapshot::new(cells))
}

/// Apply a delta: one `write_cell` per entry, in order.
///
/// No atomicity across entries. An adapter failure leaves earlier writes in
/// place; reconciliation is idempotent, so re-running repairs the remainder.
pub fn apply_delta<S: RegisterStore>(
    store: &mut S,
    map: &RegionMap,
    entries: &[DeltaEntry],
) -> Result<(), SyncError<S::Error>> {
    for entry in entries {
        let region = map
            .region(entry.table)
            .ok_or(SyncError::UnmappedTable(entry.table))?;
        store
            .write_cell(region, entry.bucket, entry.value)
            .map_err(SyncError::Store)?;
    }
    debug!("applied {} register writes", entries.len());
    Ok(())
}

/// Failures of the in-process [`MemoryStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// Named region does not exist.
    #[error("unknown region {0:?}")]
    UnknownRegion(String),

    /// Cell index beyond the region's size.
    #[error("cell index {index} out of range for region {region:?}")]
    OutOfRange {
        /// Region that was addressed.
        region: String,
        /// Offending cell index.
        index: usize,
    },
}

/// An in-process register store.
///
/// Reference implementation of [`RegisterStore`]: every region starts
/// zero-filled. Used by the test suite in place of a real transport.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    regions: HashMap<String, Vec<u32>>,
}

impl MemoryStore {
    /// Create a store with one zeroed region per mapped table.
    #[must_use]
    pub fn new(map: &RegionMap, buckets: usize) -> Self {
        let mut regions = HashMap::new();
        for table in 0..map.len() {
            if let Some(region) = map.region(table) {
                regions.insert(region.to_string(), vec![0; buckets]);
            }
        }
        Self { regions }
    }
}

impl RegisterStore for MemoryStore {
    type Error = MemoryStoreError;

    fn read_all(&mut self, region: &str) -> Result<Vec<u32>, Self::Error> {
        self.regions
            .get(region)
            .cloned()
            .ok_or_else(|| MemoryStoreError::UnknownRegion(region.to_string()))
    }

    fn write_cell(&mut self, region: &str, index: usize, value: u32) -> Result<(), Self::Error> {
        let cells = self
            .regions
            .get_mut(region)
            .ok_or_else(|| MemoryStoreError::UnknownRegion(region.to_string()))?;
        let cell = cells
            .get_mut(index)
            .ok_or_else(|| MemoryStoreError::OutOfRange {
                region: region.to_string(),
                index,
            })?;
        *cell = value;
        Ok(())
    }
}
