//! Multi-table cuckoo filter with bounded eviction and delta computation.
//!
//! The filter is the canonical *desired* state of the remote register
//! memory: `tables × buckets × slots` cells, each Empty or holding one
//! fingerprint plus the identifier it was derived from. Insertion relocates
//! occupants along a bounded cuckoo chain; [`CuckooFilter::delta`] diffs the
//! desired state against an observed [`RegisterSnapshot`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::fingerprint::fingerprint;
use crate::identifier::Identifier;
use crate::sync::{DeltaEntry, RegisterSnapshot};
use crate::{BUCKET_WINDOW_BITS, DEFAULT_MAX_EVICTIONS};

/// Fixed dimensions of a filter: `tables` × `buckets` × `slots`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterGeometry {
    /// Number of tables (`d`), each backed by one remote region.
    pub tables: usize,
    /// Buckets per table (`b`).
    pub buckets: usize,
    /// Slots per bucket (`c`).
    pub slots: usize,
}

impl FilterGeometry {
    /// Construct a geometry.
    ///
    /// # Panics
    ///
    /// Panics if any dimension is zero, if `tables > 23` (each table needs a
    /// distinct 10-bit window inside a 32-bit fingerprint), or if
    /// `buckets > 1024` (a 10-bit window cannot address more).
    #[must_use]
    pub fn new(tables: usize, buckets: usize, slots: usize) -> Self {
        let max_tables = 32 - BUCKET_WINDOW_BITS as usize + 1;
        assert!((1..=max_tables).contains(&tables), "tables must be in 1..=23");
        assert!((1..=1_usize << BUCKET_WINDOW_BITS).contains(&buckets), "buckets must be in 1..=1024");
        assert!(slots >= 1, "slots must be at least 1");
        Self { tables, buckets, slots }
    }

    /// Total number of cells.
    #[must_use]
    pub fn cells(&self) -> usize {
        self.tables * self.buckets * self.slots
    }

    /// Flat arena index of (table, bucket, slot).
    fn index(&self, table: usize, bucket: usize, slot: usize) -> usize {
        (table * self.buckets + bucket) * self.slots + slot
    }
}

/// One cell of the filter arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    /// Nothing stored here.
    #[default]
    Empty,
    /// A fingerprint and the identifier it was derived from.
    ///
    /// Carrying the identifier lets eviction reinsert the *original* item;
    /// a different identifier could in principle share the fingerprint.
    Occupied {
        /// Stored fingerprint.
        fingerprint: u32,
        /// Identifier the fingerprint summarizes.
        identifier: Identifier,
    },
}

impl Cell {
    /// Whether the cell is unoccupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Stored fingerprint, if occupied.
    #[must_use]
    pub fn fingerprint(&self) -> Option<u32> {
        match self {
            Cell::Empty => None,
            Cell::Occupied { fingerprint, .. } => Some(*fingerprint),
        }
    }

    /// Wire encoding of the cell's desired value: `fingerprint × 4`, zero
    /// when Empty. The low two bits are reserved and carried opaquely.
    #[must_use]
    pub fn encoded(&self) -> u64 {
        match self {
            Cell::Empty => 0,
            Cell::Occupied { fingerprint, .. } => u64::from(*fingerprint) << 2,
        }
    }
}

/// A `d`-way cuckoo filter shadowing a remote register memory.
#[derive(Debug, Clone)]
pub struct CuckooFilter {
    /// Fixed dimensions.
    geometry: FilterGeometry,
    /// Flat (table, bucket, slot) arena.
    cells: Vec<Cell>,
    /// Bound on the length of one eviction chain.
    max_evictions: usize,
    /// Number of occupied cells.
    occupied: usize,
    /// Victim selection; injected so runs are reproducible under a seed.
    rng: StdRng,
}

impl CuckooFilter {
    /// Create an empty filter with entropy-seeded victim selection.
    #[must_use]
    pub fn new(geometry: FilterGeometry) -> Self {
        Self::with_params(geometry, DEFAULT_MAX_EVICTIONS, StdRng::from_entropy())
    }

    /// Create an empty filter with deterministic victim selection.
    #[must_use]
    pub fn with_seed(geometry: FilterGeometry, seed: u64) -> Self {
        Self::with_params(geometry, DEFAULT_MAX_EVICTIONS, StdRng::seed_from_u64(seed))
    }

    /// Create an empty filter with explicit parameters.
    #[must_use]
    pub fn with_params(geometry: FilterGeometry, max_evictions: usize, rng: StdRng) -> Self {
        Self {
            geometry,
            cells: vec![Cell::Empty; geometry.cells()],
            max_evictions,
            occupied: 0,
            rng,
        }
    }

    /// The filter's dimensions.
    #[must_use]
    pub fn geometry(&self) -> FilterGeometry {
        self.geometry
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Whether no cell is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Inspect one cell.
    #[must_use]
    pub fn cell(&self, table: usize, bucket: usize, slot: usize) -> Option<&Cell> {
        if table < self.geometry.tables && bucket < self.geometry.buckets && slot < self.geometry.slots {
            Some(&self.cells[self.geometry.index(table, bucket, slot)])
        } else {
            None
        }
    }

    /// Candidate bucket of a fingerprint in one table: the 10-bit window of
    /// the 32-bit fingerprint starting `table` bits below the most
    /// significant bit, reduced modulo the bucket count. Successive tables
    /// read overlapping windows, giving each an independent bucket choice.
    fn bucket_index(&self, fp: u32, table: usize) -> usize {
        let shift = 32 - BUCKET_WINDOW_BITS - table as u32;
        let window = (fp >> shift) & ((1_u32 << BUCKET_WINDOW_BITS) - 1);
        window as usize % self.geometry.buckets
    }

    /// Insert an identifier, relocating occupants as needed.
    ///
    /// Returns the number of evictions performed (`0` means the identifier
    /// was placed directly). An occupied slot is only ever replaced through
    /// the explicit eviction swap, and every evicted occupant is reinserted
    /// under its own fingerprint before the chain continues.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExceeded`] when the eviction chain exceeds the
    /// configured bound. The error is terminal for this instance: its
    /// contents are unspecified and the caller must rebuild from scratch.
    pub fn insert(&mut self, identifier: Identifier) -> Result<usize> {
        let mut current = identifier;
        for depth in 0..=self.max_evictions {
            let fp = fingerprint(current);

            // Scan every candidate bucket for a free slot.
            for table in 0..self.geometry.tables {
                let bucket = self.bucket_index(fp, table);
                for slot in 0..self.geometry.slots {
                    let idx = self.geometry.index(table, bucket, slot);
                    if self.cells[idx].is_empty() {
                        self.cells[idx] = Cell::Occupied { fingerprint: fp, identifier: current };
                        self.occupied += 1;
                        trace!(
                            "placed {} at table {} bucket {} slot {} after {} evictions",
                            current, table, bucket, slot, depth
                        );
                        return Ok(depth);
                    }
                }
            }

            // Every candidate slot is occupied: swap out a victim chosen
            // uniformly at random. The bucket index is recomputed for the
            // chosen table so the displaced cell stays one of the incoming
            // fingerprint's own candidates.
            let table = self.rng.gen_range(0..self.geometry.tables);
            let slot = self.rng.gen_range(0..self.geometry.slots);
            let bucket = self.bucket_index(fp, table);
            let idx = self.geometry.index(table, bucket, slot);
            let victim = std::mem::replace(
                &mut self.cells[idx],
                Cell::Occupied { fingerprint: fp, identifier: current },
            );
            current = match victim {
                Cell::Occupied { identifier, .. } => identifier,
                // The scan above proved every candidate slot occupied.
                Cell::Empty => unreachable!("eviction target must be occupied"),
            };
            trace!("evicted {} from table {} bucket {} slot {}", current, table, bucket, slot);
        }
        Err(Error::CapacityExceeded { max: self.max_evictions })
    }

    /// Approximate membership probe for an identifier.
    ///
    /// Sound because eviction keeps every occupant inside one of its own
    /// candidate buckets. Subject to fingerprint collisions, like any
    /// approximate-membership structure.
    #[must_use]
    pub fn contains(&self, identifier: Identifier) -> bool {
        self.contains_fingerprint(fingerprint(identifier))
    }

    /// Approximate membership probe for a raw fingerprint.
    #[must_use]
    pub fn contains_fingerprint(&self, fp: u32) -> bool {
        for table in 0..self.geometry.tables {
            let bucket = self.bucket_index(fp, table);
            for slot in 0..self.geometry.slots {
                let idx = self.geometry.index(table, bucket, slot);
                if self.cells[idx].fingerprint() == Some(fp) {
                    return true;
                }
            }
        }
        false
    }

    /// Diff the filter's desired state against an observed snapshot.
    ///
    /// Returns the minimal corrective write-set in table-major,
    /// bucket-ascending order: one entry per (table, bucket) whose desired
    /// fingerprint (zero when Empty) differs from the observed value. An
    /// empty result means local and remote already agree.
    ///
    /// # Errors
    ///
    /// [`Error::MultiSlotDelta`] unless the geometry has exactly one slot
    /// per bucket; [`Error::SnapshotShape`] when the snapshot's dimensions
    /// disagree with the geometry.
    pub fn delta(&self, snapshot: &RegisterSnapshot) -> Result<Vec<DeltaEntry>> {
        if self.geometry.slots != 1 {
            return Err(Error::MultiSlotDelta { slots: self.geometry.slots });
        }
        if snapshot.tables() != self.geometry.tables {
            let got_buckets = snapshot.table(0).map_or(0, <[u32]>::len);
            return Err(self.shape_error(snapshot, got_buckets));
        }

        let mut entries = Vec::new();
        for table in 0..self.geometry.tables {
            let observed = snapshot.table(table).unwrap_or(&[]);
            if observed.len() != self.geometry.buckets {
                return Err(self.shape_error(snapshot, observed.len()));
            }
            for bucket in 0..self.geometry.buckets {
                let desired = self.cells[self.geometry.index(table, bucket, 0)]
                    .fingerprint()
                    .unwrap_or(0);
                if desired != observed[bucket] {
                    entries.push(DeltaEntry { table, bucket, value: desired });
                }
            }
        }
        debug!("computed delta of {} entries", entries.len());
        Ok(entries)
    }

    fn shape_error(&self, snapshot: &RegisterSnapshot, got_buckets: usize) -> Error {
        Error::SnapshotShape {
            tables: self.geometry.tables,
            buckets: self.geometry.buckets,
            got_tables: snapshot.tables(),
            got_buckets,
        }
    }

    /// Force a cell's contents, bypassing insertion. Test scaffolding only.
    #[cfg(test)]
    fn occupy(&mut self, table: usize, bucket: usize, slot: usize, fp: u32, identifier: Identifier) {
        let idx = self.geometry.index(table, bucket, slot);
        if self.cells[idx].is_empty() {
            self.occupied += 1;
        }
        self.cells[idx] = Cell::Occupied { fingerprint: fp, identifier };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_without_eviction() {
        // Four identifiers whose fingerprints land in four distinct
        // table-0 buckets of a (2, 4, 1) filter.
        let expect = [
            ("00:00:00:00:00:01", 1_010_450_227_u32, 0_usize),
            ("00:00:00:00:00:02", 830_020_074, 1),
            ("00:00:00:00:00:03", 901_252_189, 2),
            ("00:00:00:00:00:00", 955_982_468, 3),
        ];
        let mut filter = CuckooFilter::with_seed(FilterGeometry::new(2, 4, 1), 1);

        for (text, _, _) in expect {
            assert_eq!(filter.insert(id(text)).unwrap(), 0);
        }
        assert_eq!(filter.len(), 4);

        for (text, fp, bucket) in expect {
            assert_eq!(
                filter.cell(0, bucket, 0),
                Some(&Cell::Occupied { fingerprint: fp, identifier: id(text) })
            );
        }
        for bucket in 0..4 {
            assert!(filter.cell(1, bucket, 0).unwrap().is_empty());
        }
    }

    #[test]
    fn test_eviction_preserves_membership() {
        // All three share table-0 bucket 3; B and X also share table-1
        // bucket 2, so X's insert must displace an occupant.
        let a = id("00:00:00:00:00:00");
        let b = id("00:00:00:00:00:20");
        let x = id("00:00:00:00:00:24");

        let mut filter = CuckooFilter::with_seed(FilterGeometry::new(2, 4, 1), 9);
        assert_eq!(filter.insert(a).unwrap(), 0);
        assert_eq!(filter.insert(b).unwrap(), 0);

        let evictions = filter.insert(x).unwrap();
        assert!(evictions >= 1);
        assert_eq!(filter.len(), 3);
        assert!(filter.contains(a));
        assert!(filter.contains(b));
        assert!(filter.contains(x));
    }

    #[test]
    fn test_capacity_exceeded_terminates() {
        // One cell total: the second insert ping-pongs with the first until
        // the depth bound trips.
        let mut filter = CuckooFilter::with_seed(FilterGeometry::new(1, 1, 1), 3);
        filter.insert(id("00:00:00:00:00:01")).unwrap();
        assert_eq!(
            filter.insert(id("00:00:00:00:00:02")),
            Err(Error::CapacityExceeded { max: DEFAULT_MAX_EVICTIONS })
        );
    }

    #[test]
    fn test_saturated_bucket_pair_exceeds_capacity() {
        // These three fingerprints collide on table-0 bucket 54 and
        // table-1 bucket 44 of a 64-bucket filter; the overlapping bucket
        // windows make such double collisions far likelier than independent
        // hashing would suggest. Two cells cannot hold three occupants, so
        // the third insert must report saturation rather than loop.
        let mut filter = CuckooFilter::with_seed(FilterGeometry::new(2, 64, 1), 5);
        assert_eq!(filter.insert(Identifier::from_raw(0x73FC_3562_CD20)).unwrap(), 0);
        assert_eq!(filter.insert(Identifier::from_raw(0xE560_A85F_17E9)).unwrap(), 0);
        assert_eq!(
            filter.insert(Identifier::from_raw(0x0213_981B_09C2)),
            Err(Error::CapacityExceeded { max: DEFAULT_MAX_EVICTIONS })
        );
    }

    #[test]
    fn test_seeded_inserts_reproduce() {
        let geometry = FilterGeometry::new(2, 16, 1);
        let mut left = CuckooFilter::with_seed(geometry, 77);
        let mut right = CuckooFilter::with_seed(geometry, 77);
        for low in 0..12_u64 {
            let ident = Identifier::from_raw(low * 31);
            assert_eq!(left.insert(ident).ok(), right.insert(ident).ok());
        }
        for bucket in 0..16 {
            for table in 0..2 {
                assert_eq!(left.cell(table, bucket, 0), right.cell(table, bucket, 0));
            }
        }
    }

    #[test]
    fn test_encoded_cell_value() {
        let cell = Cell::Occupied { fingerprint: 123, identifier: id("00:00:00:00:00:7b") };
        assert_eq!(cell.encoded(), 492);
        assert_eq!(Cell::Empty.encoded(), 0);
        // A full-width fingerprint must not truncate.
        let cell = Cell::Occupied { fingerprint: u32::MAX, identifier: id("00:00:00:00:00:7b") };
        assert_eq!(cell.encoded(), u64::from(u32::MAX) << 2);
    }

    #[test]
    fn test_delta_emits_decoded_fingerprint() {
        // Local holds fingerprint 123 at (0, 2); remote reads all zeros.
        let mut filter = CuckooFilter::with_seed(FilterGeometry::new(2, 4, 1), 1);
        filter.occupy(0, 2, 0, 123, id("00:00:00:00:00:7b"));
        assert_eq!(filter.cell(0, 2, 0).unwrap().encoded(), 492);

        let snapshot = RegisterSnapshot::new(vec![vec![0; 4], vec![0; 4]]);
        let delta = filter.delta(&snapshot).unwrap();
        assert_eq!(delta, vec![DeltaEntry { table: 0, bucket: 2, value: 123 }]);

        // After the remote cell becomes 123, local and remote agree.
        let snapshot = RegisterSnapshot::new(vec![vec![0, 0, 123, 0], vec![0; 4]]);
        assert_eq!(filter.delta(&snapshot).unwrap(), vec![]);
    }

    #[test]
    fn test_delta_orders_table_major() {
        let mut filter = CuckooFilter::with_seed(FilterGeometry::new(2, 4, 1), 1);
        filter.occupy(1, 0, 0, 7, id("00:00:00:00:00:07"));
        filter.occupy(0, 3, 0, 9, id("00:00:00:00:00:09"));
        filter.occupy(0, 1, 0, 5, id("00:00:00:00:00:05"));

        let snapshot = RegisterSnapshot::new(vec![vec![0; 4], vec![0; 4]]);
        let delta = filter.delta(&snapshot).unwrap();
        assert_eq!(
            delta,
            vec![
                DeltaEntry { table: 0, bucket: 1, value: 5 },
                DeltaEntry { table: 0, bucket: 3, value: 9 },
                DeltaEntry { table: 1, bucket: 0, value: 7 },
            ]
        );
    }

    #[test]
    fn test_delta_overwrites_stale_remote_cells() {
        // Remote holds a value the local filter no longer wants: the delta
        // must drive it back to zero.
        let filter = CuckooFilter::with_seed(FilterGeometry::new(1, 4, 1), 1);
        let snapshot = RegisterSnapshot::new(vec![vec![0, 55, 0, 0]]);
        let delta = filter.delta(&snapshot).unwrap();
        assert_eq!(delta, vec![DeltaEntry { table: 0, bucket: 1, value: 0 }]);
    }

    #[test]
    fn test_delta_rejects_multi_slot_geometry() {
        let filter = CuckooFilter::with_seed(FilterGeometry::new(2, 4, 2), 1);
        let snapshot = RegisterSnapshot::new(vec![vec![0; 4], vec![0; 4]]);
        assert_eq!(
            filter.delta(&snapshot),
            Err(Error::MultiSlotDelta { slots: 2 })
        );
    }

    #[test]
    fn test_delta_rejects_wrong_snapshot_shape() {
        let filter = CuckooFilter::with_seed(FilterGeometry::new(2, 4, 1), 1);

        let short = RegisterSnapshot::new(vec![vec![0; 4]]);
        assert_eq!(
            filter.delta(&short),
            Err(Error::SnapshotShape { tables: 2, buckets: 4, got_tables: 1, got_buckets: 4 })
        );

        // The reported bucket count comes from the table that mismatches,
        // not from table 0.
        let ragged = RegisterSnapshot::new(vec![vec![0; 4], vec![0; 3]]);
        assert_eq!(
            filter.delta(&ragged),
            Err(Error::SnapshotShape { tables: 2, buckets: 4, got_tables: 2, got_buckets: 3 })
        );
    }

    #[test]
    #[should_panic(expected = "buckets")]
    fn test_geometry_rejects_oversized_buckets() {
        let _ = FilterGeometry::new(2, 2048, 1);
    }
}
