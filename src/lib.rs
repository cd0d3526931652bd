//! # Regmirror
//!
//! A shadow cuckoo filter with minimal-delta synchronization against a
//! remote register store.
//!
//! The filter held in process memory is the canonical *desired* state of a
//! fixed set of indexed numeric registers living in constrained remote
//! memory (one named register region per filter table). Regmirror provides:
//!
//! - Deterministic fingerprint derivation (CRC-32/BZIP2 over the low 32 bits
//!   of a 48-bit identifier)
//! - A `d`-way cuckoo filter with bounded eviction chains
//! - A delta reconciler that diffs the filter against an observed register
//!   snapshot and emits the minimal corrective write-set
//!
//! Transport to the remote memory is deliberately external: callers hand in
//! snapshots and apply deltas through the [`sync::RegisterStore`] trait.
//!
//! ## Example
//!
//! ```
//! use regmirror::{CuckooFilter, FilterGeometry, Identifier, Result};
//! use regmirror::sync::{self, MemoryStore, RegionMap};
//!
//! fn main() -> Result<()> {
//!     let geometry = FilterGeometry::new(2, 1024, 1);
//!     let mut filter = CuckooFilter::with_seed(geometry, 7);
//!     let map = RegionMap::new(["stage_one", "stage_two"]);
//!     let mut store = MemoryStore::new(&map, geometry.buckets);
//!
//!     filter.insert("11:22:33:44:55:66".parse::<Identifier>()?)?;
//!
//!     let snapshot = sync::read_snapshot(&mut store, &map, geometry.buckets).unwrap();
//!     let delta = filter.delta(&snapshot)?;
//!     sync::apply_delta(&mut store, &map, &delta).unwrap();
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/regmirror/0.1.0")]
#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_qualifications,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

// ─────────────────────────────────────────────────────────────────────────────
// Modules
// ─────────────────────────────────────────────────────────────────────────────

/// Error types and result alias.
pub mod error;
/// Cuckoo filter core and delta computation.
pub mod filter;
/// CRC-32/BZIP2 fingerprint derivation.
pub mod fingerprint;
/// 48-bit identifiers and their wire format.
pub mod identifier;
/// Register store adapter boundary and snapshot/apply helpers.
pub mod sync;

// ─────────────────────────────────────────────────────────────────────────────
// Common Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use error::{Error, Result};
pub use filter::{Cell, CuckooFilter, FilterGeometry};
pub use fingerprint::fingerprint;
pub use identifier::Identifier;
pub use sync::{DeltaEntry, RegisterSnapshot};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bound on the length of a cuckoo eviction chain.
pub const DEFAULT_MAX_EVICTIONS: usize = 20;

/// Width in bits of the bucket-index window cut from a fingerprint.
pub const BUCKET_WINDOW_BITS: u32 = 10;
