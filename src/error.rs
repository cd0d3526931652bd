//! Error types for regmirror.
//!
//! Core errors are raised synchronously at the call that detects them.
//! Register store adapters keep their own error types; see
//! [`crate::sync::SyncError`].

use thiserror::Error;

/// Result type alias for regmirror operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the filter core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Identifier text does not match the `"xx:xx:xx:xx:xx:xx"` wire format.
    ///
    /// Raised before any state mutation; a filter that returns this error
    /// has not been touched.
    #[error("malformed identifier: {0:?}")]
    MalformedIdentifier(String),

    /// An insertion's eviction chain exceeded the configured depth bound.
    ///
    /// Terminal for the filter instance: its contents are unspecified and it
    /// must be discarded and rebuilt from the original identifiers.
    #[error("eviction chain exceeded {max} relocations; filter must be rebuilt")]
    CapacityExceeded {
        /// The depth bound that was exhausted.
        max: usize,
    },

    /// Delta computation requires single-slot buckets.
    #[error("delta requires single-slot buckets, geometry has {slots} slots")]
    MultiSlotDelta {
        /// Slots per bucket in the offending geometry.
        slots: usize,
    },

    /// A register snapshot's dimensions disagree with the filter geometry.
    #[error("snapshot shape {got_tables}x{got_buckets} does not match filter geometry {tables}x{buckets}")]
    SnapshotShape {
        /// Tables expected by the filter.
        tables: usize,
        /// Buckets per table expected by the filter.
        buckets: usize,
        /// Tables present in the snapshot.
        got_tables: usize,
        /// Buckets in the offending snapshot table (the first table when
        /// the table count itself is wrong).
        got_buckets: usize,
    },
}
