//! Core position resolution and navigation synchronization for the mushaf reader
//!
//! This crate keeps every partition of the book (print pages, chapters,
//! thirtieths, sixtieths and their quarters, sevenths, ruku sections)
//! consistent with a single canonical position, for every live viewport.

pub mod events;
pub mod metadata;
pub mod navigation;
pub mod partition;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod fixtures;

use thiserror::Error;

// Re-export commonly used types
pub use metadata::{
    CanonicalMetadata, CanonicalMetadataProvider, EditionMetadata, EditionMetadataProvider,
};
pub use navigation::{
    NavigationChange, NavigationRequest, NavigationSnapshot, NavigationSubscriber, Navigator,
    Position, SkipReason, UpdateOutcome,
};
pub use partition::{
    CanonicalTables, PageSpread, PageTable, Partition, PartitionTables, PositionResolver, SubQuarter,
};
pub use state::{ReaderSession, ReaderSettings};
pub use sync::{
    FocusArbiter, MemoryPositionStore, ReadingPositionStore, SavedPosition, ViewportRole,
};

/// Errors that can occur while loading tables or navigating
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("no print edition is loaded")]
    EditionNotLoaded,

    #[error("edition '{0}' is not installed")]
    EditionNotInstalled(String),

    #[error("{0} viewport is not open")]
    ViewportNotOpen(ViewportRole),

    #[error("invalid edition state: {0}")]
    InvalidEditionState(String),

    #[error("{partition} table is inconsistent at segment {segment}: {reason}")]
    InconsistentTable {
        partition: Partition,
        segment: u32,
        reason: String,
    },

    #[error("{partition} table has {actual} segments, expected {expected}")]
    SegmentCount {
        partition: Partition,
        expected: usize,
        actual: usize,
    },

    #[error("metadata provider error: {0}")]
    Provider(#[from] anyhow::Error),
}
