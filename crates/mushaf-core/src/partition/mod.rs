//! Partitions of the canonical sequence and their boundary tables

use serde::{Serialize, Deserialize};
use std::fmt;

mod boundary;
mod page;
mod resolver;
mod subquarter;

pub use boundary::{BoundaryTable, CanonicalTables};
pub use page::{PageSpread, PageTable};
pub use resolver::{PartitionIndices, PartitionTables, PositionResolver};
pub use subquarter::SubQuarter;

/// The segmentations of the book kept in sync by the navigator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Print pages of the loaded edition (raw image index)
    Page,
    /// Chapters, each starting at its first verse
    Chapter,
    /// Thirtieths
    Thirtieth,
    /// Sixtieths
    Sixtieth,
    /// Quarters of a sixtieth, numbered globally 1..=240
    SubQuarter,
    /// Sevenths
    Seventh,
    /// Ruku sections
    Ruku,
}

impl Partition {
    pub const ALL: [Partition; 7] = [
        Partition::Page,
        Partition::Chapter,
        Partition::Thirtieth,
        Partition::Sixtieth,
        Partition::SubQuarter,
        Partition::Seventh,
        Partition::Ruku,
    ];

    /// Fixed segment count, `None` where it depends on loaded data
    pub fn segment_count(&self) -> Option<usize> {
        match self {
            Partition::Page | Partition::Ruku => None,
            Partition::Chapter => Some(114),
            Partition::Thirtieth => Some(30),
            Partition::Sixtieth => Some(60),
            Partition::SubQuarter => Some(240),
            Partition::Seventh => Some(7),
        }
    }

    /// Whether the boundaries differ between print editions
    pub fn is_edition_specific(&self) -> bool {
        matches!(self, Partition::Page)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Partition::Page => "page",
            Partition::Chapter => "chapter",
            Partition::Thirtieth => "thirtieth",
            Partition::Sixtieth => "sixtieth",
            Partition::SubQuarter => "sub-quarter",
            Partition::Seventh => "seventh",
            Partition::Ruku => "ruku",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
