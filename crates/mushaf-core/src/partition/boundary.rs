//! Boundary tables: segment index -> first canonical position of the segment

use crate::metadata::CanonicalMetadata;
use crate::navigation::{Position, CHAPTER_COUNT};
use crate::NavigationError;
use super::Partition;

/// Sorted boundary list of one partition
///
/// Segment `i` (1-based) starts at `boundaries[i - 1]`. Boundaries are
/// strictly increasing and the first one is the first verse of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryTable {
    partition: Partition,
    boundaries: Vec<Position>,
}

impl BoundaryTable {
    /// Validate and build a table
    pub fn new(
        partition: Partition,
        boundaries: Vec<Position>,
        chapter_lengths: &[u16],
    ) -> Result<Self, NavigationError> {
        if let Some(expected) = partition.segment_count() {
            if boundaries.len() != expected {
                return Err(NavigationError::SegmentCount {
                    partition,
                    expected,
                    actual: boundaries.len(),
                });
            }
        }

        match boundaries.first() {
            None => {
                return Err(NavigationError::SegmentCount {
                    partition,
                    expected: 1,
                    actual: 0,
                })
            }
            Some(first) if *first != Position::FIRST => {
                return Err(NavigationError::InconsistentTable {
                    partition,
                    segment: 1,
                    reason: format!("first boundary is {} instead of {}", first, Position::FIRST),
                });
            }
            Some(_) => {}
        }

        for (idx, boundary) in boundaries.iter().enumerate() {
            let segment = idx as u32 + 1;
            if !boundary.is_valid(chapter_lengths) {
                return Err(NavigationError::InconsistentTable {
                    partition,
                    segment,
                    reason: format!("boundary {} is not a verse of the book", boundary),
                });
            }
            if idx > 0 && boundaries[idx - 1] >= *boundary {
                return Err(NavigationError::InconsistentTable {
                    partition,
                    segment,
                    reason: format!(
                        "boundary {} does not follow {}",
                        boundary,
                        boundaries[idx - 1]
                    ),
                });
            }
        }

        Ok(Self { partition, boundaries })
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.boundaries.len()
    }

    /// Largest segment whose boundary is `<= position`
    pub fn index_of(&self, position: &Position) -> Option<u32> {
        let count = self.boundaries.partition_point(|boundary| boundary <= position);
        (count > 0).then_some(count as u32)
    }

    /// First position of a 1-based segment
    pub fn position_of(&self, segment: u32) -> Option<Position> {
        let idx = usize::try_from(segment).ok()?.checked_sub(1)?;
        self.boundaries.get(idx).copied()
    }
}

/// Edition-independent tables, loaded once
#[derive(Debug, Clone)]
pub struct CanonicalTables {
    chapter_lengths: Vec<u16>,
    thirtieths: BoundaryTable,
    quarters: BoundaryTable,
    sevenths: BoundaryTable,
    rukus: BoundaryTable,
}

impl CanonicalTables {
    /// Validate provider metadata into immutable tables
    pub fn from_metadata(metadata: CanonicalMetadata) -> Result<Self, NavigationError> {
        let CanonicalMetadata {
            chapter_lengths,
            thirtieths,
            quarters,
            sevenths,
            rukus,
        } = metadata;

        if chapter_lengths.len() != usize::from(CHAPTER_COUNT) {
            return Err(NavigationError::SegmentCount {
                partition: Partition::Chapter,
                expected: usize::from(CHAPTER_COUNT),
                actual: chapter_lengths.len(),
            });
        }
        if let Some(idx) = chapter_lengths.iter().position(|&length| length == 0) {
            return Err(NavigationError::InconsistentTable {
                partition: Partition::Chapter,
                segment: idx as u32 + 1,
                reason: "chapter has no verses".to_string(),
            });
        }

        let thirtieths = BoundaryTable::new(Partition::Thirtieth, thirtieths, &chapter_lengths)?;
        let quarters = BoundaryTable::new(Partition::SubQuarter, quarters, &chapter_lengths)?;
        let sevenths = BoundaryTable::new(Partition::Seventh, sevenths, &chapter_lengths)?;
        let rukus = BoundaryTable::new(Partition::Ruku, rukus, &chapter_lengths)?;

        Ok(Self {
            chapter_lengths,
            thirtieths,
            quarters,
            sevenths,
            rukus,
        })
    }

    pub fn chapter_lengths(&self) -> &[u16] {
        &self.chapter_lengths
    }

    /// Verse count of a 1-based chapter
    pub fn chapter_length(&self, chapter: u16) -> Option<u16> {
        let idx = usize::from(chapter).checked_sub(1)?;
        self.chapter_lengths.get(idx).copied()
    }

    pub fn is_valid(&self, position: &Position) -> bool {
        position.is_valid(&self.chapter_lengths)
    }

    /// Last verse of the book
    pub fn last_position(&self) -> Position {
        let length = self.chapter_lengths.last().copied().unwrap_or(1);
        Position::new(CHAPTER_COUNT, length)
    }

    pub fn thirtieths(&self) -> &BoundaryTable {
        &self.thirtieths
    }

    /// The 240-row quarter table shared by sixtieths and sub-quarters
    pub fn quarters(&self) -> &BoundaryTable {
        &self.quarters
    }

    pub fn sevenths(&self) -> &BoundaryTable {
        &self.sevenths
    }

    pub fn rukus(&self) -> &BoundaryTable {
        &self.rukus
    }

    /// Every tabulated partition, in reading-unit order
    pub fn boundary_tables(&self) -> [&BoundaryTable; 4] {
        [&self.thirtieths, &self.quarters, &self.sevenths, &self.rukus]
    }
}
