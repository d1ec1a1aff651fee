//! Print-page partition of one edition

use std::ops::RangeInclusive;
use serde::{Serialize, Deserialize};

use crate::metadata::EditionMetadata;
use crate::navigation::Position;
use crate::NavigationError;
use super::{CanonicalTables, Partition};

/// Page boundaries of the loaded edition
///
/// Pages are addressed by their raw image index `1..=page_count`. Pages
/// without a first verse (front and back matter) have no textual content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    edition: String,
    page_count: u32,
    /// (raw page, first verse shown), for every page with text
    first_verses: Vec<(u32, Position)>,
    /// (raw page, verse), first page of each distinct first verse; strictly increasing in both
    starts: Vec<(u32, Position)>,
    /// Raw page on which the first verse of the book starts
    start_offset: u32,
}

/// Raw pages shown side by side for one raw page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpread {
    /// Leading page of the spread (the right-hand page in a right-to-left layout)
    pub first: Option<u32>,
    /// Following page, only in dual-page mode
    pub second: Option<u32>,
}

impl PageTable {
    /// Validate edition metadata against the canonical tables
    pub fn new(metadata: EditionMetadata, canonical: &CanonicalTables) -> Result<Self, NavigationError> {
        let EditionMetadata { id, page_count, first_verses } = metadata;

        if page_count == 0 {
            return Err(NavigationError::InvalidEditionState(format!(
                "edition '{}' has no pages",
                id
            )));
        }
        let Some(&(start_offset, first)) = first_verses.first() else {
            return Err(NavigationError::InvalidEditionState(format!(
                "edition '{}' has an empty page table",
                id
            )));
        };
        if first != Position::FIRST {
            return Err(NavigationError::InvalidEditionState(format!(
                "edition '{}' starts its text at {} instead of {}",
                id,
                first,
                Position::FIRST
            )));
        }

        let mut starts: Vec<(u32, Position)> = Vec::with_capacity(first_verses.len());
        for (idx, &(raw, position)) in first_verses.iter().enumerate() {
            if raw == 0 || raw > page_count {
                return Err(NavigationError::InconsistentTable {
                    partition: Partition::Page,
                    segment: raw,
                    reason: format!("page outside 1..={}", page_count),
                });
            }
            if !canonical.is_valid(&position) {
                return Err(NavigationError::InconsistentTable {
                    partition: Partition::Page,
                    segment: raw,
                    reason: format!("boundary {} is not a verse of the book", position),
                });
            }
            if idx > 0 {
                let (prev_raw, prev_position) = first_verses[idx - 1];
                if prev_raw >= raw || prev_position > position {
                    return Err(NavigationError::InconsistentTable {
                        partition: Partition::Page,
                        segment: raw,
                        reason: format!(
                            "page starting at {} does not follow page {} starting at {}",
                            position, prev_raw, prev_position
                        ),
                    });
                }
            }
            if starts.last().map_or(true, |&(_, previous)| previous < position) {
                starts.push((raw, position));
            }
        }

        Ok(Self {
            edition: id,
            page_count,
            first_verses,
            starts,
            start_offset,
        })
    }

    pub fn edition(&self) -> &str {
        &self.edition
    }

    /// Number of raw page images in the edition
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Raw page showing the first verse of the book
    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    /// Whether `raw` is an image of this edition
    pub fn contains(&self, raw: u32) -> bool {
        (1..=self.page_count).contains(&raw)
    }

    /// Raw page on which `position` starts: the largest page whose first verse is `<= position`
    ///
    /// A verse carried over onto following pages belongs to the page it starts on.
    pub fn index_of(&self, position: &Position) -> Option<u32> {
        let count = self.starts.partition_point(|(_, start)| start <= position);
        count.checked_sub(1).map(|idx| self.starts[idx].0)
    }

    /// First verse shown on raw page `raw`, `None` for pages without text
    pub fn position_of(&self, raw: u32) -> Option<Position> {
        self.first_verses
            .binary_search_by_key(&raw, |&(page, _)| page)
            .ok()
            .map(|idx| self.first_verses[idx].1)
    }

    /// Whether raw page `raw` shows `position`, also as the continuation of a verse
    pub fn shows(&self, raw: u32, position: &Position) -> bool {
        let count = self.first_verses.partition_point(|(_, first)| first <= position);
        let Some(&(last, _)) = count.checked_sub(1).and_then(|idx| self.first_verses.get(idx)) else {
            return false;
        };
        self.index_of(position).map_or(false, |first| first <= raw && raw <= last)
    }

    /// User-facing page number; front matter numbers are `<= 0`
    pub fn display_page(&self, raw: u32) -> i32 {
        raw as i32 - self.start_offset as i32 + 1
    }

    /// Raw page of a display number, `None` outside the image range
    pub fn raw_page(&self, display: i32) -> Option<u32> {
        let raw = i64::from(display) + i64::from(self.start_offset) - 1;
        u32::try_from(raw).ok().filter(|raw| self.contains(*raw))
    }

    /// Display numbers a reader may navigate to; front matter is excluded
    pub fn display_range(&self) -> RangeInclusive<i32> {
        1..=self.display_page(self.page_count).max(1)
    }

    /// Clamp a requested display number into the navigable range
    pub fn clamp_display(&self, display: i32) -> i32 {
        let range = self.display_range();
        display.clamp(*range.start(), *range.end())
    }

    /// Clamp a raw page into the image range
    pub fn clamp_raw(&self, raw: u32) -> u32 {
        raw.clamp(1, self.page_count)
    }

    /// Pages shown for `raw`; in dual mode spreads start on even raw pages
    pub fn spread(&self, raw: u32, dual_page: bool) -> PageSpread {
        let visible = |page: u32| self.contains(page).then_some(page);
        if !dual_page {
            return PageSpread {
                first: visible(raw),
                second: None,
            };
        }
        let base = if raw % 2 == 1 { raw - 1 } else { raw };
        PageSpread {
            first: visible(base),
            second: visible(base + 1),
        }
    }
}
