//! Synthetic book shared by the unit tests
//!
//! Chapter lengths, thirtieth and seventh starts are the real ones. Quarters
//! split each thirtieth into eight equal runs of verses, ruku sections are
//! spread evenly, and the edition has 6 front-matter pages, 604 text pages and
//! 2 back-matter pages.

use std::sync::Arc;

use crate::metadata::{CanonicalMetadata, EditionMetadata};
use crate::navigation::Position;
use crate::partition::{CanonicalTables, PartitionTables, PositionResolver};
use crate::state::ReaderSettings;
use crate::sync::FocusArbiter;

pub const EDITION: &str = "madinah";
pub const FRONT_MATTER_PAGES: u32 = 6;
pub const TEXT_PAGES: u32 = 604;
pub const BACK_MATTER_PAGES: u32 = 2;
pub const PAGE_COUNT: u32 = FRONT_MATTER_PAGES + TEXT_PAGES + BACK_MATTER_PAGES;
pub const RUKU_COUNT: usize = 556;
pub const VERSE_COUNT: usize = 6236;

const CHAPTER_LENGTHS: [u16; 114] = [
    7, 286, 200, 176, 120, 165, 206, 75, 129, 109, 123, 111, 43, 52, 99, 128, 111, 110, 98, 135,
    112, 78, 118, 64, 77, 227, 93, 88, 69, 60, 34, 30, 73, 54, 45, 83, 182, 88, 75, 85, 54, 53, 89,
    59, 37, 35, 38, 29, 18, 45, 60, 49, 62, 55, 78, 96, 29, 22, 24, 13, 14, 11, 11, 18, 12, 12, 30,
    52, 52, 44, 28, 28, 20, 56, 40, 31, 50, 40, 46, 42, 29, 19, 36, 25, 22, 17, 19, 26, 30, 20, 15,
    21, 11, 8, 8, 19, 5, 8, 8, 11, 11, 8, 3, 9, 5, 4, 7, 3, 6, 3, 5, 4, 5, 6,
];

const THIRTIETH_STARTS: [(u16, u16); 30] = [
    (1, 1), (2, 142), (2, 253), (3, 93), (4, 24), (4, 148), (5, 82), (6, 111), (7, 88), (8, 41),
    (9, 93), (11, 6), (12, 53), (15, 1), (17, 1), (18, 75), (21, 1), (23, 1), (25, 21), (27, 56),
    (29, 46), (33, 31), (36, 28), (39, 32), (41, 47), (46, 1), (51, 31), (58, 1), (67, 1), (78, 1),
];

const SEVENTH_STARTS: [(u16, u16); 7] = [(1, 1), (5, 1), (10, 1), (17, 1), (26, 1), (37, 1), (50, 1)];

pub fn chapter_lengths() -> Vec<u16> {
    CHAPTER_LENGTHS.to_vec()
}

/// Position of the 0-based verse ordinal in reading order
pub fn position_at(mut ordinal: usize) -> Position {
    for (idx, &length) in CHAPTER_LENGTHS.iter().enumerate() {
        let length = usize::from(length);
        if ordinal < length {
            return Position::new(idx as u16 + 1, ordinal as u16 + 1);
        }
        ordinal -= length;
    }
    Position::new(114, 6)
}

/// 0-based verse ordinal of a position
pub fn ordinal_of(position: Position) -> usize {
    let before: usize = CHAPTER_LENGTHS[..usize::from(position.chapter) - 1]
        .iter()
        .map(|&length| usize::from(length))
        .sum();
    before + usize::from(position.verse) - 1
}

fn positions(pairs: &[(u16, u16)]) -> Vec<Position> {
    pairs.iter().map(|&(c, v)| Position::new(c, v)).collect()
}

fn quarters() -> Vec<Position> {
    let starts: Vec<usize> = THIRTIETH_STARTS
        .iter()
        .map(|&(c, v)| ordinal_of(Position::new(c, v)))
        .collect();
    let mut quarters = Vec::with_capacity(240);
    for (idx, &start) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).copied().unwrap_or(VERSE_COUNT);
        for k in 0..8 {
            quarters.push(position_at(start + k * (end - start) / 8));
        }
    }
    quarters
}

fn rukus() -> Vec<Position> {
    (0..RUKU_COUNT)
        .map(|i| position_at(i * VERSE_COUNT / RUKU_COUNT))
        .collect()
}

pub fn canonical_metadata() -> CanonicalMetadata {
    CanonicalMetadata {
        chapter_lengths: chapter_lengths(),
        thirtieths: positions(&THIRTIETH_STARTS),
        quarters: quarters(),
        sevenths: positions(&SEVENTH_STARTS),
        rukus: rukus(),
    }
}

pub fn canonical_tables() -> CanonicalTables {
    CanonicalTables::from_metadata(canonical_metadata()).unwrap()
}

/// First verses: 1:1 alone on the first text page, 2:1 on the second, the
/// remaining verses spread over the other 602 text pages
pub fn edition_metadata() -> EditionMetadata {
    let first_text_page = FRONT_MATTER_PAGES + 1;
    let mut first_verses = vec![(first_text_page, Position::FIRST)];
    let second = ordinal_of(Position::new(2, 1));
    let remaining_pages = (TEXT_PAGES - 1) as usize;
    for k in 0..remaining_pages {
        let ordinal = second + k * (VERSE_COUNT - second) / remaining_pages;
        first_verses.push((first_text_page + 1 + k as u32, position_at(ordinal)));
    }
    EditionMetadata {
        id: EDITION.to_string(),
        page_count: PAGE_COUNT,
        first_verses,
    }
}

/// The fixture edition with raw page 9 opening in the middle of 2:1
pub fn continued_edition_metadata() -> EditionMetadata {
    let mut metadata = edition_metadata();
    metadata.id = "continued".to_string();
    metadata.first_verses[2].1 = Position::new(2, 1);
    metadata
}

pub fn resolver() -> Arc<PositionResolver> {
    resolver_for(edition_metadata())
}

pub fn resolver_for(metadata: EditionMetadata) -> Arc<PositionResolver> {
    let resolver = PositionResolver::new(canonical_tables());
    let pages = resolver.build_page_table(metadata).unwrap();
    resolver.install_edition(pages);
    Arc::new(resolver)
}

pub fn tables() -> PartitionTables {
    resolver().tables().unwrap()
}

pub fn arbiter(compact: bool) -> FocusArbiter {
    let arbiter = FocusArbiter::new();
    arbiter.set_compact(compact);
    arbiter
}

pub fn settings() -> ReaderSettings {
    ReaderSettings {
        edition: EDITION.to_string(),
        ..ReaderSettings::default()
    }
}
