use serde::{Serialize, Deserialize};
use std::fmt;

/// Number of chapters in the book
pub const CHAPTER_COUNT: u16 = 114;

/// A canonical position in the book (chapter, verse), both 1-based
///
/// The derived ordering is the canonical reading order: chapters ascending,
/// verses ascending within a chapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub chapter: u16,
    pub verse: u16,
}

impl Position {
    /// The first verse of the book
    pub const FIRST: Position = Position { chapter: 1, verse: 1 };

    pub const fn new(chapter: u16, verse: u16) -> Self {
        Self { chapter, verse }
    }

    /// First verse of `chapter`
    pub const fn chapter_start(chapter: u16) -> Self {
        Self { chapter, verse: 1 }
    }

    /// Check the position against the chapter lengths of the book
    pub fn is_valid(&self, chapter_lengths: &[u16]) -> bool {
        if self.chapter == 0 || self.verse == 0 {
            return false;
        }
        chapter_lengths
            .get(usize::from(self.chapter) - 1)
            .is_some_and(|&length| self.verse <= length)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}
