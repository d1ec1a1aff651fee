use serde::{Serialize, Deserialize};

mod engine;
mod position;
mod state;
mod subscriber;

pub use engine::Navigator;
pub use position::{Position, CHAPTER_COUNT};
pub use state::NavigationState;
pub use subscriber::NavigationSubscriber;

use crate::partition::{Partition, PartitionIndices};
use crate::sync::ViewportRole;

/// A single edited field, the input of the update protocol
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NavigationRequest {
    /// Display page number; clamped to the navigable range
    Page(i32),
    /// Raw page image index; clamped to the image range, may be front matter
    PageImage(u32),
    /// Chapter; the verse is forced to 1
    Chapter(u32),
    /// Verse inside the current chapter
    Verse(u16),
    Thirtieth(u32),
    Sixtieth(u32),
    /// Quarter offset 0..=3 inside the current sixtieth
    SubQuarter(u8),
    Seventh(u32),
    Ruku(u32),
    /// Jump to a chapter and verse
    Position(Position),
    /// Re-derive everything from the current chapter and verse
    Refresh,
}

impl NavigationRequest {
    /// Partition whose index is taken as given
    pub fn source(&self) -> Option<Partition> {
        match self {
            NavigationRequest::Page(_) | NavigationRequest::PageImage(_) => Some(Partition::Page),
            NavigationRequest::Chapter(_) => Some(Partition::Chapter),
            NavigationRequest::Thirtieth(_) => Some(Partition::Thirtieth),
            NavigationRequest::Sixtieth(_) => Some(Partition::Sixtieth),
            NavigationRequest::SubQuarter(_) => Some(Partition::SubQuarter),
            NavigationRequest::Seventh(_) => Some(Partition::Seventh),
            NavigationRequest::Ruku(_) => Some(Partition::Ruku),
            NavigationRequest::Verse(_)
            | NavigationRequest::Position(_)
            | NavigationRequest::Refresh => None,
        }
    }
}

/// Read-only copy of a viewport's navigation state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigationSnapshot {
    pub viewport: ViewportRole,
    pub edition: String,
    /// `None` on pages without text
    pub position: Option<Position>,
    /// Raw page image index
    pub page_image: u32,
    /// Display page number, `<= 0` in front matter
    pub page: i32,
    /// Indices in every partition; `chapter` is 0 when there is no text
    pub indices: PartitionIndices,
    /// Verse count of the current chapter
    pub chapter_length: Option<u16>,
}

impl NavigationSnapshot {
    pub fn has_content(&self) -> bool {
        self.position.is_some()
    }

    /// Global sub-quarter index 1..=240
    pub fn subquarter(&self) -> u32 {
        self.indices.subquarter().global()
    }
}

/// Notification sent to subscribers once per applied update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationChange {
    /// The state is consistent and points at a verse
    PositionChanged(NavigationSnapshot),
    /// The page has no text; verse-dependent UI should be suppressed
    NoContent(NavigationSnapshot),
}

impl NavigationChange {
    pub fn snapshot(&self) -> &NavigationSnapshot {
        match self {
            NavigationChange::PositionChanged(snapshot) | NavigationChange::NoContent(snapshot) => {
                snapshot
            }
        }
    }
}

/// Result of an update call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// State written and subscribers told the position changed
    Applied,
    /// No position could be resolved; subscribers told there is no text
    NoContent,
    /// Nothing happened
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The viewport is hidden by the current layout mode
    NotAuthoritative,
    /// Another update of this viewport is still running
    Reentrant,
    /// Verse step past the first verse of the chapter
    StartOfChapter,
    /// Verse step past the last verse of the chapter
    EndOfChapter,
    /// Verse step on a page without text
    NoVerse,
}
