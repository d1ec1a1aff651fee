//! Per-viewport navigation state and the resolution of one edit

use crate::partition::{PageTable, Partition, PartitionIndices, PartitionTables, SubQuarter};
use super::{NavigationRequest, Position};

/// Current position of one viewport projected through every partition
///
/// For a state with text, re-deriving the indices from `position` yields
/// `indices` exactly, except that the page may be any page showing the
/// position when a verse runs over several pages. Without text `position` is
/// `None`, `indices.chapter` is 0 and the other indices keep the values they
/// had before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    position: Option<Position>,
    indices: PartitionIndices,
}

/// What an edit resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    Content(NavigationState),
    NoContent(NavigationState),
}

impl NavigationState {
    /// Derive a state from a position
    pub fn from_position(tables: &PartitionTables, position: Position) -> Option<Self> {
        let indices = tables.project(&position)?;
        Some(Self {
            position: Some(position),
            indices,
        })
    }

    /// Derive a state from a position, staying on raw page `page` when it shows the position
    pub fn from_position_on(tables: &PartitionTables, position: Position, page: u32) -> Option<Self> {
        let mut state = Self::from_position(tables, position)?;
        if tables.pages().shows(page, &position) {
            state.indices.page = page;
        }
        Some(state)
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn indices(&self) -> &PartitionIndices {
        &self.indices
    }

    pub fn has_content(&self) -> bool {
        self.position.is_some()
    }

    /// Current segment of `partition`; `None` for the chapter without text
    pub fn current(&self, partition: Partition) -> Option<u32> {
        match partition {
            Partition::Chapter => self.position.map(|position| u32::from(position.chapter)),
            other => Some(self.indices.get(other)),
        }
    }

    /// Resolve an edit against the tables, leaving `self` untouched
    pub(crate) fn resolve(&self, tables: &PartitionTables, request: NavigationRequest) -> Resolution {
        let pages = tables.pages();
        if self.is_current(pages, request) {
            return Resolution::Content(self.clone());
        }
        match request {
            NavigationRequest::Page(display) => self.resolve_page(tables, Self::display_to_raw(pages, display)),
            NavigationRequest::PageImage(raw) => self.resolve_page(tables, pages.clamp_raw(raw)),
            NavigationRequest::Chapter(chapter) => {
                self.resolve_segment(tables, Partition::Chapter, chapter)
            }
            NavigationRequest::Verse(verse) => match self.position {
                Some(position) => self.resolve_position(tables, Position::new(position.chapter, verse)),
                None => self.no_content(None),
            },
            NavigationRequest::Thirtieth(segment) => {
                self.resolve_segment(tables, Partition::Thirtieth, segment)
            }
            NavigationRequest::Sixtieth(sixtieth) => {
                self.resolve_subquarter(tables, SubQuarter::first_of(sixtieth))
            }
            NavigationRequest::SubQuarter(offset) => {
                self.resolve_subquarter(tables, SubQuarter::new(self.indices.sixtieth, offset))
            }
            NavigationRequest::Seventh(segment) => {
                self.resolve_segment(tables, Partition::Seventh, segment)
            }
            NavigationRequest::Ruku(segment) => self.resolve_segment(tables, Partition::Ruku, segment),
            NavigationRequest::Position(position) => self.resolve_position(tables, position),
            NavigationRequest::Refresh => match self.position {
                Some(position) => self.resolve_position(tables, position),
                None => self.resolve_page(tables, pages.clamp_raw(self.indices.page)),
            },
        }
    }

    /// Re-derive every index after the page table changed
    pub(crate) fn reproject(&self, tables: &PartitionTables) -> Resolution {
        match self.position {
            Some(position) => match Self::from_position(tables, position) {
                Some(state) => Resolution::Content(state),
                None => self.no_content(None),
            },
            None => self.resolve_page(tables, tables.pages().clamp_raw(self.indices.page)),
        }
    }

    /// Take over the position and page of another viewport
    pub(crate) fn resolve_seed(&self, tables: &PartitionTables, position: Option<Position>, page: u32) -> Resolution {
        match position {
            Some(position) => match Self::from_position_on(tables, position, page) {
                Some(state) => Resolution::Content(state),
                None => self.no_content(None),
            },
            None => self.resolve_page(tables, tables.pages().clamp_raw(page)),
        }
    }

    /// Whether `request` names the segment the state already shows
    fn is_current(&self, pages: &PageTable, request: NavigationRequest) -> bool {
        if !self.has_content() {
            return false;
        }
        let indices = &self.indices;
        match request {
            NavigationRequest::Page(display) => Self::display_to_raw(pages, display) == indices.page,
            NavigationRequest::PageImage(raw) => pages.clamp_raw(raw) == indices.page,
            NavigationRequest::Chapter(chapter) => chapter == indices.chapter,
            NavigationRequest::Thirtieth(segment) => segment == indices.thirtieth,
            NavigationRequest::Sixtieth(sixtieth) => sixtieth == indices.sixtieth,
            NavigationRequest::SubQuarter(offset) => offset == indices.subquarter_offset,
            NavigationRequest::Seventh(segment) => segment == indices.seventh,
            NavigationRequest::Ruku(segment) => segment == indices.ruku,
            NavigationRequest::Verse(_) | NavigationRequest::Position(_) | NavigationRequest::Refresh => false,
        }
    }

    fn display_to_raw(pages: &PageTable, display: i32) -> u32 {
        let display = pages.clamp_display(display);
        pages.raw_page(display).unwrap_or_else(|| pages.start_offset())
    }

    /// Stays on the current page when it shows `position`
    fn resolve_position(&self, tables: &PartitionTables, position: Position) -> Resolution {
        match Self::from_position_on(tables, position, self.indices.page) {
            Some(state) => Resolution::Content(state),
            None => self.no_content(None),
        }
    }

    fn resolve_page(&self, tables: &PartitionTables, raw: u32) -> Resolution {
        let Some(position) = tables.position_of(Partition::Page, raw) else {
            return self.no_content(Some(raw));
        };
        match Self::from_position_on(tables, position, raw) {
            Some(state) => Resolution::Content(state),
            None => self.no_content(Some(raw)),
        }
    }

    fn resolve_segment(&self, tables: &PartitionTables, partition: Partition, segment: u32) -> Resolution {
        let Some(position) = tables.position_of(partition, segment) else {
            return self.no_content(None);
        };
        let Some(mut state) = Self::from_position(tables, position) else {
            return self.no_content(None);
        };
        match partition {
            Partition::Chapter => state.indices.chapter = segment,
            Partition::Thirtieth => state.indices.thirtieth = segment,
            Partition::Seventh => state.indices.seventh = segment,
            Partition::Ruku => state.indices.ruku = segment,
            Partition::Page | Partition::Sixtieth | Partition::SubQuarter => {}
        }
        Resolution::Content(state)
    }

    fn resolve_subquarter(&self, tables: &PartitionTables, subquarter: Option<SubQuarter>) -> Resolution {
        let Some(subquarter) = subquarter else {
            return self.no_content(None);
        };
        let Some(position) = tables.subquarter_position(subquarter) else {
            return self.no_content(None);
        };
        match Self::from_position(tables, position) {
            Some(mut state) => {
                state.indices.sixtieth = subquarter.sixtieth;
                state.indices.subquarter_offset = subquarter.offset;
                Resolution::Content(state)
            }
            None => self.no_content(None),
        }
    }

    /// Only the page index and the chapter sentinel change
    fn no_content(&self, page: Option<u32>) -> Resolution {
        let mut indices = self.indices;
        indices.chapter = 0;
        if let Some(page) = page {
            indices.page = page;
        }
        Resolution::NoContent(Self {
            position: None,
            indices,
        })
    }
}
