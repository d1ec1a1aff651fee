//! Position <-> segment index conversion over all partitions

use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::metadata::{CanonicalMetadataProvider, EditionMetadata};
use crate::navigation::{Position, CHAPTER_COUNT};
use crate::NavigationError;
use super::{CanonicalTables, PageTable, Partition, SubQuarter};

/// Index of one position in every partition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionIndices {
    /// Raw page index
    pub page: u32,
    pub chapter: u32,
    pub thirtieth: u32,
    pub sixtieth: u32,
    /// Quarter inside the sixtieth, 0..=3
    pub subquarter_offset: u8,
    pub seventh: u32,
    pub ruku: u32,
}

impl PartitionIndices {
    pub fn subquarter(&self) -> SubQuarter {
        SubQuarter {
            sixtieth: self.sixtieth,
            offset: self.subquarter_offset,
        }
    }

    /// Segment index in `partition`; sub-quarters are reported globally
    pub fn get(&self, partition: Partition) -> u32 {
        match partition {
            Partition::Page => self.page,
            Partition::Chapter => self.chapter,
            Partition::Thirtieth => self.thirtieth,
            Partition::Sixtieth => self.sixtieth,
            Partition::SubQuarter => self.subquarter().global(),
            Partition::Seventh => self.seventh,
            Partition::Ruku => self.ruku,
        }
    }
}

/// Immutable view over the canonical tables and one edition's page table
///
/// One view is taken per update so a concurrent edition swap never mixes two
/// page tables inside a single resolution.
#[derive(Debug, Clone)]
pub struct PartitionTables {
    canonical: Arc<CanonicalTables>,
    pages: Arc<PageTable>,
}

impl PartitionTables {
    pub fn new(canonical: Arc<CanonicalTables>, pages: Arc<PageTable>) -> Self {
        Self { canonical, pages }
    }

    pub fn canonical(&self) -> &CanonicalTables {
        &self.canonical
    }

    pub fn pages(&self) -> &PageTable {
        &self.pages
    }

    /// Largest segment of `partition` whose boundary is `<= position`
    pub fn index_of(&self, partition: Partition, position: &Position) -> Option<u32> {
        if !self.canonical.is_valid(position) {
            return None;
        }
        match partition {
            Partition::Page => self.pages.index_of(position),
            Partition::Chapter => Some(u32::from(position.chapter)),
            Partition::Thirtieth => self.canonical.thirtieths().index_of(position),
            Partition::Sixtieth => self
                .canonical
                .quarters()
                .index_of(position)
                .and_then(SubQuarter::from_global)
                .map(|sq| sq.sixtieth),
            Partition::SubQuarter => self.canonical.quarters().index_of(position),
            Partition::Seventh => self.canonical.sevenths().index_of(position),
            Partition::Ruku => self.canonical.rukus().index_of(position),
        }
    }

    /// First position of segment `segment` of `partition`
    pub fn position_of(&self, partition: Partition, segment: u32) -> Option<Position> {
        match partition {
            Partition::Page => self.pages.position_of(segment),
            Partition::Chapter => u16::try_from(segment)
                .ok()
                .filter(|chapter| (1..=CHAPTER_COUNT).contains(chapter))
                .map(Position::chapter_start),
            Partition::Thirtieth => self.canonical.thirtieths().position_of(segment),
            Partition::Sixtieth => {
                let first = SubQuarter::first_of(segment)?;
                self.canonical.quarters().position_of(first.global())
            }
            Partition::SubQuarter => self.canonical.quarters().position_of(segment),
            Partition::Seventh => self.canonical.sevenths().position_of(segment),
            Partition::Ruku => self.canonical.rukus().position_of(segment),
        }
    }

    /// First position of a (sixtieth, offset) sub-quarter
    pub fn subquarter_position(&self, subquarter: SubQuarter) -> Option<Position> {
        self.canonical.quarters().position_of(subquarter.global())
    }

    /// Project a position through every partition
    pub fn project(&self, position: &Position) -> Option<PartitionIndices> {
        let quarter = self.index_of(Partition::SubQuarter, position)?;
        let subquarter = SubQuarter::from_global(quarter)?;
        Some(PartitionIndices {
            page: self.index_of(Partition::Page, position)?,
            chapter: self.index_of(Partition::Chapter, position)?,
            thirtieth: self.index_of(Partition::Thirtieth, position)?,
            sixtieth: subquarter.sixtieth,
            subquarter_offset: subquarter.offset,
            seventh: self.index_of(Partition::Seventh, position)?,
            ruku: self.index_of(Partition::Ruku, position)?,
        })
    }
}

/// Holds the reference tables for the lifetime of the application
///
/// The canonical tables never change. The page table is replaced on edition
/// switch under a write lock; readers take a [`PartitionTables`] view.
pub struct PositionResolver {
    canonical: Arc<CanonicalTables>,
    pages: RwLock<Option<Arc<PageTable>>>,
}

impl PositionResolver {
    /// Create a resolver with no edition loaded
    pub fn new(canonical: CanonicalTables) -> Self {
        Self {
            canonical: Arc::new(canonical),
            pages: RwLock::new(None),
        }
    }

    /// Load and validate the canonical tables from a provider
    pub fn from_provider(provider: &dyn CanonicalMetadataProvider) -> Result<Self, NavigationError> {
        let metadata = provider.canonical_metadata()?;
        let canonical = CanonicalTables::from_metadata(metadata)?;
        for table in canonical.boundary_tables() {
            debug!("Loaded {} table, {} segments", table.partition(), table.segment_count());
        }
        Ok(Self::new(canonical))
    }

    pub fn canonical(&self) -> &Arc<CanonicalTables> {
        &self.canonical
    }

    /// Validate edition metadata into a page table without installing it
    pub fn build_page_table(&self, metadata: EditionMetadata) -> Result<PageTable, NavigationError> {
        PageTable::new(metadata, &self.canonical)
    }

    /// Replace the page table, returning the previous one
    pub fn install_edition(&self, pages: PageTable) -> Option<Arc<PageTable>> {
        info!(
            "Installing edition '{}' ({} pages, text from page {})",
            pages.edition(),
            pages.page_count(),
            pages.start_offset()
        );
        self.pages.write().replace(Arc::new(pages))
    }

    /// Drop the page table; navigation is refused until an edition is installed
    pub fn clear_edition(&self) -> Option<Arc<PageTable>> {
        self.pages.write().take()
    }

    /// Identifier of the installed edition
    pub fn edition(&self) -> Option<String> {
        self.pages.read().as_ref().map(|pages| pages.edition().to_string())
    }

    /// Snapshot of all tables for one resolution
    pub fn tables(&self) -> Result<PartitionTables, NavigationError> {
        let pages = self
            .pages
            .read()
            .clone()
            .ok_or(NavigationError::EditionNotLoaded)?;
        Ok(PartitionTables::new(self.canonical.clone(), pages))
    }
}
