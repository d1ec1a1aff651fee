//! Interfaces of the metadata providers feeding the boundary tables

use std::sync::Arc;
use serde::{Serialize, Deserialize};

use crate::navigation::Position;

/// Edition-independent reference data for the whole book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetadata {
    /// Verse count of each chapter, in chapter order
    pub chapter_lengths: Vec<u16>,
    /// First verse of each thirtieth
    pub thirtieths: Vec<Position>,
    /// First verse of each quarter of a sixtieth (240 rows)
    pub quarters: Vec<Position>,
    /// First verse of each seventh
    pub sevenths: Vec<Position>,
    /// First verse of each ruku section
    pub rukus: Vec<Position>,
}

/// Page layout of one print edition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionMetadata {
    /// Edition identifier
    pub id: String,
    /// Number of page images, raw pages are `1..=page_count`
    pub page_count: u32,
    /// (raw page, first verse shown on it) for every page carrying text
    ///
    /// A page that opens in the middle of a verse repeats the verse it continues.
    pub first_verses: Vec<(u32, Position)>,
}

/// Source of the canonical tables, read once at startup
pub trait CanonicalMetadataProvider: Send + Sync {
    fn canonical_metadata(&self) -> anyhow::Result<CanonicalMetadata>;
}

/// Source of edition page tables
pub trait EditionMetadataProvider: Send + Sync {
    /// Page table of `edition`, `None` when the edition is not installed
    fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>>;

    /// Identifiers of installed editions
    fn installed_editions(&self) -> anyhow::Result<Vec<String>>;
}

impl<P: EditionMetadataProvider + ?Sized> EditionMetadataProvider for Box<P> {
    fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
        (**self).edition_metadata(edition)
    }

    fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
        (**self).installed_editions()
    }
}

impl<P: EditionMetadataProvider + ?Sized> EditionMetadataProvider for Arc<P> {
    fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
        (**self).edition_metadata(edition)
    }

    fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
        (**self).installed_editions()
    }
}
