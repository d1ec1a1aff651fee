//! Metadata source configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use mushaf_core::{CanonicalMetadataProvider, EditionMetadataProvider};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::cache::CachedEditions;
use crate::sources::{
    CsvCanonicalSource, CsvEditionSource, ImagePageCount, SqliteCanonicalSource,
    SqliteEditionSource,
};
use crate::DataError;

/// Storage format of the metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// `metadata` and `editions` are database files
    Sqlite,
    /// `metadata` and `editions` are directories of CSV files
    Csv,
}

fn default_cache_size() -> usize {
    4
}

/// Where the reader finds its reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    pub format: SourceFormat,

    /// Canonical tables
    pub metadata: PathBuf,

    /// Edition layouts
    pub editions: PathBuf,

    /// Page image root; an edition's image count overrides its page count
    #[serde(default)]
    pub images: Option<PathBuf>,

    /// Number of editions kept in memory
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

/// Providers built from a [`DataConfig`]
#[derive(Clone)]
pub struct Providers {
    pub canonical: Arc<dyn CanonicalMetadataProvider>,
    pub editions: Arc<dyn EditionMetadataProvider>,
}

impl DataConfig {
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Open the configured sources
    pub fn open(&self) -> Result<Providers, DataError> {
        info!(
            "Opening {:?} metadata at {} and editions at {}",
            self.format,
            self.metadata.display(),
            self.editions.display()
        );
        let (canonical, editions): (Arc<dyn CanonicalMetadataProvider>, Box<dyn EditionMetadataProvider>) =
            match self.format {
                SourceFormat::Sqlite => (
                    Arc::new(SqliteCanonicalSource::open(&self.metadata)?),
                    Box::new(SqliteEditionSource::open(&self.editions)?),
                ),
                SourceFormat::Csv => (
                    Arc::new(CsvCanonicalSource::new(&self.metadata)),
                    Box::new(CsvEditionSource::new(&self.editions)),
                ),
            };

        let editions = match &self.images {
            Some(images) => Box::new(ImagePageCount::new(editions, images)) as Box<dyn EditionMetadataProvider>,
            None => editions,
        };

        Ok(Providers {
            canonical,
            editions: Arc::new(CachedEditions::new(editions, self.cache_size)),
        })
    }
}
