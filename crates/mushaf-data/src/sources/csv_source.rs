//! CSV metadata sources

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use csv::{ReaderBuilder, Trim};
use mushaf_core::{
    CanonicalMetadata, CanonicalMetadataProvider, EditionMetadata, EditionMetadataProvider,
    Position,
};
use serde::Deserialize;
use tracing::debug;

use super::{check_sequence, first_verses, position, validate_identifier};
use crate::DataError;

const CHAPTERS_FILE: &str = "chapters.csv";
const THIRTIETHS_FILE: &str = "thirtieths.csv";
const QUARTERS_FILE: &str = "quarters.csv";
const SEVENTHS_FILE: &str = "sevenths.csv";
const RUKUS_FILE: &str = "rukus.csv";

#[derive(Debug, Deserialize)]
struct ChapterRow {
    id: i64,
    verses: u16,
}

#[derive(Debug, Deserialize)]
struct BoundaryRow {
    id: i64,
    chapter: i64,
    verse: i64,
}

#[derive(Debug, Deserialize)]
struct PageRow {
    page: u32,
    chapter: i64,
    verse: i64,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader)
}

/// Parse `id, verses` rows
pub fn read_chapter_lengths<R: Read>(reader: R) -> Result<Vec<u16>, DataError> {
    let mut lengths = Vec::new();
    for (idx, row) in csv_reader(reader).deserialize::<ChapterRow>().enumerate() {
        let row = row?;
        check_sequence(CHAPTERS_FILE, idx, row.id)?;
        lengths.push(row.verses);
    }
    Ok(lengths)
}

/// Parse `id, chapter, verse` boundary rows
pub fn read_boundaries<R: Read>(source_name: &str, reader: R) -> Result<Vec<Position>, DataError> {
    let mut boundaries = Vec::new();
    for (idx, row) in csv_reader(reader).deserialize::<BoundaryRow>().enumerate() {
        let row = row?;
        check_sequence(source_name, idx, row.id)?;
        boundaries.push(position(source_name, idx, row.chapter, row.verse)?);
    }
    Ok(boundaries)
}

/// Parse `page, chapter, verse` layout rows into the highest page and the first verse of each page
pub fn read_layout<R: Read>(source_name: &str, reader: R) -> Result<(u32, Vec<(u32, Position)>), DataError> {
    let mut layout = Vec::new();
    for (idx, row) in csv_reader(reader).deserialize::<PageRow>().enumerate() {
        let row = row?;
        layout.push((row.page, position(source_name, idx, row.chapter, row.verse)?));
    }
    let last_page = layout.last().map_or(0, |&(page, _)| page);
    Ok((last_page, first_verses(source_name, layout)?))
}

fn open_file(dir: &Path, name: &str) -> Result<BufReader<File>, DataError> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(DataError::MissingTable(path.display().to_string()));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// Canonical tables as one CSV file per table
pub struct CsvCanonicalSource {
    dir: PathBuf,
}

impl CsvCanonicalSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn boundaries(&self, name: &str) -> Result<Vec<Position>, DataError> {
        read_boundaries(name, open_file(&self.dir, name)?)
    }

    fn read(&self) -> Result<CanonicalMetadata, DataError> {
        Ok(CanonicalMetadata {
            chapter_lengths: read_chapter_lengths(open_file(&self.dir, CHAPTERS_FILE)?)?,
            thirtieths: self.boundaries(THIRTIETHS_FILE)?,
            quarters: self.boundaries(QUARTERS_FILE)?,
            sevenths: self.boundaries(SEVENTHS_FILE)?,
            rukus: self.boundaries(RUKUS_FILE)?,
        })
    }
}

impl CanonicalMetadataProvider for CsvCanonicalSource {
    fn canonical_metadata(&self) -> anyhow::Result<CanonicalMetadata> {
        Ok(self.read()?)
    }
}

/// Edition layouts as `<edition>.csv`, with an optional `<edition>.pages` page count
pub struct CsvEditionSource {
    dir: PathBuf,
}

impl CsvEditionSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn page_count(&self, edition: &str) -> Result<Option<u32>, DataError> {
        let path = self.dir.join(format!("{}.pages", edition));
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let count = text.trim().parse::<u32>().map_err(|err| DataError::InvalidRow {
            source_name: path.display().to_string(),
            row: 0,
            reason: err.to_string(),
        })?;
        Ok(Some(count))
    }

    fn read(&self, edition: &str) -> Result<Option<EditionMetadata>, DataError> {
        let name = format!("{}.csv", validate_identifier(edition)?);
        if !self.dir.join(&name).is_file() {
            debug!("No layout file for edition '{}'", edition);
            return Ok(None);
        }

        let (last_page, first_verses) = read_layout(&name, open_file(&self.dir, &name)?)?;
        let page_count = self.page_count(edition)?.unwrap_or(last_page);
        debug!(
            "Read edition '{}': {} pages, {} with text",
            edition,
            page_count,
            first_verses.len()
        );
        Ok(Some(EditionMetadata {
            id: edition.to_string(),
            page_count,
            first_verses,
        }))
    }

    fn editions(&self) -> Result<Vec<String>, DataError> {
        let mut editions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if validate_identifier(stem).is_ok() {
                    editions.push(stem.to_string());
                }
            }
        }
        editions.sort();
        Ok(editions)
    }
}

impl EditionMetadataProvider for CsvEditionSource {
    fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
        Ok(self.read(edition)?)
    }

    fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.editions()?)
    }
}
