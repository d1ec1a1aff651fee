//! SQLite metadata sources

use std::path::Path;
use mushaf_core::{
    CanonicalMetadata, CanonicalMetadataProvider, EditionMetadata, EditionMetadataProvider,
    Position,
};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::{check_sequence, first_verses, position, validate_identifier};
use crate::DataError;

const CHAPTERS_TABLE: &str = "suras";
const THIRTIETHS_TABLE: &str = "juzs";
const QUARTERS_TABLE: &str = "hizbs";
const SEVENTHS_TABLE: &str = "manzils";
const RUKUS_TABLE: &str = "rukus";

fn open_read_only(path: &Path) -> Result<Connection, DataError> {
    Ok(Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, DataError> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn require_table(conn: &Connection, name: &str) -> Result<(), DataError> {
    if table_exists(conn, name)? {
        Ok(())
    } else {
        Err(DataError::MissingTable(name.to_string()))
    }
}

/// Whether a table has the `page, sura, aya` columns of an edition layout
fn is_layout_table(conn: &Connection, name: &str) -> Result<bool, DataError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([name], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(["page", "sura", "aya"]
        .iter()
        .all(|required| columns.iter().any(|column| column == required)))
}

fn read_chapter_lengths(conn: &Connection) -> Result<Vec<u16>, DataError> {
    require_table(conn, CHAPTERS_TABLE)?;
    let mut stmt = conn.prepare("SELECT id, ayas FROM suras ORDER BY id")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;

    let mut lengths = Vec::new();
    for (idx, row) in rows.enumerate() {
        let (id, verses) = row?;
        check_sequence(CHAPTERS_TABLE, idx, id)?;
        let verses = u16::try_from(verses).map_err(|_| DataError::InvalidRow {
            source_name: CHAPTERS_TABLE.to_string(),
            row: idx,
            reason: format!("{} is not a verse count", verses),
        })?;
        lengths.push(verses);
    }
    Ok(lengths)
}

/// First verses of a `(id, sura, aya)` boundary table, in id order
fn read_boundaries(conn: &Connection, table: &str) -> Result<Vec<Position>, DataError> {
    require_table(conn, table)?;
    let query = format!("SELECT id, sura, aya FROM {} ORDER BY id", table);
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
    })?;

    let mut boundaries = Vec::new();
    for (idx, row) in rows.enumerate() {
        let (id, chapter, verse) = row?;
        check_sequence(table, idx, id)?;
        boundaries.push(position(table, idx, chapter, verse)?);
    }
    Ok(boundaries)
}

/// Canonical tables stored in the reader's main database
pub struct SqliteCanonicalSource {
    conn: Mutex<Connection>,
}

impl SqliteCanonicalSource {
    /// Open a database read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        Ok(Self::from_connection(open_read_only(path.as_ref())?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn read(&self) -> Result<CanonicalMetadata, DataError> {
        let conn = self.conn.lock();
        Ok(CanonicalMetadata {
            chapter_lengths: read_chapter_lengths(&conn)?,
            thirtieths: read_boundaries(&conn, THIRTIETHS_TABLE)?,
            quarters: read_boundaries(&conn, QUARTERS_TABLE)?,
            sevenths: read_boundaries(&conn, SEVENTHS_TABLE)?,
            rukus: read_boundaries(&conn, RUKUS_TABLE)?,
        })
    }
}

impl CanonicalMetadataProvider for SqliteCanonicalSource {
    fn canonical_metadata(&self) -> anyhow::Result<CanonicalMetadata> {
        Ok(self.read()?)
    }
}

/// Edition layouts, one `(id, page, sura, aya, ...)` table per edition
pub struct SqliteEditionSource {
    conn: Mutex<Connection>,
}

impl SqliteEditionSource {
    /// Open a database read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        Ok(Self::from_connection(open_read_only(path.as_ref())?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn read(&self, edition: &str) -> Result<Option<EditionMetadata>, DataError> {
        let table = validate_identifier(edition)?;
        let conn = self.conn.lock();
        if !table_exists(&conn, table)? {
            debug!("No layout table for edition '{}'", edition);
            return Ok(None);
        }

        let query = format!("SELECT page, sura, aya FROM {} ORDER BY page, id", table);
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?;

        let mut layout = Vec::new();
        for (idx, row) in rows.enumerate() {
            let (page, chapter, verse) = row?;
            let page = u32::try_from(page).map_err(|_| DataError::InvalidRow {
                source_name: table.to_string(),
                row: idx,
                reason: format!("{} is not a page number", page),
            })?;
            layout.push((page, position(table, idx, chapter, verse)?));
        }

        let page_count = layout.last().map_or(0, |&(page, _)| page);
        let first_verses = first_verses(table, layout)?;
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

    fn tables(&self) -> Result<Vec<String>, DataError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut editions = Vec::new();
        for name in names {
            let name = name?;
            if validate_identifier(&name).is_ok() && is_layout_table(&conn, &name)? {
                editions.push(name);
            }
        }
        Ok(editions)
    }
}

impl EditionMetadataProvider for SqliteEditionSource {
    fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
        Ok(self.read(edition)?)
    }

    fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.tables()?)
    }
}
