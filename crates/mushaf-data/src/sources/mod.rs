pub mod csv_source;
pub mod sqlite_source;

pub use csv_source::{CsvCanonicalSource, CsvEditionSource};
pub use sqlite_source::{SqliteCanonicalSource, SqliteEditionSource};

use std::fs;
use std::path::{Path, PathBuf};
use mushaf_core::{EditionMetadata, EditionMetadataProvider, Position};
use tracing::debug;

use crate::DataError;

/// Edition identifiers double as table and file names
pub(crate) fn validate_identifier(name: &str) -> Result<&str, DataError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(DataError::InvalidIdentifier(name.to_string()))
    }
}

pub(crate) fn position(source_name: &str, row: usize, chapter: i64, verse: i64) -> Result<Position, DataError> {
    match (u16::try_from(chapter), u16::try_from(verse)) {
        (Ok(chapter), Ok(verse)) => Ok(Position::new(chapter, verse)),
        _ => Err(DataError::InvalidRow {
            source_name: source_name.to_string(),
            row,
            reason: format!("{}:{} is not a verse reference", chapter, verse),
        }),
    }
}

/// Check that boundary rows are numbered 1, 2, 3...
pub(crate) fn check_sequence(source_name: &str, row: usize, id: i64) -> Result<(), DataError> {
    if id == row as i64 + 1 {
        Ok(())
    } else {
        Err(DataError::InvalidRow {
            source_name: source_name.to_string(),
            row,
            reason: format!("expected id {}, found {}", row + 1, id),
        })
    }
}

/// Reduce (page, verse) rows in page order to the first verse shown on each page
///
/// Layouts carry one row per verse or line. A page continuing the verse that
/// started on the previous page reports that verse again.
pub(crate) fn first_verses<I>(source_name: &str, rows: I) -> Result<Vec<(u32, Position)>, DataError>
where
    I: IntoIterator<Item = (u32, Position)>,
{
    let mut firsts: Vec<(u32, Position)> = Vec::new();
    let mut last_page = 0;
    for (row, (page, position)) in rows.into_iter().enumerate() {
        if page == 0 {
            return Err(DataError::InvalidRow {
                source_name: source_name.to_string(),
                row,
                reason: "pages are numbered from 1".to_string(),
            });
        }
        if page < last_page {
            return Err(DataError::InvalidRow {
                source_name: source_name.to_string(),
                row,
                reason: format!("page {} listed after page {}", page, last_page),
            });
        }
        if page == last_page {
            continue;
        }
        last_page = page;
        firsts.push((page, position));
    }
    Ok(firsts)
}

/// Overrides an edition's page count with the number of its page images
///
/// Images of edition `id` live in `<root>/<id>/`; editions without an image
/// directory keep the page count of the inner provider.
pub struct ImagePageCount<P> {
    inner: P,
    root: PathBuf,
}

impl<P: EditionMetadataProvider> ImagePageCount<P> {
    pub fn new(inner: P, root: impl AsRef<Path>) -> Self {
        Self {
            inner,
            root: root.as_ref().to_path_buf(),
        }
    }

    fn image_count(&self, edition: &str) -> Result<Option<u32>, DataError> {
        let dir = self.root.join(validate_identifier(edition)?);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut count = 0u32;
        for entry in fs::read_dir(&dir)? {
            if entry?.file_type()?.is_file() {
                count += 1;
            }
        }
        Ok(Some(count))
    }
}

impl<P: EditionMetadataProvider> EditionMetadataProvider for ImagePageCount<P> {
    fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
        let Some(mut metadata) = self.inner.edition_metadata(edition)? else {
            return Ok(None);
        };
        if let Some(count) = self.image_count(edition)? {
            debug!("Edition '{}' has {} page images", edition, count);
            metadata.page_count = count;
        }
        Ok(Some(metadata))
    }

    fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
        self.inner.installed_editions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identifiers() {
        assert!(validate_identifier("madinah").is_ok());
        assert!(validate_identifier("warsh_1405").is_ok());
        assert!(validate_identifier("_hafs").is_ok());
        for bad in ["", "1405", "shamarly; DROP TABLE suras", "../etc", "a-b"] {
            assert!(
                matches!(validate_identifier(bad), Err(DataError::InvalidIdentifier(_))),
                "{:?} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_position_range() {
        assert_eq!(position("t", 0, 2, 255).unwrap(), Position::new(2, 255));
        assert!(matches!(
            position("t", 3, -1, 1),
            Err(DataError::InvalidRow { row: 3, .. })
        ));
        assert!(position("t", 0, 1, 70_000).is_err());
    }

    #[test]
    fn test_first_row_of_each_page() {
        let rows = vec![
            (3, Position::new(1, 1)),
            (3, Position::new(1, 2)),
            (4, Position::new(2, 1)),
            (4, Position::new(2, 2)),
            (5, Position::new(2, 2)),
            (6, Position::new(2, 6)),
        ];
        assert_eq!(
            first_verses("t", rows).unwrap(),
            vec![
                (3, Position::new(1, 1)),
                (4, Position::new(2, 1)),
                (5, Position::new(2, 2)),
                (6, Position::new(2, 6)),
            ]
        );
    }

    #[test]
    fn test_continuation_page_repeats_its_verse() {
        let rows = vec![(8, Position::new(2, 1)), (9, Position::new(2, 1)), (9, Position::new(2, 2))];
        assert_eq!(
            first_verses("t", rows).unwrap(),
            vec![(8, Position::new(2, 1)), (9, Position::new(2, 1))]
        );
    }

    #[test]
    fn test_unordered_pages_rejected() {
        let rows = vec![(4, Position::new(1, 1)), (3, Position::new(1, 2))];
        assert!(matches!(
            first_verses("t", rows),
            Err(DataError::InvalidRow { row: 1, .. })
        ));
        assert!(first_verses("t", vec![(0, Position::FIRST)]).is_err());
    }

    #[test]
    fn test_missing_image_directory_keeps_page_count() {
        struct One;

        impl EditionMetadataProvider for One {
            fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
                Ok(Some(EditionMetadata {
                    id: edition.to_string(),
                    page_count: 10,
                    first_verses: vec![(1, Position::FIRST)],
                }))
            }

            fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
                Ok(vec!["one".to_string()])
            }
        }

        let provider = ImagePageCount::new(One, std::env::temp_dir().join("mushaf-no-images"));
        assert_eq!(provider.edition_metadata("one").unwrap().unwrap().page_count, 10);
        assert!(provider.edition_metadata("../one").is_err());
    }

    proptest! {
        #[test]
        fn first_verses_follow_reading_order(
            steps in proptest::collection::vec((0u32..3, 0u16..3), 1..200)
        ) {
            let mut page = 1;
            let mut verse = 1;
            let rows: Vec<(u32, Position)> = steps
                .into_iter()
                .map(|(page_step, verse_step)| {
                    page += page_step;
                    verse += verse_step;
                    (page, Position::new(1, verse))
                })
                .collect();
            let firsts = first_verses("t", rows).unwrap();
            for pair in firsts.windows(2) {
                prop_assert!(pair[0].0 < pair[1].0);
                prop_assert!(pair[0].1 <= pair[1].1);
            }
        }
    }
}
