//! Edition metadata caching

use ahash::AHashMap;
use mushaf_core::{EditionMetadata, EditionMetadataProvider};
use parking_lot::RwLock;
use tracing::trace;

struct CacheState {
    entries: AHashMap<String, EditionMetadata>,
    /// LRU tracking for cache eviction, most recent last
    access_order: Vec<String>,
}

impl CacheState {
    fn touch(&mut self, edition: &str) {
        if let Some(idx) = self.access_order.iter().position(|e| e == edition) {
            let entry = self.access_order.remove(idx);
            self.access_order.push(entry);
        }
    }
}

/// Keeps recently loaded editions in front of a slower provider
///
/// Editions reported as not installed are never cached.
pub struct CachedEditions<P> {
    inner: P,
    state: RwLock<CacheState>,
    max_entries: usize,
}

impl<P: EditionMetadataProvider> CachedEditions<P> {
    /// Create a cache holding at most `max_entries` editions
    pub fn new(inner: P, max_entries: usize) -> Self {
        Self {
            inner,
            state: RwLock::new(CacheState {
                entries: AHashMap::new(),
                access_order: Vec::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, edition: &str) -> bool {
        self.state.read().entries.contains_key(edition)
    }

    /// Clear the cache
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.access_order.clear();
    }

    fn put(&self, edition: &str, metadata: EditionMetadata) {
        let mut state = self.state.write();
        if !state.entries.contains_key(edition) {
            while state.entries.len() >= self.max_entries && !state.access_order.is_empty() {
                let evicted = state.access_order.remove(0);
                trace!("Evicting edition '{}' from cache", evicted);
                state.entries.remove(&evicted);
            }
            state.access_order.push(edition.to_string());
        }
        state.entries.insert(edition.to_string(), metadata);
    }
}

impl<P: EditionMetadataProvider> EditionMetadataProvider for CachedEditions<P> {
    fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
        {
            let mut state = self.state.write();
            if let Some(metadata) = state.entries.get(edition).cloned() {
                state.touch(edition);
                return Ok(Some(metadata));
            }
        }

        let metadata = self.inner.edition_metadata(edition)?;
        if let Some(metadata) = &metadata {
            self.put(edition, metadata.clone());
        }
        Ok(metadata)
    }

    fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
        self.inner.installed_editions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mushaf_core::Position;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingProvider {
        reads: Mutex<Vec<String>>,
    }

    impl EditionMetadataProvider for CountingProvider {
        fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
            self.reads.lock().push(edition.to_string());
            if edition == "missing" {
                return Ok(None);
            }
            Ok(Some(EditionMetadata {
                id: edition.to_string(),
                page_count: 604,
                first_verses: vec![(1, Position::FIRST)],
            }))
        }

        fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        }
    }

    fn reads(cache: &CachedEditions<CountingProvider>) -> Vec<String> {
        cache.inner.reads.lock().clone()
    }

    #[test]
    fn test_second_read_hits_cache() {
        let cache = CachedEditions::new(CountingProvider::default(), 2);
        let first = cache.edition_metadata("a").unwrap();
        let second = cache.edition_metadata("a").unwrap();
        assert_eq!(first, second);
        assert_eq!(reads(&cache), vec!["a".to_string()]);
    }

    #[test]
    fn test_least_recent_is_evicted() {
        let cache = CachedEditions::new(CountingProvider::default(), 2);
        cache.edition_metadata("a").unwrap();
        cache.edition_metadata("b").unwrap();
        cache.edition_metadata("a").unwrap();
        cache.edition_metadata("c").unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_missing_editions_not_cached() {
        let cache = CachedEditions::new(CountingProvider::default(), 2);
        assert_eq!(cache.edition_metadata("missing").unwrap(), None);
        assert_eq!(cache.edition_metadata("missing").unwrap(), None);
        assert!(cache.is_empty());
        assert_eq!(reads(&cache).len(), 2);

        cache.edition_metadata("a").unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.installed_editions().unwrap().len(), 3);
    }
}
