// 🧠 In-memory store - immutable snapshot, atomic reload
//
// Readers take an Arc to the current snapshot once and work on it;
// reload builds a complete new snapshot and swaps the pointer.

use super::{QuoteStore, StoreResult};
use crate::error::StoreError;
use crate::loader::Dataset;
use crate::model::{Author, Quote, Tag};
use crate::query::QuoteFilter;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

// ============================================================================
// SNAPSHOT
// ============================================================================

/// One loaded dataset, never mutated after construction
#[derive(Debug, Default)]
pub struct Snapshot {
    quotes: Vec<Quote>,
    by_id: HashMap<String, usize>,
    bios: HashMap<String, String>,
}

impl Snapshot {
    pub fn new(dataset: Dataset) -> Self {
        let by_id = dataset
            .quotes
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), i))
            .collect();

        let bios = dataset
            .authors
            .into_iter()
            .filter_map(|a| a.bio.map(|bio| (a.slug, bio)))
            .collect();

        Snapshot {
            quotes: dataset.quotes,
            by_id,
            bios,
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

pub struct MemoryStore {
    current: RwLock<Arc<Snapshot>>,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        MemoryStore {
            current: RwLock::new(Arc::new(Snapshot::new(dataset))),
        }
    }

    /// The snapshot every read in one request should use
    pub fn snapshot(&self) -> StoreResult<Arc<Snapshot>> {
        let guard = self.current.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Replace the whole collection; returns the new quote count
    ///
    /// In-flight readers keep the snapshot they already hold.
    pub fn reload(&self, dataset: Dataset) -> StoreResult<usize> {
        let next = Arc::new(Snapshot::new(dataset));
        let count = next.len();
        if next.is_empty() {
            warn!("Reloaded data source contains no quotes");
        }

        let mut guard = self.current.write().map_err(|_| StoreError::Poisoned)?;
        *guard = next;

        info!("Quote snapshot reloaded: {} quotes", count);
        Ok(count)
    }
}

impl QuoteStore for MemoryStore {
    fn find_by_id(&self, id: &str) -> StoreResult<Option<Quote>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .by_id
            .get(id)
            .map(|&i| snapshot.quotes[i].clone()))
    }

    fn find_filtered(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .quotes
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let snapshot = self.snapshot()?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for quote in &snapshot.quotes {
            for tag in &quote.tags {
                *counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(name, quote_count)| Tag {
                name: name.to_string(),
                quote_count,
            })
            .collect())
    }

    fn list_authors(&self) -> StoreResult<Vec<Author>> {
        let snapshot = self.snapshot()?;
        let mut order: Vec<&str> = Vec::new();
        let mut seen: HashMap<&str, (&str, usize)> = HashMap::new();

        for quote in &snapshot.quotes {
            let Some(slug) = quote.author_slug.as_deref() else {
                continue;
            };
            let entry = seen.entry(slug).or_insert_with(|| {
                order.push(slug);
                (quote.author.as_str(), 0)
            });
            entry.1 += 1;
        }

        Ok(order
            .into_iter()
            .map(|slug| {
                let (name, quote_count) = seen[slug];
                Author {
                    id: slug.to_string(),
                    name: name.to_string(),
                    slug: slug.to_string(),
                    bio: snapshot.bios.get(slug).cloned(),
                    quote_count,
                }
            })
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::AuthorRecord;

    fn dataset() -> Dataset {
        let quotes = vec![
            Quote::new("1", "A", Some("Albert Einstein"), None, ["wisdom", "inspiration"]),
            Quote::new("2", "BB", Some("Maya Angelou"), None, ["wisdom", "life"]),
            Quote::new("3", "CCC", Some("Albert Einstein"), None, ["science"]),
            Quote::new("4", "DDDD", None, None, Vec::<String>::new()),
        ]
        .into_iter()
        .flatten()
        .collect();

        Dataset {
            quotes,
            authors: vec![AuthorRecord {
                name: "Albert Einstein".into(),
                slug: "albert-einstein".into(),
                bio: Some("Theoretical physicist".into()),
            }],
        }
    }

    #[test]
    fn test_find_by_id() {
        let store = MemoryStore::new(dataset());
        assert_eq!(store.find_by_id("2").unwrap().unwrap().content, "BB");
        assert!(store.find_by_id("99").unwrap().is_none());
    }

    #[test]
    fn test_find_filtered_keeps_store_order() {
        let store = MemoryStore::new(dataset());
        let filter = QuoteFilter::default().with_tags("wisdom|science");
        let ids: Vec<String> = store
            .find_filtered(&filter)
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_list_tags_counts() {
        let store = MemoryStore::new(dataset());
        let tags = store.list_tags().unwrap();
        let wisdom = tags.iter().find(|t| t.name == "wisdom").unwrap();
        assert_eq!(wisdom.quote_count, 2);
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn test_list_authors_skips_unknown() {
        let store = MemoryStore::new(dataset());
        let authors = store.list_authors().unwrap();
        assert_eq!(authors.len(), 2);

        let einstein = &authors[0];
        assert_eq!(einstein.slug, "albert-einstein");
        assert_eq!(einstein.quote_count, 2);
        assert_eq!(einstein.bio.as_deref(), Some("Theoretical physicist"));
        assert_eq!(authors[1].bio, None);
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let store = MemoryStore::new(dataset());
        let before = store.snapshot().unwrap();

        let replacement = Dataset {
            quotes: Quote::new("10", "New", Some("Steve Jobs"), None, ["technology"])
                .into_iter()
                .collect(),
            authors: Vec::new(),
        };
        assert_eq!(store.reload(replacement).unwrap(), 1);

        // an old reader still sees the old collection
        assert_eq!(before.len(), 4);
        assert!(store.find_by_id("1").unwrap().is_none());
        assert!(store.find_by_id("10").unwrap().is_some());
    }
}
