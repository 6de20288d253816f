// 🎯 Quote Query Service - filtered pages, random samples, aggregates
// Stateless over the store: every call reads, shapes and returns

use crate::error::{QueryError, QueryResult};
use crate::model::{Author, Quote, Tag};
use crate::query::{check_random_limit, Pagination, QuoteFilter, Sort};
use crate::store::QuoteStore;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const QUOTE_NOT_FOUND: &str = "Quote not found";
pub const NO_MATCHING_QUOTES: &str = "No quotes found matching the given filters";

// ============================================================================
// RESPONSE SHAPES
// ============================================================================

/// Envelope of every paginated listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub count: usize,
    pub total_count: usize,
    pub page: u64,
    pub total_pages: u64,
    pub last_item_index: u64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Slice one page out of the complete, already ordered collection
    pub fn slice(items: Vec<T>, pagination: Pagination) -> Self {
        let total_count = items.len();
        let offset = pagination.offset();

        let results: Vec<T> = match usize::try_from(offset) {
            Ok(start) if start < total_count => items
                .into_iter()
                .skip(start)
                .take(usize::try_from(pagination.limit()).unwrap_or(usize::MAX))
                .collect(),
            _ => Vec::new(),
        };

        let count = results.len();
        Page {
            count,
            total_count,
            page: pagination.page(),
            total_pages: pagination.total_pages(total_count as u64),
            last_item_index: offset.saturating_add(count as u64),
            results,
        }
    }
}

/// A single quote when one was requested, a list otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RandomQuotes {
    One(Quote),
    Many(Vec<Quote>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagList {
    pub count: usize,
    pub results: Vec<Tag>,
}

// ============================================================================
// SERVICE
// ============================================================================

#[derive(Clone)]
pub struct QuoteQueryService {
    store: Arc<dyn QuoteStore>,
}

impl QuoteQueryService {
    pub fn new(store: Arc<dyn QuoteStore>) -> Self {
        QuoteQueryService { store }
    }

    pub fn list_quotes(
        &self,
        filter: &QuoteFilter,
        pagination: Pagination,
        sort: Sort,
    ) -> QueryResult<Page<Quote>> {
        let mut quotes = self.store.find_filtered(filter)?;
        quotes.sort_by(|a, b| sort.compare(a, b));

        let page = Page::slice(quotes, pagination);
        debug!(
            total = page.total_count,
            returned = page.count,
            page = page.page,
            "Listed quotes"
        );
        Ok(page)
    }

    pub fn get_random_quotes(&self, filter: &QuoteFilter, limit: usize) -> QueryResult<RandomQuotes> {
        self.get_random_quotes_with(filter, limit, &mut rand::thread_rng())
    }

    /// Independent uniform draws with replacement from the filtered set
    ///
    /// `limit` must lie in `1..=MAX_RANDOM_LIMIT`.
    pub fn get_random_quotes_with<R: Rng + ?Sized>(
        &self,
        filter: &QuoteFilter,
        limit: usize,
        rng: &mut R,
    ) -> QueryResult<RandomQuotes> {
        check_random_limit(limit)?;

        let candidates = self.store.find_filtered(filter)?;
        let mut drawn: Vec<Quote> = (0..limit)
            .filter_map(|_| candidates.choose(rng).cloned())
            .collect();

        match (limit, drawn.pop()) {
            (_, None) => Err(QueryError::not_found(NO_MATCHING_QUOTES)),
            (1, Some(quote)) => Ok(RandomQuotes::One(quote)),
            (_, Some(quote)) => {
                drawn.push(quote);
                Ok(RandomQuotes::Many(drawn))
            }
        }
    }

    pub fn get_quote_by_id(&self, id: &str) -> QueryResult<Quote> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| QueryError::not_found(QUOTE_NOT_FOUND))
    }

    /// Tags sorted by name
    pub fn list_tags(&self) -> QueryResult<TagList> {
        let mut tags = self.store.list_tags()?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(TagList {
            count: tags.len(),
            results: tags,
        })
    }

    /// Authors by descending quote count, ties by name
    pub fn list_authors(&self, pagination: Pagination) -> QueryResult<Page<Author>> {
        let mut authors = self.store.list_authors()?;
        authors.sort_by(|a, b| {
            b.quote_count
                .cmp(&a.quote_count)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(Page::slice(authors, pagination))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_json, Dataset};
    use crate::query::{SortField, SortOrder, MAX_LIMIT};
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn service_from(dataset: Dataset) -> QuoteQueryService {
        QuoteQueryService::new(Arc::new(MemoryStore::new(dataset)))
    }

    fn two_quotes() -> QuoteQueryService {
        service_from(
            parse_json(
                r#"[{"id": "1", "content": "A", "author": "Mark Twain", "tags": ["x"]},
                    {"id": "2", "content": "BB", "author": "Maya Angelou", "tags": ["y"]}]"#,
            )
            .unwrap(),
        )
    }

    fn many_quotes(n: usize) -> QuoteQueryService {
        let records: Vec<String> = (1..=n)
            .map(|i| {
                format!(
                    r#"{{"id": "{i}", "content": "quote number {i}", "author": "Author {a}",
                        "tags": ["{t}"], "dateAdded": "2020-01-{d:02}"}}"#,
                    i = i,
                    a = i % 3,
                    t = if i % 2 == 0 { "even" } else { "odd" },
                    d = (i % 28) + 1,
                )
            })
            .collect();
        service_from(parse_json(&format!("[{}]", records.join(","))).unwrap())
    }

    fn drawn(result: RandomQuotes) -> Vec<Quote> {
        match result {
            RandomQuotes::One(quote) => vec![quote],
            RandomQuotes::Many(quotes) => quotes,
        }
    }

    fn page(n: u64, limit: u64) -> Pagination {
        Pagination::new(n, limit, MAX_LIMIT).unwrap()
    }

    #[test]
    fn test_tag_filter_example() {
        let service = two_quotes();
        let filter = QuoteFilter::default().with_tags("x");
        let result = service
            .list_quotes(&filter, Pagination::default(), Sort::default())
            .unwrap();

        assert_eq!(result.total_count, 1);
        assert_eq!(result.results[0].id, "1");
    }

    #[test]
    fn test_second_page_example() {
        let service = two_quotes();
        let result = service
            .list_quotes(&QuoteFilter::default(), page(2, 1), Sort::default())
            .unwrap();

        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].id, "2");
        assert_eq!(result.last_item_index, 2);
        assert_eq!(result.total_pages, 2);
    }

    #[test]
    fn test_count_formula_holds_for_all_pages() {
        let service = many_quotes(23);
        let filter = QuoteFilter::default();

        for limit in [1u64, 4, 5, 10, 23, 50] {
            for n in 1..=8u64 {
                let result = service.list_quotes(&filter, page(n, limit), Sort::default()).unwrap();
                let total = result.total_count as u64;
                let expected = limit.min(total.saturating_sub((n - 1) * limit));

                assert_eq!(result.count as u64, expected, "page {} limit {}", n, limit);
                assert_eq!(result.count, result.results.len());
                assert_eq!(total, 23, "totalCount must not depend on pagination");
                assert_eq!(result.last_item_index, (n - 1) * limit + result.count as u64);
            }
        }
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let service = two_quotes();
        let result = service
            .list_quotes(&QuoteFilter::default(), page(10, 20), Sort::default())
            .unwrap();

        assert_eq!(result.count, 0);
        assert_eq!(result.total_count, 2);
        assert!(result.results.is_empty());
    }

    #[test]
    fn test_empty_filter_result_is_not_an_error() {
        let service = two_quotes();
        let filter = QuoteFilter::default().with_tags("missing");
        let result = service
            .list_quotes(&filter, Pagination::default(), Sort::default())
            .unwrap();

        assert_eq!(result.count, 0);
        assert_eq!(result.total_pages, 0);
    }

    #[test]
    fn test_sorting() {
        let service = many_quotes(6);
        let sort = Sort {
            field: SortField::DateAdded,
            order: SortOrder::Desc,
        };
        let result = service
            .list_quotes(&QuoteFilter::default(), Pagination::default(), sort)
            .unwrap();
        let ids: Vec<&str> = result.results.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["6", "5", "4", "3", "2", "1"]);

        let sort = Sort {
            field: SortField::Author,
            order: SortOrder::Asc,
        };
        let result = service
            .list_quotes(&QuoteFilter::default(), Pagination::default(), sort)
            .unwrap();
        let ids: Vec<&str> = result.results.iter().map(|q| q.id.as_str()).collect();
        // stable within equal authors
        assert_eq!(ids, vec!["3", "6", "1", "4", "2", "5"]);
    }

    #[test]
    fn test_random_single_is_object() {
        let service = two_quotes();
        let result = service
            .get_random_quotes_with(&QuoteFilter::default(), 1, &mut StdRng::seed_from_u64(7))
            .unwrap();

        assert!(matches!(result, RandomQuotes::One(_)));
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.is_object());
    }

    #[test]
    fn test_random_many_with_replacement() {
        let service = two_quotes();
        let filter = QuoteFilter::default().with_tags("x");
        let result = service
            .get_random_quotes_with(&filter, 5, &mut StdRng::seed_from_u64(7))
            .unwrap();

        let quotes = drawn(result);
        assert_eq!(quotes.len(), 5);
        assert!(quotes.iter().all(|q| q.id == "1"));
    }

    #[test]
    fn test_random_draws_cover_filtered_set() {
        let service = many_quotes(4);
        let mut rng = StdRng::seed_from_u64(42);
        let quotes = drawn(
            service
                .get_random_quotes_with(&QuoteFilter::default(), 150, &mut rng)
                .unwrap(),
        );

        for id in ["1", "2", "3", "4"] {
            assert!(quotes.iter().any(|q| q.id == id), "never drew {}", id);
        }
    }

    #[test]
    fn test_random_limit_out_of_range_is_rejected() {
        let service = two_quotes();
        for limit in [0, 151, 100_000_000] {
            let err = service
                .get_random_quotes(&QuoteFilter::default(), limit)
                .unwrap_err();
            assert!(matches!(err, QueryError::Validation(_)), "limit {}", limit);
        }
    }

    #[test]
    fn test_random_empty_is_not_found() {
        let service = two_quotes();
        let filter = QuoteFilter::default().with_tags("missing");
        let err = service.get_random_quotes(&filter, 5).unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[test]
    fn test_get_quote_by_id() {
        let service = two_quotes();
        assert_eq!(service.get_quote_by_id("2").unwrap().content, "BB");

        match service.get_quote_by_id("404") {
            Err(QueryError::NotFound(msg)) => assert_eq!(msg, QUOTE_NOT_FOUND),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_list_tags_sorted() {
        let service = many_quotes(5);
        let tags = service.list_tags().unwrap();
        assert_eq!(tags.count, 2);
        assert_eq!(tags.results[0].name, "even");
        assert_eq!(tags.results[0].quote_count, 2);
        assert_eq!(tags.results[1].name, "odd");
        assert_eq!(tags.results[1].quote_count, 3);
    }

    #[test]
    fn test_list_authors_by_count_then_name() {
        let service = service_from(
            parse_json(
                r#"[{"id": "1", "content": "a", "author": "Zed"},
                    {"id": "2", "content": "b", "author": "Amy"},
                    {"id": "3", "content": "c", "author": "Bob"},
                    {"id": "4", "content": "d", "author": "Bob"}]"#,
            )
            .unwrap(),
        );

        let authors = service.list_authors(Pagination::default()).unwrap();
        let names: Vec<&str> = authors.results.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Amy", "Zed"]);
        assert_eq!(authors.total_count, 3);

        let second = service.list_authors(page(2, 2)).unwrap();
        assert_eq!(second.count, 1);
        assert_eq!(second.results[0].name, "Zed");
    }
}
