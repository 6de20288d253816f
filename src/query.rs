// 🔎 Query Layer - Filters, pagination and sorting
// Raw request parameters are validated here before any store is touched

use crate::error::{QueryError, QueryResult};
use crate::model::Quote;
use serde::Deserialize;
use std::cmp::Ordering;
use std::str::FromStr;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 150;
pub const DEFAULT_RANDOM_LIMIT: u64 = 1;
pub const MAX_RANDOM_LIMIT: u64 = 150;

// ============================================================================
// FILTER
// ============================================================================

/// Predicates applied to the quote collection, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    /// Lowercase tag set, OR semantics (empty = no tag criterion)
    pub tags: Vec<String>,

    /// Slug or fragment of the display name, case-insensitive
    pub author: Option<String>,

    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl QuoteFilter {
    pub fn with_tags(mut self, raw: &str) -> Self {
        self.tags = parse_tags(raw);
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.author.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        if let Some(min) = self.min_length {
            if quote.length < min {
                return false;
            }
        }

        if let Some(max) = self.max_length {
            if quote.length > max {
                return false;
            }
        }

        if !self.tags.is_empty() && !self.tags.iter().any(|tag| quote.has_tag(tag)) {
            return false;
        }

        match &self.author {
            Some(author) => matches_author(quote, author),
            None => true,
        }
    }
}

/// Slug equality or name containment, both case-insensitive
fn matches_author(quote: &Quote, needle: &str) -> bool {
    let needle = needle.to_lowercase();

    if let Some(slug) = &quote.author_slug {
        if slug.to_lowercase() == needle {
            return true;
        }
    }

    quote.author.to_lowercase().contains(&needle)
}

/// Split a tag list on `,` or `|`; both separators mean OR
pub fn parse_tags(raw: &str) -> Vec<String> {
    crate::model::normalize_tags(raw.split([',', '|']))
}

// ============================================================================
// PAGINATION
// ============================================================================

/// A validated page request; only [`Pagination::new`] and `default()` build one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Pagination {
    /// Validated constructor, `limit` bounded by `max_limit`
    pub fn new(page: u64, limit: u64, max_limit: u64) -> QueryResult<Self> {
        if page < 1 {
            return Err(QueryError::validation("page must be at least 1"));
        }
        if limit < 1 || limit > max_limit {
            return Err(QueryError::validation(format!(
                "limit must be between 1 and {}",
                max_limit
            )));
        }
        Ok(Pagination { page, limit })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    DateAdded,
    DateModified,
    Author,
    Content,
}

impl FromStr for SortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dateadded" => Ok(SortField::DateAdded),
            "datemodified" => Ok(SortField::DateModified),
            "author" => Ok(SortField::Author),
            "content" => Ok(SortField::Content),
            _ => Err(QueryError::validation(format!(
                "sortBy must be one of dateAdded, dateModified, author, content (got '{}')",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryError::validation(format!(
                "order must be asc or desc (got '{}')",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn compare(&self, a: &Quote, b: &Quote) -> Ordering {
        let ordering = match self.field {
            SortField::DateAdded => a.date_added.cmp(&b.date_added),
            SortField::DateModified => a.date_modified.cmp(&b.date_modified),
            SortField::Author => cmp_ignore_case(&a.author, &b.author),
            SortField::Content => cmp_ignore_case(&a.content, &b.content),
        };

        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

// ============================================================================
// REQUEST PARAMETERS
// ============================================================================

/// Query string of `GET /quotes`, every value still unparsed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuotesParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub tags: Option<String>,
    pub author: Option<String>,
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListQuotesParams {
    pub fn validate(&self) -> QueryResult<(QuoteFilter, Pagination, Sort)> {
        let filter = build_filter(&self.tags, &self.author, &self.min_length, &self.max_length)?;
        let pagination = build_pagination(&self.page, &self.limit, DEFAULT_LIMIT, MAX_LIMIT)?;

        let mut sort = Sort::default();
        if let Some(field) = present(&self.sort_by) {
            sort.field = field.parse()?;
        }
        if let Some(order) = present(&self.order) {
            sort.order = order.parse()?;
        }

        Ok((filter, pagination, sort))
    }
}

/// Query string of `GET /quotes/random`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomQuotesParams {
    pub limit: Option<String>,
    pub tags: Option<String>,
    pub author: Option<String>,
    pub min_length: Option<String>,
    pub max_length: Option<String>,
}

impl RandomQuotesParams {
    pub fn validate(&self) -> QueryResult<(QuoteFilter, usize)> {
        let filter = build_filter(&self.tags, &self.author, &self.min_length, &self.max_length)?;

        let limit = parse_number("limit", &self.limit)?.unwrap_or(DEFAULT_RANDOM_LIMIT);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        check_random_limit(limit)?;

        Ok((filter, limit))
    }
}

/// Random sample size must lie in `1..=MAX_RANDOM_LIMIT`
pub fn check_random_limit(limit: usize) -> QueryResult<()> {
    if limit < 1 || limit as u64 > MAX_RANDOM_LIMIT {
        return Err(QueryError::validation(format!(
            "limit must be between 1 and {}",
            MAX_RANDOM_LIMIT
        )));
    }
    Ok(())
}

/// Query string of paginated listings without filters (`GET /authors`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn validate(&self) -> QueryResult<Pagination> {
        build_pagination(&self.page, &self.limit, DEFAULT_LIMIT, MAX_LIMIT)
    }
}

fn build_filter(
    tags: &Option<String>,
    author: &Option<String>,
    min_length: &Option<String>,
    max_length: &Option<String>,
) -> QueryResult<QuoteFilter> {
    // lengths beyond usize saturate; no quote is that long anyway
    let min_length = parse_number("minLength", min_length)?.map(saturating_usize);
    let max_length = parse_number("maxLength", max_length)?.map(saturating_usize);

    if let (Some(min), Some(max)) = (min_length, max_length) {
        if min > max {
            return Err(QueryError::validation(
                "minLength must not be greater than maxLength",
            ));
        }
    }

    let mut filter = QuoteFilter::default().with_length(min_length, max_length);
    if let Some(raw) = present(tags) {
        filter = filter.with_tags(raw);
    }
    if let Some(raw) = present(author) {
        filter = filter.with_author(raw);
    }

    Ok(filter)
}

fn build_pagination(
    page: &Option<String>,
    limit: &Option<String>,
    default_limit: u64,
    max_limit: u64,
) -> QueryResult<Pagination> {
    let page = parse_number("page", page)?.unwrap_or(1);
    let limit = parse_number("limit", limit)?.unwrap_or(default_limit);
    Pagination::new(page, limit, max_limit)
}

fn saturating_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Blank values count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: &Option<String>) -> QueryResult<Option<u64>> {
    match present(value) {
        None => Ok(None),
        Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
            QueryError::validation(format!(
                "{} must be a non-negative integer (got '{}')",
                name, raw
            ))
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
