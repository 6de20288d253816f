// 📜 Quote Model - Quotes, authors and tags
// Normalization happens once at load time; everything downstream reads immutable values

use chrono::NaiveDate;
use serde::Serialize;

/// Display name used when a record carries no author
pub const UNKNOWN_AUTHOR: &str = "Unknown";

// ============================================================================
// QUOTE
// ============================================================================

/// A single quote as served by the API
///
/// Build through [`Quote::new`]: `length` is derived from `content`
/// and `tags` are normalized there, never taken from input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub content: String,
    pub author: String,
    pub author_slug: Option<String>,
    pub tags: Vec<String>,
    pub length: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_added: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<NaiveDate>,
}

impl Quote {
    /// Build a quote, normalizing author, slug and tags
    ///
    /// Returns `None` when `content` is blank.
    pub fn new<I, S>(
        id: impl Into<String>,
        content: impl Into<String>,
        author: Option<&str>,
        author_slug: Option<&str>,
        tags: I,
    ) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let content = content.into();
        if content.trim().is_empty() {
            return None;
        }

        let author = author.map(str::trim).filter(|a| !a.is_empty());
        let author_slug = match (author_slug.map(str::trim).filter(|s| !s.is_empty()), author) {
            (Some(slug), _) => Some(slug.to_lowercase()),
            (None, Some(name)) => Some(slugify(name)).filter(|s| !s.is_empty()),
            (None, None) => None,
        };

        Some(Quote {
            id: id.into(),
            length: content.chars().count(),
            content,
            author: author.unwrap_or(UNKNOWN_AUTHOR).to_string(),
            author_slug,
            tags: normalize_tags(tags),
            date_added: None,
            date_modified: None,
        })
    }

    pub fn with_dates(mut self, added: Option<NaiveDate>, modified: Option<NaiveDate>) -> Self {
        self.date_added = added;
        self.date_modified = modified;
        self
    }

    /// Normalized content plus author slug; two quotes with the same key are one quote
    pub fn idempotency_key(&self) -> String {
        format!(
            "{}|{}",
            self.content.trim().to_lowercase(),
            self.author_slug.as_deref().unwrap_or("")
        )
    }

    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| *t == tag)
    }
}

// ============================================================================
// AUTHOR & TAG (derived aggregates)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub quote_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    pub quote_count: usize,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Turn a display name into a URL-safe lookup key
///
/// Example: "Albert Einstein" → "albert-einstein"
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Lowercase, trim, drop empties, dedupe and sort
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

// ============================================================================
// TESTS
// ============================================================================
