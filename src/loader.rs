// 📂 Data Loader - JSON / CSV → Dataset
// Every record goes through Quote::new, so length and tags are never trusted from input

use crate::model::{slugify, Quote};
use crate::query::parse_tags;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Author metadata that quotes cannot carry themselves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub name: String,
    pub slug: String,
    pub bio: Option<String>,
}

/// Everything read from one data source
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub quotes: Vec<Quote>,
    pub authors: Vec<AuthorRecord>,
}

// ============================================================================
// RAW RECORDS
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawQuote {
    #[serde(alias = "_id")]
    id: Option<serde_json::Value>,
    content: String,
    author: Option<String>,
    author_slug: Option<String>,
    tags: Vec<String>,
    date_added: Option<String>,
    date_modified: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawCsvQuote {
    id: Option<String>,
    content: String,
    author: Option<String>,
    author_slug: Option<String>,
    tags: Option<String>,
    date_added: Option<String>,
    date_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    name: String,
    slug: Option<String>,
    bio: Option<String>,
}

/// Accepts both a bare array and `{ "quotes": [...], "authors": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDataset {
    List(Vec<RawQuote>),
    Object {
        quotes: Vec<RawQuote>,
        #[serde(default)]
        authors: Vec<RawAuthor>,
    },
}

// ============================================================================
// LOADING
// ============================================================================

/// Load a dataset, picking the format from the file extension
pub fn load_path(path: &Path) -> Result<Dataset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let dataset = match extension.as_deref() {
        Some("json") => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read quotes file: {:?}", path))?;
            parse_json(&text).with_context(|| format!("Failed to parse {:?}", path))?
        }
        Some("csv") => {
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
            parse_csv(file).with_context(|| format!("Failed to parse {:?}", path))?
        }
        _ => bail!("Unsupported data file (expected .json or .csv): {:?}", path),
    };

    info!(
        quotes = dataset.quotes.len(),
        authors = dataset.authors.len(),
        "Loaded dataset from {:?}",
        path
    );
    Ok(dataset)
}

pub fn parse_json(text: &str) -> Result<Dataset> {
    let raw: RawDataset = serde_json::from_str(text).context("Failed to parse quotes JSON")?;

    let (records, raw_authors) = match raw {
        RawDataset::List(quotes) => (quotes, Vec::new()),
        RawDataset::Object { quotes, authors } => (quotes, authors),
    };

    let mut builder = DatasetBuilder::default();
    for (position, record) in records.into_iter().enumerate() {
        let id = match record.id {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        builder.push(
            position,
            id,
            record.content,
            record.author,
            record.author_slug,
            record.tags,
            record.date_added,
            record.date_modified,
        );
    }

    let authors = raw_authors
        .into_iter()
        .filter_map(|a| {
            let slug = a
                .slug
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| slugify(&a.name));
            (!slug.is_empty()).then(|| AuthorRecord {
                name: a.name.trim().to_string(),
                slug,
                bio: a.bio.filter(|b| !b.trim().is_empty()),
            })
        })
        .collect();

    Ok(builder.finish(authors))
}

/// CSV columns: id, content, author, authorSlug, tags, dateAdded, dateModified
///
/// Only `content` is required; `tags` is split on `|` or `,`.
pub fn parse_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut builder = DatasetBuilder::default();

    for (position, result) in rdr.deserialize().enumerate() {
        let record: RawCsvQuote = result.context("Failed to deserialize quote row")?;
        builder.push(
            position,
            record.id.filter(|s| !s.trim().is_empty()),
            record.content,
            record.author,
            record.author_slug,
            record.tags.as_deref().map(parse_tags).unwrap_or_default(),
            record.date_added,
            record.date_modified,
        );
    }

    Ok(builder.finish(Vec::new()))
}

#[derive(Default)]
struct DatasetBuilder {
    quotes: Vec<Quote>,
    seen_ids: HashSet<String>,
    seen_keys: HashSet<String>,
    skipped: usize,
}

impl DatasetBuilder {
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        position: usize,
        id: Option<String>,
        content: String,
        author: Option<String>,
        author_slug: Option<String>,
        tags: Vec<String>,
        date_added: Option<String>,
        date_modified: Option<String>,
    ) {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if self.seen_ids.contains(&id) {
            warn!("Skipping record {}: duplicate id {}", position, id);
            self.skipped += 1;
            return;
        }

        let Some(quote) = Quote::new(
            id.clone(),
            content,
            author.as_deref(),
            author_slug.as_deref(),
            tags,
        ) else {
            warn!("Skipping record {}: empty content", position);
            self.skipped += 1;
            return;
        };

        let quote = quote.with_dates(
            date_added.as_deref().and_then(parse_date),
            date_modified.as_deref().and_then(parse_date),
        );

        // Same content by the same author is the same quote, whatever its id
        if !self.seen_keys.insert(quote.idempotency_key()) {
            warn!("Skipping record {}: duplicate of an earlier quote", position);
            self.skipped += 1;
            return;
        }

        self.seen_ids.insert(id);
        self.quotes.push(quote);
    }

    /// One display name per author slug: author metadata first, then the first quote
    fn finish(mut self, authors: Vec<AuthorRecord>) -> Dataset {
        if self.skipped > 0 {
            warn!("Skipped {} invalid records", self.skipped);
        }

        let mut names: HashMap<String, String> = HashMap::new();
        for author in authors.iter().filter(|a| !a.name.is_empty()) {
            names
                .entry(author.slug.clone())
                .or_insert_with(|| author.name.clone());
        }
        for quote in &mut self.quotes {
            let Some(slug) = quote.author_slug.as_deref() else {
                continue;
            };
            let name = names
                .entry(slug.to_string())
                .or_insert_with(|| quote.author.clone());
            if quote.author != *name {
                quote.author = name.clone();
            }
        }

        Dataset {
            quotes: self.quotes,
            authors,
        }
    }
}

/// `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            debug!("Ignoring unparseable date '{}'", raw);
            None
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let text = r#"[
            {"_id": "abc", "content": "Imagination is more important than knowledge.",
             "author": "Albert Einstein", "tags": ["Wisdom", "inspiration"],
             "length": 999, "dateAdded": "2023-04-14"},
            {"_id": 7, "content": "BB", "author": "Maya Angelou", "authorSlug": "maya-angelou"}
        ]"#;

        let dataset = parse_json(text).unwrap();
        assert_eq!(dataset.quotes.len(), 2);

        let first = &dataset.quotes[0];
        assert_eq!(first.id, "abc");
        assert_eq!(first.length, 45);
        assert_eq!(first.author_slug.as_deref(), Some("albert-einstein"));
        assert_eq!(first.tags, vec!["inspiration", "wisdom"]);
        assert_eq!(first.date_added, NaiveDate::from_ymd_opt(2023, 4, 14));

        assert_eq!(dataset.quotes[1].id, "7");
    }

    #[test]
    fn test_parse_json_object_with_authors() {
        let text = r#"{
            "quotes": [{"id": "1", "content": "A", "author": "Steve Jobs"}],
            "authors": [{"name": "Steve Jobs", "bio": "Co-founder of Apple Inc."}]
        }"#;

        let dataset = parse_json(text).unwrap();
        assert_eq!(dataset.quotes.len(), 1);
        assert_eq!(dataset.authors.len(), 1);
        assert_eq!(dataset.authors[0].slug, "steve-jobs");
        assert_eq!(dataset.authors[0].bio.as_deref(), Some("Co-founder of Apple Inc."));
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let text = r#"[
            {"id": "1", "content": "A"},
            {"id": "1", "content": "duplicate"},
            {"id": "2", "content": "   "}
        ]"#;

        let dataset = parse_json(text).unwrap();
        assert_eq!(dataset.quotes.len(), 1);
        assert_eq!(dataset.quotes[0].content, "A");
    }

    #[test]
    fn test_same_content_same_author_is_one_quote() {
        let text = r#"[
            {"id": "a", "content": "Same words", "author": "X"},
            {"id": "b", "content": "  same WORDS ", "author": "x"},
            {"id": "c", "content": "Same words", "author": "Y"}
        ]"#;

        let dataset = parse_json(text).unwrap();
        let ids: Vec<&str> = dataset.quotes.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_one_author_name_per_slug() {
        let text = r#"{
            "quotes": [
                {"id": "1", "content": "A", "author": "Einstein", "authorSlug": "albert-einstein"},
                {"id": "2", "content": "B", "author": "Mark Twain"},
                {"id": "3", "content": "C", "author": "mark twain"}
            ],
            "authors": [{"name": "Albert Einstein", "slug": "albert-einstein"}]
        }"#;

        let dataset = parse_json(text).unwrap();
        let names: Vec<&str> = dataset.quotes.iter().map(|q| q.author.as_str()).collect();
        assert_eq!(names, vec!["Albert Einstein", "Mark Twain", "Mark Twain"]);
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let dataset = parse_json(r#"[{"content": "A"}, {"content": "B"}]"#).unwrap();
        assert_eq!(dataset.quotes.len(), 2);
        assert_ne!(dataset.quotes[0].id, dataset.quotes[1].id);
    }

    #[test]
    fn test_parse_csv() {
        let csv_text = "\
id,content,author,authorSlug,tags,dateAdded
1,Stay hungry,Steve Jobs,,technology|Life,2020-01-02
2,Be kind,,,,
";
        let dataset = parse_csv(csv_text.as_bytes()).unwrap();
        assert_eq!(dataset.quotes.len(), 2);
        assert_eq!(dataset.quotes[0].tags, vec!["life", "technology"]);
        assert_eq!(dataset.quotes[0].author_slug.as_deref(), Some("steve-jobs"));
        assert_eq!(dataset.quotes[1].author_slug, None);
        assert!(dataset.quotes[1].tags.is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2021-06-01"), NaiveDate::from_ymd_opt(2021, 6, 1));
        assert_eq!(
            parse_date("2021-06-01T10:00:00Z"),
            NaiveDate::from_ymd_opt(2021, 6, 1)
        );
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(load_path(Path::new("quotes.xml")).is_err());
    }
}
