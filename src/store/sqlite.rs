//! SQLite-backed store
//!
//! Filters become `WHERE` clauses with bound parameters; the tag list of each
//! quote is aggregated with `GROUP_CONCAT` in a correlated subquery so that
//! the tag filter never duplicates rows.

use super::{QuoteStore, StoreResult};
use crate::error::StoreError;
use crate::loader::parse_date;
use crate::model::{Author, Quote, Tag, UNKNOWN_AUTHOR};
use crate::query::QuoteFilter;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Separator for aggregated tag names (ASCII unit separator)
const TAG_SEPARATOR: char = '\u{1f}';

/// SQL function name for Unicode lowercasing; built-in `lower()` folds ASCII only
const UNICODE_LOWER: &str = "ulower";

const SELECT_QUOTES: &str = "
    SELECT q.quote_uid, q.content, a.name, a.slug, q.date_added, q.date_modified,
           (SELECT GROUP_CONCAT(t.name, char(31))
              FROM quote_tags qt
              JOIN tags t ON t.id = qt.tag_id
             WHERE qt.quote_id = q.id) AS tags
      FROM quotes q
      LEFT JOIN authors a ON a.id = q.author_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Columns of one quote row before normalization
struct QuoteRow {
    id: String,
    content: String,
    author: Option<String>,
    author_slug: Option<String>,
    date_added: Option<String>,
    date_modified: Option<String>,
    tags: Option<String>,
}

impl QuoteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(QuoteRow {
            id: row.get(0)?,
            content: row.get(1)?,
            author: row.get(2)?,
            author_slug: row.get(3)?,
            date_added: row.get(4)?,
            date_modified: row.get(5)?,
            tags: row.get(6)?,
        })
    }

    fn into_quote(self) -> StoreResult<Quote> {
        let tags = self
            .tags
            .as_deref()
            .map(|t| t.split(TAG_SEPARATOR).collect::<Vec<_>>())
            .unwrap_or_default();

        let quote = Quote::new(
            self.id.clone(),
            self.content,
            self.author.as_deref(),
            self.author_slug.as_deref(),
            tags,
        )
        .ok_or_else(|| StoreError::Corrupt(format!("quote {} has empty content", self.id)))?;

        Ok(quote.with_dates(
            self.date_added.as_deref().and_then(parse_date),
            self.date_modified.as_deref().and_then(parse_date),
        ))
    }
}

impl SqliteStore {
    /// Open an existing database read-only
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        register_functions(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_quotes(&self, sql: &str, values: Vec<Value>) -> StoreResult<Vec<Quote>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;

        let rows = stmt
            .query_map(params_from_iter(values.iter()), QuoteRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(QuoteRow::into_quote).collect()
    }
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

/// Lengths beyond `i64` match nothing (min) or everything (max), as in memory
fn length_value(length: usize) -> Value {
    Value::Integer(i64::try_from(length).unwrap_or(i64::MAX))
}

/// Build the `WHERE` clause for a filter, returning SQL and bound values
fn where_clause(filter: &QuoteFilter) -> (String, Vec<Value>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(min) = filter.min_length {
        conditions.push("q.length >= ?".to_string());
        values.push(length_value(min));
    }

    if let Some(max) = filter.max_length {
        conditions.push("q.length <= ?".to_string());
        values.push(length_value(max));
    }

    if !filter.tags.is_empty() {
        let placeholders = vec!["?"; filter.tags.len()].join(", ");
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM quote_tags qt JOIN tags t ON t.id = qt.tag_id
                      WHERE qt.quote_id = q.id AND t.name IN ({}))",
            placeholders
        ));
        values.extend(filter.tags.iter().map(|t| Value::Text(t.to_lowercase())));
    }

    if let Some(author) = &filter.author {
        let needle = author.to_lowercase();
        conditions.push(format!(
            "({f}(a.slug) = ? OR instr({f}(COALESCE(a.name, ?)), ?) > 0)",
            f = UNICODE_LOWER
        ));
        values.push(Value::Text(needle.clone()));
        values.push(Value::Text(UNKNOWN_AUTHOR.to_string()));
        values.push(Value::Text(needle));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

impl QuoteStore for SqliteStore {
    fn find_by_id(&self, id: &str) -> StoreResult<Option<Quote>> {
        let sql = format!("{} WHERE q.quote_uid = ?", SELECT_QUOTES);
        let mut quotes = self.query_quotes(&sql, vec![Value::Text(id.to_string())])?;
        Ok(quotes.pop())
    }

    fn find_filtered(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>> {
        let (clause, values) = where_clause(filter);
        let sql = format!("{}{} ORDER BY q.id", SELECT_QUOTES, clause);
        self.query_quotes(&sql, values)
    }

    fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(qt.quote_id)
               FROM tags t
               JOIN quote_tags qt ON qt.tag_id = t.id
              GROUP BY t.id
              ORDER BY t.name",
        )?;

        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    name: row.get(0)?,
                    quote_count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    fn list_authors(&self) -> StoreResult<Vec<Author>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.name, a.slug, a.bio, COUNT(q.id)
               FROM authors a
               JOIN quotes q ON q.author_id = a.id
              GROUP BY a.id
              ORDER BY a.id",
        )?;

        let authors = stmt
            .query_map([], |row| {
                Ok(Author {
                    id: row.get::<_, i64>(0)?.to_string(),
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    bio: row.get(3)?,
                    quote_count: row.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(authors)
    }
}
