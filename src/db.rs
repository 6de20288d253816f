use crate::loader::Dataset;
use crate::model::Quote;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Compute idempotency hash for duplicate detection
/// NOTE: This is for DEDUPLICATION, not IDENTITY!
/// Identity = quote id, Deduplication = hash of normalized content + author
pub fn compute_idempotency_hash(quote: &Quote) -> String {
    let mut hasher = Sha256::new();
    hasher.update(quote.idempotency_key());
    format!("{:x}", hasher.finalize())
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT UNIQUE NOT NULL,
            bio TEXT
        )",
        [],
    )?;

    // length is denormalized for WHERE clauses; readers recompute it from content
    conn.execute(
        "CREATE TABLE IF NOT EXISTS quotes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quote_uid TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT UNIQUE NOT NULL,
            content TEXT NOT NULL,
            author_id INTEGER REFERENCES authors(id),
            length INTEGER NOT NULL,
            date_added TEXT,
            date_modified TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS quote_tags (
            quote_id INTEGER NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (quote_id, tag_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_quotes_author ON quotes(author_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_quotes_length ON quotes(length)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_quote_tags_tag ON quote_tags(tag_id)",
        [],
    )?;

    Ok(())
}

/// Import a dataset; quotes already present (same hash or same id) are skipped
///
/// Returns the number of quotes inserted.
pub fn insert_dataset(conn: &Connection, dataset: &Dataset) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start import transaction")?;

    // Authors with metadata first, so bios survive the quote pass
    for author in &dataset.authors {
        tx.execute(
            "INSERT INTO authors (name, slug, bio) VALUES (?1, ?2, ?3)
             ON CONFLICT(slug) DO UPDATE SET bio = COALESCE(excluded.bio, authors.bio)",
            params![author.name, author.slug, author.bio],
        )?;
    }

    let mut inserted = 0;
    let mut duplicates = 0;

    for quote in &dataset.quotes {
        let author_id = match quote.author_slug.as_deref() {
            Some(slug) => {
                tx.execute(
                    "INSERT OR IGNORE INTO authors (name, slug) VALUES (?1, ?2)",
                    params![quote.author, slug],
                )?;
                Some(tx.query_row(
                    "SELECT id FROM authors WHERE slug = ?1",
                    [slug],
                    |row| row.get::<_, i64>(0),
                )?)
            }
            None => None,
        };

        let hash = compute_idempotency_hash(quote);

        let result = tx.execute(
            "INSERT INTO quotes (
                quote_uid, idempotency_hash, content, author_id, length, date_added, date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                quote.id,
                hash,
                quote.content,
                author_id,
                quote.length as i64,
                quote.date_added.map(|d| d.to_string()),
                quote.date_modified.map(|d| d.to_string()),
            ],
        );

        let quote_row_id = match result {
            Ok(_) => tx.last_insert_rowid(),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                debug!("Skipping duplicate quote {}", quote.id);
                duplicates += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for tag in &quote.tags {
            tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", [tag])?;
            tx.execute(
                "INSERT OR IGNORE INTO quote_tags (quote_id, tag_id)
                 SELECT ?1, id FROM tags WHERE name = ?2",
                params![quote_row_id, tag],
            )?;
        }

        inserted += 1;
    }

    tx.commit().context("Failed to commit import")?;

    info!("✓ Inserted: {} quotes", inserted);
    info!("✓ Skipped duplicates: {}", duplicates);

    Ok(inserted)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

    Ok(count)
}
