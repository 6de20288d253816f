//! Storage layer
//!
//! Every backend is a read-only [`QuoteStore`]. The in-memory store serves
//! JSON/CSV files from an immutable snapshot; the SQLite store runs the
//! filters as SQL against the schema created by [`crate::db`].

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryStore, Snapshot};
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::model::{Author, Quote, Tag};
use crate::query::QuoteFilter;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read interface over an externally owned quote collection
pub trait QuoteStore: Send + Sync {
    fn find_by_id(&self, id: &str) -> StoreResult<Option<Quote>>;

    /// The filtered set, in store order
    fn find_filtered(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>>;

    /// Distinct tags with live quote counts
    fn list_tags(&self) -> StoreResult<Vec<Tag>>;

    /// Distinct authors referenced by at least one quote, with live counts
    fn list_authors(&self) -> StoreResult<Vec<Author>>;
}
