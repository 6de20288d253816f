// Quotable - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod model;
pub mod query;
pub mod service;
pub mod store;

#[cfg(feature = "server")]
pub mod http;

// Re-export commonly used types
pub use config::{Config, DataSource, OpenedStore};
pub use db::{insert_dataset, setup_database, verify_count};
pub use error::{QueryError, QueryResult, StoreError};
pub use loader::{load_path, AuthorRecord, Dataset};
pub use model::{Author, Quote, Tag};
pub use query::{
    ListQuotesParams, PageParams, Pagination, QuoteFilter, RandomQuotesParams, Sort, SortField,
    SortOrder,
};
pub use service::{Page, QuoteQueryService, RandomQuotes, TagList};
pub use store::{MemoryStore, QuoteStore, SqliteStore};

use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global subscriber; `RUST_LOG` overrides the default `info` level
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
