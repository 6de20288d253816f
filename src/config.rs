//! Process configuration
//!
//! Read once from the environment at startup:
//! `HOST`, `PORT` and `QUOTES_DATA_SOURCE`.

use crate::loader;
use crate::store::{MemoryStore, QuoteStore, SqliteStore};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_SOURCE: &str = "data/quotes.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// JSON or CSV file served from memory
    File(PathBuf),
    /// Database created by `quotable import`
    Sqlite(PathBuf),
}

impl DataSource {
    /// `sqlite:` prefix or a `.db`/`.sqlite`/`.sqlite3` extension selects SQLite
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(path) = raw.strip_prefix("sqlite:") {
            return DataSource::Sqlite(PathBuf::from(path.trim_start_matches("//")));
        }

        let path = PathBuf::from(raw);
        let is_sqlite = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "db" | "sqlite" | "sqlite3"))
            .unwrap_or(false);

        if is_sqlite {
            DataSource::Sqlite(path)
        } else {
            DataSource::File(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            DataSource::File(path) | DataSource::Sqlite(path) => path,
        }
    }

    pub fn open(&self) -> Result<OpenedStore> {
        match self {
            DataSource::File(path) => {
                let dataset = loader::load_path(path)?;
                if dataset.quotes.is_empty() {
                    warn!("Data source {:?} contains no quotes", path);
                }
                Ok(OpenedStore::Memory(Arc::new(MemoryStore::new(dataset))))
            }
            DataSource::Sqlite(path) => {
                if !path.exists() {
                    anyhow::bail!(
                        "Database not found at {:?} (run `quotable import <file> --db {}` first)",
                        path,
                        path.display()
                    );
                }
                let store = SqliteStore::open(path)
                    .with_context(|| format!("Failed to open database {:?}", path))?;
                info!("Database opened: {:?}", path);
                Ok(OpenedStore::Sqlite(Arc::new(store)))
            }
        }
    }
}

/// A store together with its concrete kind, so file stores can be reloaded
pub enum OpenedStore {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
}

impl OpenedStore {
    pub fn as_store(&self) -> Arc<dyn QuoteStore> {
        match self {
            OpenedStore::Memory(store) => store.clone(),
            OpenedStore::Sqlite(store) => store.clone(),
        }
    }

    pub fn reloadable(&self) -> Option<Arc<MemoryStore>> {
        match self {
            OpenedStore::Memory(store) => Some(store.clone()),
            OpenedStore::Sqlite(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_source: DataSource,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT").filter(|p| !p.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {}", raw))?,
            None => DEFAULT_PORT,
        };

        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let data_source = lookup("QUOTES_DATA_SOURCE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string());

        Ok(Config {
            host,
            port,
            data_source: DataSource::parse(&data_source),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
