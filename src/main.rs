// Quotable - Command Line
// Import datasets into SQLite and inspect data sources

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;

use quotable::config::DEFAULT_DATA_SOURCE;
use quotable::{
    init_tracing, insert_dataset, load_path, setup_database, verify_count, DataSource,
    QuoteFilter, QuoteQueryService,
};

#[derive(Parser)]
#[command(name = "quotable")]
#[command(author, version, about = "Quotable - quotes dataset tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON or CSV dataset into a SQLite database
    Import {
        /// Dataset file (.json or .csv)
        file: PathBuf,

        /// Database to create or extend
        #[arg(long, default_value = "quotes.db")]
        db: PathBuf,
    },

    /// Show counts for a data source
    Stats {
        /// JSON/CSV file or SQLite database
        #[arg(long, env = "QUOTES_DATA_SOURCE", default_value = DEFAULT_DATA_SOURCE)]
        source: String,
    },

    /// Print random quotes as JSON
    Random {
        #[arg(long, env = "QUOTES_DATA_SOURCE", default_value = DEFAULT_DATA_SOURCE)]
        source: String,

        /// Tags separated by `,` or `|`
        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        author: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import { file, db } => run_import(file, db),
        Commands::Stats { source } => run_stats(&source),
        Commands::Random {
            source,
            tags,
            author,
            limit,
        } => run_random(&source, tags, author, limit),
    }
}

fn run_import(file: PathBuf, db: PathBuf) -> Result<()> {
    println!("🗄️  Import: {} → {}", file.display(), db.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load dataset
    println!("\n📂 Loading dataset...");
    let dataset = load_path(&file)?;
    println!("✓ Loaded {} quotes", dataset.quotes.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn =
        Connection::open(&db).with_context(|| format!("Failed to open database {:?}", db))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Insert quotes
    println!("\n💾 Inserting quotes...");
    let inserted = insert_dataset(&conn, &dataset)?;

    // 4. Verify count
    let count = verify_count(&conn)?;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ New quotes: {}", inserted);
    println!("✓ Database contains {} quotes", count);

    Ok(())
}

fn run_stats(source: &str) -> Result<()> {
    let service = QuoteQueryService::new(DataSource::parse(source).open()?.as_store());

    let quotes = service.list_quotes(&QuoteFilter::default(), Default::default(), Default::default())?;
    let tags = service.list_tags()?;
    let authors = service.list_authors(Default::default())?;

    println!("📊 {}", source);
    println!("   Quotes:  {}", quotes.total_count);
    println!("   Authors: {}", authors.total_count);
    println!("   Tags:    {}", tags.count);

    Ok(())
}

fn run_random(
    source: &str,
    tags: Option<String>,
    author: Option<String>,
    limit: usize,
) -> Result<()> {
    let service = QuoteQueryService::new(DataSource::parse(source).open()?.as_store());

    let mut filter = QuoteFilter::default();
    if let Some(tags) = tags {
        filter = filter.with_tags(&tags);
    }
    if let Some(author) = author {
        filter = filter.with_author(&author);
    }

    let quotes = service.get_random_quotes(&filter, limit)?;
    println!("{}", serde_json::to_string_pretty(&quotes)?);

    Ok(())
}
