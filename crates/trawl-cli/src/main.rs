use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trawl_client::{ReqwestFetcher, default_registry};
use trawl_core::models::Article;
use trawl_core::traits::{ArticleStore, Fetcher};
use trawl_core::{HarvestConfig, Harvester};
use trawl_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "trawl", version, about = "Periodic article harvester")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a source's main page and print the article links found on it
    Links {
        /// Source ID (e.g., "habr", "skillbox")
        #[arg(short, long)]
        source: String,
    },

    /// Fetch one article and print the extracted record without saving it
    Preview {
        /// Source ID whose extractor to use
        #[arg(short, long)]
        source: String,

        /// Article URL
        #[arg(short, long)]
        url: String,
    },

    /// Run the harvester until CTRL+C (requires DATABASE_URL)
    Harvest,

    /// List the persisted source catalog
    Sources,

    /// List stored articles, newest first
    Articles {
        /// Only show articles of this source
        #[arg(short, long)]
        source: Option<String>,

        /// Number of results to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print CSV instead of a table
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trawl=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Links { source } => cmd_links(&source).await?,
        Commands::Preview { source, url } => cmd_preview(&source, &url).await?,
        Commands::Harvest => cmd_harvest(cli.database_url.as_deref()).await?,
        Commands::Sources => {
            let db = connect_db(cli.database_url.as_deref()).await?;
            cmd_sources(&db).await?;
        }
        Commands::Articles { source, limit, csv } => {
            let db = connect_db(cli.database_url.as_deref()).await?;
            let articles = db.list_articles(source.as_deref(), limit).await?;
            if csv {
                write_csv(std::io::stdout().lock(), &articles)?;
            } else {
                print_articles(&articles);
            }
        }
    }

    Ok(())
}

/// Connect to PostgreSQL and apply migrations.
async fn connect_db(database_url: Option<&str>) -> Result<Database> {
    let config = DatabaseConfig::from_lookup(|key| match key {
        "DATABASE_URL" => database_url.map(str::to_string),
        _ => std::env::var(key).ok(),
    })?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db)
}

async fn cmd_links(source: &str) -> Result<()> {
    let registry = default_registry()?;
    let plugin = registry.lookup(source)?;

    tracing::info!("Fetching {}", plugin.seed_url);
    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let html = fetcher.fetch(&plugin.seed_url).await?;

    let links = plugin.extractor.extract_links(&html);
    for link in &links {
        println!("{link}");
    }
    tracing::info!(count = links.len(), "Links extracted");
    Ok(())
}

async fn cmd_preview(source: &str, url: &str) -> Result<()> {
    let registry = default_registry()?;
    let plugin = registry.lookup(source)?;

    tracing::info!("Fetching {}", url);
    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let html = fetcher.fetch(url).await?;

    let mut record = plugin.extractor.extract_record(&html, url);
    record.source_id = source.to_string();

    println!("{}", serde_json::to_string_pretty(&record)?);
    match record.validate() {
        Ok(_) => tracing::info!("Record is valid and would be stored"),
        Err(e) => tracing::warn!(error = %e, "Record would be dropped"),
    }
    Ok(())
}

async fn cmd_harvest(database_url: Option<&str>) -> Result<()> {
    let db = connect_db(database_url).await?;
    let harvester = Harvester::new(
        ReqwestFetcher::new().context("Failed to create HTTP client")?,
        db,
        Arc::new(default_registry()?),
        HarvestConfig::from_env()?,
    );
    harvester.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for CTRL+C")?;
    tracing::info!("Shutdown signal received");
    harvester.shutdown().await;
    Ok(())
}

async fn cmd_sources(db: &Database) -> Result<()> {
    let sources = db.list_sources().await?;
    if sources.is_empty() {
        println!("No sources in the catalog");
        return Ok(());
    }
    for source in &sources {
        println!("  {:<12} {}", source.id, source.seed_url);
    }
    println!("\nTotal: {} sources", sources.len());
    Ok(())
}

fn print_articles(articles: &[Article]) {
    if articles.is_empty() {
        println!("No articles found");
        return;
    }
    for article in articles {
        println!(
            "  [{}] {} by {} ({})\n      {}",
            article.source_id,
            article.title,
            article.username,
            article.published_at.format("%Y-%m-%d %H:%M UTC"),
            article.url,
        );
    }
    println!("\nTotal: {} articles", articles.len());
}

fn write_csv<W: Write>(out: W, articles: &[Article]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for article in articles {
        writer.serialize(article)?;
    }
    writer.flush()?;
    Ok(())
}
