mod config;
mod db;
mod error;
mod parser;
mod pipeline;
mod report;
mod scraper;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "court_scraper", about = "Court judgment scraper and case metadata store")]
struct Cli {
    /// SQLite database file (overrides configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, extract and store one or more judgment pages
    Process {
        /// Judgment page URLs
        #[arg(required = true)]
        urls: Vec<String>,
        /// Reprocess cases that are already stored
        #[arg(long)]
        force: bool,
    },
    /// Summarise stored cases
    Report {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = config::Settings::load()?;
    if let Some(path) = cli.db {
        settings.db_path = path;
    }

    let store = db::CaseStore::open(&settings.db_path)
        .with_context(|| format!("Failed to open case store at {:?}", settings.db_path))?;

    let result = match cli.command {
        Commands::Process { urls, force } => {
            let fetcher = scraper::build_fetcher(&settings)?;
            let pipeline = Arc::new(pipeline::Pipeline::new(
                fetcher,
                Arc::new(store),
                settings.retry_policy(),
                settings.max_concurrency,
            ));

            println!("Processing {} URLs...", urls.len());
            let stats = pipeline.run_batch(urls, force).await;
            println!(
                "Done: {} URLs ({} stored, {} skipped, {} failed).",
                stats.total, stats.persisted, stats.skipped, stats.failed
            );
            if stats.store_errors > 0 {
                bail!("{} case(s) could not be stored", stats.store_errors);
            }
            Ok(())
        }
        Commands::Report { json } => {
            let summary = report::summarize(&store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("--- Case Analytics Report ({}) ---", settings.db_path.display());
                print!("{}", report::render(&summary));
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
