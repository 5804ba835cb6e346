//! mapsearch-replay: run a search script against canned result pages.
//!
//! Usage: mapsearch-replay --fixture pages.json --script steps.jsonl [--link QUERY] [-- --search-zoom=8 ...]
//!
//! Prints one JSON record per script step to stdout.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use openerp_mapsearch::replay::{run_script, FixtureBackend};
use openerp_mapsearch::{MapSearch, MapSearchConfig};

#[derive(Parser)]
#[command(name = "mapsearch-replay")]
#[command(about = "Replay a map search script against fixture pages")]
struct Args {
    /// Fixture file: {"pages": {"": {...}, "<token>": {...}}}
    #[arg(short, long)]
    fixture: PathBuf,

    /// JSON-lines script of requests
    #[arg(short, long)]
    script: PathBuf,

    /// Shared link query string the visit starts from
    #[arg(short, long)]
    link: Option<String>,

    /// Engine flags (--search-zoom=, --page-size=, ...)
    #[arg(last = true)]
    engine_args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let fixture = std::fs::read_to_string(&args.fixture)
        .with_context(|| format!("reading {}", args.fixture.display()))?;
    let backend = Arc::new(FixtureBackend::from_json(&fixture)?);

    let config = MapSearchConfig::from_args(&args.engine_args);
    let engine = match &args.link {
        Some(link) => MapSearch::from_link(backend, config, link)?,
        None => MapSearch::new(backend, config)?,
    };

    let script = File::open(&args.script)
        .with_context(|| format!("opening {}", args.script.display()))?;
    info!("Replaying {}", args.script.display());

    let records = run_script(&engine, BufReader::new(script)).await?;
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }

    info!("Replayed {} steps", records.len());
    Ok(())
}
