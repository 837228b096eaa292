//! qm-store: inspect a prompt queue database.
//!
//! Opens (and if needed creates) the database for a namespace, then prints a
//! per-status summary or the items of one status.
//!
//! # Usage
//!
//! ```bash
//! qm-store --namespace 8188 --data-dir ./data
//! qm-store --namespace 8188 --list pending --json
//! ```
//!
//! Environment variables can also be used:
//! - `QM_NAMESPACE`: Namespace of the database file
//! - `QM_DATA_DIR`: Directory holding the database
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Context;
use clap::Parser;
use qm_store::observability::tracing::init_tracing;
use qm_store::{Config, QueueStatus, QueueStore};

#[derive(Parser, Debug)]
#[command(name = "qm-store")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// List the items of one status (name or number) instead of the summary
    #[arg(long)]
    list: Option<QueueStatus>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.config.log_level);

    let store = QueueStore::open(&cli.config).with_context(|| {
        format!(
            "failed to open queue database {}",
            cli.config.db_path().display()
        )
    })?;

    match cli.list {
        Some(status) => print_items(&store, status, cli.json),
        None => print_summary(&store, cli.json),
    }
}

fn print_summary(store: &QueueStore, json: bool) -> anyhow::Result<()> {
    let counts = store
        .count_by_status()
        .context("failed to count queue items")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    println!("Database: {}", store.manager().path().display());
    for status in QueueStatus::ALL {
        println!("  {:<9} {}", status.as_str(), counts.get(status));
    }
    println!("  {:<9} {}", "total", counts.total());
    Ok(())
}

fn print_items(store: &QueueStore, status: QueueStatus, json: bool) -> anyhow::Result<()> {
    let items = store
        .list(status)
        .with_context(|| format!("failed to list {status} items"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for item in &items {
        println!(
            "{:>6}  {:<36}  {:>6}  {}  {}",
            item.id,
            item.prompt_id,
            item.number.map_or_else(|| "-".to_string(), |n| n.to_string()),
            item.updated_at,
            item.name.as_deref().unwrap_or(""),
        );
    }
    println!("{} {status} item(s)", items.len());
    Ok(())
}
