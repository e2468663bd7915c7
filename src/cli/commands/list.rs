//! List command - show cache buckets

use super::open_storage;
use crate::cache::{CacheStorage, SystemClock};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::OffcacheResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct BucketRow {
    name: String,
    entries: usize,
    current: bool,
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> OffcacheResult<()> {
    let storage = open_storage(config);

    // Listing still works when the naming policy is misconfigured
    let current = match config.cache.naming_policy() {
        Ok(policy) => Some(policy.cache_name(&SystemClock)),
        Err(e) => {
            debug!("No current cache name: {}", e);
            None
        }
    };

    let mut rows = Vec::new();
    for name in storage.keys().await? {
        let entries = storage.entries(&name).await?.len();
        rows.push(BucketRow {
            current: current.as_deref() == Some(name.as_str()),
            name,
            entries,
        });
    }

    if rows.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cache buckets");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
    }

    Ok(())
}

fn print_table(rows: &[BucketRow]) {
    println!(
        "{:<32} {:<8} {:<8}",
        style("BUCKET").bold(),
        style("ENTRIES").bold(),
        style("STATE").bold()
    );
    println!("{}", "-".repeat(50));

    for row in rows {
        let state = if row.current {
            style("current").green()
        } else {
            style("stale").yellow()
        };
        println!("{:<32} {:<8} {:<8}", row.name, row.entries, state);
    }

    println!();
    println!("Total: {} bucket(s)", rows.len());
}
