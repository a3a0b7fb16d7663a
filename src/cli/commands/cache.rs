//! Cache command - inspect and clear the package cache

use crate::cache::{format_bytes, ContentCache};
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::Config;
use crate::error::{LoadstoneError, LoadstoneResult};
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> LoadstoneResult<()> {
    let cache = ContentCache::initialize(config.cache_root())?;

    match args.action {
        CacheAction::List => list_entries(&cache).await,
        CacheAction::Clear { yes } => clear_entries(&cache, yes).await,
    }
}

async fn list_entries(cache: &ContentCache) -> LoadstoneResult<()> {
    let entries = cache.entries().await?;

    if entries.is_empty() {
        println!("No cached packages.");
        return Ok(());
    }

    println!("{:<30} {:<10} {:<20}", "IDENT", "SIZE", "FETCHED");
    println!("{}", "-".repeat(62));

    for entry in &entries {
        let fetched = entry.fetched_at.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "{:<30} {:<10} {:<20}",
            entry.ident.canonical(),
            format_bytes(entry.size_bytes),
            fetched
        );
    }

    println!();
    println!("Total: {} package(s) at {}", entries.len(), cache.root().display());
    Ok(())
}

async fn clear_entries(cache: &ContentCache, yes: bool) -> LoadstoneResult<()> {
    let entries = cache.entries().await?;
    if entries.is_empty() {
        println!("Cache is already empty.");
        return Ok(());
    }

    if !yes {
        print!(
            "Remove {} cached package(s) under {}? [y/N] ",
            entries.len(),
            cache.root().display()
        );
        io::stdout()
            .flush()
            .map_err(|e| LoadstoneError::io("flushing stdout", e))?;

        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .map_err(|e| LoadstoneError::io("reading confirmation", e))?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = cache.clear().await?;
    println!("{} {} package(s) removed", style("Cleared").green().bold(), removed);
    Ok(())
}
