//! Fetch command - download a package into the local cache

use crate::cache::{format_bytes, ContentCache};
use crate::cli::args::FetchArgs;
use crate::cli::commands::build_source;
use crate::config::Config;
use crate::error::LoadstoneResult;
use crate::ident::PackageIdent;
use console::style;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> LoadstoneResult<()> {
    let ident: PackageIdent = args.ident.parse()?;
    let cache = ContentCache::initialize(config.cache_root())?;
    let source = build_source(config)?;

    let entry = cache.fetch(&ident, source.as_ref()).await?;

    println!(
        "{} {} ({})",
        style("Cached").green().bold(),
        entry.ident,
        format_bytes(entry.size_bytes)
    );
    println!("  {}", entry.local_path.display());
    Ok(())
}
