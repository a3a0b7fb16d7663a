//! CLI command implementations

pub mod cache;
pub mod fetch;
pub mod validate;

pub use cache::execute as cache;
pub use fetch::execute as fetch;
pub use validate::execute as validate;

use crate::cache::{ContentCache, DirSource, HttpSource, PackageSource};
use crate::config::Config;
use crate::error::{LoadstoneError, LoadstoneResult};
use crate::loader::PackageLoader;
use std::sync::Arc;

/// Build the package source configured for this invocation
///
/// A local published-package directory takes precedence over a registry
/// URL.
pub(crate) fn build_source(config: &Config) -> LoadstoneResult<Arc<dyn PackageSource>> {
    if let Some(dir) = &config.source.dir {
        return Ok(Arc::new(DirSource::new(dir.clone())));
    }
    if let Some(url) = &config.source.url {
        return Ok(Arc::new(HttpSource::new(
            url.clone(),
            config.source_timeout(),
        )));
    }
    Err(LoadstoneError::Precondition(
        "no package source configured; set source.dir or source.url, \
         or pass --source-dir / --source-url"
            .to_string(),
    ))
}

/// Build a loader over the configured cache, source, and base content
pub(crate) fn build_loader(config: &Config) -> LoadstoneResult<PackageLoader> {
    let cache = ContentCache::initialize(config.cache_root())?;
    let source = build_source(config)?;
    Ok(PackageLoader::new(cache, source, config.base_content_dir()))
}
