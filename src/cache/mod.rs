//! Content-addressed package cache
//!
//! Downloaded packages are materialized under a configured cache root,
//! keyed by the identity's canonical string. Entries are immutable once
//! written: a fetch that finds an entry on disk returns it without
//! touching the source, and a miss writes the new entry to a temp
//! directory first and renames it into place, so a crash mid-fetch never
//! leaves a half-written entry visible.
//!
//! # Cache layout
//!
//! ```text
//! <root>/
//!   <name>-<hash12>/        one directory per cached identity
//!     entry.json            CacheEntry metadata
//!     files/                materialized package file tree
//!   .tmp-*                  in-flight fetches, never listed
//! ```

pub mod source;

pub use source::{DirSource, HttpSource, PackageBundle, PackageSource};

use crate::error::{LoadstoneError, LoadstoneResult};
use crate::ident::PackageIdent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, info};

const ENTRY_MANIFEST: &str = "entry.json";
const FILES_DIR: &str = "files";

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// A cached package entry
///
/// Immutable once written; owned exclusively by the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Identity this entry was fetched for
    pub ident: PackageIdent,

    /// Entry directory under the cache root
    pub local_path: PathBuf,

    /// Total payload size of the materialized files
    pub size_bytes: u64,

    /// When the entry was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// The materialized package file tree
    pub fn files_dir(&self) -> PathBuf {
        self.local_path.join(FILES_DIR)
    }
}

/// On-disk package cache rooted at a configured directory
pub struct ContentCache {
    root: PathBuf,
}

impl ContentCache {
    /// Set the cache root, creating it if needed
    pub fn initialize(root: impl Into<PathBuf>) -> LoadstoneResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| LoadstoneError::CacheRoot {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    /// The configured cache root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fetch a package, reusing the on-disk entry when present
    ///
    /// A cache hit performs no source access. Concurrent fetches of the
    /// same identity are safe: each materializes into its own temp
    /// directory and the rename race has exactly one winner.
    pub async fn fetch(
        &self,
        ident: &PackageIdent,
        source: &dyn PackageSource,
    ) -> LoadstoneResult<CacheEntry> {
        let entry_dir = self.root.join(ident.cache_key());

        if let Some(entry) = self.read_entry(&entry_dir).await? {
            debug!("cache hit for {}", ident);
            return Ok(entry);
        }

        debug!("cache miss for {}, retrieving from {}", ident, source.describe());
        let bundle = source.retrieve(ident).await?;
        self.materialize(ident, &entry_dir, bundle).await
    }

    /// List every cached entry
    pub async fn entries(&self) -> LoadstoneResult<Vec<CacheEntry>> {
        let mut entries = vec![];
        let mut dirs = fs::read_dir(&self.root)
            .await
            .map_err(|e| LoadstoneError::io("reading cache root", e))?;

        while let Some(dir) = dirs
            .next_entry()
            .await
            .map_err(|e| LoadstoneError::io("reading cache root entry", e))?
        {
            if let Some(entry) = self.read_entry(&dir.path()).await? {
                entries.push(entry);
            }
        }

        // Stable listing order regardless of directory iteration
        entries.sort_by(|a, b| a.ident.canonical().cmp(&b.ident.canonical()));
        Ok(entries)
    }

    /// Remove every cached entry, returning how many were deleted
    pub async fn clear(&self) -> LoadstoneResult<usize> {
        let entries = self.entries().await?;
        for entry in &entries {
            fs::remove_dir_all(&entry.local_path).await.map_err(|e| {
                LoadstoneError::io(
                    format!("removing cache entry {}", entry.local_path.display()),
                    e,
                )
            })?;
        }
        info!("cleared {} cache entries", entries.len());
        Ok(entries.len())
    }

    /// Read an entry manifest if the directory holds a complete entry
    async fn read_entry(&self, entry_dir: &Path) -> LoadstoneResult<Option<CacheEntry>> {
        let manifest = entry_dir.join(ENTRY_MANIFEST);
        if !manifest.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&manifest)
            .await
            .map_err(|e| LoadstoneError::io(format!("reading {}", manifest.display()), e))?;
        let entry: CacheEntry = serde_json::from_str(&content)?;
        Ok(Some(entry))
    }

    /// Write a bundle to a temp sibling, then rename into place
    async fn materialize(
        &self,
        ident: &PackageIdent,
        entry_dir: &Path,
        bundle: PackageBundle,
    ) -> LoadstoneResult<CacheEntry> {
        static FETCH_SEQ: AtomicU64 = AtomicU64::new(0);
        let nonce = FETCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_dir = self.root.join(format!(
            ".tmp-{}-{}-{}",
            ident.cache_key(),
            std::process::id(),
            nonce
        ));

        let result = self.write_bundle(ident, entry_dir, &tmp_dir, &bundle).await;
        if result.is_err() {
            let _ = fs::remove_dir_all(&tmp_dir).await;
            return result;
        }

        match fs::rename(&tmp_dir, entry_dir).await {
            Ok(()) => {
                info!(
                    "cached {} ({}) at {}",
                    ident,
                    format_bytes(bundle.size_bytes()),
                    entry_dir.display()
                );
                result
            }
            Err(rename_err) => {
                let _ = fs::remove_dir_all(&tmp_dir).await;
                // Lost the rename race: a concurrent fetch completed first
                if let Some(existing) = self.read_entry(entry_dir).await? {
                    debug!("concurrent fetch won for {}, reusing entry", ident);
                    return Ok(existing);
                }
                Err(LoadstoneError::io(
                    format!("publishing cache entry {}", entry_dir.display()),
                    rename_err,
                ))
            }
        }
    }

    async fn write_bundle(
        &self,
        ident: &PackageIdent,
        entry_dir: &Path,
        tmp_dir: &Path,
        bundle: &PackageBundle,
    ) -> LoadstoneResult<CacheEntry> {
        let files_dir = tmp_dir.join(FILES_DIR);
        fs::create_dir_all(&files_dir)
            .await
            .map_err(|e| LoadstoneError::io("creating cache temp directory", e))?;

        for (logical, content) in &bundle.files {
            let relative = sanitize_logical_path(logical)?;
            let host = files_dir.join(relative);
            if let Some(parent) = host.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LoadstoneError::io("creating package subdirectory", e))?;
            }
            fs::write(&host, content)
                .await
                .map_err(|e| LoadstoneError::io(format!("writing package file {}", logical), e))?;
        }

        let entry = CacheEntry {
            ident: ident.clone(),
            local_path: entry_dir.to_path_buf(),
            size_bytes: bundle.size_bytes(),
            fetched_at: Utc::now(),
        };

        let manifest = serde_json::to_string_pretty(&entry)?;
        fs::write(tmp_dir.join(ENTRY_MANIFEST), manifest)
            .await
            .map_err(|e| LoadstoneError::io("writing cache entry manifest", e))?;

        Ok(entry)
    }
}

/// Reject logical paths that would escape the entry directory
fn sanitize_logical_path(logical: &str) -> LoadstoneResult<PathBuf> {
    if logical.is_empty()
        || logical.starts_with('/')
        || logical.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(LoadstoneError::Internal(format!(
            "bundle contains invalid file path '{}'",
            logical
        )));
    }
    Ok(logical.split('/').collect())
}
