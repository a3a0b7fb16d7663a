//! Package sources
//!
//! A source resolves a package identity to a published bundle. Two
//! backends are provided: a local published-package directory (used by
//! tests and air-gapped setups) and an HTTP registry.

use crate::error::{LoadstoneError, LoadstoneResult};
use crate::ident::PackageIdent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// A published package payload as returned by a source
///
/// File contents are keyed by forward-slash logical path. The map is
/// ordered so that materialization to disk is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageBundle {
    pub name: String,
    pub version: u64,
    pub files: BTreeMap<String, String>,
}

impl PackageBundle {
    /// Total payload size across all files
    pub fn size_bytes(&self) -> u64 {
        self.files.values().map(|c| c.len() as u64).sum()
    }
}

/// Abstract package retrieval interface
///
/// Implementations must be safe to call concurrently; the cache layer
/// guarantees an identity is only materialized once even if two fetches
/// race.
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Retrieve the bundle for an identity
    ///
    /// An identity without a version resolves to the latest published
    /// version.
    async fn retrieve(&self, ident: &PackageIdent) -> LoadstoneResult<PackageBundle>;

    /// Human-readable source description for logs
    fn describe(&self) -> String;
}

/// Local directory of published packages
///
/// Layout: `<root>/<name>/<version>.json`, one bundle document per
/// published version.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Create a source over a published-package directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the highest published version for a package
    async fn latest_version(&self, ident: &PackageIdent) -> LoadstoneResult<u64> {
        let pkg_dir = self.root.join(&ident.name);
        let mut entries = tokio::fs::read_dir(&pkg_dir).await.map_err(|_| {
            LoadstoneError::PackageNotFound(ident.canonical())
        })?;

        let mut latest: Option<u64> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LoadstoneError::io("reading package directory", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(version) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<u64>().ok())
                {
                    latest = Some(latest.map_or(version, |v| v.max(version)));
                }
            }
        }

        latest.ok_or_else(|| LoadstoneError::PackageNotFound(ident.canonical()))
    }
}

#[async_trait]
impl PackageSource for DirSource {
    async fn retrieve(&self, ident: &PackageIdent) -> LoadstoneResult<PackageBundle> {
        let version = match ident.version {
            Some(v) => v,
            None => self.latest_version(ident).await?,
        };

        let path = self.root.join(&ident.name).join(format!("{}.json", version));
        if !path.is_file() {
            return Err(LoadstoneError::PackageNotFound(ident.canonical()));
        }

        debug!("retrieving {} from {}", ident, path.display());
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LoadstoneError::io(format!("reading bundle {}", path.display()), e))?;

        let bundle: PackageBundle = serde_json::from_str(&content)?;
        Ok(bundle)
    }

    fn describe(&self) -> String {
        format!("dir://{}", self.root.display())
    }
}

/// HTTP package registry
///
/// Retrieves bundles from `GET {base}/packages/{name}/{version|latest}`.
/// The request timeout is supplied by the caller, not hard-coded.
pub struct HttpSource {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    /// Create a source against a registry base URL
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn bundle_url(&self, ident: &PackageIdent) -> String {
        match ident.version {
            Some(v) => format!("{}/packages/{}/{}", self.base_url, ident.name, v),
            None => format!("{}/packages/{}/latest", self.base_url, ident.name),
        }
    }
}

#[async_trait]
impl PackageSource for HttpSource {
    async fn retrieve(&self, ident: &PackageIdent) -> LoadstoneResult<PackageBundle> {
        let url = self.bundle_url(ident);
        let agent = self.agent.clone();
        let canonical = ident.canonical();

        debug!("retrieving {} from {}", canonical, url);

        // ureq is a blocking client, keep it off the async worker
        tokio::task::spawn_blocking(move || match agent.get(&url).call() {
            Ok(resp) => resp.into_json::<PackageBundle>().map_err(|e| {
                LoadstoneError::network(&canonical, format!("invalid bundle body: {}", e))
            }),
            Err(ureq::Error::Status(404, _)) => Err(LoadstoneError::PackageNotFound(canonical)),
            Err(ureq::Error::Status(code, _)) => Err(LoadstoneError::network(
                &canonical,
                format!("registry returned status {}", code),
            )),
            Err(e) => Err(LoadstoneError::network(&canonical, e.to_string())),
        })
        .await
        .map_err(|e| LoadstoneError::Internal(format!("retrieval task panicked: {}", e)))?
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
