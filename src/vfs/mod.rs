//! Virtual filesystem mount table
//!
//! Tracks which packages are mounted into the single logical filesystem
//! and maintains the logical-path index resources are resolved against.
//! Logical paths are forward-slash delimited and never touch the host
//! filesystem layout.
//!
//! Collision handling between packages providing the same logical path is
//! a caller-visible contract: the default policy is last-mounted wins.

use crate::error::{LoadstoneError, LoadstoneResult};
use crate::ident::PackageIdent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Policy applied when two packages provide the same logical path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The most recently mounted package wins (default)
    #[default]
    LastWins,
    /// The first package to provide a path keeps it
    FirstWins,
    /// Any cross-package collision fails the mount
    Strict,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastWins => write!(f, "last-wins"),
            Self::FirstWins => write!(f, "first-wins"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// One mounted package
#[derive(Debug, Clone)]
pub struct MountRecord {
    /// Identity the mount was created for
    pub ident: PackageIdent,

    /// Host directory backing the mount
    pub root_path: PathBuf,

    /// Number of files this package contributes
    pub file_count: usize,
}

#[derive(Debug, Clone)]
struct FileEntry {
    host_path: PathBuf,
    owner: String,
}

/// Registry of mounted packages and their aggregate file index
#[derive(Debug, Default)]
pub struct MountTable {
    policy: CollisionPolicy,
    records: HashMap<String, MountRecord>,
    index: HashMap<String, FileEntry>,
}

impl MountTable {
    /// Create an empty table with the given collision policy
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            records: HashMap::new(),
            index: HashMap::new(),
        }
    }

    /// Mount a package's file tree under its identity
    ///
    /// Idempotent: mounting an already-mounted identity returns the
    /// existing record without re-indexing. Under [`CollisionPolicy::Strict`]
    /// a cross-package path collision fails and leaves the table unchanged.
    pub fn mount(&mut self, ident: &PackageIdent, root: &Path) -> LoadstoneResult<MountRecord> {
        let canonical = ident.canonical();

        if let Some(existing) = self.records.get(&canonical) {
            debug!("{} already mounted, reusing record", canonical);
            return Ok(existing.clone());
        }

        let mut files = vec![];
        collect_files(root, String::new(), &mut files)?;
        // Deterministic index application regardless of directory order
        files.sort_by(|a, b| a.0.cmp(&b.0));

        if self.policy == CollisionPolicy::Strict {
            for (logical, _) in &files {
                if let Some(entry) = self.index.get(logical) {
                    return Err(LoadstoneError::MountConflict {
                        path: logical.clone(),
                        existing: entry.owner.clone(),
                        incoming: canonical,
                    });
                }
            }
        }

        let file_count = files.len();
        for (logical, host_path) in files {
            let entry = FileEntry {
                host_path,
                owner: canonical.clone(),
            };
            match self.policy {
                CollisionPolicy::FirstWins => {
                    self.index.entry(logical).or_insert(entry);
                }
                CollisionPolicy::LastWins | CollisionPolicy::Strict => {
                    self.index.insert(logical, entry);
                }
            }
        }

        let record = MountRecord {
            ident: ident.clone(),
            root_path: root.to_path_buf(),
            file_count,
        };
        self.records.insert(canonical.clone(), record.clone());
        info!("mounted {} ({} files)", canonical, file_count);
        Ok(record)
    }

    /// Atomically clear every mount; safe to call when nothing is mounted
    pub fn unmount_all(&mut self) {
        if self.records.is_empty() {
            return;
        }
        let count = self.records.len();
        self.records.clear();
        self.index.clear();
        info!("unmounted {} packages", count);
    }

    /// Sum of file counts across all mounted packages; never touches disk
    pub fn file_count(&self) -> usize {
        self.records.values().map(|r| r.file_count).sum()
    }

    /// Look up the host path backing a logical path
    pub fn resolve(&self, logical: &str) -> Option<&Path> {
        self.index.get(logical).map(|e| e.host_path.as_path())
    }

    /// Whether an identity is currently mounted
    pub fn is_mounted(&self, ident: &PackageIdent) -> bool {
        self.records.contains_key(&ident.canonical())
    }

    /// Iterate over current mount records
    pub fn records(&self) -> impl Iterator<Item = &MountRecord> {
        self.records.values()
    }

    /// Iterate over (logical path, host path) index entries
    pub fn files(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.index
            .iter()
            .map(|(logical, entry)| (logical.as_str(), entry.host_path.as_path()))
    }

    /// Whether no package is mounted
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Recursively collect (logical path, host path) pairs under a root
fn collect_files(
    dir: &Path,
    prefix: String,
    out: &mut Vec<(String, PathBuf)>,
) -> LoadstoneResult<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| LoadstoneError::io(format!("reading mount root {}", dir.display()), e))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| LoadstoneError::io("reading mount directory entry", e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let logical = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        if path.is_dir() {
            collect_files(&path, logical, out)?;
        } else {
            out.push((logical, path));
        }
    }
    Ok(())
}
