//! Runtime context and bootstrap lifecycle
//!
//! A [`RuntimeContext`] owns the mount table and the bootstrapped runtime
//! handle behind one coarse lock, serializing mount/unmount/bootstrap/close
//! transitions across concurrent load operations. Callers construct one
//! context per load cycle instead of sharing process-wide globals, so
//! independent pipelines can coexist in a single process.

use crate::error::{LoadstoneError, LoadstoneResult};
use crate::ident::PackageIdent;
use crate::vfs::{CollisionPolicy, MountTable};
use std::collections::BTreeSet;
use std::ops::BitOr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Reserved identity base content is mounted under
pub const BASE_IDENT: &str = "base";

/// Suffix of type-declaration documents scanned during bootstrap
const TYPES_SUFFIX: &str = ".types.json";

/// Types available before any content is mounted
const CORE_TYPES: &[&str] = &["GameObject", "Component", "Scene", "Resource"];

/// Bit-set of load options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadFlags(u32);

impl LoadFlags {
    /// No options
    pub const NONE: LoadFlags = LoadFlags(0);

    /// Bootstrap as the hosting (server-authoritative) context
    pub const HOST: LoadFlags = LoadFlags(1);

    /// Enable editor tooling content
    pub const TOOLS: LoadFlags = LoadFlags(1 << 1);

    /// Whether every flag in `other` is set
    pub fn contains(self, other: LoadFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LoadFlags {
    type Output = LoadFlags;

    fn bitor(self, rhs: LoadFlags) -> LoadFlags {
        LoadFlags(self.0 | rhs.0)
    }
}

/// Registry of type names known to the bootstrapped runtime
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeSet<String>,
}

impl TypeRegistry {
    fn with_core() -> Self {
        Self {
            types: CORE_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether a type name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains(name)
    }

    /// Register every type declared by mounted `*.types.json` documents
    fn scan_mounts(&mut self, mounts: &MountTable) -> LoadstoneResult<()> {
        for (logical, host) in mounts.files() {
            if !logical.ends_with(TYPES_SUFFIX) {
                continue;
            }
            let content = std::fs::read_to_string(host)
                .map_err(|e| LoadstoneError::io(format!("reading type document {}", logical), e))?;
            let names: Vec<String> = serde_json::from_str(&content)?;
            for name in names {
                self.types.insert(name);
            }
        }
        Ok(())
    }
}

/// Handle to a bootstrapped runtime
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    /// Number of types in the registry
    pub type_count: usize,

    /// Flags the runtime was bootstrapped with
    pub flags: LoadFlags,
}

#[derive(Debug)]
struct ContextState {
    mounts: MountTable,
    registry: TypeRegistry,
    handle: Option<RuntimeHandle>,
}

/// Per-load-cycle runtime context
///
/// At most one [`RuntimeHandle`] exists per context at any time.
#[derive(Debug)]
pub struct RuntimeContext {
    state: Mutex<ContextState>,
}

impl RuntimeContext {
    /// Create a fresh, unbootstrapped context
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            state: Mutex::new(ContextState {
                mounts: MountTable::new(policy),
                registry: TypeRegistry::default(),
                handle: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        // A poisoned lock only means a panicking test thread; the state
        // itself stays coherent under the coarse-lock discipline.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mount a package file tree, returning its file count
    pub fn mount(&self, ident: &PackageIdent, root: &Path) -> LoadstoneResult<usize> {
        let mut state = self.lock();
        let record = state.mounts.mount(ident, root)?;
        Ok(record.file_count)
    }

    /// Bootstrap the runtime over the mounted content
    ///
    /// Idempotent: if a handle already exists it is returned unchanged.
    /// Mounts base content under the reserved [`BASE_IDENT`] identity and
    /// builds the type registry from core types plus every mounted type
    /// document.
    pub fn bootstrap(
        &self,
        base_content: &Path,
        flags: LoadFlags,
    ) -> LoadstoneResult<RuntimeHandle> {
        let mut state = self.lock();

        if let Some(handle) = &state.handle {
            debug!("runtime already bootstrapped, reusing handle");
            return Ok(handle.clone());
        }

        if !base_content.is_dir() {
            return Err(LoadstoneError::Bootstrap(format!(
                "base content not found at {}",
                base_content.display()
            )));
        }

        state
            .mounts
            .mount(&PackageIdent::new(BASE_IDENT), base_content)?;

        let mut registry = TypeRegistry::with_core();
        registry.scan_mounts(&state.mounts)?;

        let handle = RuntimeHandle {
            type_count: registry.len(),
            flags,
        };
        info!(
            "bootstrapped runtime: {} types, {} context",
            handle.type_count,
            if flags.contains(LoadFlags::HOST) {
                "host"
            } else {
                "client"
            }
        );

        state.registry = registry;
        state.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Unmount every package and tear down the runtime handle
    ///
    /// The registry and handle are derived from mounted content, so
    /// unmounting everything also returns the context to its
    /// pre-bootstrap state. Safe to call when nothing is mounted.
    pub fn unmount_all(&self) {
        let mut state = self.lock();
        state.mounts.unmount_all();
        state.registry = TypeRegistry::default();
        if state.handle.take().is_some() {
            debug!("runtime handle dropped");
        }
    }

    /// Close the runtime, restoring the pre-bootstrap state
    pub fn close(&self) {
        info!("closing runtime context");
        self.unmount_all();
    }

    /// Current runtime handle, if bootstrapped
    pub fn handle(&self) -> Option<RuntimeHandle> {
        self.lock().handle.clone()
    }

    /// Whether the runtime has been bootstrapped
    pub fn is_bootstrapped(&self) -> bool {
        self.lock().handle.is_some()
    }

    /// Aggregate file count across all mounted packages
    pub fn file_count(&self) -> usize {
        self.lock().mounts.file_count()
    }

    /// Whether an identity is currently mounted
    pub fn is_mounted(&self, ident: &PackageIdent) -> bool {
        self.lock().mounts.is_mounted(ident)
    }

    /// File count contributed by a single mounted identity
    pub fn mounted_file_count(&self, ident: &PackageIdent) -> Option<usize> {
        let state = self.lock();
        let count = state
            .mounts
            .records()
            .find(|r| r.ident == *ident)
            .map(|r| r.file_count);
        count
    }

    /// Resolve a logical path against the mount index
    pub fn resolve_file(&self, logical: &str) -> Option<PathBuf> {
        self.lock().mounts.resolve(logical).map(Path::to_path_buf)
    }

    /// Whether a type name is registered
    pub fn has_type(&self, name: &str) -> bool {
        self.lock().registry.contains(name)
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(CollisionPolicy::default())
    }
}
