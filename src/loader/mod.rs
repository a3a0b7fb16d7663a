//! Package load pipeline
//!
//! Drives fetch → mount → bootstrap as a cancellable asynchronous state
//! machine. The caller is expected to have unmounted prior content before
//! loading; reloading a different package is an explicit unmount-then-load
//! protocol. A failed or cancelled load leaves no package mounted and no
//! runtime handle created.

pub mod cancel;

pub use cancel::CancelToken;

use crate::cache::{ContentCache, PackageSource};
use crate::error::{LoadstoneError, LoadstoneResult};
use crate::ident::PackageIdent;
use crate::runtime::{LoadFlags, RuntimeContext, RuntimeHandle};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phase of a load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Fetching,
    Mounting,
    Bootstrapping,
    Ready,
    Cancelled,
    Failed,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Mounting => "mounting",
            Self::Bootstrapping => "bootstrapping",
            Self::Ready => "ready",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Orchestrates cache, mount table, and runtime bootstrap for one package
pub struct PackageLoader {
    cache: ContentCache,
    source: Arc<dyn PackageSource>,
    base_content: PathBuf,
}

impl PackageLoader {
    /// Create a loader over a cache, a package source, and base content
    pub fn new(
        cache: ContentCache,
        source: Arc<dyn PackageSource>,
        base_content: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cache,
            source,
            base_content: base_content.into(),
        }
    }

    /// The cache this loader fetches through
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Load a package into the context
    ///
    /// Cancellation is cooperative: the token is checked at each phase
    /// boundary, so an in-flight retrieval completes before cancellation
    /// is observed. Step errors surface unchanged; on any failure or
    /// cancellation the context is rolled back to its unmounted,
    /// unbootstrapped state.
    pub async fn load(
        &self,
        ctx: &RuntimeContext,
        ident: &PackageIdent,
        flags: LoadFlags,
        cancel: &CancelToken,
    ) -> LoadstoneResult<RuntimeHandle> {
        let mut phase = LoadPhase::Idle;
        match self.run(ctx, ident, flags, cancel, &mut phase).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                if phase != LoadPhase::Cancelled {
                    phase = LoadPhase::Failed;
                }
                warn!("load of {} ended {}: {}", ident, phase, e);
                // The caller unmounted before loading, so everything
                // currently mounted belongs to this load
                ctx.unmount_all();
                Err(e)
            }
        }
    }

    /// Drive a load to completion on the calling thread
    ///
    /// Adapter for callers that cannot await. Propagates the same errors
    /// and cancellation as [`PackageLoader::load`]. Must not be called
    /// from inside an async runtime.
    pub fn load_blocking(
        &self,
        ctx: &RuntimeContext,
        ident: &PackageIdent,
        flags: LoadFlags,
        cancel: &CancelToken,
    ) -> LoadstoneResult<RuntimeHandle> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LoadstoneError::io("building blocking load runtime", e))?;
        rt.block_on(self.load(ctx, ident, flags, cancel))
    }

    async fn run(
        &self,
        ctx: &RuntimeContext,
        ident: &PackageIdent,
        flags: LoadFlags,
        cancel: &CancelToken,
        phase: &mut LoadPhase,
    ) -> LoadstoneResult<RuntimeHandle> {
        advance(phase, LoadPhase::Fetching, cancel)?;
        let entry = self.cache.fetch(ident, self.source.as_ref()).await?;

        advance(phase, LoadPhase::Mounting, cancel)?;
        let mounted = ctx.mount(ident, &entry.files_dir())?;
        debug!("mounted {} files from {}", mounted, ident);

        advance(phase, LoadPhase::Bootstrapping, cancel)?;
        let handle = ctx.bootstrap(&self.base_content, flags)?;

        advance(phase, LoadPhase::Ready, cancel)?;
        info!(
            "{} ready: {} files mounted, {} types registered",
            ident,
            ctx.file_count(),
            handle.type_count
        );
        Ok(handle)
    }
}

/// Transition to the next phase, observing cancellation at the boundary
fn advance(phase: &mut LoadPhase, next: LoadPhase, cancel: &CancelToken) -> LoadstoneResult<()> {
    if cancel.is_cancelled() {
        let at = *phase;
        *phase = LoadPhase::Cancelled;
        return Err(LoadstoneError::Cancelled {
            phase: at.to_string(),
        });
    }
    debug!("load phase {} -> {}", phase, next);
    *phase = next;
    Ok(())
}
