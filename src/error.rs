//! Error types for Loadstone
//!
//! All modules use `LoadstoneResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Loadstone operations
pub type LoadstoneResult<T> = Result<T, LoadstoneError>;

/// All errors that can occur in Loadstone
#[derive(Error, Debug)]
pub enum LoadstoneError {
    // Identity errors
    #[error("Invalid package identity '{ident}': {reason}")]
    InvalidIdent { ident: String, reason: String },

    // Cache errors
    #[error("Failed to create cache root {path}: {source}")]
    CacheRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Network error retrieving {ident}: {reason}")]
    Network { ident: String, reason: String },

    // Mount errors
    #[error("Mount conflict: '{path}' is provided by both {existing} and {incoming}")]
    MountConflict {
        path: String,
        existing: String,
        incoming: String,
    },

    // Runtime errors
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Operation requires prior state: {0}")]
    Precondition(String),

    // Scene errors
    #[error("Resource not found in mounted filesystem: {0}")]
    ResourceNotFound(String),

    #[error("Failed to parse scene {path}: {reason}")]
    SceneParse { path: String, reason: String },

    // Load errors
    #[error("Load cancelled during {phase}")]
    Cancelled { phase: String },

    // Validation surface (CLI-level)
    #[error("Invalid ignore GUID '{0}'")]
    InvalidIgnoreGuid(String),

    #[error("Scene references {actual} graphs, expected {expected}")]
    GraphCountMismatch { expected: usize, actual: usize },

    #[error("{0} graph(s) have unexpected errors")]
    GraphValidation(usize),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoadstoneError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a package identity
    pub fn network(ident: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            ident: ident.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound(_) => {
                Some("Check the identity spelling and the configured package source")
            }
            Self::Network { .. } => Some("Transient retrieval failure, retry the load"),
            Self::Precondition(_) => Some("Load a package before resolving resources"),
            Self::Bootstrap(_) => Some("Check the base content directory (--base-content)"),
            _ => None,
        }
    }
}
