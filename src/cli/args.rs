//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Loadstone - content package loading and validation pipeline
///
/// Fetches published content packages into a local cache, mounts them
/// into a virtual filesystem, bootstraps a runtime, and validates the
/// visual-script graphs referenced by a scene.
#[derive(Parser, Debug)]
#[command(name = "loadstone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LOADSTONE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache root directory (overrides config)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Local published-package directory (overrides config)
    #[arg(long, global = true)]
    pub source_dir: Option<PathBuf>,

    /// Package registry base URL (overrides config)
    #[arg(long, global = true, conflicts_with = "source_dir")]
    pub source_url: Option<String>,

    /// Base content directory mounted during bootstrap (overrides config)
    #[arg(long, global = true)]
    pub base_content: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a package and validate the graphs referenced by a scene
    Validate(ValidateArgs),

    /// Fetch a package into the local cache
    Fetch(FetchArgs),

    /// Manage the package cache
    Cache(CacheArgs),
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Package identity (name or name#version)
    pub ident: String,

    /// Scene resource path inside the package (e.g. scenes/a.scene)
    pub scene: String,

    /// Graph GUIDs whose known errors should not fail validation
    #[arg(long = "ignore", value_name = "GUID")]
    pub ignore: Vec<String>,

    /// Fail unless the scene references exactly this many graphs
    #[arg(long, value_name = "N")]
    pub expect_graphs: Option<usize>,

    /// Bootstrap as the hosting (server-authoritative) context
    #[arg(long)]
    pub host: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Package identity (name or name#version)
    pub ident: String,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Cache action to perform
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommand actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached package entries
    List,

    /// Remove every cached entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
