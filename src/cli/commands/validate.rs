//! Validate command - load a package and check its scene graphs

use crate::cli::args::ValidateArgs;
use crate::cli::commands::build_loader;
use crate::config::Config;
use crate::error::{LoadstoneError, LoadstoneResult};
use crate::ident::PackageIdent;
use crate::loader::CancelToken;
use crate::runtime::{LoadFlags, RuntimeContext};
use crate::scene::{collect_graphs, validate, SceneLoader};
use console::style;
use std::collections::HashSet;
use uuid::Uuid;

/// Execute the validate command
pub async fn execute(args: ValidateArgs, config: &Config) -> LoadstoneResult<()> {
    let ident: PackageIdent = args.ident.parse()?;
    let ignore = parse_ignore_set(&args.ignore)?;

    let loader = build_loader(config)?;
    let ctx = RuntimeContext::new(config.mount.collision);

    // Production load protocol: explicit unmount, then load
    ctx.unmount_all();

    let flags = if args.host {
        LoadFlags::HOST
    } else {
        LoadFlags::NONE
    };
    let handle = loader
        .load(&ctx, &ident, flags, &CancelToken::new())
        .await?;

    println!(
        "{} {} ({} files, {} types)",
        style("Loaded").green().bold(),
        ident,
        ctx.file_count(),
        handle.type_count
    );

    let scene = SceneLoader::resolve(&ctx, &args.scene)?;
    let graphs = collect_graphs(&scene);

    if let Some(expected) = args.expect_graphs {
        if graphs.len() != expected {
            ctx.close();
            return Err(LoadstoneError::GraphCountMismatch {
                expected,
                actual: graphs.len(),
            });
        }
    }

    let report = validate(&graphs, &ignore);

    for verdict in &report.per_graph {
        let suffix = if verdict.ignored {
            format!(" {}", style("(IGNORED)").yellow())
        } else {
            String::new()
        };
        println!("{}: {}{}", verdict.graph.guid, verdict.graph.title, suffix);
        for message in &verdict.graph.messages {
            println!("  {}", message);
        }
    }

    ctx.close();

    if report.has_unexpected_errors {
        let failed = report
            .per_graph
            .iter()
            .filter(|v| !v.ignored && v.graph.has_errors)
            .count();
        return Err(LoadstoneError::GraphValidation(failed));
    }

    println!(
        "{} {} graphs, no unexpected errors",
        style("OK").green().bold(),
        graphs.len()
    );
    Ok(())
}

fn parse_ignore_set(raw: &[String]) -> LoadstoneResult<HashSet<Uuid>> {
    raw.iter()
        .map(|s| {
            Uuid::parse_str(s.trim()).map_err(|_| LoadstoneError::InvalidIgnoreGuid(s.clone()))
        })
        .collect()
}
