//! Integration tests for Loadstone

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const GUID_DOOR: &str = "11111111-1111-1111-1111-111111111111";
const GUID_PICKUP: &str = "22222222-2222-2222-2222-222222222222";

/// A published-package directory, base content, and empty cache root
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ws = Self { dir };

        // Scene with two graphs: "Door Logic" references a missing node,
        // "Pickup" is clean
        let scene = serde_json::json!({
            "objects": [
                {
                    "name": "world",
                    "graphs": [
                        {
                            "guid": GUID_DOOR,
                            "title": "Door Logic",
                            "nodes": [
                                {"id": 1, "kind": "event", "inputs": []},
                                {"id": 2, "kind": "call", "inputs": [7]}
                            ]
                        }
                    ],
                    "children": [
                        {
                            "name": "inventory",
                            "graphs": [
                                {
                                    "guid": GUID_PICKUP,
                                    "title": "Pickup",
                                    "nodes": [{"id": 1, "kind": "event", "inputs": []}]
                                }
                            ],
                            "children": []
                        }
                    ]
                }
            ]
        });

        let bundle = serde_json::json!({
            "name": "acme.game",
            "version": 5,
            "files": {
                "scenes/a.scene": scene.to_string(),
                "game.types.json": "[\"Inventory\"]",
                "textures/readme.md": "placeholder"
            }
        });

        let published = ws.published();
        fs::create_dir_all(published.join("acme.game")).unwrap();
        fs::write(
            published.join("acme.game/5.json"),
            serde_json::to_string_pretty(&bundle).unwrap(),
        )
        .unwrap();

        let base = ws.base();
        fs::create_dir_all(&base).unwrap();
        fs::write(
            base.join("base.types.json"),
            "[\"RigidBody\", \"PlayerController\"]",
        )
        .unwrap();

        ws
    }

    fn published(&self) -> PathBuf {
        self.dir.path().join("published")
    }

    fn base(&self) -> PathBuf {
        self.dir.path().join("base")
    }

    fn cache(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn config(&self) -> PathBuf {
        // Intentionally absent: loading falls back to defaults and never
        // reads the developer's real config
        self.dir.path().join("config.toml")
    }
}

mod pipeline_tests {
    use super::*;
    use loadstone::cache::{ContentCache, DirSource};
    use loadstone::ident::PackageIdent;
    use loadstone::loader::{CancelToken, PackageLoader};
    use loadstone::runtime::{LoadFlags, RuntimeContext};
    use loadstone::scene::{collect_graphs, validate, SceneLoader};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn loader_for(ws: &Workspace) -> PackageLoader {
        PackageLoader::new(
            ContentCache::initialize(ws.cache()).unwrap(),
            Arc::new(DirSource::new(ws.published())),
            ws.base(),
        )
    }

    #[tokio::test]
    async fn live_package_scene_has_no_unexpected_graph_errors() {
        let ws = Workspace::new();
        let loader = loader_for(&ws);
        let ctx = RuntimeContext::default();
        let ident = PackageIdent::with_version("acme.game", 5);

        ctx.unmount_all();
        let handle = loader
            .load(&ctx, &ident, LoadFlags::HOST, &CancelToken::new())
            .await
            .unwrap();

        assert!(ctx.handle().is_some(), "runtime should be loaded");
        assert_eq!(
            ctx.mounted_file_count(&ident),
            Some(3),
            "package files are mounted"
        );
        assert!(handle.type_count > 0, "registry has types");
        assert!(ctx.has_type("Inventory"));

        let scene = SceneLoader::resolve(&ctx, "scenes/a.scene").unwrap();
        let graphs = collect_graphs(&scene);
        assert_eq!(graphs.len(), 2, "scene has expected graph count");
        assert_eq!(graphs[0].guid.to_string(), GUID_DOOR);
        assert_eq!(graphs[1].guid.to_string(), GUID_PICKUP);
        assert!(graphs[0].has_errors);
        assert!(!graphs[1].has_errors);

        // Known-bad graph is allow-listed; the verdict must pass
        let ignore: HashSet<_> = [graphs[0].guid].into_iter().collect();
        let report = validate(&graphs, &ignore);
        assert!(!report.has_unexpected_errors, "no unexpected graph errors");
        assert!(report.per_graph[0].ignored);
        assert!(!report.per_graph[0].graph.messages.is_empty());

        // Without the allow-list the same scene fails
        let report = validate(&graphs, &HashSet::new());
        assert!(report.has_unexpected_errors);

        ctx.close();
        assert_eq!(ctx.file_count(), 0);
        assert!(ctx.handle().is_none());
    }

    #[tokio::test]
    async fn repeated_loads_reuse_the_cache_entry() {
        let ws = Workspace::new();
        let loader = loader_for(&ws);
        let ident = PackageIdent::with_version("acme.game", 5);

        let ctx = RuntimeContext::default();
        loader
            .load(&ctx, &ident, LoadFlags::NONE, &CancelToken::new())
            .await
            .unwrap();
        ctx.close();

        // Delete the published source; a second load must come from cache
        fs::remove_dir_all(ws.published()).unwrap();

        let ctx = RuntimeContext::default();
        loader
            .load(&ctx, &ident, LoadFlags::NONE, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(ctx.mounted_file_count(&ident), Some(3));
        ctx.close();
    }

    #[tokio::test]
    async fn graph_order_is_stable_across_loads() {
        let ws = Workspace::new();
        let loader = loader_for(&ws);
        let ident = PackageIdent::with_version("acme.game", 5);

        let mut orders = vec![];
        for _ in 0..2 {
            let ctx = RuntimeContext::default();
            loader
                .load(&ctx, &ident, LoadFlags::NONE, &CancelToken::new())
                .await
                .unwrap();
            let scene = SceneLoader::resolve(&ctx, "scenes/a.scene").unwrap();
            let guids: Vec<String> = collect_graphs(&scene)
                .iter()
                .map(|g| g.guid.to_string())
                .collect();
            orders.push(guids);
            ctx.close();
        }

        assert_eq!(orders[0], orders[1]);
    }

    #[tokio::test]
    async fn blocking_adapter_matches_async_load() {
        let ws = Workspace::new();
        let loader = loader_for(&ws);
        let ident = PackageIdent::with_version("acme.game", 5);

        // Drive the blocking adapter off the async worker threads
        let handle = tokio::task::spawn_blocking(move || {
            let ctx = RuntimeContext::default();
            let handle = loader
                .load_blocking(&ctx, &ident, LoadFlags::HOST, &CancelToken::new())
                .unwrap();
            ctx.close();
            handle
        })
        .await
        .unwrap();

        assert!(handle.type_count > 0);
        assert!(handle.flags.contains(LoadFlags::HOST));
    }
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn loadstone(ws: &Workspace) -> Command {
        let mut cmd = cargo_bin_cmd!("loadstone");
        cmd.args([
            "--config",
            path_str(&ws.config()),
            "--cache-dir",
            path_str(&ws.cache()),
            "--source-dir",
            path_str(&ws.published()),
            "--base-content",
            path_str(&ws.base()),
        ]);
        cmd
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("loadstone")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("content package"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("loadstone")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("loadstone"));
    }

    #[test]
    fn validate_passes_with_ignored_graph() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args([
                "validate",
                "acme.game#5",
                "scenes/a.scene",
                "--ignore",
                GUID_DOOR,
                "--expect-graphs",
                "2",
            ])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("(IGNORED)")
                    .and(predicate::str::contains("no unexpected errors")),
            );
    }

    #[test]
    fn validate_fails_on_unexpected_graph_errors() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args(["validate", "acme.game#5", "scenes/a.scene"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unexpected errors"));
    }

    #[test]
    fn validate_fails_on_graph_count_mismatch() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args([
                "validate",
                "acme.game#5",
                "scenes/a.scene",
                "--ignore",
                GUID_DOOR,
                "--expect-graphs",
                "3",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("expected 3"));
    }

    #[test]
    fn validate_unknown_package_fails() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args(["validate", "ghost.pkg#1", "scenes/a.scene"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Package not found"));
    }

    #[test]
    fn validate_rejects_malformed_ident() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args(["validate", "acme.game#latest", "scenes/a.scene"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid package identity"));
    }

    #[test]
    fn validate_rejects_malformed_ignore_guid() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args([
                "validate",
                "acme.game#5",
                "scenes/a.scene",
                "--ignore",
                "not-a-guid",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid ignore GUID"));
    }

    #[test]
    fn fetch_caches_the_package() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args(["fetch", "acme.game#5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached acme.game#5"));

        loadstone(&ws)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("acme.game#5"));
    }

    #[test]
    fn fetch_latest_resolves_highest_version() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args(["fetch", "acme.game"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached acme.game"));
    }

    #[test]
    fn cache_list_empty() {
        let ws = Workspace::new();
        loadstone(&ws)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached packages"));
    }

    #[test]
    fn cache_clear_removes_entries() {
        let ws = Workspace::new();
        loadstone(&ws).args(["fetch", "acme.game#5"]).assert().success();

        loadstone(&ws)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared"));

        loadstone(&ws)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached packages"));
    }
}
