//! Scene loading against the mounted filesystem

pub mod graph;

pub use graph::{
    collect_graphs, validate, GraphDoc, GraphNode, GraphReference, GraphVerdict, ValidationReport,
};

use crate::error::{LoadstoneError, LoadstoneResult};
use crate::runtime::RuntimeContext;
use serde::Deserialize;
use tracing::debug;

/// An object in a scene's hierarchy
#[derive(Debug, Clone, Deserialize)]
pub struct SceneObject {
    #[serde(default)]
    pub name: String,

    /// Graphs attached directly to this object
    #[serde(default)]
    pub graphs: Vec<GraphDoc>,

    #[serde(default)]
    pub children: Vec<SceneObject>,
}

/// A scene materialized from a mounted resource
#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub objects: Vec<SceneObject>,

    /// Logical path this scene was resolved from
    #[serde(skip)]
    pub resource_path: String,
}

/// Resolves scene resources against a bootstrapped runtime context
pub struct SceneLoader;

impl SceneLoader {
    /// Resolve a logical resource path to a materialized scene
    ///
    /// Requires a bootstrapped runtime with content mounted. Pure with
    /// respect to the mount table: resolution never mutates mount state.
    pub fn resolve(ctx: &RuntimeContext, resource_path: &str) -> LoadstoneResult<Scene> {
        if !ctx.is_bootstrapped() {
            return Err(LoadstoneError::Precondition(
                "no runtime bootstrapped; load a package first".to_string(),
            ));
        }
        if ctx.file_count() == 0 {
            return Err(LoadstoneError::Precondition(
                "no package mounted".to_string(),
            ));
        }

        let host = ctx
            .resolve_file(resource_path)
            .ok_or_else(|| LoadstoneError::ResourceNotFound(resource_path.to_string()))?;

        let content = std::fs::read_to_string(&host)
            .map_err(|e| LoadstoneError::io(format!("reading scene {}", host.display()), e))?;

        let mut scene: Scene =
            serde_json::from_str(&content).map_err(|e| LoadstoneError::SceneParse {
                path: resource_path.to_string(),
                reason: e.to_string(),
            })?;
        scene.resource_path = resource_path.to_string();

        debug!(
            "resolved scene {} ({} root objects)",
            resource_path,
            scene.objects.len()
        );
        Ok(scene)
    }
}
