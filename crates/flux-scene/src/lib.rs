#![warn(missing_docs)]

//! Flux JSON to renderable scene graphs.
//!
//! [`SceneBuilder`] walks an arbitrary nesting of primitive records, entity
//! maps and arrays, builds each primitive with the builder registered for
//! its kind, merges compatible siblings, and returns the tree together with
//! a [`BuildReport`] of everything that failed. One bad element never stops
//! the rest of the scene from building.
//!
//! ```
//! use flux_scene::{SceneBuilder, SceneConfig};
//! use serde_json::json;
//!
//! let mut builder = SceneBuilder::new(SceneConfig::default());
//! let result = builder.build(&json!([
//!     {"primitive": "sphere", "radius": 1.0},
//!     {"primitive": "sphere"}
//! ]));
//! assert!(result.object().is_some());
//! assert!(result.invalid_prims().contains("sphere"));
//! ```

pub mod assemble;
pub mod brep;
pub mod builders;
pub mod config;
pub mod error;
pub mod material;
pub mod merge;
pub mod node;
pub mod registry;
pub mod report;
pub mod upgrade;

use std::collections::BTreeSet;

use serde_json::Value;

pub use assemble::SceneBuilder;
pub use brep::{
    resolve_breps, BrepBatchResponse, BrepCache, BrepElementResult, BrepErrorDescriptor,
    BrepMesh, BrepProvider, BrepRequest, ProviderError,
};
pub use builders::BuildContext;
pub use config::SceneConfig;
pub use error::{GeometryError, Result, SceneError};
pub use material::{material_class, resolve_material, Material, MaterialClass};
pub use merge::merge_siblings;
pub use node::{Geometry, NodeKind, PolygonOffset, SceneNode};
pub use registry::{BuildFn, BuilderEntry, BuilderRegistry};
pub use report::{BuildIssue, BuildReport, Severity};
pub use upgrade::upgrade_geometry;

/// Outcome of one build: the scene, if anything built, and what failed.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    /// Root of the scene. `None` when nothing in the input produced geometry.
    pub root: Option<SceneNode>,
    /// Element failures.
    pub report: BuildReport,
}

impl BuildResult {
    /// The scene root.
    pub fn object(&self) -> Option<&SceneNode> {
        self.root.as_ref()
    }

    /// Take the scene root.
    pub fn into_object(self) -> Option<SceneNode> {
        self.root
    }

    /// Human-readable digest of every failure. Empty when nothing failed.
    pub fn error_summary(&self) -> String {
        self.report.summary()
    }

    /// Primitive names that failed at least once.
    pub fn invalid_prims(&self) -> &BTreeSet<String> {
        self.report.invalid_prims()
    }

    /// Every recorded issue.
    pub fn issues(&self) -> &[BuildIssue] {
        self.report.issues()
    }

    /// Node built from the element with `id`, or the node it was merged into.
    pub fn object_by_id(&self, id: &str) -> Option<&SceneNode> {
        self.root.as_ref()?.find_by_id(id)
    }

    /// Reduce to the legacy `{mesh, invalidPrims}` shape.
    pub fn into_legacy(self) -> LegacyResult {
        LegacyResult {
            mesh: self.root,
            invalid_prims: self.report.invalid_prims().clone(),
        }
    }
}

/// Result shape of [`create_object`].
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyResult {
    /// Scene root, if anything built.
    pub mesh: Option<SceneNode>,
    /// Primitive names that failed.
    pub invalid_prims: BTreeSet<String>,
}

/// Build `value` with the standard registry and default tessellation.
pub fn create_object(value: &Value, merge_models: bool) -> LegacyResult {
    let config = SceneConfig::default().with_merge_models(merge_models);
    SceneBuilder::new(config).build(value).into_legacy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Arc;

    #[test]
    fn legacy_create_object() {
        let scene = json!([
            {"primitive": "line", "start": [0, 0], "end": [1, 0]},
            {"primitive": "arc", "start": [0, 0]},
            {"primitive": "curve", "degree": 2, "knots": [0, 1], "controlPoints": [[0, 0, 0]]}
        ]);
        let legacy = create_object(&scene, true);
        assert!(legacy.mesh.is_some());
        assert_eq!(
            legacy.invalid_prims.iter().map(String::as_str).collect::<Vec<_>>(),
            ["arc", "curve"]
        );
    }

    #[test]
    fn object_by_id_finds_merged_elements() {
        let scene = json!([
            {"primitive": "block", "id": "a", "dimensions": [1, 1, 1]},
            {"primitive": "block", "id": "b", "dimensions": [1, 1, 1], "origin": [3, 0, 0]},
            {"primitive": "block", "id": "c", "dimensions": [1, 1, 1],
             "attributes": {"materialProperties": {"color": "#ff0000"}}}
        ]);
        let result = SceneBuilder::default().build(&scene);
        let host = result.object_by_id("b").unwrap();
        assert_eq!(host.id.as_deref(), Some("a"));
        assert_eq!(host.merged_ids, ["b"]);

        let red = result.object_by_id("c").unwrap();
        assert_eq!(red.id.as_deref(), Some("c"));
        assert_eq!(red.material.unwrap().color, [1.0, 0.0, 0.0]);
        assert!(result.object_by_id("d").is_none());
    }

    #[test]
    fn custom_registry_replaces_builders() {
        fn flat_point(
            record: &flux_ir::PrimitiveRecord<'_>,
            material: &Material,
            ctx: &mut BuildContext<'_>,
        ) -> Result<SceneNode> {
            let _ = (record, ctx);
            Ok(SceneNode::new(
                NodeKind::Points,
                Geometry::Buffer(flux_tessellate::BufferGeometry::from_points(&[
                    flux_math::Point3::origin(),
                ])),
                *material,
            ))
        }

        let mut registry = BuilderRegistry::new();
        registry.register("marker", flux_ir::EntityClass::Vertex, flat_point);
        let mut builder = SceneBuilder::with_registry(&registry, SceneConfig::default());
        let result = builder.build(&json!([
            {"primitive": "marker"},
            {"primitive": "sphere", "radius": 1}
        ]));
        assert_eq!(result.object().unwrap().children.len(), 1);
        assert!(result.invalid_prims().contains("sphere"));
    }

    struct StaticProvider(BrepBatchResponse);

    impl BrepProvider for StaticProvider {
        fn tessellate(
            &self,
            _requests: Vec<BrepRequest>,
        ) -> impl Future<Output = std::result::Result<BrepBatchResponse, ProviderError>> + Send
        {
            let response = self.0.clone();
            async move { Ok(response) }
        }
    }

    struct DownProvider;

    impl BrepProvider for DownProvider {
        fn tessellate(
            &self,
            _requests: Vec<BrepRequest>,
        ) -> impl Future<Output = std::result::Result<BrepBatchResponse, ProviderError>> + Send
        {
            async { Err(ProviderError::Unreachable("connection refused".into())) }
        }
    }

    fn brep(id: &str, content: &str) -> Value {
        json!({"primitive": "brep", "id": id, "content": content, "format": "step"})
    }

    fn triangle() -> BrepElementResult {
        BrepElementResult::Mesh(BrepMesh {
            vertices: vec![
                flux_ir::Coord([0.0, 0.0, 0.0]),
                flux_ir::Coord([1.0, 0.0, 0.0]),
                flux_ir::Coord([0.0, 1.0, 0.0]),
            ],
            faces: vec![vec![0, 1, 2]],
        })
    }

    #[tokio::test]
    async fn identical_breps_share_geometry() {
        let scene = json!({"Entities": {
            "left": brep("left", "solid"),
            "right": brep("right", "solid")
        }});
        let provider = StaticProvider(BrepBatchResponse {
            results: HashMap::from([("left".to_string(), triangle())]),
        });
        let mut builder = SceneBuilder::default();
        let result = builder.build_resolved(&scene, &provider).await;
        assert!(result.report.is_empty(), "{}", result.error_summary());

        let left = result.object_by_id("left").unwrap();
        let right = result.object_by_id("right").unwrap();
        assert_eq!(left.kind, NodeKind::Mesh);
        assert!(Arc::ptr_eq(
            left.geometry.as_ref().unwrap(),
            right.geometry.as_ref().unwrap()
        ));
    }

    #[tokio::test]
    async fn provider_errors_are_element_failures() {
        let scene = json!([
            brep("ok", "a"),
            brep("broken", "b"),
            {"primitive": "sphere", "radius": 1}
        ]);
        let provider = StaticProvider(BrepBatchResponse {
            results: HashMap::from([
                ("ok".to_string(), triangle()),
                (
                    "broken".to_string(),
                    BrepElementResult::Error(BrepErrorDescriptor {
                        name: "InvalidGeometry".into(),
                        message: "open shell".into(),
                        severity: Severity::Error,
                    }),
                ),
            ]),
        });
        let result = SceneBuilder::default().build_resolved(&scene, &provider).await;
        assert!(result.object().is_some());
        let issues: Vec<_> = result.report.issues_for_id("broken").collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "InvalidGeometry: open shell");
    }

    #[tokio::test]
    async fn unreachable_provider_fails_only_breps() {
        let scene = json!([brep("x", "a"), {"primitive": "sphere", "radius": 1, "id": "ball"}]);
        let result = SceneBuilder::default().build_resolved(&scene, &DownProvider).await;
        assert!(result.object_by_id("ball").is_some());
        assert!(result.invalid_prims().contains("brep"));
        assert!(result.error_summary().contains("ServiceUnavailable"));
    }
}
