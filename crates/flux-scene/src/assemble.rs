//! Recursive scene assembly.
//!
//! The input is classified once per value into primitive, entity map, list,
//! or anything else, and each shape is handled by its own arm:
//!
//! - primitives go through the material resolver and their builder; a
//!   failure is recorded in the report and the element is dropped
//! - entity maps become groups whose children are named by key
//! - lists become groups whose compatible children are merged, then
//!   converted to flat buffers
//! - anything else contributes nothing and raises nothing, so mixed batches
//!   can be passed through without filtering

use flux_ir::{canonical_name, classify, JsonShape, PrimitiveRecord, PRIMITIVE_KEY};
use flux_math::VectorPool;
use serde_json::Value;
use tracing::debug;

use crate::brep::{self, BrepCache, BrepProvider};
use crate::builders::BuildContext;
use crate::config::SceneConfig;
use crate::error::{GeometryError, Result, SceneError};
use crate::material::resolve_material;
use crate::merge::merge_siblings;
use crate::node::SceneNode;
use crate::registry::BuilderRegistry;
use crate::report::{BuildIssue, BuildReport, Severity};
use crate::upgrade::upgrade_geometry;
use crate::BuildResult;

/// Turns Flux JSON into scene graphs.
///
/// Owns the scratch [`VectorPool`]; one builder serves one build at a time,
/// and the pool is cleared at the end of every call.
#[derive(Debug)]
pub struct SceneBuilder<'r> {
    registry: &'r BuilderRegistry,
    config: SceneConfig,
    pool: VectorPool,
}

impl SceneBuilder<'static> {
    /// Builder over the standard registry.
    pub fn new(config: SceneConfig) -> Self {
        Self::with_registry(BuilderRegistry::standard(), config)
    }
}

impl Default for SceneBuilder<'static> {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl<'r> SceneBuilder<'r> {
    /// Builder over an alternate registry.
    pub fn with_registry(registry: &'r BuilderRegistry, config: SceneConfig) -> Self {
        Self {
            registry,
            config,
            pool: VectorPool::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Scratch pool, for inspection.
    pub fn pool(&self) -> &VectorPool {
        &self.pool
    }

    /// Build a parsed JSON value. Breps fail as unresolved.
    pub fn build(&mut self, value: &Value) -> BuildResult {
        self.run(value, None)
    }

    /// Build with brep geometry fetched beforehand.
    pub fn build_with_breps(&mut self, value: &Value, breps: &BrepCache) -> BuildResult {
        self.run(value, Some(breps))
    }

    /// Parse and build JSON text.
    pub fn build_str(&mut self, json: &str) -> std::result::Result<BuildResult, SceneError> {
        let value: Value = serde_json::from_str(json)?;
        Ok(self.build(&value))
    }

    /// Fetch geometry for every brep in `value` from `provider`.
    pub async fn resolve_breps<P: BrepProvider>(&self, value: &Value, provider: &P) -> BrepCache {
        brep::resolve_breps(value, provider).await
    }

    /// Resolve breps through `provider`, then build.
    pub async fn build_resolved<P: BrepProvider>(&mut self, value: &Value, provider: &P) -> BuildResult {
        let breps = self.resolve_breps(value, provider).await;
        self.build_with_breps(value, &breps)
    }

    fn run(&mut self, value: &Value, breps: Option<&BrepCache>) -> BuildResult {
        let branch = {
            let ctx = BuildContext::new(&mut self.pool, self.config.tessellation, self.registry);
            let ctx = match breps {
                Some(breps) => ctx.with_breps(breps),
                None => ctx,
            };
            let mut walker = Walker {
                ctx,
                merge_models: self.config.merge_models,
            };
            walker.walk(value, "$")
        };
        let root = branch.node.map(|mut node| {
            upgrade_geometry(&mut node);
            node
        });
        self.pool.clear();
        BuildResult {
            root,
            report: branch.report,
        }
    }
}

/// What one subtree of the input produced.
#[derive(Default)]
struct Branch {
    node: Option<SceneNode>,
    report: BuildReport,
}

impl Branch {
    fn failed(issue: BuildIssue) -> Self {
        let mut report = BuildReport::new();
        report.record(issue);
        Self { node: None, report }
    }
}

struct Walker<'a> {
    ctx: BuildContext<'a>,
    merge_models: bool,
}

impl Walker<'_> {
    fn walk(&mut self, value: &Value, path: &str) -> Branch {
        match classify(value) {
            JsonShape::Primitive(raw) => self.primitive(raw, path),
            JsonShape::EntityMap(entities) => {
                let mut report = BuildReport::new();
                let mut children = Vec::with_capacity(entities.len());
                for (name, child) in entities {
                    let branch = self.walk(child, &format!("{path}.Entities.{name}"));
                    report.union(branch.report);
                    if let Some(mut node) = branch.node {
                        node.name = Some(name.clone());
                        children.push(node);
                    }
                }
                let node = (!children.is_empty()).then(|| SceneNode::group_of(children));
                Branch { node, report }
            }
            JsonShape::List(items) => {
                let mut report = BuildReport::new();
                let mut children = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let branch = self.walk(item, &format!("{path}[{i}]"));
                    report.union(branch.report);
                    children.extend(branch.node);
                }
                if self.merge_models {
                    children = merge_siblings(children);
                }
                let node = (!children.is_empty()).then(|| {
                    let mut group = SceneNode::group_of(children);
                    upgrade_geometry(&mut group);
                    group
                });
                Branch { node, report }
            }
            JsonShape::Unrecognized => Branch::default(),
        }
    }

    fn primitive(&mut self, raw: &Value, path: &str) -> Branch {
        let record = match PrimitiveRecord::from_value(raw) {
            None => return Branch::default(),
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                let name = raw
                    .get(PRIMITIVE_KEY)
                    .and_then(Value::as_str)
                    .map_or("unknown", canonical_name);
                return Branch::failed(failure(name, None, path, &GeometryError::from(e)));
            }
        };
        match self.build(&record) {
            Ok(mut node) => {
                node.id = record.id;
                node.primitive = Some(record.kind);
                node.attributes = record.attributes;
                Branch {
                    node: Some(node),
                    report: BuildReport::new(),
                }
            }
            Err(e) => Branch::failed(failure(&record.kind, record.id.clone(), path, &e)),
        }
    }

    fn build(&mut self, record: &PrimitiveRecord<'_>) -> Result<SceneNode> {
        let entry = *self
            .ctx
            .registry
            .get(&record.kind)
            .ok_or_else(|| GeometryError::Unsupported(record.kind.clone()))?;
        let material = resolve_material(&record.kind, record.material_properties())?;
        (entry.build)(record, &material, &mut self.ctx)
    }
}

fn failure(primitive: &str, id: Option<String>, path: &str, error: &GeometryError) -> BuildIssue {
    debug!(primitive, path, id = id.as_deref(), error = %error, "primitive failed to build");
    BuildIssue {
        primitive: primitive.to_string(),
        id,
        path: path.to_string(),
        message: error.to_string(),
        severity: Severity::Error,
    }
}
