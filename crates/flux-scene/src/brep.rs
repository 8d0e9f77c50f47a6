//! Brep geometry from an external tessellation service.
//!
//! Breps are the one primitive this crate cannot tessellate itself. Before
//! a build, [`resolve_breps`] collects every brep in the input, submits one
//! batch to a [`BrepProvider`], and stores the answers in a [`BrepCache`].
//! The synchronous build then reads geometry from the cache.
//!
//! Elements with identical `(format, content)` share one cache entry, and
//! therefore one `Arc<Geometry>`.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flux_ir::{classify, BrepRecord, JsonShape, PrimitiveKind, PrimitiveRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::builders::{point, solid::face_mesh};
use crate::error::{GeometryError, Result};
use crate::node::Geometry;
use crate::report::Severity;

/// One element submitted to the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrepRequest {
    /// Key the provider answers under.
    pub id: String,
    /// Base64 of the element's `content`.
    pub content: String,
    /// Source format, passed through.
    pub format: String,
    /// Always `"brep"`.
    pub primitive: &'static str,
}

/// Tessellated geometry returned for one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrepMesh {
    /// Vertex positions.
    pub vertices: Vec<flux_ir::Coord>,
    /// Polygon faces as vertex indices.
    pub faces: Vec<Vec<u32>>,
}

/// Structured failure reported by the provider for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrepErrorDescriptor {
    /// Error name, such as `InvalidGeometry`.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Seriousness.
    #[serde(default)]
    pub severity: Severity,
}

impl BrepErrorDescriptor {
    fn new(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

/// Either shape may appear for any element of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrepElementResult {
    /// Geometry record.
    Mesh(BrepMesh),
    /// Error descriptor.
    Error(BrepErrorDescriptor),
}

/// Provider answer for one batch, keyed by request id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrepBatchResponse {
    /// Per-element results.
    pub results: HashMap<String, BrepElementResult>,
}

/// Failure of the whole provider round-trip.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The service could not be reached.
    #[error("brep service unreachable: {0}")]
    Unreachable(String),

    /// The service answered with a non-success status.
    #[error("brep service returned status {0}")]
    Status(u16),

    /// The service answered with something unreadable.
    #[error("brep service returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// An asynchronous brep tessellation service.
pub trait BrepProvider {
    /// Tessellate one batch of breps.
    fn tessellate(
        &self,
        requests: Vec<BrepRequest>,
    ) -> impl Future<Output = std::result::Result<BrepBatchResponse, ProviderError>> + Send;
}

type Entry = std::result::Result<Arc<Geometry>, BrepErrorDescriptor>;

/// Resolved brep geometry, keyed by `(format, content)`.
#[derive(Debug, Clone, Default)]
pub struct BrepCache {
    keys: HashMap<(String, String), String>,
    ids: HashSet<String>,
    entries: HashMap<String, Entry>,
}

impl BrepCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests for every brep in `value` not already known to the cache.
    ///
    /// Each distinct `(format, content)` is requested once, under the id of
    /// the first element carrying it when that id is free.
    pub fn collect_requests(&mut self, value: &Value) -> Vec<BrepRequest> {
        let mut requests = Vec::new();
        self.collect(value, &mut requests);
        requests
    }

    fn collect(&mut self, value: &Value, requests: &mut Vec<BrepRequest>) {
        match classify(value) {
            JsonShape::Primitive(raw) => {
                let Some(Ok(record)) = PrimitiveRecord::from_value(raw) else {
                    return;
                };
                if record.primitive_kind() != Some(PrimitiveKind::Brep) {
                    return;
                }
                let Ok(brep) = record.parse::<BrepRecord>() else {
                    return;
                };
                let key = (brep.format.clone(), brep.content.clone());
                if self.keys.contains_key(&key) {
                    return;
                }
                let id = match record.id {
                    Some(id) if !self.ids.contains(&id) => id,
                    _ => {
                        let mut n = self.ids.len();
                        while self.ids.contains(&format!("brep-{n}")) {
                            n += 1;
                        }
                        format!("brep-{n}")
                    }
                };
                self.ids.insert(id.clone());
                self.keys.insert(key, id.clone());
                requests.push(BrepRequest {
                    id,
                    content: STANDARD.encode(brep.content.as_bytes()),
                    format: brep.format,
                    primitive: "brep",
                });
            }
            JsonShape::EntityMap(entities) => {
                for child in entities.values() {
                    self.collect(child, requests);
                }
            }
            JsonShape::List(items) => {
                for item in items {
                    self.collect(item, requests);
                }
            }
            JsonShape::Unrecognized => {}
        }
    }

    /// Store the provider's answer for `requests`.
    ///
    /// A transport failure marks every request failed; a missing element
    /// result marks just that element.
    pub fn insert_response(
        &mut self,
        requests: &[BrepRequest],
        response: std::result::Result<BrepBatchResponse, ProviderError>,
    ) {
        let mut results = match response {
            Ok(batch) => batch.results,
            Err(e) => {
                warn!(error = %e, count = requests.len(), "brep provider failed");
                for request in requests {
                    self.entries.insert(
                        request.id.clone(),
                        Err(BrepErrorDescriptor::new("ServiceUnavailable", e.to_string())),
                    );
                }
                return;
            }
        };
        for request in requests {
            let entry = match results.remove(&request.id) {
                Some(BrepElementResult::Mesh(mesh)) => {
                    let vertices = mesh.vertices.iter().map(point).collect();
                    face_mesh("brep", vertices, &mesh.faces)
                        .map(|m| Arc::new(Geometry::Buffer(m.to_buffer())))
                        .map_err(|e| BrepErrorDescriptor::new("InvalidMesh", e.to_string()))
                }
                Some(BrepElementResult::Error(descriptor)) => Err(descriptor),
                None => Err(BrepErrorDescriptor::new(
                    "MissingResult",
                    format!("no result for element {}", request.id),
                )),
            };
            debug!(id = %request.id, ok = entry.is_ok(), "brep resolved");
            self.entries.insert(request.id.clone(), entry);
        }
    }

    /// Geometry for a brep, shared with every other element of the same content.
    pub fn lookup(&self, format: &str, content: &str) -> Result<Arc<Geometry>> {
        let entry = self
            .keys
            .get(&(format.to_string(), content.to_string()))
            .and_then(|id| self.entries.get(id))
            .ok_or(GeometryError::BrepUnresolved)?;
        match entry {
            Ok(geometry) => Ok(Arc::clone(geometry)),
            Err(descriptor) => Err(GeometryError::Provider {
                name: descriptor.name.clone(),
                message: descriptor.message.clone(),
            }),
        }
    }

    /// Number of distinct breps with an answer.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetch geometry for every brep in `value` in one provider batch.
pub async fn resolve_breps<P: BrepProvider>(value: &Value, provider: &P) -> BrepCache {
    let mut cache = BrepCache::new();
    let requests = cache.collect_requests(value);
    if requests.is_empty() {
        return cache;
    }
    let response = provider.tessellate(requests.clone()).await;
    cache.insert_response(&requests, response);
    cache
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        response: std::result::Result<BrepBatchResponse, ProviderError>,
        seen: Mutex<Vec<BrepRequest>>,
    }

    impl BrepProvider for Canned {
        fn tessellate(
            &self,
            requests: Vec<BrepRequest>,
        ) -> impl Future<Output = std::result::Result<BrepBatchResponse, ProviderError>> + Send
        {
            if let Ok(mut seen) = self.seen.lock() {
                seen.extend(requests);
            }
            let response = self.response.clone();
            async move { response }
        }
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

    #[test]
    fn duplicate_content_is_requested_once() {
        let scene = json!([
            {"primitive": "brep", "id": "a", "content": "solid", "format": "step"},
            {"primitive": "brep", "id": "b", "content": "solid", "format": "step"},
            {"primitive": "brep", "id": "a", "content": "other", "format": "step"},
            {"primitive": "sphere", "radius": 1}
        ]);
        let mut cache = BrepCache::new();
        let requests = cache.collect_requests(&scene);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].id, "a");
        assert_eq!(requests[0].content, "c29saWQ=");
        assert_eq!(requests[1].id, "brep-1");
        assert!(requests.iter().all(|r| r.primitive == "brep"));
    }

    #[test]
    fn response_shapes_parse_per_element() {
        let response: BrepBatchResponse = serde_json::from_value(json!({
            "results": {
                "a": {"vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]], "faces": [[0, 1, 2]]},
                "b": {"name": "InvalidGeometry", "message": "bad shell", "severity": "warning"}
            }
        }))
        .unwrap();
        assert!(matches!(response.results["a"], BrepElementResult::Mesh(_)));
        match &response.results["b"] {
            BrepElementResult::Error(e) => assert_eq!(e.severity, Severity::Warning),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mixed_batch_resolves_independently() {
        let scene = json!({"Entities": {
            "good": {"primitive": "brep", "id": "good", "content": "x", "format": "step"},
            "bad": {"primitive": "brep", "id": "bad", "content": "y", "format": "step"}
        }});
        let provider = Canned {
            response: Ok(BrepBatchResponse {
                results: HashMap::from([
                    ("good".to_string(), triangle()),
                    (
                        "bad".to_string(),
                        BrepElementResult::Error(BrepErrorDescriptor::new("InvalidGeometry", "bad shell")),
                    ),
                ]),
            }),
            seen: Mutex::new(Vec::new()),
        };
        let cache = resolve_breps(&scene, &provider).await;
        assert_eq!(provider.seen.lock().unwrap().len(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("step", "x").unwrap().num_vertices(), 3);
        assert_eq!(
            cache.lookup("step", "y").unwrap_err(),
            GeometryError::Provider {
                name: "InvalidGeometry".into(),
                message: "bad shell".into()
            }
        );
        assert_eq!(cache.lookup("step", "z").unwrap_err(), GeometryError::BrepUnresolved);
    }

    #[tokio::test]
    async fn transport_failure_marks_every_element() {
        let scene = json!([
            {"primitive": "brep", "content": "x", "format": "step"},
            {"primitive": "brep", "content": "y", "format": "iges"}
        ]);
        let provider = Canned {
            response: Err(ProviderError::Status(503)),
            seen: Mutex::new(Vec::new()),
        };
        let cache = resolve_breps(&scene, &provider).await;
        for (format, content) in [("step", "x"), ("iges", "y")] {
            match cache.lookup(format, content) {
                Err(GeometryError::Provider { name, message }) => {
                    assert_eq!(name, "ServiceUnavailable");
                    assert!(message.contains("503"), "{message}");
                }
                other => panic!("expected provider error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn missing_result_is_per_element() {
        let scene = json!({"primitive": "brep", "id": "lonely", "content": "x", "format": "step"});
        let provider = Canned {
            response: Ok(BrepBatchResponse::default()),
            seen: Mutex::new(Vec::new()),
        };
        let cache = resolve_breps(&scene, &provider).await;
        match cache.lookup("step", "x") {
            Err(GeometryError::Provider { name, .. }) => assert_eq!(name, "MissingResult"),
            other => panic!("expected missing result, got {other:?}"),
        }
    }
}
