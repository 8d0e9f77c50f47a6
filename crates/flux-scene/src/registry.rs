//! Builder lookup by primitive name.

use std::collections::HashMap;
use std::sync::OnceLock;

use flux_ir::{canonical_name, EntityClass, PrimitiveRecord};

use crate::builders::{self, BuildContext};
use crate::error::Result;
use crate::material::Material;
use crate::node::SceneNode;

/// Builds one primitive record into a scene node.
pub type BuildFn =
    fn(&PrimitiveRecord<'_>, &Material, &mut BuildContext<'_>) -> Result<SceneNode>;

/// A registered builder and the capability class of what it produces.
#[derive(Debug, Clone, Copy)]
pub struct BuilderEntry {
    /// Capability class checked by container primitives.
    pub class: EntityClass,
    /// The builder.
    pub build: BuildFn,
}

/// Read-only table from canonical primitive name to builder.
///
/// [`BuilderRegistry::standard`] is built once per process; alternate tables
/// can be assembled with [`BuilderRegistry::register`] and handed to
/// [`SceneBuilder::with_registry`](crate::SceneBuilder::with_registry).
#[derive(Debug, Clone, Default)]
pub struct BuilderRegistry {
    builders: HashMap<String, BuilderEntry>,
}

static STANDARD: OnceLock<BuilderRegistry> = OnceLock::new();

impl BuilderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry of every standard builder.
    pub fn standard() -> &'static BuilderRegistry {
        STANDARD.get_or_init(|| {
            let mut registry = BuilderRegistry::new();
            builders::register_standard(&mut registry);
            registry
        })
    }

    /// Register `build` under `name` (canonicalized), returning any entry it replaces.
    pub fn register(
        &mut self,
        name: &str,
        class: EntityClass,
        build: BuildFn,
    ) -> Option<BuilderEntry> {
        self.builders
            .insert(canonical_name(name).to_string(), BuilderEntry { class, build })
    }

    /// Builder for `name`, accepting legacy spellings.
    pub fn get(&self, name: &str) -> Option<&BuilderEntry> {
        self.builders.get(canonical_name(name))
    }

    /// True when a builder exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, unordered.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Number of registered builders.
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_ir::PrimitiveKind;

    #[test]
    fn standard_covers_every_kind() {
        let registry = BuilderRegistry::standard();
        for kind in PrimitiveKind::ALL {
            let entry = registry
                .get(kind.as_str())
                .unwrap_or_else(|| panic!("no builder for {kind}"));
            assert_eq!(entry.class, kind.entity_class(), "class of {kind}");
        }
        assert_eq!(registry.len(), PrimitiveKind::ALL.len());
    }

    #[test]
    fn lookup_accepts_legacy_names() {
        let registry = BuilderRegistry::standard();
        assert!(registry.contains("point-2d"));
        assert!(registry.contains("polygon-set"));
        assert!(!registry.contains("teapot"));
    }

    #[test]
    fn custom_registry_starts_empty() {
        let mut registry = BuilderRegistry::new();
        assert!(registry.is_empty());
        let sphere = BuilderRegistry::standard().get("sphere").copied().unwrap();
        assert!(registry
            .register("ball", EntityClass::Solid, sphere.build)
            .is_none());
        assert!(registry.contains("ball"));
        assert!(!registry.contains("sphere"));
    }
}
