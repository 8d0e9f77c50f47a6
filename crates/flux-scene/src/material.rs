//! Material resolution.
//!
//! Every primitive renders with one of three material classes chosen by its
//! kind. Per-element `attributes.materialProperties` override the class
//! defaults.

use flux_ir::{canonical_name, ColorValue, EntityClass, MaterialProperties, PrimitiveKind};

use crate::error::{GeometryError, Result};

/// Rendering class of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialClass {
    /// Lit, shaded surfaces.
    Surface,
    /// Unlit lines.
    Line,
    /// Screen-space points.
    Point,
}

/// Resolved rendering parameters for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Rendering class.
    pub class: MaterialClass,
    /// Linear RGB in `0..1`.
    pub color: [f32; 3],
    /// Opacity in `0..1`.
    pub opacity: f32,
    /// Surface roughness in `0..1`. Ignored by lines and points.
    pub roughness: f32,
    /// Render triangle edges only.
    pub wireframe: bool,
    /// Line width or point size.
    pub size: f32,
}

impl Material {
    /// Defaults for a material class.
    pub fn for_class(class: MaterialClass) -> Self {
        match class {
            MaterialClass::Surface => Self {
                class,
                color: [0.8, 0.8, 0.8],
                opacity: 1.0,
                roughness: 0.5,
                wireframe: false,
                size: 1.0,
            },
            MaterialClass::Line => Self {
                class,
                color: [0.2, 0.2, 0.2],
                opacity: 1.0,
                roughness: 1.0,
                wireframe: false,
                size: 1.0,
            },
            MaterialClass::Point => Self {
                class,
                color: [0.2, 0.2, 0.2],
                opacity: 1.0,
                roughness: 1.0,
                wireframe: false,
                size: 5.0,
            },
        }
    }

    /// True when blending is needed.
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }

    /// Apply per-element overrides.
    pub fn with_overrides(mut self, props: &MaterialProperties) -> std::result::Result<Self, String> {
        if let Some(color) = &props.color {
            self.color = decode_color(color)?;
        }
        if let Some(opacity) = props.opacity {
            self.opacity = opacity.clamp(0.0, 1.0) as f32;
        }
        if let Some(roughness) = props.roughness {
            self.roughness = roughness.clamp(0.0, 1.0) as f32;
        }
        if let Some(wireframe) = props.wireframe {
            self.wireframe = wireframe;
        }
        if let Some(size) = props.size {
            self.size = size as f32;
        }
        Ok(self)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::for_class(MaterialClass::Surface)
    }
}

/// Material class for a primitive name. Unknown names render as surfaces.
pub fn material_class(primitive: &str) -> MaterialClass {
    match PrimitiveKind::parse(canonical_name(primitive)).map(PrimitiveKind::entity_class) {
        Some(EntityClass::Vertex) => MaterialClass::Point,
        Some(EntityClass::Wire) => MaterialClass::Line,
        Some(EntityClass::Sheet | EntityClass::Solid) | None => MaterialClass::Surface,
    }
}

/// Resolve the material for one primitive.
pub fn resolve_material(primitive: &str, props: Option<&MaterialProperties>) -> Result<Material> {
    let base = Material::for_class(material_class(primitive));
    match props {
        None => Ok(base),
        Some(props) => base
            .with_overrides(props)
            .map_err(|message| GeometryError::invalid(primitive, message)),
    }
}

fn decode_color(color: &ColorValue) -> std::result::Result<[f32; 3], String> {
    match color {
        ColorValue::Rgb(rgb) => Ok(rgb.map(|c| c.clamp(0.0, 1.0) as f32)),
        ColorValue::Hex(text) => {
            let digits = text.trim_start_matches('#');
            let mut bytes = [0u8; 3];
            hex::decode_to_slice(digits, &mut bytes)
                .map_err(|e| format!("color `{text}` is not #rrggbb: {e}"))?;
            Ok(bytes.map(|b| b as f32 / 255.0))
        }
    }
}
