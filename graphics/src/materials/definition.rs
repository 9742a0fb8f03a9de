//! Key/value material definitions.
//!
//! A definition names a shader, texture keys per slot and optional pipeline
//! state, all as plain strings. The context resolves it through its caches:
//!
//! ```text
//! # brick.material
//! shader = Default
//! diffuse = textures/brick.png
//! blend = alpha
//! depth = less
//! depth_write = false
//! cull = none
//! ```

use tessera_core::sampler::CompareFunction;

use crate::error::GraphicsError;
use crate::shader::{BlendMode, CullMode, DepthState, FillMode, RasterState, Shader, Winding};

use super::material::{StateOverrides, TextureSlot};

/// A parsed material definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialDefinition {
    /// Shader key.
    pub shader: String,
    /// Texture key per slot, in [`TextureSlot::ALL`] order.
    pub textures: [Option<String>; TextureSlot::COUNT],
    pub blend: Option<BlendMode>,
    pub depth_compare: Option<CompareFunction>,
    pub depth_write: Option<bool>,
    pub cull: Option<CullMode>,
    pub fill: Option<FillMode>,
    pub winding: Option<Winding>,
}

impl MaterialDefinition {
    /// A definition that only names its shader.
    pub fn new(shader: impl Into<String>) -> Self {
        Self {
            shader: shader.into(),
            ..Default::default()
        }
    }

    /// Set the texture key of a slot.
    pub fn with_texture(mut self, slot: TextureSlot, key: impl Into<String>) -> Self {
        self.textures[slot.index()] = Some(key.into());
        self
    }

    /// Texture key of a slot, if set.
    pub fn texture(&self, slot: TextureSlot) -> Option<&str> {
        self.textures[slot.index()].as_deref()
    }

    /// Build a definition from `(key, value)` pairs.
    ///
    /// Keys are case-sensitive and values are trimmed. Unknown keys,
    /// unparsable values and a missing `shader` are errors.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, GraphicsError> {
        let mut definition = Self::default();
        for (key, value) in pairs {
            let key = key.trim();
            let value = value.trim();
            let invalid = || {
                GraphicsError::MaterialLoadFailed(format!("invalid value '{value}' for '{key}'"))
            };
            match key {
                "shader" => definition.shader = value.to_string(),
                "blend" => definition.blend = Some(BlendMode::from_name(value).ok_or_else(invalid)?),
                "depth" => {
                    definition.depth_compare =
                        Some(CompareFunction::from_name(value).ok_or_else(invalid)?)
                }
                "depth_write" => definition.depth_write = Some(parse_bool(value).ok_or_else(invalid)?),
                "cull" => definition.cull = Some(CullMode::from_name(value).ok_or_else(invalid)?),
                "fill" => definition.fill = Some(FillMode::from_name(value).ok_or_else(invalid)?),
                "winding" => definition.winding = Some(Winding::from_name(value).ok_or_else(invalid)?),
                _ => match TextureSlot::from_key(key) {
                    Some(slot) => definition.textures[slot.index()] = Some(value.to_string()),
                    None => {
                        return Err(GraphicsError::MaterialLoadFailed(format!(
                            "unknown material key '{key}'"
                        )));
                    }
                },
            }
        }

        if definition.shader.is_empty() {
            return Err(GraphicsError::MaterialLoadFailed(
                "material definition has no shader".into(),
            ));
        }
        Ok(definition)
    }

    /// Parse `key = value` lines. Blank lines and lines starting with `#`
    /// are skipped.
    pub fn parse(text: &str) -> Result<Self, GraphicsError> {
        let mut pairs = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                GraphicsError::MaterialLoadFailed(format!(
                    "line {}: expected 'key = value', got '{line}'",
                    number + 1
                ))
            })?;
            pairs.push((key, value));
        }
        Self::from_pairs(pairs)
    }

    /// Resolve the state fields against the shader's baseline.
    ///
    /// Fields the definition leaves unset take the baseline values; a state
    /// with no fields set stays `None`.
    pub fn state_overrides(&self, shader: &Shader) -> StateOverrides {
        let baseline = shader.baseline();
        let depth = (self.depth_compare.is_some() || self.depth_write.is_some()).then(|| {
            let base = baseline.depth;
            DepthState::new(
                self.depth_compare.unwrap_or(base.compare),
                self.depth_write.unwrap_or(base.write_enabled),
            )
        });
        let raster = (self.cull.is_some() || self.fill.is_some() || self.winding.is_some()).then(
            || {
                let base = baseline.raster;
                RasterState::new(
                    self.fill.unwrap_or(base.fill),
                    self.cull.unwrap_or(base.cull),
                    self.winding.unwrap_or(base.winding),
                )
            },
        );
        StateOverrides {
            blend: self.blend,
            depth,
            raster,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_parse_full_definition() {
        let text = r#"
# brick
shader = Default
diffuse = textures/brick.png
normal = textures/brick_n.png
blend = alpha
depth = less
depth_write = false
cull = none
fill = wireframe
winding = cw
"#;
        let def = MaterialDefinition::parse(text).unwrap();
        assert_eq!(def.shader, "Default");
        assert_eq!(def.texture(TextureSlot::Diffuse), Some("textures/brick.png"));
        assert_eq!(def.texture(TextureSlot::Emissive), None);
        assert_eq!(def.blend, Some(BlendMode::Alpha));
        assert_eq!(def.depth_compare, Some(CompareFunction::Less));
        assert_eq!(def.depth_write, Some(false));
        assert_eq!(def.cull, Some(CullMode::None));
        assert_eq!(def.fill, Some(FillMode::Wireframe));
        assert_eq!(def.winding, Some(Winding::Clockwise));
    }

    #[test]
    fn test_errors() {
        assert!(MaterialDefinition::from_pairs([("diffuse", "a.png")]).is_err());
        assert!(MaterialDefinition::from_pairs([("shader", "S"), ("gloss", "1")]).is_err());
        let err = MaterialDefinition::from_pairs([("shader", "S"), ("blend", "multiply")])
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(MaterialDefinition::parse("shader Default").is_err());
    }

    #[test]
    fn test_state_overrides_merge_with_baseline() {
        let backend = DummyBackend::new();
        let shader = Shader::builtin_default(&backend).unwrap();
        let def = MaterialDefinition::from_pairs([("shader", "Default"), ("depth_write", "no")])
            .unwrap();
        shader.set_depth_state(DepthState::new(CompareFunction::Greater, true));

        let overrides = def.state_overrides(&shader);
        assert_eq!(overrides.blend, None);
        assert_eq!(overrides.raster, None);
        let depth = overrides.depth.unwrap();
        assert!(!depth.write_enabled);
        assert_eq!(depth.compare, shader.baseline().depth.compare);
        assert_eq!(depth.compare, CompareFunction::LessEqual);
    }
}
