//! Material: a shader plus its texture, sampler and constant bindings.

use std::sync::Arc;

use tessera_core::color::Rgba8;

use crate::resources::{Buffer, Sampler, ShaderResourceView};
use crate::shader::{BlendMode, DepthState, PipelineStates, RasterState, Shader};

/// Named texture slots of a material, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    Normal,
    Emissive,
    Specular,
    AmbientOcclusion,
    Bump,
}

impl TextureSlot {
    /// Number of material texture slots.
    pub const COUNT: usize = 6;

    /// Every slot, in binding order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Diffuse,
        Self::Normal,
        Self::Emissive,
        Self::Specular,
        Self::AmbientOcclusion,
        Self::Bump,
    ];

    /// Texture slot index; the texture binds at `2 * index` in group 1.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Key used in material definitions.
    pub fn key(self) -> &'static str {
        match self {
            Self::Diffuse => "diffuse",
            Self::Normal => "normal",
            Self::Emissive => "emissive",
            Self::Specular => "specular",
            Self::AmbientOcclusion => "ambient_occlusion",
            Self::Bump => "bump",
        }
    }

    /// Parse a definition key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.key() == key)
    }

    /// Color of the generated texture that fills the slot when unset.
    pub fn default_color(self) -> Rgba8 {
        match self {
            Self::Diffuse | Self::AmbientOcclusion => Rgba8::WHITE,
            Self::Normal => Rgba8::FLAT_NORMAL,
            Self::Emissive => Rgba8::BLACK,
            Self::Specular | Self::Bump => Rgba8::GRAY,
        }
    }
}

/// Engine defaults used for every unset material slot.
#[derive(Debug, Clone)]
pub struct MaterialDefaults {
    textures: [ShaderResourceView; TextureSlot::COUNT],
    sampler: Sampler,
}

impl MaterialDefaults {
    /// Bundle one default view per slot (in [`TextureSlot::ALL`] order) with
    /// the default sampler.
    pub fn new(textures: [ShaderResourceView; TextureSlot::COUNT], sampler: Sampler) -> Self {
        Self { textures, sampler }
    }

    /// Default view of `slot`.
    pub fn texture(&self, slot: TextureSlot) -> &ShaderResourceView {
        &self.textures[slot.index()]
    }

    /// Default sampler.
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}

/// Pipeline state a material imposes on its shader when bound.
///
/// `None` means the shader's baseline, not whatever state the shader was
/// last left in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateOverrides {
    pub blend: Option<BlendMode>,
    pub depth: Option<DepthState>,
    pub raster: Option<RasterState>,
}

impl StateOverrides {
    /// Complete states: the overrides, with `baseline` for unset fields.
    pub fn resolve(&self, baseline: PipelineStates) -> PipelineStates {
        PipelineStates {
            blend: self.blend.unwrap_or(baseline.blend),
            depth: self.depth.unwrap_or(baseline.depth),
            raster: self.raster.unwrap_or(baseline.raster),
        }
    }
}

/// A shader with a full set of texture and sampler bindings.
///
/// Every slot holds a view: unset slots were filled with the engine defaults
/// when the material was built, so binding a material never binds nothing.
///
/// # Example
///
/// ```ignore
/// let material = Material::builder("Brick", shader)
///     .with_texture(TextureSlot::Diffuse, brick.create_shader_resource_view()?)
///     .build(context.material_defaults());
/// ```
pub struct Material {
    name: String,
    shader: Arc<Shader>,
    textures: [ShaderResourceView; TextureSlot::COUNT],
    samplers: [Sampler; TextureSlot::COUNT],
    constants: Option<Arc<Buffer>>,
    overrides: StateOverrides,
    states: PipelineStates,
}

impl Material {
    /// Start building a material around `shader`.
    pub fn builder(name: impl Into<String>, shader: Arc<Shader>) -> MaterialBuilder {
        MaterialBuilder {
            name: name.into(),
            shader,
            textures: Default::default(),
            samplers: Default::default(),
            constants: None,
            overrides: StateOverrides::default(),
        }
    }

    /// Material name (its cache key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shader this material draws with.
    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    /// View bound to `slot`.
    pub fn texture(&self, slot: TextureSlot) -> &ShaderResourceView {
        &self.textures[slot.index()]
    }

    /// Sampler bound to `slot`.
    pub fn sampler(&self, slot: TextureSlot) -> &Sampler {
        &self.samplers[slot.index()]
    }

    /// Constant block bound to the material uniform slot, if any.
    pub fn constants(&self) -> Option<&Arc<Buffer>> {
        self.constants.as_ref()
    }

    /// The overrides the material was built with.
    pub fn state_overrides(&self) -> &StateOverrides {
        &self.overrides
    }

    /// Complete states set on the shader each time the material is bound.
    pub fn pipeline_states(&self) -> PipelineStates {
        self.states
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("shader", &self.shader.name())
            .field("constants", &self.constants.is_some())
            .field("overrides", &self.overrides)
            .finish()
    }
}

static_assertions::assert_impl_all!(Material: Send, Sync);

/// Builder for [`Material`].
#[derive(Debug)]
pub struct MaterialBuilder {
    name: String,
    shader: Arc<Shader>,
    textures: [Option<ShaderResourceView>; TextureSlot::COUNT],
    samplers: [Option<Sampler>; TextureSlot::COUNT],
    constants: Option<Arc<Buffer>>,
    overrides: StateOverrides,
}

impl MaterialBuilder {
    /// Bind a texture view to a slot.
    pub fn with_texture(mut self, slot: TextureSlot, view: ShaderResourceView) -> Self {
        self.textures[slot.index()] = Some(view);
        self
    }

    /// Bind a sampler to a slot.
    pub fn with_sampler(mut self, slot: TextureSlot, sampler: Sampler) -> Self {
        self.samplers[slot.index()] = Some(sampler);
        self
    }

    /// Attach a constant block.
    pub fn with_constants(mut self, buffer: Arc<Buffer>) -> Self {
        self.constants = Some(buffer);
        self
    }

    /// Set the state imposed on the shader at bind time.
    pub fn with_state_overrides(mut self, overrides: StateOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Fill unset slots from `defaults` and build the material.
    pub fn build(self, defaults: &MaterialDefaults) -> Material {
        let mut textures = self.textures;
        let mut samplers = self.samplers;
        let textures = TextureSlot::ALL.map(|slot| {
            textures[slot.index()]
                .take()
                .unwrap_or_else(|| defaults.texture(slot).clone())
        });
        let samplers = TextureSlot::ALL.map(|slot| {
            samplers[slot.index()]
                .take()
                .unwrap_or_else(|| defaults.sampler().clone())
        });

        let states = self.overrides.resolve(self.shader.baseline());
        Material {
            name: self.name,
            shader: self.shader,
            textures,
            samplers,
            constants: self.constants,
            overrides: self.overrides,
            states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GpuBackend;
    use crate::backend::dummy::DummyBackend;
    use crate::resources::{Texture, TextureView};

    fn defaults(backend: &Arc<dyn GpuBackend>) -> MaterialDefaults {
        let textures = TextureSlot::ALL.map(|slot| {
            Texture::solid_color(backend, slot.default_color())
                .and_then(|t| t.create_shader_resource_view())
                .unwrap()
        });
        MaterialDefaults::new(textures, Sampler::linear_wrap(backend).unwrap())
    }

    #[test]
    fn test_slot_keys() {
        for slot in TextureSlot::ALL {
            assert_eq!(TextureSlot::from_key(slot.key()), Some(slot));
        }
        assert_eq!(TextureSlot::Bump.index(), 5);
        assert_eq!(TextureSlot::Normal.default_color(), Rgba8::FLAT_NORMAL);
    }

    #[test]
    fn test_unset_slots_use_defaults() {
        let dummy = Arc::new(DummyBackend::new());
        let backend: Arc<dyn GpuBackend> = dummy.clone();
        let defaults = defaults(&backend);
        let shader = Arc::new(Shader::builtin_default(dummy.as_ref()).unwrap());

        let brick = Texture::solid_color(&backend, Rgba8::new(200, 80, 40, 255)).unwrap();
        let brick_view = brick.create_shader_resource_view().unwrap();
        let material = Material::builder("Brick", shader)
            .with_texture(TextureSlot::Diffuse, brick_view.clone())
            .build(&defaults);

        assert!(material.texture(TextureSlot::Diffuse).shares_resource_with(&brick_view));
        for slot in &TextureSlot::ALL[1..] {
            assert!(
                material
                    .texture(*slot)
                    .shares_resource_with(defaults.texture(*slot))
            );
            assert!(Arc::ptr_eq(
                material.sampler(*slot).gpu_handle(),
                defaults.sampler().gpu_handle()
            ));
        }
        assert!(material.constants().is_none());
    }

    #[test]
    fn test_states_resolve_against_baseline() {
        let dummy = Arc::new(DummyBackend::new());
        let backend: Arc<dyn GpuBackend> = dummy.clone();
        let defaults = defaults(&backend);
        let shader = Arc::new(Shader::builtin_default(dummy.as_ref()).unwrap());

        // Live shader state must not leak into a material built afterwards.
        shader.set_blend_mode(BlendMode::Additive);
        shader.set_depth_state(DepthState::disabled());

        let alpha = Material::builder("Glass", Arc::clone(&shader))
            .with_state_overrides(StateOverrides {
                blend: Some(BlendMode::Alpha),
                ..Default::default()
            })
            .build(&defaults);
        let plain = Material::builder("Plain", shader).build(&defaults);

        assert_eq!(alpha.pipeline_states().blend, BlendMode::Alpha);
        assert_eq!(alpha.pipeline_states().depth, DepthState::default());
        assert_eq!(plain.pipeline_states(), PipelineStates::default());
    }
}
