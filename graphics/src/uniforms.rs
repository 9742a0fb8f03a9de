//! Uniform blocks shared with shaders, and the context-scoped lighting and
//! effect settings they are filled from.
//!
//! Every block is `#[repr(C)]` with 16-byte aligned members so it can be
//! uploaded as-is into a WGSL `var<uniform>`.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use tessera_core::math::{Mat4, Vec3, mat4_to_cols_array_2d};

/// Uniform slot of the camera block.
pub const CAMERA_SLOT: usize = 0;
/// Uniform slot of the model block.
pub const MODEL_SLOT: usize = 1;
/// Uniform slot of the lighting block.
pub const LIGHTING_SLOT: usize = 2;
/// Uniform slot of the effect block.
pub const EFFECT_SLOT: usize = 3;
/// Uniform slot of a material's constant block.
pub const MATERIAL_SLOT: usize = 4;

/// Maximum number of lights in [`LightingSettings`].
pub const MAX_LIGHTS: usize = 8;

/// Per-camera block (slot 0).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    /// Camera position in world space; `w` is unused.
    pub position: [f32; 4],
}

impl CameraUniform {
    /// Build the block from view and projection matrices.
    pub fn new(view: &Mat4, projection: &Mat4, position: &Vec3) -> Self {
        Self {
            view: mat4_to_cols_array_2d(view),
            projection: mat4_to_cols_array_2d(projection),
            view_projection: mat4_to_cols_array_2d(&(projection * view)),
            position: [position.x, position.y, position.z, 1.0],
        }
    }

    /// Identity matrices, used for screen-space passes.
    pub fn identity() -> Self {
        let identity = Mat4::identity();
        Self::new(&identity, &identity, &Vec3::zeros())
    }
}

/// Per-draw model block (slot 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    /// Color multiplied into the vertex color.
    pub tint: [f32; 4],
}

impl ModelUniform {
    /// Build the block from a model matrix and tint.
    pub fn new(model: &Mat4, tint: [f32; 4]) -> Self {
        Self {
            model: mat4_to_cols_array_2d(model),
            tint,
        }
    }
}

impl Default for ModelUniform {
    fn default() -> Self {
        Self::new(&Mat4::identity(), [1.0; 4])
    }
}

/// Kind of light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightKind {
    /// Light arriving from one direction (sun).
    #[default]
    Directional,
    /// Light emitted from a point, fading out at `range`.
    Point,
}

/// One light source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Direction the light travels (directional) or world position (point).
    pub vector: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Distance at which a point light reaches zero.
    pub range: f32,
}

impl Light {
    /// A directional light.
    pub fn directional(direction: Vec3, color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            vector: direction,
            color,
            intensity,
            range: 0.0,
        }
    }

    /// A point light.
    pub fn point(position: Vec3, color: [f32; 3], intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            vector: position,
            color,
            intensity,
            range,
        }
    }
}

/// GPU layout of one light.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// `xyz` direction or position; `w` is 0 for directional, 1 for point.
    pub vector: [f32; 4],
    /// `rgb` color, `a` intensity.
    pub color: [f32; 4],
    /// `x` range; the rest is reserved.
    pub params: [f32; 4],
}

/// Lighting block (slot 2).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightingUniform {
    /// `rgb` ambient color, `a` ambient intensity.
    pub ambient: [f32; 4],
    /// `x` is the number of active lights.
    pub counts: [u32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
}

/// Effect block (slot 3).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EffectUniform {
    pub parameters: [[f32; 4]; 4],
}

const_assert_eq!(std::mem::size_of::<CameraUniform>(), 208);
const_assert_eq!(std::mem::size_of::<ModelUniform>(), 80);
const_assert_eq!(std::mem::size_of::<LightUniform>(), 48);
const_assert_eq!(std::mem::size_of::<LightingUniform>(), 32 + 48 * MAX_LIGHTS);
const_assert_eq!(std::mem::size_of::<EffectUniform>(), 64);

/// Context-scoped light list, uploaded at every `begin_camera`.
#[derive(Debug, Clone, PartialEq)]
pub struct LightingSettings {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    lights: Vec<Light>,
}

impl LightingSettings {
    /// Add a light. Returns `false` (and drops it) when all
    /// [`MAX_LIGHTS`] slots are in use.
    pub fn add_light(&mut self, light: Light) -> bool {
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!("Light limit of {} reached, light ignored", MAX_LIGHTS);
            return false;
        }
        self.lights.push(light);
        true
    }

    /// Remove every light.
    pub fn clear_lights(&mut self) {
        self.lights.clear();
    }

    /// Active lights.
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Mutable access to the active lights.
    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    /// Pack into the GPU layout.
    pub fn to_uniform(&self) -> LightingUniform {
        let mut uniform = LightingUniform::zeroed();
        let [r, g, b] = self.ambient_color;
        uniform.ambient = [r, g, b, self.ambient_intensity];
        uniform.counts[0] = self.lights.len() as u32;
        for (slot, light) in uniform.lights.iter_mut().zip(&self.lights) {
            let w = match light.kind {
                LightKind::Directional => 0.0,
                LightKind::Point => 1.0,
            };
            let [r, g, b] = light.color;
            *slot = LightUniform {
                vector: [light.vector.x, light.vector.y, light.vector.z, w],
                color: [r, g, b, light.intensity],
                params: [light.range, 0.0, 0.0, 0.0],
            };
        }
        uniform
    }
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.1,
            lights: Vec::new(),
        }
    }
}

/// Context-scoped parameters for screen-space effects, uploaded at every
/// `begin_camera` and before `apply_effect`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectSettings {
    parameters: [f32; 16],
}

impl EffectSettings {
    /// Number of scalar parameters.
    pub const PARAMETER_COUNT: usize = 16;

    /// Set parameter `index`. Out-of-range indices are ignored with a warning.
    pub fn set(&mut self, index: usize, value: f32) {
        match self.parameters.get_mut(index) {
            Some(slot) => *slot = value,
            None => log::warn!("Effect parameter {} out of range", index),
        }
    }

    /// Get parameter `index`.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.parameters.get(index).copied()
    }

    /// Pack into the GPU layout.
    pub fn to_uniform(&self) -> EffectUniform {
        let mut parameters = [[0.0; 4]; 4];
        for (i, value) in self.parameters.iter().enumerate() {
            parameters[i / 4][i % 4] = *value;
        }
        EffectUniform { parameters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_uniform_identity() {
        let u = CameraUniform::identity();
        assert_eq!(u.view_projection[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(u.view_projection[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_camera_uniform_column_major() {
        let view = tessera_core::math::mat4_from_translation(Vec3::new(1.0, 2.0, 3.0));
        let u = CameraUniform::new(&view, &Mat4::identity(), &Vec3::zeros());
        assert_eq!(u.view[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_light_limit() {
        let mut lighting = LightingSettings::default();
        for _ in 0..MAX_LIGHTS {
            assert!(lighting.add_light(Light::directional(-Vec3::y(), [1.0; 3], 1.0)));
        }
        assert!(!lighting.add_light(Light::point(Vec3::zeros(), [1.0; 3], 1.0, 5.0)));
        assert_eq!(lighting.lights().len(), MAX_LIGHTS);
    }

    #[test]
    fn test_lighting_packing() {
        let mut lighting = LightingSettings::default();
        lighting.add_light(Light::point(Vec3::new(1.0, 2.0, 3.0), [0.5, 0.5, 0.5], 2.0, 10.0));
        let u = lighting.to_uniform();
        assert_eq!(u.counts[0], 1);
        assert_eq!(u.lights[0].vector, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.lights[0].color[3], 2.0);
        assert_eq!(u.lights[0].params[0], 10.0);
        assert_eq!(u.lights[1], LightUniform::zeroed());
    }

    #[test]
    fn test_effect_parameters() {
        let mut effects = EffectSettings::default();
        effects.set(5, 0.25);
        effects.set(99, 1.0);
        assert_eq!(effects.get(5), Some(0.25));
        assert_eq!(effects.get(99), None);
        assert_eq!(effects.to_uniform().parameters[1][1], 0.25);
    }
}
