//! Full-screen effects over the intermediate color target.

use crate::error::GraphicsError;
use crate::materials::{Material, TextureSlot};
use crate::types::Viewport;
use crate::uniforms::{CAMERA_SLOT, EFFECT_SLOT, MODEL_SLOT, ModelUniform};

use super::binding::DrawRequest;
use super::{ContextState, GraphicsContext};

impl GraphicsContext {
    /// Run `material` over the whole frame.
    ///
    /// Draws one full-screen triangle into the effect target with the
    /// intermediate color target bound as the diffuse input, then copies
    /// the result back into the intermediate. Only valid inside a frame
    /// and outside any camera.
    pub fn apply_effect(&mut self, material: &Material) -> Result<(), GraphicsError> {
        tessera_core::profile_scope!("apply_effect");
        self.expect_state(&[ContextState::InFrame], "apply_effect")?;
        let effects = self.effects.to_uniform();
        {
            let Some(runtime) = self.runtime.as_mut() else {
                return Err(GraphicsError::Internal("context started without a runtime".into()));
            };
            let targets = runtime.frame_targets()?.clone();
            let uniforms = &runtime.uniforms;
            uniforms
                .model
                .copy_cpu_to_gpu(bytemuck::bytes_of(&ModelUniform::default()))?;
            uniforms.effect.copy_cpu_to_gpu(bytemuck::bytes_of(&effects))?;

            let bindings = &mut runtime.bindings;
            bindings.reset();
            bindings.set_targets(
                targets.effect_target,
                None,
                Viewport::from_extent(targets.size),
            );
            bindings.set_uniform(CAMERA_SLOT, &uniforms.identity_camera);
            bindings.set_uniform(MODEL_SLOT, &uniforms.model);
            bindings.set_uniform(EFFECT_SLOT, &uniforms.effect);
        }

        let result = self.draw_effect(material);
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.bindings.reset();
        }
        result
    }

    fn draw_effect(&mut self, material: &Material) -> Result<(), GraphicsError> {
        self.bind_material(material)?;
        let Some(runtime) = self.runtime.as_mut() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };
        let targets = runtime.frame_targets()?.clone();
        runtime
            .bindings
            .set_texture(TextureSlot::Diffuse.index(), &targets.color_input);
        runtime.bindings.set_vertex_stream(runtime.fullscreen.vertex_buffer());

        runtime.bindings.draw(
            &*runtime.backend,
            DrawRequest {
                count: runtime.fullscreen.element_count(),
                layout: runtime.fullscreen.layout(),
                vertex_offset: 0,
                indexed: false,
                topology: runtime.fullscreen.topology(),
            },
        )?;
        runtime.backend.copy_texture(
            targets.effect.gpu_handle(),
            targets.color.gpu_handle(),
            targets.size,
        )?;
        log::trace!("Applied effect {}", material.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::camera::Camera;
    use crate::config::ContextParameters;

    #[test]
    fn test_effect_draws_and_copies_back() {
        let dummy = Arc::new(DummyBackend::with_back_buffer(32, 32));
        let mut context = GraphicsContext::with_backend(ContextParameters::new(), dummy.clone());
        context.startup().unwrap();
        let material = context.create_or_get_material("Default").unwrap();

        context.begin_frame().unwrap();
        let before = dummy.stats();
        context.apply_effect(&material).unwrap();
        let delta = dummy.stats().since(&before);
        assert_eq!(delta.draws, 1);
        assert_eq!(delta.texture_copies, 1);
        assert_eq!(context.state(), ContextState::InFrame);
        context.end_frame().unwrap();
    }

    #[test]
    fn test_effect_inside_camera_is_invalid() {
        let dummy = Arc::new(DummyBackend::with_back_buffer(32, 32));
        let mut context = GraphicsContext::with_backend(ContextParameters::new(), dummy.clone());
        context.startup().unwrap();
        let material = context.create_or_get_material("Default").unwrap();
        let mut camera = Camera::new();

        context.begin_frame().unwrap();
        context.begin_camera(&mut camera).unwrap();
        assert!(matches!(
            context.apply_effect(&material),
            Err(GraphicsError::InvalidState(_))
        ));
    }
}
