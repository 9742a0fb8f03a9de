//! Bind state and draw submission.

use std::sync::Arc;

use tessera_core::math::Mat4;

use crate::backend::{
    DrawCall, GpuBackend, GpuBuffer, GpuSampler, GpuTexture, TEXTURE_SLOT_COUNT,
    UNIFORM_SLOT_COUNT,
};
use crate::error::GraphicsError;
use crate::materials::{Material, TextureSlot};
use crate::mesh::{Mesh, PrimitiveTopology, VertexLayoutDescriptor};
use crate::resources::{
    Buffer, ColorTargetView, DepthStencilTargetView, Sampler, ShaderResourceView, TextureView,
};
use crate::shader::{ResolvedStates, Shader};
use crate::types::{BufferUsage, Viewport};
use crate::uniforms::{MATERIAL_SLOT, MODEL_SLOT, ModelUniform};

use super::{ContextState, GraphicsContext};

/// What the next draw reads.
#[derive(Default)]
pub(super) struct BindState {
    shader: Option<Arc<Shader>>,
    states: Option<ResolvedStates>,
    vertex: Option<Arc<GpuBuffer>>,
    index: Option<Arc<GpuBuffer>>,
    topology: PrimitiveTopology,
    uniforms: [Option<Arc<GpuBuffer>>; UNIFORM_SLOT_COUNT],
    textures: [Option<Arc<GpuTexture>>; TEXTURE_SLOT_COUNT],
    samplers: [Option<Arc<GpuSampler>>; TEXTURE_SLOT_COUNT],
    color_target: Option<ColorTargetView>,
    depth_target: Option<DepthStencilTargetView>,
    viewport: Viewport,
}

/// One draw's parameters beyond the bind state.
pub(super) struct DrawRequest<'a> {
    pub count: u32,
    pub layout: &'a VertexLayoutDescriptor,
    pub vertex_offset: u64,
    pub indexed: bool,
    pub topology: PrimitiveTopology,
}

impl BindState {
    /// Start rendering into new targets.
    pub(super) fn set_targets(
        &mut self,
        color: ColorTargetView,
        depth: Option<DepthStencilTargetView>,
        viewport: Viewport,
    ) {
        self.color_target = Some(color);
        self.depth_target = depth;
        self.viewport = viewport;
    }

    /// Forget targets and per-draw bindings.
    pub(super) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(super) fn set_uniform(&mut self, slot: usize, buffer: &Buffer) {
        self.uniforms[slot] = Some(Arc::clone(buffer.gpu_handle()));
    }

    pub(super) fn set_vertex_stream(&mut self, buffer: &Buffer) {
        self.vertex = Some(Arc::clone(buffer.gpu_handle()));
    }

    pub(super) fn set_texture(&mut self, slot: usize, view: &ShaderResourceView) {
        self.textures[slot] = Some(Arc::clone(view.resource()));
    }

    pub(super) fn color_target(&self) -> Option<&ColorTargetView> {
        self.color_target.as_ref()
    }

    /// Issue a draw against the current bindings.
    ///
    /// A missing shader or vertex stream panics in debug builds and skips
    /// the draw in release builds.
    pub(super) fn draw(
        &self,
        backend: &dyn GpuBackend,
        request: DrawRequest<'_>,
    ) -> Result<(), GraphicsError> {
        let (Some(shader), Some(states), Some(vertex)) = (&self.shader, &self.states, &self.vertex)
        else {
            return unbound_draw("no shader or vertex stream bound");
        };
        let index_buffer = match (request.indexed, &self.index) {
            (false, _) => None,
            (true, Some(index)) => Some(&**index),
            (true, None) => return unbound_draw("no index stream bound"),
        };

        let input_layout = shader.input_layout(backend, request.layout).inspect_err(|e| {
            log::error!("Draw with shader {}: {}", shader.name(), e);
        })?;

        let call = DrawCall {
            program: shader.program(),
            blend: &states.blend,
            depth: &states.depth,
            raster: &states.raster,
            input_layout: &input_layout,
            vertex_buffer: vertex,
            vertex_stride: request.layout.stride,
            vertex_offset: request.vertex_offset,
            index_buffer,
            count: request.count,
            topology: request.topology,
            color_target: self
                .color_target
                .as_ref()
                .map(|view| (&**view.resource(), view.format())),
            depth_target: self
                .depth_target
                .as_ref()
                .map(|view| (&**view.resource(), view.format())),
            viewport: self.viewport,
            uniforms: std::array::from_fn(|slot| self.uniforms[slot].as_deref()),
            textures: std::array::from_fn(|slot| self.textures[slot].as_deref()),
            samplers: std::array::from_fn(|slot| self.samplers[slot].as_deref()),
        };
        log::trace!(
            "Draw {} ({} elements, indexed: {})",
            shader.name(),
            request.count,
            request.indexed
        );
        backend.draw(&call)
    }
}

fn unbound_draw(reason: &str) -> Result<(), GraphicsError> {
    if cfg!(debug_assertions) {
        panic!("draw issued with {reason}");
    }
    log::error!("Draw skipped: {}", reason);
    Ok(())
}

fn check_slot(slot: usize, count: usize, kind: &str) -> Result<(), GraphicsError> {
    if slot < count {
        Ok(())
    } else {
        Err(GraphicsError::InvalidParameter(format!(
            "{kind} slot {slot} out of range (0..{count})"
        )))
    }
}

fn check_usage(buffer: &Buffer, usage: BufferUsage, role: &str) -> Result<(), GraphicsError> {
    if buffer.usage().contains(usage) {
        Ok(())
    } else {
        Err(GraphicsError::InvalidParameter(format!(
            "buffer {:?} bound as {role} without {usage:?} usage",
            buffer.label()
        )))
    }
}

const BIND_STATES: &[ContextState] = &[ContextState::InFrame, ContextState::InCamera];

impl GraphicsContext {
    fn bindings_mut(&mut self, operation: &str) -> Result<&mut BindState, GraphicsError> {
        self.expect_state(BIND_STATES, operation)?;
        self.runtime
            .as_mut()
            .map(|runtime| &mut runtime.bindings)
            .ok_or_else(|| GraphicsError::Internal("context started without a runtime".into()))
    }

    /// Bind a shader, rebuilding any of its dirty native states.
    pub fn bind_shader(&mut self, shader: &Arc<Shader>) -> Result<(), GraphicsError> {
        self.expect_state(BIND_STATES, "bind_shader")?;
        let Some(runtime) = self.runtime.as_mut() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };
        let states = shader.resolve_states(&*runtime.backend).inspect_err(|e| {
            log::error!("Failed to build states for shader {}: {}", shader.name(), e);
        })?;
        if states.rebuilds > 0 {
            log::debug!(
                "Shader {}: rebuilt {} state object(s)",
                shader.name(),
                states.rebuilds
            );
        }
        runtime.bindings.shader = Some(Arc::clone(shader));
        runtime.bindings.states = Some(states);
        Ok(())
    }

    /// Bind a texture to `slot`, or restore the backend fallback with `None`.
    pub fn bind_texture_view(
        &mut self,
        slot: usize,
        view: Option<&ShaderResourceView>,
    ) -> Result<(), GraphicsError> {
        let bindings = self.bindings_mut("bind_texture_view")?;
        check_slot(slot, TEXTURE_SLOT_COUNT, "texture")?;
        bindings.textures[slot] = view.map(|view| Arc::clone(view.resource()));
        Ok(())
    }

    /// Bind a sampler to `slot`, or restore the backend fallback with `None`.
    pub fn bind_sampler(&mut self, slot: usize, sampler: Option<&Sampler>) -> Result<(), GraphicsError> {
        let bindings = self.bindings_mut("bind_sampler")?;
        check_slot(slot, TEXTURE_SLOT_COUNT, "sampler")?;
        bindings.samplers[slot] = sampler.map(|sampler| Arc::clone(sampler.gpu_handle()));
        Ok(())
    }

    /// Bind the vertex buffer read by `draw` and `draw_indexed`.
    pub fn bind_vertex_stream(&mut self, buffer: &Buffer) -> Result<(), GraphicsError> {
        let bindings = self.bindings_mut("bind_vertex_stream")?;
        check_usage(buffer, BufferUsage::VERTEX, "vertex stream")?;
        bindings.set_vertex_stream(buffer);
        Ok(())
    }

    /// Bind the index buffer read by `draw_indexed`, or unbind with `None`.
    pub fn bind_index_stream(&mut self, buffer: Option<&Buffer>) -> Result<(), GraphicsError> {
        let bindings = self.bindings_mut("bind_index_stream")?;
        if let Some(buffer) = buffer {
            check_usage(buffer, BufferUsage::INDEX, "index stream")?;
        }
        bindings.index = buffer.map(|buffer| Arc::clone(buffer.gpu_handle()));
        Ok(())
    }

    /// Bind a uniform buffer to `slot` of the uniform group.
    pub fn bind_uniform_buffer(&mut self, slot: usize, buffer: &Buffer) -> Result<(), GraphicsError> {
        let bindings = self.bindings_mut("bind_uniform_buffer")?;
        check_slot(slot, UNIFORM_SLOT_COUNT, "uniform")?;
        check_usage(buffer, BufferUsage::UNIFORM, "uniform buffer")?;
        bindings.set_uniform(slot, buffer);
        Ok(())
    }

    /// Topology used by `draw` and `draw_indexed`. Meshes carry their own.
    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) -> Result<(), GraphicsError> {
        self.bindings_mut("set_primitive_topology")?.topology = topology;
        Ok(())
    }

    /// Upload a model transform and tint into the model uniform slot.
    pub fn bind_model_matrix(&mut self, model: &Mat4, tint: [f32; 4]) -> Result<(), GraphicsError> {
        self.expect_state(BIND_STATES, "bind_model_matrix")?;
        let Some(runtime) = self.runtime.as_mut() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };
        let uniform = ModelUniform::new(model, tint);
        runtime
            .uniforms
            .model
            .copy_cpu_to_gpu(bytemuck::bytes_of(&uniform))?;
        runtime.bindings.set_uniform(MODEL_SLOT, &runtime.uniforms.model);
        Ok(())
    }

    /// Set the material's complete pipeline states on its shader, bind the
    /// shader, all six texture and sampler slots, and its constants.
    ///
    /// States the material does not override are reset to the shader's
    /// baseline, so a material never inherits state from the one bound
    /// before it.
    ///
    /// A material without constants unbinds the material uniform slot.
    pub fn bind_material(&mut self, material: &Material) -> Result<(), GraphicsError> {
        self.expect_state(BIND_STATES, "bind_material")?;
        material.shader().set_pipeline_states(material.pipeline_states());
        self.bind_shader(material.shader())?;

        let bindings = self.bindings_mut("bind_material")?;
        for slot in TextureSlot::ALL {
            let index = slot.index();
            bindings.set_texture(index, material.texture(slot));
            bindings.samplers[index] = Some(Arc::clone(material.sampler(slot).gpu_handle()));
        }
        bindings.uniforms[MATERIAL_SLOT] = material
            .constants()
            .map(|buffer| Arc::clone(buffer.gpu_handle()));
        Ok(())
    }

    fn issue_draw(&mut self, operation: &str, request: DrawRequest<'_>) -> Result<(), GraphicsError> {
        tessera_core::profile_scope!("draw");
        self.expect_state(&[ContextState::InCamera], operation)?;
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };
        runtime.bindings.draw(&*runtime.backend, request)
    }

    /// Draw `vertex_count` vertices of the bound vertex stream, starting
    /// `byte_offset` bytes in.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        layout: &VertexLayoutDescriptor,
        byte_offset: u64,
    ) -> Result<(), GraphicsError> {
        let topology = self.runtime.as_ref().map(|r| r.bindings.topology).unwrap_or_default();
        self.issue_draw(
            "draw",
            DrawRequest {
                count: vertex_count,
                layout,
                vertex_offset: byte_offset,
                indexed: false,
                topology,
            },
        )
    }

    /// Draw `index_count` indices of the bound index stream.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        layout: &VertexLayoutDescriptor,
    ) -> Result<(), GraphicsError> {
        let topology = self.runtime.as_ref().map(|r| r.bindings.topology).unwrap_or_default();
        self.issue_draw(
            "draw_indexed",
            DrawRequest {
                count: index_count,
                layout,
                vertex_offset: 0,
                indexed: true,
                topology,
            },
        )
    }

    /// Bind the mesh's streams and draw all of it.
    pub fn draw_mesh(&mut self, mesh: &Mesh) -> Result<(), GraphicsError> {
        self.expect_state(&[ContextState::InCamera], "draw_mesh")?;
        self.bind_vertex_stream(mesh.vertex_buffer())?;
        self.bind_index_stream(mesh.index_buffer())?;
        self.issue_draw(
            "draw_mesh",
            DrawRequest {
                count: mesh.element_count(),
                layout: mesh.layout(),
                vertex_offset: 0,
                indexed: mesh.is_indexed(),
                topology: mesh.topology(),
            },
        )
    }
}
