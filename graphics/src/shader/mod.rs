//! Shaders and their fixed-function pipeline state.
//!
//! A [`Shader`] is a compiled WGSL program plus three independently
//! dirty-tracked state descriptions (blend, depth, raster). Setters only
//! mark their own [`StateCell`] dirty; native state objects are rebuilt
//! lazily by [`Shader::resolve_states`], which the context calls when the
//! shader is bound.
//!
//! Each shader also caches the input layouts it has matched against
//! caller-supplied [`VertexLayoutDescriptor`]s.
//!
//! # Example
//!
//! ```ignore
//! let shader = Shader::compile(&backend, "Lit", LIT_SOURCE)?;
//! shader.set_raster_state(RasterState::default().with_cull(CullMode::None));
//! // Only the raster object is rebuilt on the next bind.
//! ```

pub mod builtin;
pub mod compiler;
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{
    GpuBackend, GpuInputLayout, GpuProgram, GpuStateObject, InputAttribute,
    InputLayoutDescriptor, ProgramDescriptor,
};
use crate::error::GraphicsError;
use crate::mesh::VertexLayoutDescriptor;

pub use builtin::{DEFAULT_SHADER_KEY, DEFAULT_SHADER_SOURCE};
pub use compiler::{ShaderReflection, TEXTURE_GROUP, UNIFORM_GROUP, reflect_wgsl};
pub use state::{BlendMode, CullMode, DepthState, FillMode, RasterState, StateCell, Winding};

#[derive(Debug)]
struct ShaderStates {
    blend: StateCell<BlendMode>,
    depth: StateCell<DepthState>,
    raster: StateCell<RasterState>,
}

/// Blend, depth and raster descriptions, as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineStates {
    pub blend: BlendMode,
    pub depth: DepthState,
    pub raster: RasterState,
}

/// Native state objects of a bound shader.
#[derive(Debug, Clone)]
pub struct ResolvedStates {
    pub blend: Arc<GpuStateObject>,
    pub depth: Arc<GpuStateObject>,
    pub raster: Arc<GpuStateObject>,
    /// How many of the three objects were rebuilt by this resolve.
    pub rebuilds: u32,
}

/// A compiled program with cached pipeline state.
pub struct Shader {
    name: String,
    program: Arc<GpuProgram>,
    reflection: ShaderReflection,
    baseline: PipelineStates,
    states: Mutex<ShaderStates>,
    input_layouts: Mutex<HashMap<VertexLayoutDescriptor, Arc<GpuInputLayout>>>,
}

impl Shader {
    /// Validate `source` and create its program.
    ///
    /// States start at their defaults (opaque, `LessEqual` with writes,
    /// solid back-face culling) and are built on first bind.
    pub fn compile(
        backend: &dyn GpuBackend,
        name: impl Into<String>,
        source: &str,
    ) -> Result<Self, GraphicsError> {
        let name = name.into();
        let reflection = reflect_wgsl(&name, source)?;
        let program = backend.create_program(&ProgramDescriptor {
            label: &name,
            source,
            vertex_entry: &reflection.vertex_entry,
            fragment_entry: &reflection.fragment_entry,
        })?;
        log::debug!("Compiled shader {}", name);

        let baseline = PipelineStates::default();
        Ok(Self {
            name,
            program: Arc::new(program),
            reflection,
            baseline,
            states: Mutex::new(ShaderStates {
                blend: StateCell::new(baseline.blend),
                depth: StateCell::new(baseline.depth),
                raster: StateCell::new(baseline.raster),
            }),
            input_layouts: Mutex::new(HashMap::new()),
        })
    }

    /// The built-in unlit shader.
    pub fn builtin_default(backend: &dyn GpuBackend) -> Result<Self, GraphicsError> {
        Self::compile(backend, DEFAULT_SHADER_KEY, DEFAULT_SHADER_SOURCE)
    }

    /// Shader name (its cache key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry points and vertex inputs.
    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    /// Native program handle.
    pub fn program(&self) -> &Arc<GpuProgram> {
        &self.program
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.states.lock().blend.description()
    }

    /// Set the blend mode. Returns whether the blend state became dirty.
    pub fn set_blend_mode(&self, mode: BlendMode) -> bool {
        self.states.lock().blend.set(mode)
    }

    pub fn depth_state(&self) -> DepthState {
        self.states.lock().depth.description()
    }

    /// Set the depth state. Returns whether the depth state became dirty.
    pub fn set_depth_state(&self, state: DepthState) -> bool {
        self.states.lock().depth.set(state)
    }

    pub fn raster_state(&self) -> RasterState {
        self.states.lock().raster.description()
    }

    /// Set the raster state. Returns whether the raster state became dirty.
    pub fn set_raster_state(&self, state: RasterState) -> bool {
        self.states.lock().raster.set(state)
    }

    pub fn set_fill_mode(&self, fill: FillMode) -> bool {
        let mut states = self.states.lock();
        let next = states.raster.description().with_fill(fill);
        states.raster.set(next)
    }

    pub fn set_cull_mode(&self, cull: CullMode) -> bool {
        let mut states = self.states.lock();
        let next = states.raster.description().with_cull(cull);
        states.raster.set(next)
    }

    pub fn set_winding(&self, winding: Winding) -> bool {
        let mut states = self.states.lock();
        let next = states.raster.description().with_winding(winding);
        states.raster.set(next)
    }

    /// The states the shader was created with. Material overrides resolve
    /// against these, never against the current states.
    pub fn baseline(&self) -> PipelineStates {
        self.baseline
    }

    /// Current blend, depth and raster descriptions.
    pub fn pipeline_states(&self) -> PipelineStates {
        let states = self.states.lock();
        PipelineStates {
            blend: states.blend.description(),
            depth: states.depth.description(),
            raster: states.raster.description(),
        }
    }

    /// Set all three descriptions. Returns how many cells became dirty;
    /// cells whose description is unchanged stay clean.
    pub fn set_pipeline_states(&self, next: PipelineStates) -> u32 {
        let mut states = self.states.lock();
        [
            states.blend.set(next.blend),
            states.depth.set(next.depth),
            states.raster.set(next.raster),
        ]
        .into_iter()
        .filter(|dirtied| *dirtied)
        .count() as u32
    }

    /// Whether any state will be rebuilt on the next bind.
    pub fn has_dirty_states(&self) -> bool {
        let states = self.states.lock();
        states.blend.is_dirty() || states.depth.is_dirty() || states.raster.is_dirty()
    }

    /// Rebuild dirty states and return all three native objects.
    ///
    /// Clean cells keep their objects, so repeated binds without mutation
    /// perform no native work.
    pub fn resolve_states(&self, backend: &dyn GpuBackend) -> Result<ResolvedStates, GraphicsError> {
        let mut states = self.states.lock();
        let (blend, blend_rebuilt) = states
            .blend
            .resolve(|mode| backend.create_blend_state(mode))?;
        let (depth, depth_rebuilt) = states
            .depth
            .resolve(|state| backend.create_depth_state(state))?;
        let (raster, raster_rebuilt) = states
            .raster
            .resolve(|state| backend.create_raster_state(state))?;

        let rebuilds = [blend_rebuilt, depth_rebuilt, raster_rebuilt]
            .into_iter()
            .filter(|rebuilt| *rebuilt)
            .count() as u32;
        if rebuilds > 0 {
            log::debug!(
                "Shader {}: rebuilt {} state object(s) (blend: {}, depth: {}, raster: {})",
                self.name,
                rebuilds,
                blend_rebuilt,
                depth_rebuilt,
                raster_rebuilt
            );
        }

        Ok(ResolvedStates {
            blend,
            depth,
            raster,
            rebuilds,
        })
    }

    /// Built blend object, if the blend state is clean.
    pub fn cached_blend_state(&self) -> Option<Arc<GpuStateObject>> {
        self.states.lock().blend.handle().cloned()
    }

    /// Built depth object, if the depth state is clean.
    pub fn cached_depth_state(&self) -> Option<Arc<GpuStateObject>> {
        self.states.lock().depth.handle().cloned()
    }

    /// Built raster object, if the raster state is clean.
    pub fn cached_raster_state(&self) -> Option<Arc<GpuStateObject>> {
        self.states.lock().raster.handle().cloned()
    }

    /// Input layout matching `layout` against this shader's vertex inputs.
    ///
    /// Cached per layout value. Fails with
    /// [`GraphicsError::InvalidVertexLayout`] when the layout is malformed
    /// or lacks an attribute for a location the vertex stage reads.
    pub fn input_layout(
        &self,
        backend: &dyn GpuBackend,
        layout: &VertexLayoutDescriptor,
    ) -> Result<Arc<GpuInputLayout>, GraphicsError> {
        let mut cache = self.input_layouts.lock();
        if let Some(existing) = cache.get(layout) {
            return Ok(Arc::clone(existing));
        }

        layout.validate()?;
        let mut attributes = Vec::with_capacity(self.reflection.vertex_inputs.len());
        for &location in &self.reflection.vertex_inputs {
            let attribute = layout.attribute_for_location(location).ok_or_else(|| {
                GraphicsError::InvalidVertexLayout(format!(
                    "shader {} reads input location {} which the vertex layout does not provide",
                    self.name, location
                ))
            })?;
            attributes.push(InputAttribute {
                location,
                format: attribute.format,
                offset: attribute.offset,
            });
        }

        let handle = Arc::new(backend.create_input_layout(&InputLayoutDescriptor {
            stride: layout.stride,
            attributes,
        })?);
        log::debug!(
            "Shader {}: created input layout #{} (stride {})",
            self.name,
            cache.len() + 1,
            layout.stride
        );
        cache.insert(layout.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Number of cached input layouts.
    pub fn input_layout_count(&self) -> usize {
        self.input_layouts.lock().len()
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("reflection", &self.reflection)
            .field("states", &*self.states.lock())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Shader: Send, Sync);
