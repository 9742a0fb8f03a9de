//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. Every native object
//! it hands out is a [`DummyHandle`] token that records its own release, so
//! tests can assert exactly how many objects were created, rebuilt and
//! freed, and how many presents, copies and draws were issued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::shader::{BlendMode, DepthState, RasterState};
use crate::types::{
    BufferDescriptor, Extent2d, Residency, SamplerDescriptor, TextureDescriptor, TextureFormat,
};

use super::{
    DrawCall, GpuBackend, GpuBuffer, GpuInputLayout, GpuProgram, GpuSampler, GpuStateObject,
    GpuTexture, InputLayoutDescriptor, ProgramDescriptor, TEXTURE_SLOT_COUNT, UNIFORM_SLOT_COUNT,
};

/// Kind of native object a [`DummyHandle`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyKind {
    Buffer,
    Texture,
    StagingTexture,
    BackBuffer,
    Sampler,
    Program,
    BlendState,
    DepthState,
    RasterState,
    InputLayout,
}

#[derive(Debug, Default)]
struct DummyCounters {
    next_id: AtomicU64,
    buffers_created: AtomicU64,
    buffers_released: AtomicU64,
    textures_created: AtomicU64,
    textures_released: AtomicU64,
    staging_textures_created: AtomicU64,
    staging_textures_released: AtomicU64,
    samplers_created: AtomicU64,
    programs_created: AtomicU64,
    blend_states_created: AtomicU64,
    depth_states_created: AtomicU64,
    raster_states_created: AtomicU64,
    state_objects_released: AtomicU64,
    input_layouts_created: AtomicU64,
    buffer_writes: AtomicU64,
    texture_writes: AtomicU64,
    back_buffer_acquires: AtomicU64,
    clears: AtomicU64,
    texture_copies: AtomicU64,
    readbacks: AtomicU64,
    draws: AtomicU64,
    presents: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Counted token standing in for a native object.
pub struct DummyHandle {
    id: u64,
    kind: DummyKind,
    counters: Arc<DummyCounters>,
}

impl DummyHandle {
    /// Unique id of this token.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Kind of object this token stands for.
    pub fn kind(&self) -> DummyKind {
        self.kind
    }
}

impl std::fmt::Debug for DummyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Drop for DummyHandle {
    fn drop(&mut self) {
        let c = &self.counters;
        match self.kind {
            DummyKind::Buffer => bump(&c.buffers_released),
            DummyKind::Texture => bump(&c.textures_released),
            DummyKind::StagingTexture => bump(&c.staging_textures_released),
            DummyKind::BlendState | DummyKind::DepthState | DummyKind::RasterState => {
                bump(&c.state_objects_released)
            }
            DummyKind::BackBuffer
            | DummyKind::Sampler
            | DummyKind::Program
            | DummyKind::InputLayout => {}
        }
    }
}

/// Snapshot of the dummy backend's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub buffers_created: u64,
    pub buffers_released: u64,
    pub textures_created: u64,
    pub textures_released: u64,
    pub staging_textures_created: u64,
    pub staging_textures_released: u64,
    pub samplers_created: u64,
    pub programs_created: u64,
    pub blend_states_created: u64,
    pub depth_states_created: u64,
    pub raster_states_created: u64,
    pub state_objects_released: u64,
    pub input_layouts_created: u64,
    pub buffer_writes: u64,
    pub texture_writes: u64,
    pub back_buffer_acquires: u64,
    pub clears: u64,
    pub texture_copies: u64,
    pub readbacks: u64,
    pub draws: u64,
    pub presents: u64,
}

impl DummyStats {
    /// Total native state objects (blend + depth + raster) created.
    pub fn state_objects_created(&self) -> u64 {
        self.blend_states_created + self.depth_states_created + self.raster_states_created
    }

    /// Counter deltas between `earlier` and `self`.
    pub fn since(&self, earlier: &DummyStats) -> DummyStats {
        DummyStats {
            buffers_created: self.buffers_created - earlier.buffers_created,
            buffers_released: self.buffers_released - earlier.buffers_released,
            textures_created: self.textures_created - earlier.textures_created,
            textures_released: self.textures_released - earlier.textures_released,
            staging_textures_created: self.staging_textures_created
                - earlier.staging_textures_created,
            staging_textures_released: self.staging_textures_released
                - earlier.staging_textures_released,
            samplers_created: self.samplers_created - earlier.samplers_created,
            programs_created: self.programs_created - earlier.programs_created,
            blend_states_created: self.blend_states_created - earlier.blend_states_created,
            depth_states_created: self.depth_states_created - earlier.depth_states_created,
            raster_states_created: self.raster_states_created - earlier.raster_states_created,
            state_objects_released: self.state_objects_released - earlier.state_objects_released,
            input_layouts_created: self.input_layouts_created - earlier.input_layouts_created,
            buffer_writes: self.buffer_writes - earlier.buffer_writes,
            texture_writes: self.texture_writes - earlier.texture_writes,
            back_buffer_acquires: self.back_buffer_acquires - earlier.back_buffer_acquires,
            clears: self.clears - earlier.clears,
            texture_copies: self.texture_copies - earlier.texture_copies,
            readbacks: self.readbacks - earlier.readbacks,
            draws: self.draws - earlier.draws,
            presents: self.presents - earlier.presents,
        }
    }
}

/// Token ids bound by the most recent draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawRecord {
    pub count: u32,
    pub indexed: bool,
    pub program: Option<u64>,
    pub blend: Option<u64>,
    pub depth: Option<u64>,
    pub raster: Option<u64>,
    pub vertex_buffer: Option<u64>,
    pub uniforms: [Option<u64>; UNIFORM_SLOT_COUNT],
    pub textures: [Option<u64>; TEXTURE_SLOT_COUNT],
    pub samplers: [Option<u64>; TEXTURE_SLOT_COUNT],
    pub color_target: Option<u64>,
    pub depth_target: Option<u64>,
}

#[allow(unreachable_patterns)]
fn buffer_id(buffer: &GpuBuffer) -> Option<u64> {
    match buffer {
        GpuBuffer::Dummy(handle) => Some(handle.id),
        _ => None,
    }
}

#[allow(unreachable_patterns)]
fn texture_id(texture: &GpuTexture) -> Option<u64> {
    match texture {
        GpuTexture::Dummy(handle) => Some(handle.id),
        _ => None,
    }
}

#[allow(unreachable_patterns)]
fn sampler_id(sampler: &GpuSampler) -> Option<u64> {
    match sampler {
        GpuSampler::Dummy(handle) => Some(handle.id),
        _ => None,
    }
}

#[allow(unreachable_patterns)]
fn program_id(program: &GpuProgram) -> Option<u64> {
    match program {
        GpuProgram::Dummy(handle) => Some(handle.id),
        _ => None,
    }
}

#[allow(unreachable_patterns)]
fn state_id(state: &GpuStateObject) -> Option<u64> {
    match state {
        GpuStateObject::Dummy(handle) => Some(handle.id),
        _ => None,
    }
}

impl DrawRecord {
    fn of(call: &DrawCall<'_>) -> Self {
        Self {
            count: call.count,
            indexed: call.is_indexed(),
            program: program_id(call.program),
            blend: state_id(call.blend),
            depth: state_id(call.depth),
            raster: state_id(call.raster),
            vertex_buffer: buffer_id(call.vertex_buffer),
            uniforms: std::array::from_fn(|slot| call.uniforms[slot].and_then(buffer_id)),
            textures: std::array::from_fn(|slot| call.textures[slot].and_then(texture_id)),
            samplers: std::array::from_fn(|slot| call.samplers[slot].and_then(sampler_id)),
            color_target: call.color_target.and_then(|(texture, _)| texture_id(texture)),
            depth_target: call.depth_target.and_then(|(texture, _)| texture_id(texture)),
        }
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    counters: Arc<DummyCounters>,
    back_buffer: Mutex<Extent2d>,
    max_buffer_size: Mutex<Option<u64>>,
    last_draw: Mutex<Option<DrawRecord>>,
}

impl DummyBackend {
    /// Create a new dummy backend with a 1280x720 back buffer.
    pub fn new() -> Self {
        Self::with_back_buffer(1280, 720)
    }

    /// Create a new dummy backend with the given back buffer size.
    pub fn with_back_buffer(width: u32, height: u32) -> Self {
        Self {
            counters: Arc::new(DummyCounters::default()),
            back_buffer: Mutex::new(Extent2d::new(width, height)),
            max_buffer_size: Mutex::new(None),
            last_draw: Mutex::new(None),
        }
    }

    /// What the most recent draw bound.
    pub fn last_draw(&self) -> Option<DrawRecord> {
        self.last_draw.lock().clone()
    }

    /// Snapshot the counters.
    pub fn stats(&self) -> DummyStats {
        let c = &self.counters;
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DummyStats {
            buffers_created: load(&c.buffers_created),
            buffers_released: load(&c.buffers_released),
            textures_created: load(&c.textures_created),
            textures_released: load(&c.textures_released),
            staging_textures_created: load(&c.staging_textures_created),
            staging_textures_released: load(&c.staging_textures_released),
            samplers_created: load(&c.samplers_created),
            programs_created: load(&c.programs_created),
            blend_states_created: load(&c.blend_states_created),
            depth_states_created: load(&c.depth_states_created),
            raster_states_created: load(&c.raster_states_created),
            state_objects_released: load(&c.state_objects_released),
            input_layouts_created: load(&c.input_layouts_created),
            buffer_writes: load(&c.buffer_writes),
            texture_writes: load(&c.texture_writes),
            back_buffer_acquires: load(&c.back_buffer_acquires),
            clears: load(&c.clears),
            texture_copies: load(&c.texture_copies),
            readbacks: load(&c.readbacks),
            draws: load(&c.draws),
            presents: load(&c.presents),
        }
    }

    /// Make buffer creations larger than `size` fail with
    /// [`GraphicsError::OutOfMemory`]. `None` removes the limit.
    pub fn set_max_buffer_size(&self, size: Option<u64>) {
        *self.max_buffer_size.lock() = size;
    }

    fn handle(&self, kind: DummyKind) -> DummyHandle {
        let c = &self.counters;
        match kind {
            DummyKind::Buffer => bump(&c.buffers_created),
            DummyKind::Texture => bump(&c.textures_created),
            DummyKind::StagingTexture => bump(&c.staging_textures_created),
            DummyKind::BackBuffer => bump(&c.back_buffer_acquires),
            DummyKind::Sampler => bump(&c.samplers_created),
            DummyKind::Program => bump(&c.programs_created),
            DummyKind::BlendState => bump(&c.blend_states_created),
            DummyKind::DepthState => bump(&c.depth_states_created),
            DummyKind::RasterState => bump(&c.raster_states_created),
            DummyKind::InputLayout => bump(&c.input_layouts_created),
        }
        DummyHandle {
            id: c.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
            counters: Arc::clone(c),
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuBuffer, GraphicsError> {
        if let Some(max) = *self.max_buffer_size.lock()
            && descriptor.size > max
        {
            return Err(GraphicsError::OutOfMemory);
        }
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {}, seeded: {})",
            descriptor.label,
            descriptor.size,
            initial_data.is_some()
        );
        Ok(GpuBuffer::Dummy(self.handle(DummyKind::Buffer)))
    }

    fn write_buffer(
        &self,
        _buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        log::trace!(
            "DummyBackend: write_buffer offset={} len={}",
            offset,
            data.len()
        );
        bump(&self.counters.buffer_writes);
        Ok(())
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        _initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {:?})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.residency
        );
        let kind = if descriptor.residency == Residency::Staging {
            DummyKind::StagingTexture
        } else {
            DummyKind::Texture
        };
        Ok(GpuTexture::Dummy(self.handle(kind)))
    }

    fn write_texture(
        &self,
        _texture: &GpuTexture,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        log::trace!(
            "DummyBackend: write_texture {:?} len={}",
            descriptor.label,
            data.len()
        );
        bump(&self.counters.texture_writes);
        Ok(())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError> {
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        Ok(GpuSampler::Dummy(self.handle(DummyKind::Sampler)))
    }

    fn create_program(
        &self,
        descriptor: &ProgramDescriptor<'_>,
    ) -> Result<GpuProgram, GraphicsError> {
        log::trace!(
            "DummyBackend: creating program {} ({} / {})",
            descriptor.label,
            descriptor.vertex_entry,
            descriptor.fragment_entry
        );
        Ok(GpuProgram::Dummy(self.handle(DummyKind::Program)))
    }

    fn create_blend_state(&self, mode: BlendMode) -> Result<GpuStateObject, GraphicsError> {
        log::trace!("DummyBackend: creating blend state {:?}", mode);
        Ok(GpuStateObject::Dummy(self.handle(DummyKind::BlendState)))
    }

    fn create_depth_state(&self, state: DepthState) -> Result<GpuStateObject, GraphicsError> {
        log::trace!("DummyBackend: creating depth state {:?}", state);
        Ok(GpuStateObject::Dummy(self.handle(DummyKind::DepthState)))
    }

    fn create_raster_state(&self, state: RasterState) -> Result<GpuStateObject, GraphicsError> {
        log::trace!("DummyBackend: creating raster state {:?}", state);
        Ok(GpuStateObject::Dummy(self.handle(DummyKind::RasterState)))
    }

    fn create_input_layout(
        &self,
        descriptor: &InputLayoutDescriptor,
    ) -> Result<GpuInputLayout, GraphicsError> {
        log::trace!(
            "DummyBackend: creating input layout (stride: {}, attributes: {})",
            descriptor.stride,
            descriptor.attributes.len()
        );
        Ok(GpuInputLayout::Dummy(self.handle(DummyKind::InputLayout)))
    }

    fn back_buffer_format(&self) -> TextureFormat {
        TextureFormat::Rgba8Unorm
    }

    fn back_buffer_size(&self) -> Extent2d {
        *self.back_buffer.lock()
    }

    fn resize(&self, width: u32, height: u32) -> Result<(), GraphicsError> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "back buffer size must be non-zero, got {width}x{height}"
            )));
        }
        *self.back_buffer.lock() = Extent2d::new(width, height);
        Ok(())
    }

    fn acquire_back_buffer(&self) -> Result<GpuTexture, GraphicsError> {
        Ok(GpuTexture::Dummy(self.handle(DummyKind::BackBuffer)))
    }

    fn clear_color(&self, _target: &GpuTexture, _color: [f32; 4]) -> Result<(), GraphicsError> {
        bump(&self.counters.clears);
        Ok(())
    }

    fn clear_depth(&self, _target: &GpuTexture, _depth: f32) -> Result<(), GraphicsError> {
        bump(&self.counters.clears);
        Ok(())
    }

    fn copy_texture(
        &self,
        _source: &GpuTexture,
        _destination: &GpuTexture,
        size: Extent2d,
    ) -> Result<(), GraphicsError> {
        log::trace!(
            "DummyBackend: copy_texture {}x{}",
            size.width,
            size.height
        );
        bump(&self.counters.texture_copies);
        Ok(())
    }

    fn read_texture(
        &self,
        _staging: &GpuTexture,
        descriptor: &TextureDescriptor,
    ) -> Result<Vec<u8>, GraphicsError> {
        bump(&self.counters.readbacks);
        // Return zeroed data
        Ok(vec![0u8; descriptor.byte_size() as usize])
    }

    fn draw(&self, call: &DrawCall<'_>) -> Result<(), GraphicsError> {
        log::trace!(
            "DummyBackend: draw count={} indexed={}",
            call.count,
            call.is_indexed()
        );
        bump(&self.counters.draws);
        *self.last_draw.lock() = Some(DrawRecord::of(call));
        Ok(())
    }

    fn present(&self) -> Result<(), GraphicsError> {
        bump(&self.counters.presents);
        Ok(())
    }
}
