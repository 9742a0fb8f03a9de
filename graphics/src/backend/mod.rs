//! GPU backend abstraction layer.
//!
//! Everything above this module talks to the device through the
//! [`GpuBackend`] trait, so the context, resources and shaders never name a
//! native API directly.
//!
//! # Available Backends
//!
//! - `dummy`: no GPU work; every native object is a counted token, which is
//!   what the test suite asserts against
//! - `wgpu-backend` (default): cross-platform backend using wgpu
//!
//! # Native handles
//!
//! Native objects are wrapped in per-kind enums ([`GpuBuffer`],
//! [`GpuTexture`], [`GpuSampler`], [`GpuProgram`], [`GpuStateObject`],
//! [`GpuInputLayout`]). Higher layers share them through `Arc`, and the
//! native object is released when the last `Arc` drops.

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

pub mod dummy;

use std::sync::Arc;

use crate::config::{BackendType, ContextParameters};
use crate::error::GraphicsError;
use crate::mesh::{PrimitiveTopology, VertexAttributeFormat};
use crate::shader::{BlendMode, DepthState, RasterState};
use crate::types::{
    BufferDescriptor, Extent2d, SamplerDescriptor, TextureDescriptor, TextureFormat, Viewport,
};

use dummy::DummyHandle;

/// Number of uniform buffer slots (bind group 0).
pub const UNIFORM_SLOT_COUNT: usize = 8;

/// Number of texture/sampler slots (bind group 1).
pub const TEXTURE_SLOT_COUNT: usize = 8;

/// Handle to a GPU buffer resource.
pub enum GpuBuffer {
    /// Dummy backend token
    Dummy(DummyHandle),
    /// wgpu backend buffer
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Buffer>),
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(handle) => f.debug_tuple("GpuBuffer::Dummy").field(handle).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(buffer) => f.debug_tuple("GpuBuffer::Wgpu").field(buffer).finish(),
        }
    }
}

/// Handle to a GPU texture resource.
pub enum GpuTexture {
    /// Dummy backend token
    Dummy(DummyHandle),
    /// wgpu backend texture
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        texture: Arc<wgpu::Texture>,
        view: Arc<wgpu::TextureView>,
    },
    /// wgpu staging texture, backed by a mappable buffer with padded rows
    #[cfg(feature = "wgpu-backend")]
    WgpuStaging {
        buffer: Arc<wgpu::Buffer>,
        bytes_per_row: u32,
    },
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(handle) => f.debug_tuple("GpuTexture::Dummy").field(handle).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu { texture, view } => f
                .debug_struct("GpuTexture::Wgpu")
                .field("texture", texture)
                .field("view", view)
                .finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::WgpuStaging {
                buffer,
                bytes_per_row,
            } => f
                .debug_struct("GpuTexture::WgpuStaging")
                .field("buffer", buffer)
                .field("bytes_per_row", bytes_per_row)
                .finish(),
        }
    }
}

/// Handle to a GPU sampler resource.
pub enum GpuSampler {
    /// Dummy backend token
    Dummy(DummyHandle),
    /// wgpu backend sampler
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Sampler>),
}

impl std::fmt::Debug for GpuSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(handle) => f.debug_tuple("GpuSampler::Dummy").field(handle).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(sampler) => f.debug_tuple("GpuSampler::Wgpu").field(sampler).finish(),
        }
    }
}

/// Handle to a compiled vertex + fragment program.
pub enum GpuProgram {
    /// Dummy backend token
    Dummy(DummyHandle),
    /// wgpu shader module with its entry points
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        id: u64,
        module: Arc<wgpu::ShaderModule>,
        vertex_entry: String,
        fragment_entry: String,
    },
}

impl std::fmt::Debug for GpuProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(handle) => f.debug_tuple("GpuProgram::Dummy").field(handle).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu {
                id,
                vertex_entry,
                fragment_entry,
                ..
            } => f
                .debug_struct("GpuProgram::Wgpu")
                .field("id", id)
                .field("vertex_entry", vertex_entry)
                .field("fragment_entry", fragment_entry)
                .finish_non_exhaustive(),
        }
    }
}

/// Handle to a native fixed-function state object (blend, depth or raster).
pub enum GpuStateObject {
    /// Dummy backend token
    Dummy(DummyHandle),
    /// wgpu has no standalone state objects; the resolved description is
    /// stored and folded into the pipeline key.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu_impl::WgpuState),
}

impl std::fmt::Debug for GpuStateObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(handle) => f
                .debug_tuple("GpuStateObject::Dummy")
                .field(handle)
                .finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(state) => f.debug_tuple("GpuStateObject::Wgpu").field(state).finish(),
        }
    }
}

/// Handle to an input layout matching a vertex structure to shader inputs.
pub enum GpuInputLayout {
    /// Dummy backend token
    Dummy(DummyHandle),
    /// wgpu vertex attributes, ready for a `VertexBufferLayout`
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        id: u64,
        attributes: Vec<wgpu::VertexAttribute>,
    },
}

impl std::fmt::Debug for GpuInputLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(handle) => f
                .debug_tuple("GpuInputLayout::Dummy")
                .field(handle)
                .finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu { id, attributes } => f
                .debug_struct("GpuInputLayout::Wgpu")
                .field("id", id)
                .field("attributes", attributes)
                .finish(),
        }
    }
}

/// Source and entry points for a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    /// Debug label, usually the shader key.
    pub label: &'a str,
    /// Validated WGSL source.
    pub source: &'a str,
    /// Vertex stage entry point.
    pub vertex_entry: &'a str,
    /// Fragment stage entry point.
    pub fragment_entry: &'a str,
}

/// One vertex attribute routed to a shader input location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputAttribute {
    /// Shader input location.
    pub location: u32,
    /// Attribute format in the vertex buffer.
    pub format: VertexAttributeFormat,
    /// Byte offset inside one vertex.
    pub offset: u32,
}

/// Fully resolved input layout, produced by matching a vertex layout against
/// the inputs a shader consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputLayoutDescriptor {
    /// Vertex stride in bytes.
    pub stride: u32,
    /// Attributes the shader consumes, ordered by location.
    pub attributes: Vec<InputAttribute>,
}

/// Everything the backend needs to issue one draw.
///
/// Slots that are `None` are filled with backend fallbacks (zeroed uniform
/// buffer, 1x1 texture, default sampler).
#[derive(Debug)]
pub struct DrawCall<'a> {
    pub program: &'a GpuProgram,
    pub blend: &'a GpuStateObject,
    pub depth: &'a GpuStateObject,
    pub raster: &'a GpuStateObject,
    pub input_layout: &'a GpuInputLayout,
    pub vertex_buffer: &'a GpuBuffer,
    pub vertex_stride: u32,
    pub vertex_offset: u64,
    pub index_buffer: Option<&'a GpuBuffer>,
    /// Vertex count, or index count for indexed draws.
    pub count: u32,
    pub topology: PrimitiveTopology,
    pub color_target: Option<(&'a GpuTexture, TextureFormat)>,
    pub depth_target: Option<(&'a GpuTexture, TextureFormat)>,
    /// Viewport in pixels.
    pub viewport: Viewport,
    pub uniforms: [Option<&'a GpuBuffer>; UNIFORM_SLOT_COUNT],
    pub textures: [Option<&'a GpuTexture>; TEXTURE_SLOT_COUNT],
    pub samplers: [Option<&'a GpuSampler>; TEXTURE_SLOT_COUNT],
}

impl DrawCall<'_> {
    /// Whether this draw reads an index buffer.
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }
}

/// GPU backend trait for abstracting different GPU APIs.
///
/// Commands are recorded in call order. Buffer writes, clears, copies and
/// draws observe each other exactly as issued, the way an immediate
/// context behaves.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a buffer, optionally seeded with `initial_data`.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuBuffer, GraphicsError>;

    /// Write data into a buffer at `offset`.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8])
    -> Result<(), GraphicsError>;

    /// Create a texture, optionally seeded with tightly packed pixels.
    ///
    /// `Staging` residency produces a CPU-readable texture usable as a copy
    /// destination and by [`GpuBackend::read_texture`].
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError>;

    /// Replace the whole contents of a texture with tightly packed pixels.
    ///
    /// `data` holds exactly `descriptor.byte_size()` bytes.
    fn write_texture(
        &self,
        texture: &GpuTexture,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Create a sampler resource.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError>;

    /// Create a program from validated shader source.
    fn create_program(&self, descriptor: &ProgramDescriptor<'_>)
    -> Result<GpuProgram, GraphicsError>;

    /// Create a blend state object.
    fn create_blend_state(&self, mode: BlendMode) -> Result<GpuStateObject, GraphicsError>;

    /// Create a depth state object.
    fn create_depth_state(&self, state: DepthState) -> Result<GpuStateObject, GraphicsError>;

    /// Create a raster state object.
    fn create_raster_state(&self, state: RasterState) -> Result<GpuStateObject, GraphicsError>;

    /// Create an input layout.
    fn create_input_layout(
        &self,
        descriptor: &InputLayoutDescriptor,
    ) -> Result<GpuInputLayout, GraphicsError>;

    /// Format of the back buffer.
    fn back_buffer_format(&self) -> TextureFormat;

    /// Current back buffer size.
    fn back_buffer_size(&self) -> Extent2d;

    /// Resize the back buffer.
    fn resize(&self, width: u32, height: u32) -> Result<(), GraphicsError>;

    /// Acquire the back buffer for the current frame.
    fn acquire_back_buffer(&self) -> Result<GpuTexture, GraphicsError>;

    /// Clear a color target.
    fn clear_color(&self, target: &GpuTexture, color: [f32; 4]) -> Result<(), GraphicsError>;

    /// Clear a depth target.
    fn clear_depth(&self, target: &GpuTexture, depth: f32) -> Result<(), GraphicsError>;

    /// Copy `size` pixels from `source` into `destination`.
    fn copy_texture(
        &self,
        source: &GpuTexture,
        destination: &GpuTexture,
        size: Extent2d,
    ) -> Result<(), GraphicsError>;

    /// Read a staging texture back into tightly packed bytes.
    ///
    /// This is a blocking operation that waits for the GPU to finish.
    fn read_texture(
        &self,
        staging: &GpuTexture,
        descriptor: &TextureDescriptor,
    ) -> Result<Vec<u8>, GraphicsError>;

    /// Issue one draw.
    fn draw(&self, call: &DrawCall<'_>) -> Result<(), GraphicsError>;

    /// Submit recorded work and present the acquired back buffer.
    fn present(&self) -> Result<(), GraphicsError>;
}

/// Selects and creates the backend requested by `params`.
///
/// `Wgpu` and `Auto` try wgpu first and fall back to the dummy backend.
pub fn create_backend(params: &ContextParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    match params.backend {
        BackendType::Dummy => {}
        BackendType::Wgpu | BackendType::Auto => {
            #[cfg(feature = "wgpu-backend")]
            {
                match wgpu_impl::WgpuBackend::headless(params) {
                    Ok(backend) => {
                        log::info!("Using wgpu backend");
                        return Ok(Arc::new(backend));
                    }
                    Err(e) => {
                        log::warn!("Failed to create wgpu backend: {}", e);
                    }
                }
            }
            #[cfg(not(feature = "wgpu-backend"))]
            log::warn!("wgpu backend requested but the `wgpu-backend` feature is disabled");
        }
    }

    log::info!("Using dummy backend");
    Ok(Arc::new(dummy::DummyBackend::with_back_buffer(
        params.width,
        params.height,
    )))
}

/// Check if a real GPU backend is compiled in.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "wgpu-backend")
}
