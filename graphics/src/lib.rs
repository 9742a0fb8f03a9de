//! # Tessera Graphics
//!
//! GPU resource and pipeline-state layer for immediate-mode renderers.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsContext`] - Creates, caches, binds and draws every GPU resource
//! - [`Buffer`], [`DynamicBuffer`], [`Texture`] and typed texture views
//! - [`Shader`] - A compiled program with lazily rebuilt blend, depth and
//!   raster state
//! - [`Material`] - A shader plus six texture/sampler slots and constants
//! - [`Camera`] - Placement, projection, targets and clear policy per view
//! - [`GpuBackend`] - Trait for backend implementations: wgpu, and a
//!   counting dummy backend for tests
//!
//! ## Example
//!
//! ```ignore
//! use tessera_graphics::{Camera, ContextParameters, GraphicsContext};
//!
//! let mut context = GraphicsContext::new(ContextParameters::new());
//! context.startup()?;
//! let material = context.create_or_get_material("Default")?;
//!
//! let mut camera = Camera::new();
//! context.begin_frame()?;
//! context.begin_camera(&mut camera)?;
//! context.bind_material(&material)?;
//! // draw meshes...
//! context.end_camera(&camera)?;
//! context.end_frame()?;
//! ```

pub mod backend;
pub mod cache;
pub mod camera;
pub mod config;
pub mod context;
pub mod error;
pub mod font;
pub mod materials;
pub mod mesh;
pub mod resources;
pub mod screenshot;
pub mod shader;
pub mod types;
pub mod uniforms;

// Re-export main types for convenience
pub use backend::dummy::{DrawRecord, DummyBackend, DummyStats};
pub use backend::{GpuBackend, create_backend, has_gpu_backend};
pub use camera::{Camera, ClearPolicy, ColorClear, Projection};
pub use config::{BackendType, ContextParameters, PresentMode};
pub use context::{ContextState, GraphicsContext};
pub use error::GraphicsError;
pub use font::BitmapFont;
pub use materials::{
    Material, MaterialBuilder, MaterialDefaults, MaterialDefinition, StateOverrides, TextureSlot,
};
pub use mesh::{CpuMesh, Mesh, PrimitiveTopology, VertexLayoutDescriptor};
pub use resources::{
    Buffer, ColorTargetView, DepthStencilTargetView, DynamicBuffer, Sampler, ShaderResourceView,
    Texture, TextureView,
};
pub use screenshot::{ChannelDispatcher, PngWriter, ScreenshotDispatcher, ScreenshotRequest};
pub use shader::{
    BlendMode, CullMode, DepthState, FillMode, PipelineStates, RasterState, Shader, Winding,
};
pub use types::{
    BufferDescriptor, BufferUsage, Extent2d, Residency, SamplerDescriptor, TextureDescriptor,
    TextureFormat, TextureUsage, Viewport,
};
pub use uniforms::{EffectSettings, Light, LightingSettings};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the graphics library version and compiled-in backends.
pub fn init() {
    log::info!(
        "Tessera Graphics v{} initialized (GPU backend: {})",
        VERSION,
        has_gpu_backend()
    );
}
