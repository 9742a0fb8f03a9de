//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12, and WebGPU.
//!
//! Every buffer update, clear, copy and draw is recorded on a single frame
//! encoder in call order. The encoder is submitted at present or when a
//! readback needs the results, which gives the ordering of an immediate
//! context on top of wgpu's deferred command model.

pub(crate) mod conversion;
mod pass_encoding;
mod resources;
mod swapchain;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use super::{
    DrawCall, GpuBackend, GpuBuffer, GpuInputLayout, GpuProgram, GpuSampler, GpuStateObject,
    GpuTexture, InputLayoutDescriptor, ProgramDescriptor, TEXTURE_SLOT_COUNT, UNIFORM_SLOT_COUNT,
};
use crate::config::ContextParameters;
use crate::error::GraphicsError;
use crate::shader::{BlendMode, DepthState, RasterState};
use crate::types::{
    BufferDescriptor, Extent2d, SamplerDescriptor, TextureDescriptor, TextureFormat,
};

use pass_encoding::PipelineKey;
use swapchain::BackBuffer;

/// Size of the zeroed buffer bound to unused uniform slots.
const FALLBACK_UNIFORM_SIZE: u64 = 4096;

/// A fixed-function state resolved for wgpu.
///
/// wgpu bakes blend, depth and raster state into render pipelines, so these
/// objects only carry the converted description plus an id that becomes
/// part of the pipeline cache key.
#[derive(Debug, Clone)]
pub struct WgpuState {
    id: u64,
    kind: WgpuStateKind,
}

#[derive(Debug, Clone, Copy)]
enum WgpuStateKind {
    Blend(wgpu::BlendState),
    Depth {
        compare: wgpu::CompareFunction,
        write_enabled: bool,
    },
    Raster {
        polygon_mode: wgpu::PolygonMode,
        cull_mode: Option<wgpu::Face>,
        front_face: wgpu::FrontFace,
    },
}

/// Bind group and pipeline layouts shared by every program.
struct BindingLayouts {
    uniforms: wgpu::BindGroupLayout,
    textures: wgpu::BindGroupLayout,
    pipeline: wgpu::PipelineLayout,
}

/// Resources bound to slots a draw leaves empty.
struct Fallbacks {
    uniform: wgpu::Buffer,
    texture: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    encoder: Mutex<Option<wgpu::CommandEncoder>>,
    back_buffer: Mutex<BackBuffer>,
    pipelines: Mutex<HashMap<PipelineKey, wgpu::RenderPipeline>>,
    layouts: BindingLayouts,
    fallbacks: Fallbacks,
    next_id: AtomicU64,
    wireframe_supported: bool,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .field("pipelines", &self.pipelines.lock().len())
            .finish()
    }
}

impl WgpuBackend {
    /// Create a backend that renders into an offscreen back buffer of
    /// `params.width` x `params.height`.
    pub fn headless(params: &ContextParameters) -> Result<Self, GraphicsError> {
        check_size(params.width, params.height)?;
        let instance = create_instance(params);
        let (adapter, device, queue) = open_device(&instance, None)?;
        let back_buffer = BackBuffer::offscreen(&device, params.width, params.height);
        Ok(Self::from_parts(instance, adapter, device, queue, back_buffer))
    }

    /// Create a backend that presents to `window`.
    pub fn with_window<W>(params: &ContextParameters, window: Arc<W>) -> Result<Self, GraphicsError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        check_size(params.width, params.height)?;
        let instance = create_instance(params);
        let surface = instance.create_surface(window).map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to create wgpu surface: {e}"))
        })?;
        let (adapter, device, queue) = open_device(&instance, Some(&surface))?;
        let back_buffer = BackBuffer::surface(surface, &adapter, &device, params)?;
        Ok(Self::from_parts(instance, adapter, device, queue, back_buffer))
    }

    fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        back_buffer: BackBuffer,
    ) -> Self {
        let wireframe_supported = device
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let layouts = BindingLayouts::new(&device);
        let fallbacks = Fallbacks::new(&device, &queue);
        log::info!(
            "wgpu backend ready: {} ({:?}), back buffer {:?} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            back_buffer.format(),
            back_buffer.size(),
        );

        Self {
            instance,
            adapter,
            device,
            queue,
            encoder: Mutex::new(None),
            back_buffer: Mutex::new(back_buffer),
            pipelines: Mutex::new(HashMap::new()),
            layouts,
            fallbacks,
            next_id: AtomicU64::new(1),
            wireframe_supported,
        }
    }

    /// Get the wgpu adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Number of render pipelines built so far.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.lock().len()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn check_size(width: u32, height: u32) -> Result<(), GraphicsError> {
    if width == 0 || height == 0 {
        return Err(GraphicsError::InvalidParameter(format!(
            "back buffer size must be non-zero, got {width}x{height}"
        )));
    }
    Ok(())
}

fn create_instance(params: &ContextParameters) -> wgpu::Instance {
    let mut flags = wgpu::InstanceFlags::default();
    if params.validation {
        flags |= wgpu::InstanceFlags::VALIDATION;
    }
    if params.debug {
        flags |= wgpu::InstanceFlags::DEBUG;
    }

    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags,
        backend_options: wgpu::BackendOptions::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
    })
}

fn open_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), GraphicsError> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface,
        force_fallback_adapter: false,
    }))
    .map_err(|e| GraphicsError::InitializationFailed(format!("No compatible GPU adapter: {e}")))?;

    log::info!("wgpu adapter: {:?}", adapter.get_info());

    // Wireframe raster states need line polygon mode; it is optional.
    let required_features = adapter.features() & wgpu::Features::POLYGON_MODE_LINE;
    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("Tessera Device"),
        required_features,
        required_limits: wgpu::Limits::default(),
        memory_hints: wgpu::MemoryHints::default(),
        experimental_features: wgpu::ExperimentalFeatures::default(),
        trace: wgpu::Trace::Off,
    }))
    .map_err(|e| GraphicsError::InitializationFailed(format!("Device creation failed: {e}")))?;

    Ok((adapter, device, queue))
}

impl BindingLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let uniform_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..UNIFORM_SLOT_COUNT as u32)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let mut texture_entries = Vec::with_capacity(TEXTURE_SLOT_COUNT * 2);
        for slot in 0..TEXTURE_SLOT_COUNT as u32 {
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot * 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot * 2 + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }

        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tessera Uniform Slots"),
            entries: &uniform_entries,
        });
        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tessera Texture Slots"),
            entries: &texture_entries,
        });
        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Tessera Pipeline Layout"),
            bind_group_layouts: &[&uniforms, &textures],
            immediate_size: 0,
        });

        Self {
            uniforms,
            textures,
            pipeline,
        }
    }
}

impl Fallbacks {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tessera Fallback Uniform"),
            size: FALLBACK_UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM,
            mapped_at_creation: false,
        });

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Tessera Fallback Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            texture.as_image_copy(),
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        Self {
            uniform,
            texture: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            sampler: device.create_sampler(&wgpu::SamplerDescriptor::default()),
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuBuffer, GraphicsError> {
        self.create_wgpu_buffer(descriptor, initial_data)
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.record_buffer_write(buffer, offset, data)
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError> {
        self.create_wgpu_texture(descriptor, initial_data)
    }

    fn write_texture(
        &self,
        texture: &GpuTexture,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.record_texture_write(texture, descriptor, data)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError> {
        self.create_wgpu_sampler(descriptor)
    }

    fn create_program(
        &self,
        descriptor: &ProgramDescriptor<'_>,
    ) -> Result<GpuProgram, GraphicsError> {
        self.create_wgpu_program(descriptor)
    }

    fn create_blend_state(&self, mode: BlendMode) -> Result<GpuStateObject, GraphicsError> {
        Ok(self.blend_state(mode))
    }

    fn create_depth_state(&self, state: DepthState) -> Result<GpuStateObject, GraphicsError> {
        Ok(self.depth_state(state))
    }

    fn create_raster_state(&self, state: RasterState) -> Result<GpuStateObject, GraphicsError> {
        Ok(self.raster_state(state))
    }

    fn create_input_layout(
        &self,
        descriptor: &InputLayoutDescriptor,
    ) -> Result<GpuInputLayout, GraphicsError> {
        Ok(self.input_layout(descriptor))
    }

    fn back_buffer_format(&self) -> TextureFormat {
        self.back_buffer.lock().format()
    }

    fn back_buffer_size(&self) -> Extent2d {
        self.back_buffer.lock().size()
    }

    fn resize(&self, width: u32, height: u32) -> Result<(), GraphicsError> {
        check_size(width, height)?;
        // Work recorded against the old back buffer must land first.
        self.flush();
        self.back_buffer.lock().resize(&self.device, width, height);
        Ok(())
    }

    fn acquire_back_buffer(&self) -> Result<GpuTexture, GraphicsError> {
        self.back_buffer.lock().acquire(&self.device)
    }

    fn clear_color(&self, target: &GpuTexture, color: [f32; 4]) -> Result<(), GraphicsError> {
        self.record_clear_color(target, color)
    }

    fn clear_depth(&self, target: &GpuTexture, depth: f32) -> Result<(), GraphicsError> {
        self.record_clear_depth(target, depth)
    }

    fn copy_texture(
        &self,
        source: &GpuTexture,
        destination: &GpuTexture,
        size: Extent2d,
    ) -> Result<(), GraphicsError> {
        self.record_texture_copy(source, destination, size)
    }

    fn read_texture(
        &self,
        staging: &GpuTexture,
        descriptor: &TextureDescriptor,
    ) -> Result<Vec<u8>, GraphicsError> {
        self.read_staging(staging, descriptor)
    }

    fn draw(&self, call: &DrawCall<'_>) -> Result<(), GraphicsError> {
        self.record_draw(call)
    }

    fn present(&self) -> Result<(), GraphicsError> {
        tessera_core::profile_scope!("wgpu_present");
        self.flush();
        self.back_buffer.lock().present();
        Ok(())
    }
}
