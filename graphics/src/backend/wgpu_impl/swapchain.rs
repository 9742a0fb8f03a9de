//! Back buffer handling for the wgpu backend.
//!
//! A headless backend renders into an offscreen texture that stands in for
//! the swap chain; a windowed backend acquires and presents surface
//! textures.

use std::sync::Arc;

use super::conversion::{convert_present_mode, convert_texture_format, texture_format_from_wgpu};
use crate::backend::GpuTexture;
use crate::config::ContextParameters;
use crate::error::GraphicsError;
use crate::types::{Extent2d, TextureFormat};

/// Format of the offscreen back buffer.
const OFFSCREEN_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

pub(super) enum BackBuffer {
    Offscreen {
        texture: Arc<wgpu::Texture>,
        view: Arc<wgpu::TextureView>,
    },
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        format: TextureFormat,
        current: Option<wgpu::SurfaceTexture>,
    },
}

fn offscreen_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (Arc<wgpu::Texture>, Arc<wgpu::TextureView>) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Tessera Offscreen Back Buffer"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: convert_texture_format(OFFSCREEN_FORMAT),
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (Arc::new(texture), Arc::new(view))
}

/// Usage flags for the surface configuration.
///
/// Composited frames are copied into the back buffer, so a surface that
/// cannot be a copy destination is rejected.
fn surface_usage(offered: wgpu::TextureUsages) -> Result<wgpu::TextureUsages, GraphicsError> {
    if !offered.contains(wgpu::TextureUsages::COPY_DST) {
        return Err(GraphicsError::InitializationFailed(format!(
            "surface cannot be a copy destination (usages {offered:?})"
        )));
    }
    Ok(wgpu::TextureUsages::RENDER_ATTACHMENT
        | wgpu::TextureUsages::COPY_DST
        | (offered & wgpu::TextureUsages::COPY_SRC))
}

impl BackBuffer {
    pub(super) fn offscreen(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (texture, view) = offscreen_texture(device, width, height);
        Self::Offscreen { texture, view }
    }

    pub(super) fn surface(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        params: &ContextParameters,
    ) -> Result<Self, GraphicsError> {
        let capabilities = surface.get_capabilities(adapter);
        let usage = surface_usage(capabilities.usages)?;
        let (wgpu_format, format) = capabilities
            .formats
            .iter()
            .find_map(|&candidate| texture_format_from_wgpu(candidate).map(|f| (candidate, f)))
            .ok_or_else(|| {
                GraphicsError::InitializationFailed(format!(
                    "surface offers no supported color format: {:?}",
                    capabilities.formats
                ))
            })?;

        let present_mode = convert_present_mode(params.present_mode);
        let present_mode = if capabilities.present_modes.contains(&present_mode) {
            present_mode
        } else {
            log::warn!(
                "Present mode {:?} unsupported by surface, falling back to Fifo",
                params.present_mode
            );
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage,
            format: wgpu_format,
            width: params.width,
            height: params.height,
            present_mode,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &config);
        log::info!(
            "Configured wgpu surface: {:?} {}x{} {:?}",
            format,
            config.width,
            config.height,
            present_mode
        );

        Ok(Self::Surface {
            surface,
            config,
            format,
            current: None,
        })
    }

    pub(super) fn format(&self) -> TextureFormat {
        match self {
            Self::Offscreen { .. } => OFFSCREEN_FORMAT,
            Self::Surface { format, .. } => *format,
        }
    }

    pub(super) fn size(&self) -> Extent2d {
        match self {
            Self::Offscreen { texture, .. } => Extent2d::new(texture.width(), texture.height()),
            Self::Surface { config, .. } => Extent2d::new(config.width, config.height),
        }
    }

    pub(super) fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        match self {
            Self::Offscreen { texture, view } => {
                (*texture, *view) = offscreen_texture(device, width, height);
            }
            Self::Surface {
                surface,
                config,
                current,
                ..
            } => {
                // An acquired texture from the old configuration is dropped
                // unpresented.
                current.take();
                config.width = width;
                config.height = height;
                surface.configure(device, config);
            }
        }
        log::info!("Back buffer resized to {}x{}", width, height);
    }

    pub(super) fn acquire(&mut self, device: &wgpu::Device) -> Result<GpuTexture, GraphicsError> {
        match self {
            Self::Offscreen { texture, view } => Ok(GpuTexture::Wgpu {
                texture: Arc::clone(texture),
                view: Arc::clone(view),
            }),
            Self::Surface {
                surface,
                config,
                current,
                ..
            } => {
                let surface_texture = match surface.get_current_texture() {
                    Ok(surface_texture) => surface_texture,
                    Err(wgpu::SurfaceError::Outdated) => {
                        surface.configure(device, config);
                        return Err(GraphicsError::SurfaceOutdated);
                    }
                    Err(wgpu::SurfaceError::Lost) => return Err(GraphicsError::SurfaceLost),
                    Err(wgpu::SurfaceError::OutOfMemory) => return Err(GraphicsError::OutOfMemory),
                    Err(e) => {
                        return Err(GraphicsError::Internal(format!(
                            "Failed to acquire surface texture: {e}"
                        )));
                    }
                };

                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let handle = GpuTexture::Wgpu {
                    texture: Arc::new(surface_texture.texture.clone()),
                    view: Arc::new(view),
                };
                *current = Some(surface_texture);
                Ok(handle)
            }
        }
    }

    /// Present the acquired surface texture. Offscreen back buffers have
    /// nothing to present.
    pub(super) fn present(&mut self) {
        if let Self::Surface { current, .. } = self {
            match current.take() {
                Some(surface_texture) => surface_texture.present(),
                None => log::warn!("present called without an acquired back buffer"),
            }
        }
    }
}
