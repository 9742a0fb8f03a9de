//! GPU texture resource.

use std::sync::Arc;

use tessera_core::color::Rgba8;
use tessera_core::image::CpuImage;

use crate::backend::{GpuBackend, GpuTexture};
use crate::error::GraphicsError;
use crate::types::{Extent2d, Residency, TextureDescriptor, TextureFormat, TextureUsage};

use super::view::{ColorTargetView, DepthStencilTargetView, ShaderResourceView};

/// A GPU texture resource.
///
/// The texture and every view created from it share one native handle; the
/// native object is released when the last of them drops.
///
/// # Example
///
/// ```ignore
/// let target = Texture::render_target(&backend, 1920, 1080, TextureFormat::Rgba8Unorm)?;
/// let srv = target.create_shader_resource_view()?;
/// let rtv = target.create_color_target_view()?;
/// assert!(srv.shares_resource_with(&rtv));
/// ```
pub struct Texture {
    backend: Arc<dyn GpuBackend>,
    descriptor: TextureDescriptor,
    handle: Arc<GpuTexture>,
}

impl Texture {
    /// Create a texture, optionally seeded with tightly packed pixels.
    pub fn create(
        backend: &Arc<dyn GpuBackend>,
        descriptor: TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Self, GraphicsError> {
        if descriptor.size.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {:?} has empty size {}x{}",
                descriptor.label, descriptor.size.width, descriptor.size.height
            )));
        }
        if descriptor.residency.requires_initial_data() && initial_data.is_none() {
            return Err(GraphicsError::ResidencyViolation(format!(
                "static texture {:?} created without initial data",
                descriptor.label
            )));
        }
        if let Some(data) = initial_data
            && data.len() as u64 != descriptor.byte_size()
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {:?} expects {} bytes of pixel data, got {}",
                descriptor.label,
                descriptor.byte_size(),
                data.len()
            )));
        }
        let render_usage =
            TextureUsage::SAMPLED | TextureUsage::COLOR_TARGET | TextureUsage::DEPTH_STENCIL;
        if descriptor.residency == Residency::Staging && descriptor.usage.intersects(render_usage)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "staging texture {:?} cannot be sampled or rendered to",
                descriptor.label
            )));
        }
        let is_depth = descriptor.format.is_depth_stencil();
        if descriptor.usage.contains(TextureUsage::DEPTH_STENCIL) && !is_depth {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} is not a depth-stencil format",
                descriptor.format
            )));
        }
        if descriptor.usage.contains(TextureUsage::COLOR_TARGET) && is_depth {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} cannot be a color target",
                descriptor.format
            )));
        }

        let handle = backend.create_texture(&descriptor, initial_data)?;
        log::trace!(
            "Created texture {:?} ({}x{}, {:?}, {:?})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format,
            descriptor.residency
        );

        Ok(Self {
            backend: Arc::clone(backend),
            descriptor,
            handle: Arc::new(handle),
        })
    }

    /// Upload a CPU image as a static, sampled RGBA8 texture.
    pub fn from_image(
        backend: &Arc<dyn GpuBackend>,
        image: &CpuImage,
        label: impl Into<String>,
    ) -> Result<Self, GraphicsError> {
        let descriptor = TextureDescriptor::new_2d(
            image.width(),
            image.height(),
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED,
            Residency::Static,
        )
        .with_label(label);
        Self::create(backend, descriptor, Some(image.pixels()))
    }

    /// A static 1x1 texture of one color.
    pub fn solid_color(backend: &Arc<dyn GpuBackend>, color: Rgba8) -> Result<Self, GraphicsError> {
        let descriptor = TextureDescriptor::new_2d(
            1,
            1,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED,
            Residency::Static,
        )
        .with_label(format!("solid {color}"));
        Self::create(backend, descriptor, Some(&color.to_array()))
    }

    /// An empty GPU-only target.
    ///
    /// Color formats are sampleable, renderable and copyable both ways.
    /// Depth formats are depth-stencil targets only.
    pub fn render_target(
        backend: &Arc<dyn GpuBackend>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Self, GraphicsError> {
        let usage = if format.is_depth_stencil() {
            TextureUsage::DEPTH_STENCIL
        } else {
            TextureUsage::SAMPLED
                | TextureUsage::COLOR_TARGET
                | TextureUsage::COPY_SRC
                | TextureUsage::COPY_DST
        };
        let descriptor =
            TextureDescriptor::new_2d(width, height, format, usage, Residency::GpuOnly);
        Self::create(backend, descriptor, None)
    }

    /// A CPU-readable copy destination.
    pub fn staging(
        backend: &Arc<dyn GpuBackend>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Self, GraphicsError> {
        let descriptor = TextureDescriptor::new_2d(
            width,
            height,
            format,
            TextureUsage::COPY_DST,
            Residency::Staging,
        )
        .with_label("staging");
        Self::create(backend, descriptor, None)
    }

    /// Replace the texture contents with tightly packed pixels.
    ///
    /// Valid only for `Dynamic` and `Staging` textures. `data` must cover the
    /// whole texture.
    pub fn copy_cpu_to_gpu(&self, data: &[u8]) -> Result<(), GraphicsError> {
        if !self.descriptor.residency.is_cpu_writable() {
            return Err(GraphicsError::ResidencyViolation(format!(
                "texture {:?} with {:?} residency is not CPU-writable",
                self.descriptor.label, self.descriptor.residency
            )));
        }
        if data.len() as u64 != self.descriptor.byte_size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {:?} expects {} bytes of pixel data, got {}",
                self.descriptor.label,
                self.descriptor.byte_size(),
                data.len()
            )));
        }
        self.backend.write_texture(&self.handle, &self.descriptor, data)
    }

    /// Read a staging texture back into tightly packed bytes.
    ///
    /// Blocks until the GPU has finished all work recorded so far.
    pub fn read_back(&self) -> Result<Vec<u8>, GraphicsError> {
        if !self.descriptor.residency.is_cpu_readable() {
            return Err(GraphicsError::ResidencyViolation(format!(
                "texture {:?} with {:?} residency is not CPU-readable",
                self.descriptor.label, self.descriptor.residency
            )));
        }
        self.backend.read_texture(&self.handle, &self.descriptor)
    }

    /// Create a view for sampling in shaders.
    pub fn create_shader_resource_view(&self) -> Result<ShaderResourceView, GraphicsError> {
        self.require_usage(TextureUsage::SAMPLED, "shader resource view")?;
        Ok(ShaderResourceView::new(
            Arc::clone(&self.handle),
            self.descriptor.format,
            self.descriptor.size,
        ))
    }

    /// Create a view for rendering color into.
    pub fn create_color_target_view(&self) -> Result<ColorTargetView, GraphicsError> {
        self.require_usage(TextureUsage::COLOR_TARGET, "color target view")?;
        Ok(ColorTargetView::new(
            Arc::clone(&self.handle),
            self.descriptor.format,
            self.descriptor.size,
        ))
    }

    /// Create a view for depth testing.
    pub fn create_depth_stencil_view(&self) -> Result<DepthStencilTargetView, GraphicsError> {
        self.require_usage(TextureUsage::DEPTH_STENCIL, "depth-stencil view")?;
        Ok(DepthStencilTargetView::new(
            Arc::clone(&self.handle),
            self.descriptor.format,
            self.descriptor.size,
        ))
    }

    fn require_usage(&self, usage: TextureUsage, what: &str) -> Result<(), GraphicsError> {
        if self.descriptor.usage.contains(usage) {
            Ok(())
        } else {
            Err(GraphicsError::InvalidParameter(format!(
                "cannot create a {what} for texture {:?} with usage {:?}",
                self.descriptor.label, self.descriptor.usage
            )))
        }
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the texture size.
    pub fn size(&self) -> Extent2d {
        self.descriptor.size
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    /// Get the texture format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    /// Get the residency.
    pub fn residency(&self) -> Residency {
        self.descriptor.residency
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Get the native handle.
    pub fn gpu_handle(&self) -> &Arc<GpuTexture> {
        &self.handle
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("usage", &self.descriptor.usage)
            .field("residency", &self.descriptor.residency)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::view::TextureView;
    use crate::backend::dummy::DummyBackend;

    fn backend() -> (Arc<DummyBackend>, Arc<dyn GpuBackend>) {
        let dummy = Arc::new(DummyBackend::new());
        let backend: Arc<dyn GpuBackend> = dummy.clone();
        (dummy, backend)
    }

    #[test]
    fn test_static_texture_requires_data() {
        let (_, backend) = backend();
        let desc = TextureDescriptor::new_2d(
            2,
            2,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED,
            Residency::Static,
        );
        assert!(matches!(
            Texture::create(&backend, desc.clone(), None),
            Err(GraphicsError::ResidencyViolation(_))
        ));
        assert!(Texture::create(&backend, desc.clone(), Some(&[0u8; 15])).is_err());
        assert!(Texture::create(&backend, desc, Some(&[0u8; 16])).is_ok());
    }

    #[test]
    fn test_solid_color() {
        let (dummy, backend) = backend();
        let texture = Texture::solid_color(&backend, Rgba8::WHITE).unwrap();
        assert_eq!(texture.size(), Extent2d::new(1, 1));
        assert_eq!(texture.residency(), Residency::Static);
        assert_eq!(dummy.stats().textures_created, 1);
    }

    #[test]
    fn test_view_usage_checked() {
        let (_, backend) = backend();
        let solid = Texture::solid_color(&backend, Rgba8::BLACK).unwrap();
        assert!(solid.create_shader_resource_view().is_ok());
        assert!(solid.create_color_target_view().is_err());

        let depth = Texture::render_target(&backend, 4, 4, TextureFormat::Depth32Float).unwrap();
        assert!(depth.create_depth_stencil_view().is_ok());
        assert!(depth.create_shader_resource_view().is_err());
    }

    #[test]
    fn test_views_release_native_once() {
        let (dummy, backend) = backend();
        let target = Texture::render_target(&backend, 8, 8, TextureFormat::Rgba8Unorm).unwrap();
        let srv = target.create_shader_resource_view().unwrap();
        let rtv = target.create_color_target_view().unwrap();
        assert!(srv.shares_resource_with(&rtv));

        drop(target);
        drop(srv);
        assert_eq!(dummy.stats().textures_released, 0);
        drop(rtv);
        assert_eq!(dummy.stats().textures_released, 1);
    }

    #[test]
    fn test_staging_readback() {
        let (dummy, backend) = backend();
        let staging = Texture::staging(&backend, 4, 2, TextureFormat::Rgba8Unorm).unwrap();
        assert_eq!(staging.read_back().unwrap().len(), 32);
        assert_eq!(dummy.stats().staging_textures_created, 1);

        let sampled = Texture::solid_color(&backend, Rgba8::GRAY).unwrap();
        assert!(sampled.read_back().is_err());
    }

    #[test]
    fn test_dynamic_texture_accepts_writes() {
        let (dummy, backend) = backend();
        let desc = TextureDescriptor::new_2d(
            2,
            2,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED,
            Residency::Dynamic,
        );
        let texture = Texture::create(&backend, desc, None).unwrap();

        texture.copy_cpu_to_gpu(&[7u8; 16]).unwrap();
        assert_eq!(dummy.stats().texture_writes, 1);

        // Partial and oversized uploads are rejected before the backend.
        assert!(matches!(
            texture.copy_cpu_to_gpu(&[7u8; 12]),
            Err(GraphicsError::InvalidParameter(_))
        ));
        assert!(texture.copy_cpu_to_gpu(&[7u8; 20]).is_err());
        assert_eq!(dummy.stats().texture_writes, 1);
    }

    #[test]
    fn test_static_texture_rejects_writes() {
        let (dummy, backend) = backend();
        let solid = Texture::solid_color(&backend, Rgba8::WHITE).unwrap();
        assert!(matches!(
            solid.copy_cpu_to_gpu(&[0u8; 4]),
            Err(GraphicsError::ResidencyViolation(_))
        ));
        assert_eq!(dummy.stats().texture_writes, 0);
    }

    #[test]
    fn test_invalid_format_usage_rejected() {
        let (_, backend) = backend();
        let desc = TextureDescriptor::new_2d(
            4,
            4,
            TextureFormat::Rgba8Unorm,
            TextureUsage::DEPTH_STENCIL,
            Residency::GpuOnly,
        );
        assert!(Texture::create(&backend, desc, None).is_err());
        assert!(Texture::render_target(&backend, 0, 4, TextureFormat::Rgba8Unorm).is_err());
    }
}
