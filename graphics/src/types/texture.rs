//! Texture types and descriptors.

use bitflags::bitflags;

use super::{Extent2d, Residency};

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit depth, float.
    Depth32Float,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32Float)
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8)
    }

    /// Returns true if channels are stored blue-first.
    pub fn is_bgra(&self) -> bool {
        matches!(self, Self::Bgra8Unorm | Self::Bgra8UnormSrgb)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be sampled through a shader resource view.
        const SAMPLED = 1 << 0;
        /// Texture can be rendered to as a color target.
        const COLOR_TARGET = 1 << 1;
        /// Texture can be rendered to as a depth-stencil target.
        const DEPTH_STENCIL = 1 << 2;
        /// Texture can be copied from.
        const COPY_SRC = 1 << 3;
        /// Texture can be copied to.
        const COPY_DST = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size in pixels.
    pub size: Extent2d,
    /// Pixel format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
    /// Memory residency.
    pub residency: Residency,
}

impl TextureDescriptor {
    /// Create a 2D texture descriptor.
    pub fn new_2d(
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsage,
        residency: Residency,
    ) -> Self {
        Self {
            label: None,
            size: Extent2d::new(width, height),
            format,
            usage,
            residency,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bytes in one tightly packed row.
    pub fn bytes_per_row(&self) -> u32 {
        self.size.width * self.format.block_size()
    }

    /// Bytes in the whole tightly packed image.
    pub fn byte_size(&self) -> u64 {
        self.bytes_per_row() as u64 * self.size.height as u64
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(
            1,
            1,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED,
            Residency::GpuOnly,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_properties() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(TextureFormat::Bgra8UnormSrgb.is_bgra());
        assert_eq!(TextureFormat::Rgba16Float.block_size(), 8);
    }

    #[test]
    fn test_descriptor_sizes() {
        let desc = TextureDescriptor::new_2d(
            16,
            8,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED,
            Residency::Static,
        );
        assert_eq!(desc.bytes_per_row(), 64);
        assert_eq!(desc.byte_size(), 512);
    }
}
