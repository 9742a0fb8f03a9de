//! Views onto texture resources.
//!
//! A view is a cheap, cloneable projection of a texture for one purpose. It
//! holds its own reference to the native handle, so a view outlives the
//! [`Texture`](super::Texture) it was created from.

use std::sync::Arc;

use crate::backend::GpuTexture;
use crate::types::{Extent2d, TextureFormat};

/// Common access to the resource behind a view.
pub trait TextureView {
    /// The native handle shared with the texture and its other views.
    fn resource(&self) -> &Arc<GpuTexture>;

    /// Pixel format of the viewed resource.
    fn format(&self) -> TextureFormat;

    /// Size of the viewed resource.
    fn size(&self) -> Extent2d;

    /// Whether both views project the same native resource.
    fn shares_resource_with(&self, other: &impl TextureView) -> bool
    where
        Self: Sized,
    {
        Arc::ptr_eq(self.resource(), other.resource())
    }
}

macro_rules! texture_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            resource: Arc<GpuTexture>,
            format: TextureFormat,
            size: Extent2d,
        }

        impl $name {
            pub(crate) fn new(resource: Arc<GpuTexture>, format: TextureFormat, size: Extent2d) -> Self {
                Self {
                    resource,
                    format,
                    size,
                }
            }

            /// Width in pixels.
            pub fn width(&self) -> u32 {
                self.size.width
            }

            /// Height in pixels.
            pub fn height(&self) -> u32 {
                self.size.height
            }
        }

        impl TextureView for $name {
            fn resource(&self) -> &Arc<GpuTexture> {
                &self.resource
            }

            fn format(&self) -> TextureFormat {
                self.format
            }

            fn size(&self) -> Extent2d {
                self.size
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("format", &self.format)
                    .field("size", &self.size)
                    .field("resource", &self.resource)
                    .finish()
            }
        }

        static_assertions::assert_impl_all!($name: Send, Sync);
    };
}

texture_view!(
    /// A texture bound for sampling.
    ShaderResourceView
);

texture_view!(
    /// A texture bound as a color render target.
    ColorTargetView
);

texture_view!(
    /// A texture bound as a depth-stencil target.
    DepthStencilTargetView
);

impl ColorTargetView {
    /// Wrap the acquired back buffer of the current frame.
    pub(crate) fn back_buffer(handle: GpuTexture, format: TextureFormat, size: Extent2d) -> Self {
        Self::new(Arc::new(handle), format, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GpuBackend;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_back_buffer_view() {
        let backend = DummyBackend::with_back_buffer(320, 240);
        let handle = backend.acquire_back_buffer().unwrap();
        let view = ColorTargetView::back_buffer(
            handle,
            backend.back_buffer_format(),
            backend.back_buffer_size(),
        );
        assert_eq!((view.width(), view.height()), (320, 240));
        assert_eq!(view.format(), TextureFormat::Rgba8Unorm);

        let clone = view.clone();
        assert!(clone.shares_resource_with(&view));
    }
}
