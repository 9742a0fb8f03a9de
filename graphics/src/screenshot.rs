//! Screenshot capture hand-off.
//!
//! `end_frame` reads the finished frame back into a [`ScreenshotRequest`]
//! and passes ownership to a [`ScreenshotDispatcher`]. The context never
//! waits on the dispatcher; what happens to the image (saving, encoding,
//! uploading) is the dispatcher's business.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use tessera_core::image::CpuImage;

use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{TextureDescriptor, TextureFormat};

/// A captured frame.
///
/// Holds the staging texture it was read from; dropping the request (or
/// calling [`ScreenshotRequest::into_image`]) releases it.
#[derive(Debug)]
pub struct ScreenshotRequest {
    frame_index: u64,
    staging: Texture,
    image: CpuImage,
}

impl ScreenshotRequest {
    pub(crate) fn new(frame_index: u64, staging: Texture, image: CpuImage) -> Self {
        Self {
            frame_index,
            staging,
            image,
        }
    }

    /// Index of the frame the image was captured from.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The captured RGBA8 image.
    pub fn image(&self) -> &CpuImage {
        &self.image
    }

    /// The staging texture the image was read from.
    pub fn staging(&self) -> &Texture {
        &self.staging
    }

    /// Release the staging texture and keep the image.
    pub fn into_image(self) -> CpuImage {
        self.image
    }
}

/// Receives finished screenshots.
pub trait ScreenshotDispatcher: Send + Sync {
    /// Take ownership of a request. Must not block the render thread.
    fn dispatch(&self, request: ScreenshotRequest);
}

/// Forwards requests into a `flume` channel.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: flume::Sender<ScreenshotRequest>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiving end of its channel.
    pub fn new() -> (Self, flume::Receiver<ScreenshotRequest>) {
        let (sender, receiver) = flume::unbounded();
        (Self { sender }, receiver)
    }
}

impl ScreenshotDispatcher for ChannelDispatcher {
    fn dispatch(&self, request: ScreenshotRequest) {
        let frame = request.frame_index;
        if self.sender.send(request).is_err() {
            log::warn!("Screenshot of frame {} dropped: receiver is gone", frame);
        }
    }
}

/// Saves every screenshot as `screenshot_<frame>.png` on a worker thread.
pub struct PngWriter {
    dispatcher: ChannelDispatcher,
    worker: Option<JoinHandle<()>>,
}

impl PngWriter {
    /// Start the worker thread, writing into `directory`.
    pub fn spawn(directory: impl Into<PathBuf>) -> Result<Self, GraphicsError> {
        let directory = directory.into();
        let (dispatcher, receiver) = ChannelDispatcher::new();
        let worker = std::thread::Builder::new()
            .name("screenshot-writer".into())
            .spawn(move || {
                for request in receiver.iter() {
                    let path = Self::path_for(&directory, request.frame_index());
                    match request.image().save_png(&path) {
                        Ok(()) => log::info!("Saved screenshot {}", path.display()),
                        Err(e) => log::error!("Failed to save {}: {}", path.display(), e),
                    }
                }
            })
            .map_err(|e| GraphicsError::Internal(format!("failed to spawn screenshot writer: {e}")))?;
        Ok(Self {
            dispatcher,
            worker: Some(worker),
        })
    }

    /// File a frame's screenshot is written to.
    pub fn path_for(directory: &Path, frame_index: u64) -> PathBuf {
        directory.join(format!("screenshot_{frame_index:06}.png"))
    }

    /// Stop accepting screenshots and wait for pending writes.
    pub fn finish(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let (closed, _) = flume::bounded(0);
        self.dispatcher = ChannelDispatcher { sender: closed };
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("Screenshot writer thread panicked");
        }
    }
}

impl ScreenshotDispatcher for PngWriter {
    fn dispatch(&self, request: ScreenshotRequest) {
        self.dispatcher.dispatch(request);
    }
}

impl Drop for PngWriter {
    fn drop(&mut self) {
        self.join();
    }
}

/// Convert tightly packed readback bytes into an RGBA8 image.
///
/// BGRA formats are swizzled; other non-RGBA8 formats are rejected.
pub(crate) fn readback_to_image(
    mut bytes: Vec<u8>,
    descriptor: &TextureDescriptor,
) -> Result<CpuImage, GraphicsError> {
    match descriptor.format {
        TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => {}
        TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => {
            for pixel in bytes.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }
        other => {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot capture screenshots from {other:?} targets"
            )));
        }
    }
    CpuImage::new(descriptor.size.width, descriptor.size.height, bytes)
        .map_err(|e| GraphicsError::Internal(format!("screenshot readback: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Residency, TextureUsage};

    fn descriptor(format: TextureFormat) -> TextureDescriptor {
        TextureDescriptor::new_2d(2, 1, format, TextureUsage::COPY_DST, Residency::Staging)
    }

    #[test]
    fn test_bgra_is_swizzled() {
        let bytes = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let image = readback_to_image(bytes, &descriptor(TextureFormat::Bgra8Unorm)).unwrap();
        assert_eq!(image.pixels(), &[3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn test_rgba_passes_through() {
        let bytes = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let image = readback_to_image(bytes.clone(), &descriptor(TextureFormat::Rgba8Unorm)).unwrap();
        assert_eq!(image.pixels(), bytes.as_slice());
    }

    #[test]
    fn test_unsupported_format() {
        let bytes = vec![0; 16];
        assert!(readback_to_image(bytes, &descriptor(TextureFormat::Rgba16Float)).is_err());
    }

    #[test]
    fn test_png_path() {
        let path = PngWriter::path_for(Path::new("shots"), 42);
        assert_eq!(path, Path::new("shots").join("screenshot_000042.png"));
    }
}
