//! CPU-addressable RGBA8 images.
//!
//! [`CpuImage`] is the exchange format between the graphics layer and the
//! outside world: texture uploads read from it and screenshot readbacks
//! produce it.

use std::fmt;
use std::path::Path;

use crate::color::Rgba8;

/// Errors from image construction, decoding and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Width or height is zero, or the pixel buffer has the wrong length.
    InvalidDimensions {
        width: u32,
        height: u32,
        byte_len: usize,
    },
    /// The file could not be read or decoded.
    Decode(String),
    /// The image could not be encoded or written.
    Encode(String),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions {
                width,
                height,
                byte_len,
            } => write!(
                f,
                "invalid image dimensions {width}x{height} for {byte_len} bytes"
            ),
            Self::Decode(msg) => write!(f, "image decode failed: {msg}"),
            Self::Encode(msg) => write!(f, "image encode failed: {msg}"),
        }
    }
}

impl std::error::Error for ImageError {}

/// A tightly packed RGBA8 image stored row by row, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct CpuImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl CpuImage {
    /// Bytes per pixel of every `CpuImage`.
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Wrap existing RGBA8 pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL as usize;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(ImageError::InvalidDimensions {
                width,
                height,
                byte_len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create an image filled with a single color.
    pub fn filled(width: u32, height: u32, color: Rgba8) -> Result<Self, ImageError> {
        let count = width as usize * height as usize;
        let pixels = color.to_array().repeat(count);
        Self::new(width, height, pixels)
    }

    /// Decode an image file into RGBA8.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let decoded = ::image::open(path)
            .map_err(|e| ImageError::Decode(format!("{}: {e}", path.display())))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        log::debug!("Decoded image {} ({width}x{height})", path.display());
        Self::new(width, height, decoded.into_raw())
    }

    /// Encode the image as PNG at `path`.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        let buffer = ::image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| ImageError::Encode("pixel buffer size mismatch".to_string()))?;
        buffer
            .save_with_format(path, ::image::ImageFormat::Png)
            .map_err(|e| ImageError::Encode(format!("{}: {e}", path.display())))
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the image and return its RGBA8 bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Color of the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * Self::BYTES_PER_PIXEL) as usize;
        Some(Rgba8::new(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }
}

impl fmt::Debug for CpuImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(CpuImage::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            CpuImage::new(2, 2, vec![0; 15]),
            Err(ImageError::InvalidDimensions { .. })
        ));
        assert!(CpuImage::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_filled_pixels() {
        let img = CpuImage::filled(3, 2, Rgba8::GRAY).unwrap();
        assert_eq!(img.pixel(2, 1), Some(Rgba8::GRAY));
        assert_eq!(img.pixel(3, 0), None);
    }

    #[test]
    fn test_png_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");

        let mut pixels = vec![0u8; 2 * 2 * 4];
        pixels[4..8].copy_from_slice(&[255, 0, 0, 255]);
        let img = CpuImage::new(2, 2, pixels).unwrap();
        img.save_png(&path).unwrap();

        let loaded = CpuImage::from_file(&path).unwrap();
        assert_eq!(loaded, img);
        assert_eq!(loaded.pixel(1, 0), Some(Rgba8::new(255, 0, 0, 255)));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = CpuImage::from_file("definitely/not/here.png").unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }
}
