//! Common types shared across the graphics system.

// ============================================================================
// Residency
// ============================================================================

/// Memory-access and update pattern of a GPU resource.
///
/// | Residency  | Initial data | CPU writes | CPU reads |
/// |------------|--------------|------------|-----------|
/// | `GpuOnly`  | optional     | no         | no        |
/// | `Static`   | required     | no         | no        |
/// | `Dynamic`  | optional     | yes        | no        |
/// | `Staging`  | optional     | yes        | yes       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Residency {
    /// Written and read only by the GPU (render targets).
    #[default]
    GpuOnly,
    /// Immutable after creation; must be seeded with initial data.
    Static,
    /// Rewritten by the CPU, possibly every frame.
    Dynamic,
    /// Copy destination the CPU can read back.
    Staging,
}

impl Residency {
    /// Whether creation must supply initial data.
    pub fn requires_initial_data(self) -> bool {
        self == Self::Static
    }

    /// Whether `copy_cpu_to_gpu` is allowed.
    pub fn is_cpu_writable(self) -> bool {
        matches!(self, Self::Dynamic | Self::Staging)
    }

    /// Whether the CPU can read the resource back.
    pub fn is_cpu_readable(self) -> bool {
        self == Self::Staging
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Viewport configuration for rendering.
///
/// Uses the wgpu/D3D convention: origin at the top-left corner, depth
/// range `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// X coordinate of the viewport's top-left corner.
    pub x: f32,
    /// Y coordinate of the viewport's top-left corner.
    pub y: f32,
    /// Width of the viewport.
    pub width: f32,
    /// Height of the viewport.
    pub height: f32,
    /// Minimum depth value (default: 0.0).
    pub min_depth: f32,
    /// Maximum depth value (default: 1.0).
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport with the default depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    /// Create a viewport covering a whole surface.
    pub fn from_extent(extent: Extent2d) -> Self {
        Self::new(0.0, 0.0, extent.width as f32, extent.height as f32)
    }
}

// ============================================================================
// Extent
// ============================================================================

/// Width and height of a 2D surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create an extent.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, or 1.0 for an empty extent.
    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residency_rules() {
        assert!(Residency::Static.requires_initial_data());
        assert!(!Residency::Dynamic.requires_initial_data());
        assert!(Residency::Dynamic.is_cpu_writable());
        assert!(Residency::Staging.is_cpu_writable());
        assert!(!Residency::Static.is_cpu_writable());
        assert!(!Residency::GpuOnly.is_cpu_writable());
        assert!(Residency::Staging.is_cpu_readable());
    }

    #[test]
    fn test_extent_aspect() {
        assert_eq!(Extent2d::new(200, 100).aspect(), 2.0);
        assert_eq!(Extent2d::new(0, 100).aspect(), 1.0);
        assert!(Extent2d::default().is_empty());
    }

    #[test]
    fn test_viewport_from_extent() {
        let vp = Viewport::from_extent(Extent2d::new(640, 480));
        assert_eq!(vp.width, 640.0);
        assert_eq!(vp.max_depth, 1.0);
    }
}
