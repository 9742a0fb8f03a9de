//! Fixed-function state descriptions and their lazily built native objects.

use std::sync::Arc;

use crate::backend::GpuStateObject;
use crate::error::GraphicsError;
use crate::types::CompareFunction;

// ============================================================================
// Blend
// ============================================================================

/// How fragment output combines with the color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Output overwrites the destination.
    #[default]
    Opaque,
    /// Source-over compositing using the output's alpha.
    Alpha,
    /// Color is added to the destination; alpha combines by maximum.
    Additive,
}

impl BlendMode {
    /// Lowercase name used in material definitions.
    pub fn name(self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::Alpha => "alpha",
            Self::Additive => "additive",
        }
    }

    /// Parse a name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "opaque" => Some(Self::Opaque),
            "alpha" => Some(Self::Alpha),
            "additive" => Some(Self::Additive),
            _ => None,
        }
    }
}

// ============================================================================
// Depth
// ============================================================================

/// Depth test and write policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Comparison that must pass for a fragment to be kept.
    pub compare: CompareFunction,
    /// Whether passing fragments write their depth.
    pub write_enabled: bool,
}

impl DepthState {
    /// Test with `compare` and write depth.
    pub fn new(compare: CompareFunction, write_enabled: bool) -> Self {
        Self {
            compare,
            write_enabled,
        }
    }

    /// Test with `compare` but never write.
    pub fn read_only(compare: CompareFunction) -> Self {
        Self::new(compare, false)
    }

    /// No depth test and no depth write.
    pub fn disabled() -> Self {
        Self::new(CompareFunction::Always, false)
    }
}

impl Default for DepthState {
    fn default() -> Self {
        Self::new(CompareFunction::LessEqual, true)
    }
}

// ============================================================================
// Raster
// ============================================================================

/// Polygon fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

impl FillMode {
    /// Parse a name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "solid" => Some(Self::Solid),
            "wireframe" => Some(Self::Wireframe),
            _ => None,
        }
    }
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

impl CullMode {
    /// Parse a name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "front" => Some(Self::Front),
            "back" => Some(Self::Back),
            _ => None,
        }
    }
}

/// Vertex order that marks a triangle as front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Winding {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl Winding {
    /// Parse `ccw` / `cw` (or the long names), ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ccw" | "counterclockwise" | "counter_clockwise" => Some(Self::CounterClockwise),
            "cw" | "clockwise" => Some(Self::Clockwise),
            _ => None,
        }
    }
}

/// Rasterizer policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RasterState {
    pub fill: FillMode,
    pub cull: CullMode,
    pub winding: Winding,
}

impl RasterState {
    /// Create a raster state.
    pub fn new(fill: FillMode, cull: CullMode, winding: Winding) -> Self {
        Self {
            fill,
            cull,
            winding,
        }
    }

    /// Replace the fill mode.
    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    /// Replace the cull mode.
    pub fn with_cull(mut self, cull: CullMode) -> Self {
        self.cull = cull;
        self
    }

    /// Replace the winding order.
    pub fn with_winding(mut self, winding: Winding) -> Self {
        self.winding = winding;
        self
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// One state description together with its native object, if built.
///
/// `Dirty` keeps the superseded native object alive until the next rebuild,
/// so mutation never touches the device.
#[derive(Debug)]
pub enum StateCell<D> {
    /// The native object matches the description.
    Clean {
        description: D,
        handle: Arc<GpuStateObject>,
    },
    /// The description changed (or was never built).
    Dirty {
        description: D,
        stale: Option<Arc<GpuStateObject>>,
    },
}

impl<D: Copy + PartialEq> StateCell<D> {
    /// A cell that will be built on first use.
    pub fn new(description: D) -> Self {
        Self::Dirty {
            description,
            stale: None,
        }
    }

    /// Current description.
    pub fn description(&self) -> D {
        match self {
            Self::Clean { description, .. } | Self::Dirty { description, .. } => *description,
        }
    }

    /// Whether the next [`StateCell::resolve`] will rebuild.
    pub fn is_dirty(&self) -> bool {
        matches!(self, Self::Dirty { .. })
    }

    /// The built native object, if the cell is clean.
    pub fn handle(&self) -> Option<&Arc<GpuStateObject>> {
        match self {
            Self::Clean { handle, .. } => Some(handle),
            Self::Dirty { .. } => None,
        }
    }

    /// Replace the description. Setting an equal value is a no-op.
    ///
    /// Returns whether the cell became dirty.
    pub fn set(&mut self, new_description: D) -> bool {
        if self.description() == new_description {
            return false;
        }
        let stale = match self {
            Self::Clean { handle, .. } => Some(Arc::clone(handle)),
            Self::Dirty { stale, .. } => stale.take(),
        };
        *self = Self::Dirty {
            description: new_description,
            stale,
        };
        true
    }

    /// Return the native object, building it first if the cell is dirty.
    ///
    /// The boolean is `true` when a rebuild happened. A failed build leaves
    /// the cell dirty.
    pub fn resolve(
        &mut self,
        build: impl FnOnce(D) -> Result<GpuStateObject, GraphicsError>,
    ) -> Result<(Arc<GpuStateObject>, bool), GraphicsError> {
        match self {
            Self::Clean { handle, .. } => Ok((Arc::clone(handle), false)),
            Self::Dirty { description, .. } => {
                let description = *description;
                let handle = Arc::new(build(description)?);
                // Dropping the previous variant releases the stale object.
                *self = Self::Clean {
                    description,
                    handle: Arc::clone(&handle),
                };
                Ok((handle, true))
            }
        }
    }
}
