//! Vertex layout descriptors.
//!
//! A [`VertexLayoutDescriptor`] is an ordered list of
//! `(semantic, format, offset)` entries describing one interleaved vertex
//! structure. The renderer never hardcodes a vertex format: each draw passes
//! the layout of the bound vertex stream, and the bound shader derives (and
//! caches) a matching input layout.
//!
//! Semantics are routed to fixed shader input locations:
//!
//! | Semantic                 | Location |
//! |--------------------------|----------|
//! | `POSITION`               | 0        |
//! | `COLOR`                  | 1        |
//! | `TEXCOORD`               | 2        |
//! | `NORMAL`                 | 3        |
//! | `TANGENT`                | 4        |
//! | `BITANGENT` / `BINORMAL` | 5        |
//!
//! # Example
//!
//! ```ignore
//! let layout = VertexLayoutDescriptor::new(24)
//!     .with_attribute(VertexAttributeDescriptor::position(0))
//!     .with_attribute(VertexAttributeDescriptor::color(12))
//!     .with_attribute(VertexAttributeDescriptor::texcoord(16));
//! layout.validate()?;
//! ```

use std::sync::Arc;

use tessera_core::mesh::{VertexPcu, VertexPcutbn};

use crate::error::GraphicsError;

/// Shader input location for a semantic name, ignoring case.
pub fn semantic_location(semantic: &str) -> Option<u32> {
    match semantic.to_ascii_uppercase().as_str() {
        "POSITION" => Some(0),
        "COLOR" => Some(1),
        "TEXCOORD" => Some(2),
        "NORMAL" => Some(3),
        "TANGENT" => Some(4),
        "BITANGENT" | "BINORMAL" => Some(5),
        _ => None,
    }
}

/// Format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Single 32-bit unsigned integer.
    Uint,
    /// Two 32-bit unsigned integers.
    Uint2,
    /// Three 32-bit unsigned integers.
    Uint3,
    /// Four 32-bit unsigned integers.
    Uint4,
    /// Four 8-bit unsigned integers (normalized to 0.0-1.0).
    Unorm8x4,
    /// Four 8-bit signed integers (normalized to -1.0-1.0).
    Snorm8x4,
}

impl VertexAttributeFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> u32 {
        match self {
            Self::Float | Self::Uint => 4,
            Self::Float2 | Self::Uint2 => 8,
            Self::Float3 | Self::Uint3 => 12,
            Self::Float4 | Self::Uint4 => 16,
            Self::Unorm8x4 | Self::Snorm8x4 => 4,
        }
    }

    /// Parse a format name.
    ///
    /// Accepts short names (`float3`), wgpu-style names (`float32x3`) and
    /// DXGI-style names (`R32G32B32_FLOAT`), ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let format = match name.to_ascii_lowercase().as_str() {
            "float" | "float32" | "r32_float" => Self::Float,
            "float2" | "float32x2" | "r32g32_float" => Self::Float2,
            "float3" | "float32x3" | "r32g32b32_float" => Self::Float3,
            "float4" | "float32x4" | "r32g32b32a32_float" => Self::Float4,
            "uint" | "uint32" | "r32_uint" => Self::Uint,
            "uint2" | "uint32x2" | "r32g32_uint" => Self::Uint2,
            "uint3" | "uint32x3" | "r32g32b32_uint" => Self::Uint3,
            "uint4" | "uint32x4" | "r32g32b32a32_uint" => Self::Uint4,
            "unorm8x4" | "r8g8b8a8_unorm" => Self::Unorm8x4,
            "snorm8x4" | "r8g8b8a8_snorm" => Self::Snorm8x4,
            _ => return None,
        };
        Some(format)
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// Semantic name, matched to a shader input location.
    pub semantic: String,
    /// Data format of this attribute.
    pub format: VertexAttributeFormat,
    /// Byte offset within one vertex.
    pub offset: u32,
}

impl VertexAttributeDescriptor {
    /// Create a new vertex attribute.
    pub fn new(semantic: impl Into<String>, format: VertexAttributeFormat, offset: u32) -> Self {
        Self {
            semantic: semantic.into(),
            format,
            offset,
        }
    }

    /// Position attribute (float3).
    pub fn position(offset: u32) -> Self {
        Self::new("POSITION", VertexAttributeFormat::Float3, offset)
    }

    /// Color attribute (unorm8x4).
    pub fn color(offset: u32) -> Self {
        Self::new("COLOR", VertexAttributeFormat::Unorm8x4, offset)
    }

    /// Texture coordinate attribute (float2).
    pub fn texcoord(offset: u32) -> Self {
        Self::new("TEXCOORD", VertexAttributeFormat::Float2, offset)
    }

    /// Normal attribute (float3).
    pub fn normal(offset: u32) -> Self {
        Self::new("NORMAL", VertexAttributeFormat::Float3, offset)
    }

    /// Tangent attribute (float3).
    pub fn tangent(offset: u32) -> Self {
        Self::new("TANGENT", VertexAttributeFormat::Float3, offset)
    }

    /// Bitangent attribute (float3).
    pub fn bitangent(offset: u32) -> Self {
        Self::new("BITANGENT", VertexAttributeFormat::Float3, offset)
    }

    /// Shader input location of this attribute's semantic.
    pub fn location(&self) -> Option<u32> {
        semantic_location(&self.semantic)
    }

    /// One past the last byte this attribute occupies.
    pub fn end(&self) -> u32 {
        self.offset + self.format.size()
    }
}

/// Describes the layout of one interleaved vertex structure.
///
/// Layouts are compared and hashed by value; they are the key of each
/// shader's input-layout cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayoutDescriptor {
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Attributes in declaration order.
    pub attributes: Vec<VertexAttributeDescriptor>,
}

impl VertexLayoutDescriptor {
    /// Create an empty layout with the given stride.
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            attributes: Vec::new(),
        }
    }

    /// Add a vertex attribute.
    pub fn with_attribute(mut self, attribute: VertexAttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Build a layout from `(semantic, format name, offset)` entries.
    ///
    /// Fails if a format name has no native equivalent.
    pub fn from_entries(stride: u32, entries: &[(&str, &str, u32)]) -> Result<Self, GraphicsError> {
        let mut layout = Self::new(stride);
        for &(semantic, format, offset) in entries {
            let format = VertexAttributeFormat::from_name(format).ok_or_else(|| {
                GraphicsError::InvalidVertexLayout(format!(
                    "attribute {semantic}: unknown format '{format}'"
                ))
            })?;
            layout
                .attributes
                .push(VertexAttributeDescriptor::new(semantic, format, offset));
        }
        layout.validate()?;
        Ok(layout)
    }

    /// Find an attribute by semantic name, ignoring case.
    pub fn attribute(&self, semantic: &str) -> Option<&VertexAttributeDescriptor> {
        self.attributes
            .iter()
            .find(|attr| attr.semantic.eq_ignore_ascii_case(semantic))
    }

    /// Find the attribute routed to a shader input location.
    pub fn attribute_for_location(&self, location: u32) -> Option<&VertexAttributeDescriptor> {
        self.attributes
            .iter()
            .find(|attr| attr.location() == Some(location))
    }

    /// Check that the layout describes a well-formed vertex structure.
    ///
    /// Attributes must have a known semantic (each at most once), offsets
    /// must increase without overlap, and every attribute must fit inside
    /// the stride.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        let fail = |msg: String| Err(GraphicsError::InvalidVertexLayout(msg));

        if self.stride == 0 {
            return fail("stride must be non-zero".into());
        }
        if self.attributes.is_empty() {
            return fail("layout has no attributes".into());
        }

        let mut seen = [false; 6];
        let mut previous_end = 0;
        for attr in &self.attributes {
            let Some(location) = attr.location() else {
                return fail(format!("unknown semantic '{}'", attr.semantic));
            };
            if std::mem::replace(&mut seen[location as usize], true) {
                return fail(format!("semantic '{}' appears twice", attr.semantic));
            }
            if attr.offset < previous_end {
                return fail(format!(
                    "attribute {} at offset {} overlaps the previous attribute (ends at {})",
                    attr.semantic, attr.offset, previous_end
                ));
            }
            if attr.end() > self.stride {
                return fail(format!(
                    "attribute {} ends at {} beyond stride {}",
                    attr.semantic,
                    attr.end(),
                    self.stride
                ));
            }
            previous_end = attr.end();
        }
        Ok(())
    }
}

// ============================================================================
// Common Layouts
// ============================================================================

impl VertexLayoutDescriptor {
    /// Layout of [`VertexPcu`]: position, color, texcoord (24 bytes).
    pub fn pcu() -> Arc<Self> {
        Arc::new(
            Self::new(std::mem::size_of::<VertexPcu>() as u32)
                .with_attribute(VertexAttributeDescriptor::position(0))
                .with_attribute(VertexAttributeDescriptor::color(12))
                .with_attribute(VertexAttributeDescriptor::texcoord(16)),
        )
    }

    /// Layout of [`VertexPcutbn`]: position, color, texcoord, tangent,
    /// bitangent, normal (60 bytes).
    pub fn pcutbn() -> Arc<Self> {
        Arc::new(
            Self::new(std::mem::size_of::<VertexPcutbn>() as u32)
                .with_attribute(VertexAttributeDescriptor::position(0))
                .with_attribute(VertexAttributeDescriptor::color(12))
                .with_attribute(VertexAttributeDescriptor::texcoord(16))
                .with_attribute(VertexAttributeDescriptor::tangent(24))
                .with_attribute(VertexAttributeDescriptor::bitangent(36))
                .with_attribute(VertexAttributeDescriptor::normal(48)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_routing() {
        assert_eq!(semantic_location("POSITION"), Some(0));
        assert_eq!(semantic_location("texcoord"), Some(2));
        assert_eq!(semantic_location("BINORMAL"), Some(5));
        assert_eq!(semantic_location("BITANGENT"), Some(5));
        assert_eq!(semantic_location("BLENDWEIGHT"), None);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(
            VertexAttributeFormat::from_name("R32G32B32_FLOAT"),
            Some(VertexAttributeFormat::Float3)
        );
        assert_eq!(
            VertexAttributeFormat::from_name("float32x2"),
            Some(VertexAttributeFormat::Float2)
        );
        assert_eq!(
            VertexAttributeFormat::from_name("r8g8b8a8_unorm"),
            Some(VertexAttributeFormat::Unorm8x4)
        );
        assert_eq!(VertexAttributeFormat::from_name("R16_FLOAT"), None);
    }

    #[test]
    fn test_builtin_layouts_are_valid() {
        let pcu = VertexLayoutDescriptor::pcu();
        assert_eq!(pcu.stride, 24);
        assert!(pcu.validate().is_ok());

        let pcutbn = VertexLayoutDescriptor::pcutbn();
        assert_eq!(pcutbn.stride, 60);
        assert_eq!(pcutbn.attributes.len(), 6);
        assert!(pcutbn.validate().is_ok());
        assert_eq!(pcutbn.attribute_for_location(3).unwrap().offset, 48);
    }

    #[test]
    fn test_validation_failures() {
        let overlapping = VertexLayoutDescriptor::new(24)
            .with_attribute(VertexAttributeDescriptor::position(0))
            .with_attribute(VertexAttributeDescriptor::texcoord(8));
        assert!(matches!(
            overlapping.validate(),
            Err(GraphicsError::InvalidVertexLayout(_))
        ));

        let too_long = VertexLayoutDescriptor::new(12)
            .with_attribute(VertexAttributeDescriptor::position(4));
        assert!(too_long.validate().is_err());

        let duplicated = VertexLayoutDescriptor::new(24)
            .with_attribute(VertexAttributeDescriptor::position(0))
            .with_attribute(VertexAttributeDescriptor::new(
                "position",
                VertexAttributeFormat::Float3,
                12,
            ));
        assert!(duplicated.validate().is_err());

        assert!(VertexLayoutDescriptor::new(0).validate().is_err());
        assert!(VertexLayoutDescriptor::new(16).validate().is_err());
    }

    #[test]
    fn test_from_entries() {
        let layout = VertexLayoutDescriptor::from_entries(
            20,
            &[("POSITION", "R32G32B32_FLOAT", 0), ("TEXCOORD", "float2", 12)],
        )
        .unwrap();
        assert_eq!(layout.attribute("texcoord").unwrap().offset, 12);

        let err = VertexLayoutDescriptor::from_entries(16, &[("POSITION", "half3", 0)]);
        assert!(matches!(err, Err(GraphicsError::InvalidVertexLayout(_))));
    }

    #[test]
    fn test_layouts_hash_by_value() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert((*VertexLayoutDescriptor::pcu()).clone());
        set.insert((*VertexLayoutDescriptor::pcu()).clone());
        set.insert((*VertexLayoutDescriptor::pcutbn()).clone());
        assert_eq!(set.len(), 2);
    }
}
