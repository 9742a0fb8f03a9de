//! Standard vertex structures.

use crate::color::Rgba8;
use crate::math::{Vec2, Vec3};

/// Position, color, texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexPcu {
    pub position: [f32; 3],
    pub color: Rgba8,
    pub uv: [f32; 2],
}

impl VertexPcu {
    /// Create a vertex from math types.
    pub fn new(position: Vec3, color: Rgba8, uv: Vec2) -> Self {
        Self {
            position: position.into(),
            color,
            uv: uv.into(),
        }
    }
}

/// Position, color, texture coordinate, tangent, bitangent, normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexPcutbn {
    pub position: [f32; 3],
    pub color: Rgba8,
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub normal: [f32; 3],
}
