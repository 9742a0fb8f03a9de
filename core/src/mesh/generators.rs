//! Mesh generators for common shapes.
//!
//! These generators produce [`CpuMesh`] values in the standard vertex
//! formats, ready to be paired with the matching vertex layout.

use crate::color::Rgba8;
use crate::math::{Vec2, Vec3};

use super::data::CpuMesh;
use super::vertex::{VertexPcu, VertexPcutbn};

/// Generate an XY quad centered at the origin, facing +Z.
///
/// Uses [`VertexPcu`] with `u32` indices. UV (0, 0) is the top-left corner.
pub fn generate_quad(half_width: f32, half_height: f32, color: Rgba8) -> CpuMesh {
    let vertices = [
        VertexPcu::new(
            Vec3::new(-half_width, -half_height, 0.0),
            color,
            Vec2::new(0.0, 1.0),
        ),
        VertexPcu::new(
            Vec3::new(half_width, -half_height, 0.0),
            color,
            Vec2::new(1.0, 1.0),
        ),
        VertexPcu::new(
            Vec3::new(half_width, half_height, 0.0),
            color,
            Vec2::new(1.0, 0.0),
        ),
        VertexPcu::new(
            Vec3::new(-half_width, half_height, 0.0),
            color,
            Vec2::new(0.0, 0.0),
        ),
    ];

    CpuMesh::from_vertices(&vertices)
        .with_indices(vec![0, 1, 2, 2, 3, 0])
        .with_label("quad")
}

/// Generate an axis-aligned cube with per-face normals and tangents.
///
/// Uses [`VertexPcutbn`]: 24 vertices, 36 indices.
pub fn generate_cube(half_extent: f32, color: Rgba8) -> CpuMesh {
    // (normal, tangent) per face; bitangent = normal x tangent
    let faces = [
        (Vec3::x(), -Vec3::z()),
        (-Vec3::x(), Vec3::z()),
        (Vec3::y(), Vec3::x()),
        (-Vec3::y(), Vec3::x()),
        (Vec3::z(), Vec3::x()),
        (-Vec3::z(), -Vec3::x()),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, tangent) in faces {
        let bitangent = normal.cross(&tangent);
        let base = vertices.len() as u32;
        for (u, v) in corners {
            let position = (normal + tangent * u + bitangent * v) * half_extent;
            vertices.push(VertexPcutbn {
                position: position.into(),
                color,
                uv: [(u + 1.0) * 0.5, (1.0 - v) * 0.5],
                tangent: tangent.into(),
                bitangent: bitangent.into(),
                normal: normal.into(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    CpuMesh::from_vertices(&vertices)
        .with_indices(indices)
        .with_label("cube")
}

/// Generate one triangle that covers the whole of clip space.
///
/// Positions are already in normalized device coordinates; UVs map the
/// visible region to `[0, 1]` with V pointing down.
pub fn generate_fullscreen_triangle() -> CpuMesh {
    let vertices = [
        VertexPcu::new(Vec3::new(-1.0, -1.0, 0.0), Rgba8::WHITE, Vec2::new(0.0, 1.0)),
        VertexPcu::new(Vec3::new(3.0, -1.0, 0.0), Rgba8::WHITE, Vec2::new(2.0, 1.0)),
        VertexPcu::new(Vec3::new(-1.0, 3.0, 0.0), Rgba8::WHITE, Vec2::new(0.0, -1.0)),
    ];
    CpuMesh::from_vertices(&vertices).with_label("fullscreen_triangle")
}
