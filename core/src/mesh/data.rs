//! CPU-side mesh data structures.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`CpuMesh`] - CPU-side mesh holding raw vertex bytes and indices

use std::fmt;

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Get the number of vertices per primitive (for non-strip topologies).
    pub fn vertices_per_primitive(&self) -> Option<u32> {
        match self {
            Self::PointList => Some(1),
            Self::LineList => Some(2),
            Self::TriangleList => Some(3),
            Self::LineStrip | Self::TriangleStrip => None,
        }
    }
}

/// Structural problem found in a [`CpuMesh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshDataError(pub String);

impl fmt::Display for MeshDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mesh data: {}", self.0)
    }
}

impl std::error::Error for MeshDataError {}

/// CPU-side mesh: interleaved vertex bytes plus optional `u32` indices.
///
/// # Example
///
/// ```ignore
/// let vertices = [VertexPcu::new(...), VertexPcu::new(...), VertexPcu::new(...)];
/// let mesh = CpuMesh::from_vertices(&vertices)
///     .with_indices(vec![0, 1, 2])
///     .with_label("triangle");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CpuMesh {
    vertices: Vec<u8>,
    vertex_stride: u32,
    vertex_count: u32,
    indices: Option<Vec<u32>>,
    topology: PrimitiveTopology,
    label: Option<String>,
}

impl CpuMesh {
    /// Create a mesh from a slice of plain-old-data vertices.
    pub fn from_vertices<V: bytemuck::Pod>(vertices: &[V]) -> Self {
        Self {
            vertices: bytemuck::cast_slice(vertices).to_vec(),
            vertex_stride: std::mem::size_of::<V>() as u32,
            vertex_count: vertices.len() as u32,
            indices: None,
            topology: PrimitiveTopology::TriangleList,
            label: None,
        }
    }

    /// Create a mesh from raw interleaved bytes.
    pub fn from_raw(vertices: Vec<u8>, vertex_stride: u32) -> Self {
        let vertex_count = if vertex_stride == 0 {
            0
        } else {
            (vertices.len() / vertex_stride as usize) as u32
        };
        Self {
            vertices,
            vertex_stride,
            vertex_count,
            indices: None,
            topology: PrimitiveTopology::TriangleList,
            label: None,
        }
    }

    /// Attach an index list.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Set the primitive topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Interleaved vertex bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        &self.vertices
    }

    /// Size of one vertex in bytes.
    pub fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Index list, if any.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Check if this mesh uses indexed drawing.
    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Number of elements a draw consumes: indices if indexed, else vertices.
    pub fn element_count(&self) -> u32 {
        self.indices
            .as_ref()
            .map_or(self.vertex_count, |indices| indices.len() as u32)
    }

    /// Primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Check the mesh for structural problems.
    ///
    /// Rejects empty meshes, a zero stride, vertex bytes that are not a whole
    /// number of vertices, and indices that reference missing vertices.
    pub fn validate(&self) -> Result<(), MeshDataError> {
        if self.vertex_stride == 0 {
            return Err(MeshDataError("vertex stride is zero".to_string()));
        }
        if self.vertices.is_empty() {
            return Err(MeshDataError("mesh has no vertices".to_string()));
        }
        if self.vertices.len() % self.vertex_stride as usize != 0 {
            return Err(MeshDataError(format!(
                "{} vertex bytes is not a multiple of stride {}",
                self.vertices.len(),
                self.vertex_stride
            )));
        }
        if let Some(indices) = &self.indices {
            if indices.is_empty() {
                return Err(MeshDataError("index list is empty".to_string()));
            }
            if let Some(bad) = indices.iter().find(|&&i| i >= self.vertex_count) {
                return Err(MeshDataError(format!(
                    "index {bad} out of range for {} vertices",
                    self.vertex_count
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
    struct P {
        position: [f32; 3],
    }

    fn triangle() -> CpuMesh {
        CpuMesh::from_vertices(&[
            P {
                position: [0.0, 0.0, 0.0],
            },
            P {
                position: [1.0, 0.0, 0.0],
            },
            P {
                position: [0.0, 1.0, 0.0],
            },
        ])
    }

    #[test]
    fn test_from_vertices() {
        let mesh = triangle();
        assert_eq!(mesh.vertex_stride(), 12);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.vertex_bytes().len(), 36);
        assert!(!mesh.is_indexed());
        assert_eq!(mesh.element_count(), 3);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_indexed_element_count() {
        let mesh = triangle().with_indices(vec![0, 1, 2, 2, 1, 0]);
        assert!(mesh.is_indexed());
        assert_eq!(mesh.element_count(), 6);
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let mesh = triangle().with_indices(vec![0, 1, 3]);
        let err = mesh.validate().unwrap_err();
        assert!(err.0.contains("index 3"));
    }

    #[test]
    fn test_validate_rejects_partial_vertex() {
        let mesh = CpuMesh::from_raw(vec![0u8; 13], 12);
        assert!(mesh.validate().is_err());
        assert!(CpuMesh::from_raw(vec![0u8; 12], 0).validate().is_err());
    }

    #[test]
    fn test_topology_primitive_size() {
        assert_eq!(PrimitiveTopology::TriangleList.vertices_per_primitive(), Some(3));
        assert_eq!(PrimitiveTopology::LineStrip.vertices_per_primitive(), None);
    }
}
