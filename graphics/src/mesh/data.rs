//! GPU mesh built from CPU mesh data.
//!
//! A [`Mesh`] owns the GPU resources needed to draw one piece of geometry:
//! a vertex buffer, an optional `u32` index buffer, the vertex layout that
//! describes the vertex structure, and the key of the material it is drawn
//! with by default.

use std::sync::Arc;

use tessera_core::mesh::{CpuMesh, PrimitiveTopology};

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::shader::DEFAULT_SHADER_KEY;
use crate::types::{BufferDescriptor, Residency};

use super::layout::VertexLayoutDescriptor;

/// A GPU mesh with a vertex buffer and an optional index buffer.
///
/// # Example
///
/// ```ignore
/// let cpu = generate_cube(0.5, Rgba8::WHITE);
/// let mesh = Mesh::from_cpu(&backend, &cpu, VertexLayoutDescriptor::pcu())?;
/// context.draw_mesh(&mesh)?;
/// ```
pub struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Option<Buffer>,
    element_count: u32,
    topology: PrimitiveTopology,
    layout: Arc<VertexLayoutDescriptor>,
    default_material: String,
    label: Option<String>,
}

impl Mesh {
    /// Upload `cpu` into static GPU buffers.
    ///
    /// Fails with [`GraphicsError::MeshLoadFailed`] when the CPU data is
    /// malformed or its stride disagrees with `layout`, and with
    /// [`GraphicsError::InvalidVertexLayout`] when the layout itself is
    /// malformed.
    pub fn from_cpu(
        backend: &Arc<dyn GpuBackend>,
        cpu: &CpuMesh,
        layout: Arc<VertexLayoutDescriptor>,
    ) -> Result<Self, GraphicsError> {
        let name = cpu.label().unwrap_or("<unnamed>");
        cpu.validate()
            .map_err(|e| GraphicsError::MeshLoadFailed(format!("{name}: {e}")))?;
        layout.validate()?;
        if cpu.vertex_stride() != layout.stride {
            return Err(GraphicsError::MeshLoadFailed(format!(
                "{name}: vertex stride {} does not match layout stride {}",
                cpu.vertex_stride(),
                layout.stride
            )));
        }

        let vertex_bytes = cpu.vertex_bytes();
        let mut vertex_desc =
            BufferDescriptor::vertex(vertex_bytes.len() as u64, layout.stride, Residency::Static);
        if let Some(label) = cpu.label() {
            vertex_desc = vertex_desc.with_label(format!("{label} vertices"));
        }
        let vertex_buffer = Buffer::create(backend, vertex_desc, Some(vertex_bytes))?;

        let index_buffer = match cpu.indices() {
            Some(indices) => {
                let bytes: &[u8] = bytemuck::cast_slice(indices);
                let mut index_desc = BufferDescriptor::index(bytes.len() as u64, Residency::Static);
                if let Some(label) = cpu.label() {
                    index_desc = index_desc.with_label(format!("{label} indices"));
                }
                Some(Buffer::create(backend, index_desc, Some(bytes))?)
            }
            None => None,
        };

        log::trace!(
            "Created mesh {} ({} vertices, {} elements)",
            name,
            cpu.vertex_count(),
            cpu.element_count()
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            element_count: cpu.element_count(),
            topology: cpu.topology(),
            layout,
            default_material: DEFAULT_SHADER_KEY.to_string(),
            label: cpu.label().map(str::to_string),
        })
    }

    /// Set the key of the material this mesh is drawn with by default.
    pub fn with_default_material(mut self, key: impl Into<String>) -> Self {
        self.default_material = key.into();
        self
    }

    /// Get the vertex buffer.
    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    /// Get the index buffer, if indexed.
    pub fn index_buffer(&self) -> Option<&Buffer> {
        self.index_buffer.as_ref()
    }

    /// Check if this mesh uses indexed rendering.
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    /// Number of indices if indexed, otherwise number of vertices.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// Get the primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Get the vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayoutDescriptor> {
        &self.layout
    }

    /// Key of the default material.
    pub fn default_material(&self) -> &str {
        &self.default_material
    }

    /// Get the mesh label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("element_count", &self.element_count)
            .field("indexed", &self.is_indexed())
            .field("topology", &self.topology)
            .field("stride", &self.layout.stride)
            .field("default_material", &self.default_material)
            .field("label", &self.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Mesh: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use tessera_core::color::Rgba8;
    use tessera_core::mesh::generators::{generate_cube, generate_quad};

    fn backend() -> (Arc<DummyBackend>, Arc<dyn GpuBackend>) {
        let dummy = Arc::new(DummyBackend::new());
        let backend: Arc<dyn GpuBackend> = dummy.clone();
        (dummy, backend)
    }

    #[test]
    fn test_indexed_cube() {
        let (dummy, backend) = backend();
        let cpu = generate_cube(0.5, Rgba8::WHITE);
        let mesh = Mesh::from_cpu(&backend, &cpu, VertexLayoutDescriptor::pcutbn()).unwrap();

        assert!(mesh.is_indexed());
        assert_eq!(mesh.element_count(), 36);
        assert_eq!(mesh.default_material(), "Default");
        assert_eq!(dummy.stats().buffers_created, 2);
    }

    #[test]
    fn test_stride_mismatch_is_mesh_error() {
        let (dummy, backend) = backend();
        let cpu = generate_quad(1.0, 1.0, Rgba8::WHITE);
        let err = Mesh::from_cpu(&backend, &cpu, VertexLayoutDescriptor::pcutbn()).unwrap_err();
        assert!(matches!(err, GraphicsError::MeshLoadFailed(_)));
        assert_eq!(dummy.stats().buffers_created, 0);
    }

    #[test]
    fn test_invalid_cpu_data() {
        let (_, backend) = backend();
        let cpu = CpuMesh::from_raw(vec![0u8; 10], 24);
        assert!(matches!(
            Mesh::from_cpu(&backend, &cpu, VertexLayoutDescriptor::pcu()),
            Err(GraphicsError::MeshLoadFailed(_))
        ));
    }
}
