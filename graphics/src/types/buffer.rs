//! Buffer types and descriptors.

use bitflags::bitflags;

use super::Residency;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be bound as a vertex stream.
        const VERTEX = 1 << 0;
        /// Buffer can be bound as an index stream.
        const INDEX = 1 << 1;
        /// Buffer can be bound to a uniform slot.
        const UNIFORM = 1 << 2;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 3;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 4;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Size of one element in bytes (vertex size, index size, block size).
    pub stride: u32,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Memory residency.
    pub residency: Residency,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, stride: u32, usage: BufferUsage, residency: Residency) -> Self {
        Self {
            label: None,
            size,
            stride,
            usage,
            residency,
        }
    }

    /// Descriptor for a vertex buffer.
    pub fn vertex(size: u64, stride: u32, residency: Residency) -> Self {
        Self::new(size, stride, BufferUsage::VERTEX, residency)
    }

    /// Descriptor for a `u32` index buffer.
    pub fn index(size: u64, residency: Residency) -> Self {
        Self::new(size, 4, BufferUsage::INDEX, residency)
    }

    /// Descriptor for a uniform buffer; the whole block is one element.
    pub fn uniform(size: u64, residency: Residency) -> Self {
        Self::new(size, size.min(u32::MAX as u64) as u32, BufferUsage::UNIFORM, residency)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Number of whole elements the buffer holds.
    pub fn element_count(&self) -> u64 {
        if self.stride == 0 {
            0
        } else {
            self.size / self.stride as u64
        }
    }
}
