//! Mesh types for the graphics engine.
//!
//! This module provides mesh data structures for rendering:
//!
//! - [`VertexLayoutDescriptor`] - Describes vertex attributes (shared via `Arc`)
//! - [`Mesh`] - GPU mesh with vertex/index buffers and draw metadata
//!
//! # Efficient Sharing via Arc
//!
//! Vertex layouts are wrapped in `Arc` since there are typically only a few
//! layout combinations across many meshes. Each shader keys its input-layout
//! cache by layout value, so meshes sharing a layout share one input layout.

mod data;
mod layout;

pub use data::Mesh;
pub use layout::{
    VertexAttributeDescriptor, VertexAttributeFormat, VertexLayoutDescriptor, semantic_location,
};

// Re-export CPU-side types from core
pub use tessera_core::mesh::{CpuMesh, PrimitiveTopology, VertexPcu, VertexPcutbn, generators};
