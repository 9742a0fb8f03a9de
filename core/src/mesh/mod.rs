//! CPU-side mesh types and generators.
//!
//! This module provides GPU-agnostic mesh data:
//!
//! - [`CpuMesh`] - Raw vertex bytes, optional `u32` indices and topology
//! - [`VertexPcu`] / [`VertexPcutbn`] - Standard vertex structures
//! - Generators for common shapes (quad, cube, full-screen triangle)
//!
//! The graphics layer pairs a [`CpuMesh`] with a vertex layout descriptor
//! to build a GPU mesh; nothing here knows how vertices will be consumed.

mod data;
pub mod generators;
mod vertex;

pub use data::{CpuMesh, MeshDataError, PrimitiveTopology};
pub use vertex::{VertexPcu, VertexPcutbn};
