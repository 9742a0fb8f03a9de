//! Material system for the graphics engine.
//!
//! - [`Material`] - A shader with a complete set of texture, sampler and
//!   constant bindings
//! - [`MaterialDefinition`] - Key/value description resolved through the
//!   context's caches
//!
//! Materials share their shader, views and samplers through `Arc`, so many
//! materials can reference the same default textures.

mod definition;
mod material;

pub use definition::MaterialDefinition;
pub use material::{Material, MaterialBuilder, MaterialDefaults, StateOverrides, TextureSlot};
