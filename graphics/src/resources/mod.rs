//! GPU resources.
//!
//! This module contains the resource types the context creates and binds:
//! - [`Buffer`] - GPU memory buffer, and [`DynamicBuffer`] which grows on demand
//! - [`Texture`] - GPU texture/image
//! - [`ShaderResourceView`], [`ColorTargetView`], [`DepthStencilTargetView`] -
//!   purpose-specific projections of a texture
//! - [`Sampler`] - Texture sampler
//!
//! Native handles are reference-counted with [`Arc`] and can be shared across
//! threads. A texture and its views hold the same handle.
//!
//! [`Arc`]: std::sync::Arc

mod buffer;
mod sampler;
mod texture;
mod view;

pub use buffer::{Buffer, DynamicBuffer};
pub use sampler::Sampler;
pub use texture::Texture;
pub use view::{ColorTargetView, DepthStencilTargetView, ShaderResourceView, TextureView};
