//! Sampling and comparison enums shared between CPU and GPU code.
//!
//! [`FilterMode`] and [`AddressMode`] describe texture sampling;
//! [`CompareFunction`] is used both by depth testing and by comparison
//! samplers.

mod types;

pub use types::{AddressMode, CompareFunction, FilterMode};
