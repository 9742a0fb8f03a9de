//! # Tessera Core
//!
//! GPU-agnostic data shared between the Tessera graphics layer and its
//! callers: math aliases, colors, CPU images, CPU meshes and sampler enums.

pub mod color;
pub mod image;
pub mod math;
pub mod mesh;
pub mod profiling;
pub mod sampler;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Tessera Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
