//! Graphics error types.
//!
//! Errors come in two tiers. Fatal errors ([`GraphicsError::is_fatal`])
//! describe resources that later draws structurally depend on: a shader that
//! does not compile, a mesh that cannot be built, a vertex layout that does
//! not match. Everything else is either recoverable by the caller or a
//! lifecycle misuse reported without touching the device.

use std::fmt;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    InitializationFailed(String),
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// Shader source failed to parse, validate, or expose its entry points.
    ShaderCompilationFailed(String),
    /// A vertex layout is malformed or does not satisfy a shader's inputs.
    InvalidVertexLayout(String),
    /// Mesh data could not be loaded or built.
    MeshLoadFailed(String),
    /// A material definition is malformed or references a missing shader.
    MaterialLoadFailed(String),
    /// A copy exceeded the capacity of a non-growable buffer.
    BufferOverflow {
        /// Bytes requested.
        requested: u64,
        /// Bytes available.
        capacity: u64,
    },
    /// The operation is not allowed for the resource's residency.
    ResidencyViolation(String),
    /// The operation is not valid in the context's current state.
    InvalidState(String),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// The GPU device was lost.
    DeviceLost,
    /// The surface is outdated and needs to be reconfigured.
    SurfaceOutdated,
    /// The surface was lost and needs to be recreated.
    SurfaceLost,
    /// An internal error occurred.
    Internal(String),
}

impl GraphicsError {
    /// Whether this error leaves a structurally required resource missing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InitializationFailed(_)
                | Self::ResourceCreationFailed(_)
                | Self::ShaderCompilationFailed(_)
                | Self::InvalidVertexLayout(_)
                | Self::MeshLoadFailed(_)
                | Self::MaterialLoadFailed(_)
                | Self::OutOfMemory
                | Self::DeviceLost
        )
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::ShaderCompilationFailed(msg) => write!(f, "shader compilation failed: {msg}"),
            Self::InvalidVertexLayout(msg) => write!(f, "invalid vertex layout: {msg}"),
            Self::MeshLoadFailed(msg) => write!(f, "mesh load failed: {msg}"),
            Self::MaterialLoadFailed(msg) => write!(f, "material load failed: {msg}"),
            Self::BufferOverflow {
                requested,
                capacity,
            } => write!(
                f,
                "buffer overflow: {requested} bytes requested, capacity is {capacity}"
            ),
            Self::ResidencyViolation(msg) => write!(f, "residency violation: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::SurfaceOutdated => write!(f, "surface outdated, needs reconfiguration"),
            Self::SurfaceLost => write!(f, "surface lost, needs recreation"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::BufferOverflow {
            requested: 80,
            capacity: 64,
        };
        assert_eq!(
            err.to_string(),
            "buffer overflow: 80 bytes requested, capacity is 64"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(GraphicsError::ShaderCompilationFailed("x".into()).is_fatal());
        assert!(GraphicsError::InvalidVertexLayout("x".into()).is_fatal());
        assert!(!GraphicsError::InvalidState("x".into()).is_fatal());
        assert!(
            !GraphicsError::BufferOverflow {
                requested: 1,
                capacity: 0
            }
            .is_fatal()
        );
    }
}
