//! GPU sampler resource.

use std::sync::Arc;

use crate::backend::{GpuBackend, GpuSampler};
use crate::error::GraphicsError;
use crate::types::SamplerDescriptor;

/// A GPU texture sampler.
///
/// Cheap to clone; clones share the native sampler.
///
/// # Example
///
/// ```ignore
/// let sampler = Sampler::create(&backend, SamplerDescriptor::point_clamp())?;
/// ```
#[derive(Clone)]
pub struct Sampler {
    descriptor: SamplerDescriptor,
    handle: Arc<GpuSampler>,
}

impl Sampler {
    /// Create a sampler.
    pub fn create(
        backend: &Arc<dyn GpuBackend>,
        descriptor: SamplerDescriptor,
    ) -> Result<Self, GraphicsError> {
        let handle = backend.create_sampler(&descriptor)?;
        Ok(Self {
            descriptor,
            handle: Arc::new(handle),
        })
    }

    /// The linear-filtering, repeating sampler materials fall back to.
    pub fn linear_wrap(backend: &Arc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        Self::create(
            backend,
            SamplerDescriptor::linear_wrap().with_label("linear_wrap"),
        )
    }

    /// Get the sampler descriptor.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// Get the sampler label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Get the native handle.
    pub fn gpu_handle(&self) -> &Arc<GpuSampler> {
        &self.handle
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("filter", &self.descriptor.filter)
            .field("address", &self.descriptor.address)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Sampler: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::types::AddressMode;

    #[test]
    fn test_linear_wrap() {
        let dummy = Arc::new(DummyBackend::new());
        let backend: Arc<dyn GpuBackend> = dummy.clone();
        let sampler = Sampler::linear_wrap(&backend).unwrap();
        assert_eq!(sampler.label(), Some("linear_wrap"));
        assert_eq!(sampler.descriptor().address, AddressMode::Repeat);

        let debug = format!("{:?}", sampler);
        assert!(debug.contains("Linear"));
        assert_eq!(dummy.stats().samplers_created, 1);
    }
}
