//! Common utilities for graphics integration tests.
//!
//! Every test runs against the counting dummy backend unless it asks for a
//! real adapter through [`TestContext::wgpu`].

#![allow(dead_code)]

use std::sync::Arc;

use rstest::fixture;
use tessera_core::color::Rgba8;
use tessera_core::mesh::generators::generate_cube;
use tessera_graphics::backend::{GpuStateObject, GpuTexture};
use tessera_graphics::{
    ContextParameters, DummyBackend, DummyStats, GpuBackend, GraphicsContext, Mesh, TextureView,
    VertexLayoutDescriptor,
};

/// Back buffer size used by the fixtures.
pub const TEST_WIDTH: u32 = 64;
pub const TEST_HEIGHT: u32 = 48;

/// A started context plus the backend it runs on.
pub struct TestContext {
    pub context: GraphicsContext,
    pub dummy: Option<Arc<DummyBackend>>,
}

impl TestContext {
    /// Unstarted context on a fresh dummy backend.
    pub fn unstarted() -> Self {
        let dummy = Arc::new(DummyBackend::with_back_buffer(TEST_WIDTH, TEST_HEIGHT));
        let context = GraphicsContext::with_backend(
            ContextParameters::new().with_size(TEST_WIDTH, TEST_HEIGHT),
            dummy.clone(),
        );
        Self {
            context,
            dummy: Some(dummy),
        }
    }

    /// Started context on a fresh dummy backend.
    pub fn dummy() -> Self {
        let mut ctx = Self::unstarted();
        ctx.context.startup().expect("dummy startup");
        ctx
    }

    /// Started context on a headless wgpu backend, or `None` when no adapter
    /// is available.
    #[cfg(feature = "wgpu-backend")]
    pub fn wgpu() -> Option<Self> {
        let params = ContextParameters::new().with_size(TEST_WIDTH, TEST_HEIGHT);
        let backend = match tessera_graphics::backend::wgpu_impl::WgpuBackend::headless(&params) {
            Ok(backend) => backend,
            Err(e) => {
                eprintln!("wgpu backend unavailable, skipping: {e}");
                return None;
            }
        };
        let mut context = GraphicsContext::with_backend(params, Arc::new(backend));
        context.startup().expect("wgpu startup");
        Some(Self {
            context,
            dummy: None,
        })
    }

    /// Counters of the dummy backend.
    pub fn stats(&self) -> DummyStats {
        self.dummy
            .as_ref()
            .expect("stats require the dummy backend")
            .stats()
    }

    /// The dummy backend.
    pub fn backend(&self) -> &Arc<DummyBackend> {
        self.dummy.as_ref().expect("not a dummy context")
    }

    /// The started backend as a trait object.
    pub fn gpu(&self) -> Arc<dyn GpuBackend> {
        Arc::clone(self.context.backend().expect("context not started"))
    }

    /// A cached unit cube in the full PCUTBN layout.
    pub fn cube(&mut self) -> Arc<Mesh> {
        self.context
            .create_or_get_mesh("test-cube", || {
                Ok((generate_cube(0.5, Rgba8::WHITE), VertexLayoutDescriptor::pcutbn()))
            })
            .expect("cube mesh")
    }
}

/// A started dummy context.
#[fixture]
pub fn ctx() -> TestContext {
    let _ = env_logger::builder().is_test(true).try_init();
    TestContext::dummy()
}

/// Token id of a dummy texture handle.
pub fn texture_token(view: &impl TextureView) -> Option<u64> {
    match view.resource().as_ref() {
        GpuTexture::Dummy(handle) => Some(handle.id()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Token id of a dummy state object.
pub fn state_token(state: &GpuStateObject) -> Option<u64> {
    match state {
        GpuStateObject::Dummy(handle) => Some(handle.id()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}
