//! The graphics context.
//!
//! [`GraphicsContext`] is the single entry point for creating, caching,
//! binding and drawing GPU resources. It owns the backend, the per-frame
//! render targets, every resource cache and the current bind state.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --startup--> Ready --begin_frame--> InFrame --begin_camera--> InCamera
//!       ^                      |  <--end_frame--      |     <--end_camera--
//!       +------shutdown--------+                      +--apply_effect
//! ```
//!
//! Calls made in the wrong state return [`GraphicsError::InvalidState`]
//! and never reach the backend.
//!
//! # Example
//!
//! ```ignore
//! let mut context = GraphicsContext::new(ContextParameters::new());
//! context.startup()?;
//!
//! let material = context.create_or_get_material("Default")?;
//! let cube = context.create_or_get_mesh("cube", || {
//!     Ok((generate_cube(0.5, Rgba8::WHITE), VertexLayoutDescriptor::pcutbn()))
//! })?;
//!
//! context.begin_frame()?;
//! context.begin_camera(&mut camera)?;
//! context.bind_material(&material)?;
//! context.draw_mesh(&cube)?;
//! context.end_camera(&camera)?;
//! context.end_frame()?;
//! ```

mod binding;
mod effect;
mod frame;
mod resources;

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{GpuBackend, create_backend};
use crate::cache::ResourceCache;
use crate::config::ContextParameters;
use crate::error::GraphicsError;
use crate::font::BitmapFont;
use crate::materials::{Material, MaterialDefaults, MaterialDefinition};
use crate::mesh::Mesh;
use crate::resources::{Buffer, ColorTargetView, Texture};
use crate::screenshot::ScreenshotDispatcher;
use crate::shader::Shader;
use crate::uniforms::{EffectSettings, LightingSettings};

pub use frame::DEFAULT_DEPTH_FORMAT;
pub use resources::DEFAULT_MATERIAL_KEY;

use binding::BindState;
use frame::FrameTargets;

/// Where the context is in its frame lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// Not started, or shut down. Nothing touches the backend.
    Uninitialized,
    /// Started, between frames.
    Ready,
    /// Between `begin_frame` and `end_frame`, outside any camera.
    InFrame,
    /// Between `begin_camera` and `end_camera`.
    InCamera,
}

impl std::fmt::Display for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Ready => "Ready",
            Self::InFrame => "InFrame",
            Self::InCamera => "InCamera",
        };
        f.write_str(name)
    }
}

/// Context-owned uniform buffers rebound at every `begin_camera`.
struct ContextUniforms {
    model: Buffer,
    lighting: Buffer,
    effect: Buffer,
    identity_camera: Buffer,
}

/// Everything that exists only between `startup` and `shutdown`.
struct Runtime {
    backend: Arc<dyn GpuBackend>,
    textures: ResourceCache<Texture>,
    shaders: ResourceCache<Shader>,
    materials: ResourceCache<Material>,
    meshes: ResourceCache<Mesh>,
    fonts: ResourceCache<BitmapFont>,
    definitions: HashMap<String, MaterialDefinition>,
    white: Arc<Texture>,
    defaults: MaterialDefaults,
    uniforms: ContextUniforms,
    fullscreen: Mesh,
    targets: Option<FrameTargets>,
    back_buffer: Option<ColorTargetView>,
    bindings: BindState,
}

/// Owns the backend, resource caches, frame targets and bind state.
pub struct GraphicsContext {
    params: ContextParameters,
    injected_backend: Option<Arc<dyn GpuBackend>>,
    state: ContextState,
    runtime: Option<Runtime>,
    lighting: LightingSettings,
    effects: EffectSettings,
    dispatcher: Option<Arc<dyn ScreenshotDispatcher>>,
    screenshot_requested: bool,
    frame_index: u64,
}

impl GraphicsContext {
    /// Create an unstarted context. The backend is chosen at
    /// [`startup`](Self::startup) from `params.backend`.
    pub fn new(params: ContextParameters) -> Self {
        Self {
            params,
            injected_backend: None,
            state: ContextState::Uninitialized,
            runtime: None,
            lighting: LightingSettings::default(),
            effects: EffectSettings::default(),
            dispatcher: None,
            screenshot_requested: false,
            frame_index: 0,
        }
    }

    /// Create an unstarted context that will run on `backend`.
    ///
    /// The backend is not touched until [`startup`](Self::startup).
    pub fn with_backend(params: ContextParameters, backend: Arc<dyn GpuBackend>) -> Self {
        Self {
            injected_backend: Some(backend),
            ..Self::new(params)
        }
    }

    /// Create the backend (unless one was injected), the engine defaults
    /// and the context uniform buffers.
    pub fn startup(&mut self) -> Result<(), GraphicsError> {
        self.expect_state(&[ContextState::Uninitialized], "startup")?;

        let backend = match &self.injected_backend {
            Some(backend) => Arc::clone(backend),
            None => create_backend(&self.params)?,
        };
        let runtime = Runtime::new(backend).inspect_err(|e| {
            log::error!("Graphics context startup failed: {}", e);
        })?;
        log::info!(
            "Graphics context started on {} backend ({}x{})",
            runtime.backend.name(),
            self.params.width,
            self.params.height
        );

        self.runtime = Some(runtime);
        self.lighting = LightingSettings::default();
        self.effects = EffectSettings::default();
        self.screenshot_requested = false;
        self.frame_index = 0;
        self.state = ContextState::Ready;
        Ok(())
    }

    /// Drop every cache, target and binding and return to `Uninitialized`.
    ///
    /// Only valid between frames.
    pub fn shutdown(&mut self) -> Result<(), GraphicsError> {
        self.expect_state(&[ContextState::Ready], "shutdown")?;
        if let Some(runtime) = self.runtime.take() {
            log::info!(
                "Graphics context shutting down ({} textures, {} shaders, {} materials, {} meshes cached)",
                runtime.textures.len(),
                runtime.shaders.len(),
                runtime.materials.len(),
                runtime.meshes.len()
            );
        }
        self.lighting = LightingSettings::default();
        self.effects = EffectSettings::default();
        self.screenshot_requested = false;
        self.state = ContextState::Uninitialized;
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Parameters the context was created with.
    pub fn parameters(&self) -> &ContextParameters {
        &self.params
    }

    /// The running backend, once started.
    pub fn backend(&self) -> Option<&Arc<dyn GpuBackend>> {
        self.runtime.as_ref().map(|runtime| &runtime.backend)
    }

    /// Engine default textures and sampler, once started.
    pub fn material_defaults(&self) -> Option<&MaterialDefaults> {
        self.runtime.as_ref().map(|runtime| &runtime.defaults)
    }

    /// Number of frames begun since startup.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn lighting(&self) -> &LightingSettings {
        &self.lighting
    }

    /// Lighting uploaded at the next `begin_camera`.
    pub fn lighting_mut(&mut self) -> &mut LightingSettings {
        &mut self.lighting
    }

    pub fn effects(&self) -> &EffectSettings {
        &self.effects
    }

    /// Effect parameters uploaded at the next `begin_camera` or
    /// `apply_effect`.
    pub fn effects_mut(&mut self) -> &mut EffectSettings {
        &mut self.effects
    }

    /// Set where captured screenshots are delivered.
    pub fn set_screenshot_dispatcher(&mut self, dispatcher: Arc<dyn ScreenshotDispatcher>) {
        self.dispatcher = Some(dispatcher);
    }

    fn expect_state(&self, allowed: &[ContextState], operation: &str) -> Result<(), GraphicsError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            log::warn!("{} called in state {}", operation, self.state);
            Err(GraphicsError::InvalidState(format!(
                "{operation} is not valid in state {}",
                self.state
            )))
        }
    }

    /// The runtime, for any state after startup.
    fn started_mut(&mut self, operation: &str) -> Result<&mut Runtime, GraphicsError> {
        self.expect_state(
            &[
                ContextState::Ready,
                ContextState::InFrame,
                ContextState::InCamera,
            ],
            operation,
        )?;
        self.runtime
            .as_mut()
            .ok_or_else(|| GraphicsError::Internal("context started without a runtime".into()))
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("state", &self.state)
            .field("backend", &self.backend().map(|backend| backend.name()))
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    fn dummy_context() -> (GraphicsContext, Arc<DummyBackend>) {
        let dummy = Arc::new(DummyBackend::with_back_buffer(64, 32));
        let context = GraphicsContext::with_backend(ContextParameters::new(), dummy.clone());
        (context, dummy)
    }

    #[test]
    fn test_startup_and_shutdown() {
        let (mut context, dummy) = dummy_context();
        assert_eq!(context.state(), ContextState::Uninitialized);
        assert!(context.backend().is_none());

        context.startup().unwrap();
        assert_eq!(context.state(), ContextState::Ready);
        assert_eq!(context.backend().unwrap().name(), "Dummy Backend");
        assert!(context.material_defaults().is_some());
        assert!(dummy.stats().textures_created > 0);

        context.shutdown().unwrap();
        assert_eq!(context.state(), ContextState::Uninitialized);
        assert!(context.material_defaults().is_none());
        let stats = dummy.stats();
        assert_eq!(stats.textures_created, stats.textures_released);
        assert_eq!(stats.buffers_created, stats.buffers_released);
    }

    #[test]
    fn test_double_startup_is_invalid() {
        let (mut context, _dummy) = dummy_context();
        context.startup().unwrap();
        assert!(matches!(
            context.startup(),
            Err(GraphicsError::InvalidState(_))
        ));
    }

    #[test]
    fn test_shutdown_requires_ready() {
        let (mut context, _dummy) = dummy_context();
        assert!(matches!(
            context.shutdown(),
            Err(GraphicsError::InvalidState(_))
        ));
        context.startup().unwrap();
        context.begin_frame().unwrap();
        assert!(matches!(
            context.shutdown(),
            Err(GraphicsError::InvalidState(_))
        ));
    }

    #[test]
    fn test_settings_reset_at_startup() {
        let (mut context, _dummy) = dummy_context();
        context.effects_mut().set(0, 2.0);
        context.startup().unwrap();
        assert_eq!(context.effects().get(0), Some(0.0));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ContextState::InCamera.to_string(), "InCamera");
    }
}
