//! Frame and camera lifecycle.

use std::sync::Arc;

use crate::backend::GpuBackend;
use crate::camera::{Camera, ColorClear};
use crate::error::GraphicsError;
use crate::resources::{
    ColorTargetView, DepthStencilTargetView, ShaderResourceView, Texture, TextureView,
};
use crate::screenshot::{ScreenshotRequest, readback_to_image};
use crate::types::{Extent2d, TextureFormat};
use crate::uniforms::{CAMERA_SLOT, EFFECT_SLOT, LIGHTING_SLOT, MODEL_SLOT, ModelUniform};

use super::{ContextState, GraphicsContext, Runtime};

/// Format of the default depth buffer.
pub const DEFAULT_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Render targets sized to the back buffer, rebuilt when it resizes.
#[derive(Clone)]
pub(super) struct FrameTargets {
    pub size: Extent2d,
    pub color: Arc<Texture>,
    pub color_target: ColorTargetView,
    pub color_input: ShaderResourceView,
    pub depth_target: DepthStencilTargetView,
    pub effect: Arc<Texture>,
    pub effect_target: ColorTargetView,
}

impl FrameTargets {
    fn new(
        backend: &Arc<dyn GpuBackend>,
        size: Extent2d,
        format: TextureFormat,
    ) -> Result<Self, GraphicsError> {
        let color = Arc::new(Texture::render_target(backend, size.width, size.height, format)?);
        let depth = Texture::render_target(backend, size.width, size.height, DEFAULT_DEPTH_FORMAT)?;
        let effect = Arc::new(Texture::render_target(backend, size.width, size.height, format)?);
        log::debug!(
            "Created frame targets {}x{} ({:?})",
            size.width,
            size.height,
            format
        );
        Ok(Self {
            size,
            color_target: color.create_color_target_view()?,
            color_input: color.create_shader_resource_view()?,
            depth_target: depth.create_depth_stencil_view()?,
            effect_target: effect.create_color_target_view()?,
            color,
            effect,
        })
    }
}

impl Runtime {
    /// Frame targets of the current frame.
    pub(super) fn frame_targets(&self) -> Result<&FrameTargets, GraphicsError> {
        self.targets
            .as_ref()
            .ok_or_else(|| GraphicsError::Internal("frame targets missing inside a frame".into()))
    }
}

impl GraphicsContext {
    /// Acquire the back buffer and start rendering into the intermediate
    /// color target.
    pub fn begin_frame(&mut self) -> Result<(), GraphicsError> {
        tessera_core::profile_scope!("begin_frame");
        self.expect_state(&[ContextState::Ready], "begin_frame")?;
        let Some(runtime) = self.runtime.as_mut() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };

        let back_buffer = runtime.backend.acquire_back_buffer()?;
        let size = runtime.backend.back_buffer_size();
        let format = runtime.backend.back_buffer_format();
        let stale = runtime
            .targets
            .as_ref()
            .is_none_or(|targets| targets.size != size || targets.color.format() != format);
        if stale {
            runtime.targets = Some(FrameTargets::new(&runtime.backend, size, format)?);
        }
        runtime.back_buffer = Some(ColorTargetView::back_buffer(back_buffer, format, size));
        runtime.bindings.reset();

        self.frame_index += 1;
        self.state = ContextState::InFrame;
        log::trace!("Frame {} begun ({}x{})", self.frame_index, size.width, size.height);
        Ok(())
    }

    /// Copy the intermediate target to the back buffer, present, and
    /// capture a screenshot if one was requested.
    pub fn end_frame(&mut self) -> Result<(), GraphicsError> {
        tessera_core::profile_scope!("end_frame");
        self.expect_state(&[ContextState::InFrame], "end_frame")?;
        self.state = ContextState::Ready;
        let capture = std::mem::take(&mut self.screenshot_requested);
        let Some(runtime) = self.runtime.as_mut() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };

        runtime.bindings.reset();
        let back_buffer = runtime
            .back_buffer
            .take()
            .ok_or_else(|| GraphicsError::Internal("back buffer missing inside a frame".into()))?;
        let targets = runtime.frame_targets()?;
        runtime.backend.copy_texture(
            targets.color.gpu_handle(),
            back_buffer.resource(),
            targets.size,
        )?;
        runtime.backend.present()?;
        log::trace!("Frame {} presented", self.frame_index);

        if capture {
            self.capture_screenshot()?;
        }
        tessera_core::frame_mark!();
        Ok(())
    }

    fn capture_screenshot(&mut self) -> Result<(), GraphicsError> {
        let Some(dispatcher) = self.dispatcher.clone() else {
            log::warn!(
                "Screenshot of frame {} requested with no dispatcher set",
                self.frame_index
            );
            return Ok(());
        };
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };
        let targets = runtime.frame_targets()?;
        let size = targets.size;

        let staging =
            Texture::staging(&runtime.backend, size.width, size.height, targets.color.format())?;
        runtime
            .backend
            .copy_texture(targets.color.gpu_handle(), staging.gpu_handle(), size)?;
        let bytes = staging.read_back()?;
        let image = readback_to_image(bytes, staging.descriptor())?;
        log::debug!("Captured screenshot of frame {}", self.frame_index);
        dispatcher.dispatch(ScreenshotRequest::new(self.frame_index, staging, image));
        Ok(())
    }

    /// Capture the current frame at `end_frame`.
    ///
    /// Requests within one frame collapse into one capture.
    pub fn request_screenshot(&mut self) -> Result<(), GraphicsError> {
        self.started_mut("request_screenshot")?;
        self.screenshot_requested = true;
        Ok(())
    }

    /// Whether a screenshot will be captured at the next `end_frame`.
    pub fn screenshot_pending(&self) -> bool {
        self.screenshot_requested
    }

    /// Bind the camera's targets and uniforms and apply its clear policy.
    ///
    /// Cameras without their own targets render into the intermediate
    /// color target and the default depth buffer. Lighting and effect
    /// settings are uploaded here, so changes made between two cameras
    /// are seen only by the second.
    pub fn begin_camera(&mut self, camera: &mut Camera) -> Result<(), GraphicsError> {
        tessera_core::profile_scope!("begin_camera");
        self.expect_state(&[ContextState::InFrame], "begin_camera")?;
        let default_clear = self.params.clear_color;
        let lighting = self.lighting.to_uniform();
        let effects = self.effects.to_uniform();
        let Some(runtime) = self.runtime.as_mut() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };
        let targets = runtime.frame_targets()?;

        let color = camera
            .color_target()
            .cloned()
            .unwrap_or_else(|| targets.color_target.clone());
        let depth = match camera.depth_target() {
            Some(depth) => Some(depth.clone()),
            None if targets.depth_target.size() == color.size() => {
                Some(targets.depth_target.clone())
            }
            None => {
                log::debug!("Camera target size differs from the default depth buffer, depth disabled");
                None
            }
        };

        let clear = *camera.clear_policy();
        let clear_color = match clear.color {
            ColorClear::None => None,
            ColorClear::Default => Some(default_clear),
            ColorClear::Color(color) => Some(color),
        };
        if let Some(clear_color) = clear_color {
            runtime.backend.clear_color(color.resource(), clear_color)?;
        }
        if let (Some(value), Some(depth)) = (clear.depth, &depth) {
            runtime.backend.clear_depth(depth.resource(), value)?;
        }

        let camera_buffer = camera.refresh_uniform_buffer(&runtime.backend)?;
        let uniforms = &runtime.uniforms;
        uniforms
            .model
            .copy_cpu_to_gpu(bytemuck::bytes_of(&ModelUniform::default()))?;
        uniforms.lighting.copy_cpu_to_gpu(bytemuck::bytes_of(&lighting))?;
        uniforms.effect.copy_cpu_to_gpu(bytemuck::bytes_of(&effects))?;

        let viewport = camera.pixel_viewport(color.size());
        let bindings = &mut runtime.bindings;
        bindings.set_targets(color, depth, viewport);
        bindings.set_uniform(CAMERA_SLOT, &camera_buffer);
        bindings.set_uniform(MODEL_SLOT, &uniforms.model);
        bindings.set_uniform(LIGHTING_SLOT, &uniforms.lighting);
        bindings.set_uniform(EFFECT_SLOT, &uniforms.effect);

        self.state = ContextState::InCamera;
        Ok(())
    }

    /// Unbind the camera's targets.
    pub fn end_camera(&mut self, camera: &Camera) -> Result<(), GraphicsError> {
        self.expect_state(&[ContextState::InCamera], "end_camera")?;
        if let Some(runtime) = self.runtime.as_mut() {
            if let (Some(expected), Some(bound)) =
                (camera.color_target(), runtime.bindings.color_target())
                && !expected.shares_resource_with(bound)
            {
                log::warn!("end_camera called with a camera other than the one begun");
            }
            runtime.bindings.reset();
        }
        self.state = ContextState::InFrame;
        Ok(())
    }

    /// Resize the back buffer. Frame targets follow at the next
    /// `begin_frame`.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GraphicsError> {
        self.expect_state(&[ContextState::Ready], "resize")?;
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(GraphicsError::Internal("context started without a runtime".into()));
        };
        log::info!("Resizing back buffer to {}x{}", width, height);
        runtime.backend.resize(width, height)
    }

    /// Size of the back buffer, once started.
    pub fn back_buffer_size(&self) -> Option<Extent2d> {
        self.backend().map(|backend| backend.back_buffer_size())
    }

    /// The intermediate color target of the current frame, for sampling
    /// in later passes.
    pub fn intermediate_view(&self) -> Option<&ShaderResourceView> {
        self.runtime
            .as_ref()
            .and_then(|runtime| runtime.targets.as_ref())
            .map(|targets| &targets.color_input)
    }
}
