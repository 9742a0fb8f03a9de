//! Camera: view and projection transforms, render targets and clear policy.

use std::sync::Arc;

use tessera_core::math::{
    Mat4, Ray3, Vec2, Vec3, orthographic_rh, perspective_rh, transform_point_projective,
};

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::resources::{Buffer, ColorTargetView, DepthStencilTargetView};
use crate::types::{BufferDescriptor, Extent2d, Residency, Viewport};
use crate::uniforms::CameraUniform;

/// Camera projection type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        min: Vec2,
        max: Vec2,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_degrees,
                aspect,
                near,
                far,
            } => perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                min,
                max,
                near,
                far,
            } => orthographic_rh(min.x, max.x, min.y, max.y, near, far),
        }
    }
}

/// How the color target is cleared at `begin_camera`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ColorClear {
    /// Keep the existing contents.
    None,
    /// Clear to the context's default clear color.
    #[default]
    Default,
    /// Clear to a specific color.
    Color([f32; 4]),
}

/// What `begin_camera` clears before any draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearPolicy {
    pub color: ColorClear,
    /// Depth to clear to, or `None` to keep the depth buffer.
    pub depth: Option<f32>,
}

impl ClearPolicy {
    /// Clear nothing; used for overlays drawn over an earlier camera.
    pub fn none() -> Self {
        Self {
            color: ColorClear::None,
            depth: None,
        }
    }
}

impl Default for ClearPolicy {
    fn default() -> Self {
        Self {
            color: ColorClear::Default,
            depth: Some(1.0),
        }
    }
}

/// A per-view bundle of transforms, targets and clear policy.
///
/// The view matrix is always the inverse of the placement ("model") matrix.
/// Without explicit targets the camera renders into the context's
/// intermediate color target and default depth buffer.
///
/// # Example
///
/// ```ignore
/// let mut camera = Camera::new();
/// camera.set_perspective_projection(60.0, 16.0 / 9.0, 0.1, 100.0);
/// camera.set_model_matrix(placement_looking_at(&eye, &Vec3::zeros(), &Vec3::y()));
/// context.begin_camera(&mut camera)?;
/// ```
#[derive(Debug)]
pub struct Camera {
    placement: Mat4,
    view: Mat4,
    projection: Projection,
    color_target: Option<ColorTargetView>,
    depth_target: Option<DepthStencilTargetView>,
    clear: ClearPolicy,
    viewport: Viewport,
    uniform_buffer: Option<Arc<Buffer>>,
}

impl Camera {
    /// A camera at the origin looking down -Z with the default perspective.
    pub fn new() -> Self {
        Self {
            placement: Mat4::identity(),
            view: Mat4::identity(),
            projection: Projection::default(),
            color_target: None,
            depth_target: None,
            clear: ClearPolicy::default(),
            viewport: Viewport::default(),
            uniform_buffer: None,
        }
    }

    /// Orthographic projection over `min..max` with depth range `0..1`.
    pub fn set_ortho_view(&mut self, min: Vec2, max: Vec2) {
        self.set_orthographic_projection(min, max, 0.0, 1.0);
    }

    /// Orthographic projection over `min..max` and `near..far`.
    pub fn set_orthographic_projection(&mut self, min: Vec2, max: Vec2, near: f32, far: f32) {
        self.projection = Projection::Orthographic { min, max, near, far };
    }

    /// Perspective projection with a vertical field of view in degrees.
    pub fn set_perspective_projection(
        &mut self,
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Projection::Perspective {
            fov_y_degrees,
            aspect,
            near,
            far,
        };
    }

    /// Update the aspect ratio of a perspective projection.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = &mut self.projection {
            *a = aspect;
        }
    }

    /// Vertical field of view, for perspective projections.
    pub fn fov_degrees(&self) -> Option<f32> {
        match self.projection {
            Projection::Perspective { fov_y_degrees, .. } => Some(fov_y_degrees),
            Projection::Orthographic { .. } => None,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Place the camera in the world. The view becomes the inverse of `placement`.
    ///
    /// A singular matrix is rejected with a warning and the previous
    /// placement and view are kept.
    pub fn set_model_matrix(&mut self, placement: Mat4) {
        match placement.try_inverse() {
            Some(view) => {
                self.placement = placement;
                self.view = view;
            }
            None => log::warn!("Camera placement matrix is singular, keeping previous view"),
        }
    }

    /// Placement (camera-to-world) matrix.
    pub fn model_matrix(&self) -> &Mat4 {
        &self.placement
    }

    /// View (world-to-camera) matrix.
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view
    }

    /// Camera position in world space.
    pub fn position(&self) -> Vec3 {
        self.placement.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Unproject a pixel into a world-space ray.
    ///
    /// `pixel` has its origin at the top-left of a client area of
    /// `client_size` pixels; the camera viewport maps into that area. The
    /// ray starts on the near plane. Returns `None` for an empty client area
    /// or a singular view-projection.
    pub fn screen_point_to_world_ray(&self, pixel: Vec2, client_size: Vec2) -> Option<Ray3> {
        let width = self.viewport.width * client_size.x;
        let height = self.viewport.height * client_size.y;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let local_x = pixel.x - self.viewport.x * client_size.x;
        let local_y = pixel.y - self.viewport.y * client_size.y;
        let ndc_x = 2.0 * local_x / width - 1.0;
        let ndc_y = 1.0 - 2.0 * local_y / height;

        let inverse = self.view_projection_matrix().try_inverse()?;
        let near = transform_point_projective(&inverse, &Vec3::new(ndc_x, ndc_y, 0.0))?;
        let far = transform_point_projective(&inverse, &Vec3::new(ndc_x, ndc_y, 1.0))?;
        Ray3::new(near, far - near)
    }

    /// Render into `target` instead of the context's intermediate target.
    pub fn set_color_target(&mut self, target: Option<ColorTargetView>) {
        self.color_target = target;
    }

    /// Test against `target` instead of the context's default depth buffer.
    pub fn set_depth_target(&mut self, target: Option<DepthStencilTargetView>) {
        self.depth_target = target;
    }

    pub fn color_target(&self) -> Option<&ColorTargetView> {
        self.color_target.as_ref()
    }

    pub fn depth_target(&self) -> Option<&DepthStencilTargetView> {
        self.depth_target.as_ref()
    }

    pub fn set_clear_policy(&mut self, clear: ClearPolicy) {
        self.clear = clear;
    }

    pub fn clear_policy(&self) -> &ClearPolicy {
        &self.clear
    }

    /// Set the viewport in normalized `[0, 1]` target coordinates.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Viewport in normalized target coordinates.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Viewport scaled to a target of `size` pixels.
    pub fn pixel_viewport(&self, size: Extent2d) -> Viewport {
        let w = size.width as f32;
        let h = size.height as f32;
        Viewport {
            x: self.viewport.x * w,
            y: self.viewport.y * h,
            width: self.viewport.width * w,
            height: self.viewport.height * h,
            min_depth: self.viewport.min_depth,
            max_depth: self.viewport.max_depth,
        }
    }

    /// Uniform block for the current matrices.
    pub fn uniform(&self) -> CameraUniform {
        CameraUniform::new(&self.view, &self.projection_matrix(), &self.position())
    }

    /// Upload the current uniform block, creating the buffer on first use.
    pub(crate) fn refresh_uniform_buffer(
        &mut self,
        backend: &Arc<dyn GpuBackend>,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        let uniform = self.uniform();
        let bytes = bytemuck::bytes_of(&uniform);
        match &self.uniform_buffer {
            Some(buffer) => buffer.copy_cpu_to_gpu(bytes)?,
            None => {
                let descriptor =
                    BufferDescriptor::uniform(bytes.len() as u64, Residency::Dynamic)
                        .with_label("camera uniforms");
                self.uniform_buffer = Some(Arc::new(Buffer::create(
                    backend,
                    descriptor,
                    Some(bytes),
                )?));
            }
        }
        self.uniform_buffer
            .clone()
            .ok_or_else(|| GraphicsError::Internal("camera uniform buffer missing".into()))
    }

    /// The uniform buffer, once a `begin_camera` has created it.
    pub fn uniform_buffer(&self) -> Option<&Arc<Buffer>> {
        self.uniform_buffer.as_ref()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use tessera_core::math::{mat4_from_translation, placement_looking_at};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_view_is_inverse_of_placement() {
        let mut camera = Camera::new();
        camera.set_model_matrix(mat4_from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let product = camera.model_matrix() * camera.view_matrix();
        assert!((product - Mat4::identity()).norm() < 1e-5);
        assert_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_singular_placement_keeps_view() {
        let mut camera = Camera::new();
        camera.set_model_matrix(mat4_from_translation(Vec3::new(0.0, 0.0, 5.0)));
        let before = *camera.view_matrix();
        camera.set_model_matrix(Mat4::zeros());
        assert_eq!(*camera.view_matrix(), before);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(90.0, 1.0, 0.1, 100.0);
        camera.set_model_matrix(placement_looking_at(
            &Vec3::new(0.0, 0.0, 5.0),
            &Vec3::zeros(),
            &Vec3::y(),
        ));

        let ray = camera
            .screen_point_to_world_ray(Vec2::new(50.0, 50.0), Vec2::new(100.0, 100.0))
            .unwrap();
        assert!(approx(ray.direction.z, -1.0));
        assert!(approx(ray.origin.z, 4.9));
    }

    #[test]
    fn test_ortho_ray_corners() {
        let mut camera = Camera::new();
        camera.set_ortho_view(Vec2::new(0.0, 0.0), Vec2::new(200.0, 100.0));
        let ray = camera
            .screen_point_to_world_ray(Vec2::new(0.0, 0.0), Vec2::new(200.0, 100.0))
            .unwrap();
        // Top-left pixel maps to (min.x, max.y)
        assert!(approx(ray.origin.x, 0.0));
        assert!(approx(ray.origin.y, 100.0));
        assert!(approx(ray.direction.z, -1.0));
    }

    #[test]
    fn test_ray_empty_client_area() {
        let camera = Camera::new();
        assert!(
            camera
                .screen_point_to_world_ray(Vec2::new(1.0, 1.0), Vec2::zeros())
                .is_none()
        );
    }

    #[test]
    fn test_pixel_viewport() {
        let mut camera = Camera::new();
        camera.set_viewport(Viewport::new(0.5, 0.0, 0.5, 1.0));
        let vp = camera.pixel_viewport(Extent2d::new(800, 600));
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (400.0, 0.0, 400.0, 600.0));
    }

    #[test]
    fn test_uniform_buffer_created_once() {
        let dummy = Arc::new(DummyBackend::new());
        let backend: Arc<dyn GpuBackend> = dummy.clone();
        let mut camera = Camera::new();
        let first = camera.refresh_uniform_buffer(&backend).unwrap();
        let second = camera.refresh_uniform_buffer(&backend).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(dummy.stats().buffers_created, 1);
        assert_eq!(dummy.stats().buffer_writes, 1);
    }
}
