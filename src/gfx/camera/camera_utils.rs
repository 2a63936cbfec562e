use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};

use crate::{config::ViewerConfig, input::InputEvent};

use super::{camera_controller::CameraController, trackball::VirtualTrackball};

/// Maps OpenGL clip space depth (-1..1) onto wgpu's (0..1)
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Zoom change per wheel step
pub const ZOOM_STEP: f32 = 1e-3;
/// Zoom is kept within `1 ± ZOOM_SPAN`
pub const ZOOM_SPAN: f32 = 0.015;
/// Allowed range of the view's z translation
pub const VIEW_DEPTH_RANGE: (f32, f32) = (-26.0, -2.0);

/// Fixed-position perspective camera looking down -z at the model
///
/// The view is a plain translation; rotation comes from the trackball and is
/// applied in [`CameraManager::view_matrix`].
#[derive(Debug, Clone)]
pub struct ViewCamera {
    pub view: Matrix4<f32>,
    pub zoom: f32,
    pub fovy: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    projection: Matrix4<f32>,
}

impl ViewCamera {
    pub fn new(config: &ViewerConfig) -> Self {
        let mut camera = Self {
            view: Matrix4::from_translation(Vector3::new(0.0, 0.0, -config.camera_distance)),
            zoom: 1.0,
            fovy: config.projection.fovy,
            aspect: config.aspect(),
            znear: config.projection.znear,
            zfar: config.projection.zfar,
            projection: Matrix4::identity(),
        };
        camera.update_projection();
        camera
    }

    /// Perspective projection in wgpu clip space
    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    fn update_projection(&mut self) {
        self.projection = OPENGL_TO_WGPU_MATRIX
            * cgmath::perspective(Deg(self.fovy / self.zoom), self.aspect, self.znear, self.zfar);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
        self.update_projection();
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(1.0 + ZOOM_SPAN);
        self.update_projection();
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(1.0 - ZOOM_SPAN);
        self.update_projection();
    }

    /// Moves the model along the view axis, positive offsets bring it closer
    pub fn move_model(&mut self, offset: f32) {
        let (far, near) = VIEW_DEPTH_RANGE;
        self.view.w.z = (self.view.w.z + offset).clamp(far, near);
    }

    /// Shifts the view sideways in view space
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.view = self.view * Matrix4::from_translation(Vector3::new(dx, dy, 0.0));
    }

    /// Distance from the eye to the model centre
    pub fn distance(&self) -> f32 {
        -self.view.w.z
    }
}

/// Camera plus the trackball and controller that drive it
pub struct CameraManager {
    pub camera: ViewCamera,
    pub trackball: VirtualTrackball,
    pub controller: CameraController,
}

impl CameraManager {
    pub fn new(camera: ViewCamera, trackball: VirtualTrackball, controller: CameraController) -> Self {
        Self {
            camera,
            trackball,
            controller,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        let mut trackball = VirtualTrackball::new();
        trackball.set_viewport_size(config.window_width, config.window_height);
        Self::new(ViewCamera::new(config), trackball, CameraController::default())
    }

    /// Returns true when the event was consumed by the camera
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        self.controller
            .process_event(event, &mut self.camera, &mut self.trackball)
    }

    /// View matrix: camera translation applied after the trackball rotation
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.camera.view * self.trackball.current_transform()
    }

    /// Zero-sized windows (minimised) keep the last valid viewport
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.trackball.set_viewport_size(width, height);
        self.camera.resize_projection(width, height);
    }
}
