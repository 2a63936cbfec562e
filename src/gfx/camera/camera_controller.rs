use crate::input::{InputEvent, Key};

use super::{camera_utils::ViewCamera, trackball::VirtualTrackball};

/// Routes pointer, wheel and movement keys to the camera and trackball
pub struct CameraController {
    pub pan_step: f32,
    pub move_step: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(0.1, 0.2)
    }
}

impl CameraController {
    pub fn new(pan_step: f32, move_step: f32) -> Self {
        Self {
            pan_step,
            move_step,
        }
    }

    /// Applies one event, returning true if it was a camera event
    pub fn process_event(
        &mut self,
        event: &InputEvent,
        camera: &mut ViewCamera,
        trackball: &mut VirtualTrackball,
    ) -> bool {
        match *event {
            InputEvent::PointerDown { x, y } => trackball.begin_drag(x, y),
            InputEvent::PointerUp { x, y } => trackball.end_drag(x, y),
            InputEvent::PointerMove { x, y } => trackball.update_drag(x, y, camera.zoom),
            InputEvent::Wheel { steps } if steps > 0 => camera.zoom_in(),
            InputEvent::Wheel { .. } => camera.zoom_out(),
            InputEvent::Key { key, .. } => return self.process_key(key, camera),
            _ => return false,
        }
        true
    }

    fn process_key(&self, key: Key, camera: &mut ViewCamera) -> bool {
        match key {
            Key::W => camera.move_model(self.move_step),
            Key::S => camera.move_model(-self.move_step),
            Key::Right => camera.pan(-self.pan_step, 0.0),
            Key::Left => camera.pan(self.pan_step, 0.0),
            Key::Up => camera.pan(0.0, -self.pan_step),
            Key::Down => camera.pan(0.0, self.pan_step),
            _ => return false,
        }
        true
    }
}
