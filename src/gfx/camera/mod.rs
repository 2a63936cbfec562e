pub mod camera_controller;
pub mod camera_utils;
pub mod trackball;

// Re-export main types
pub use camera_controller::CameraController;
pub use camera_utils::{CameraManager, ViewCamera};
pub use trackball::VirtualTrackball;
