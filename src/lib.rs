// src/lib.rs
//! Tessellated normal-mapping model viewer
//!
//! Loads one textured model, normalises it into a unit cube, and renders it
//! with vertex-stage Phong tessellation and normal-mapped Blinn-Phong
//! shading, rotated with a virtual trackball. Built on wgpu and winit.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod input;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::ViewerApp;
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};

/// Loads the configured model and runs the viewer until it exits
pub fn run(config: ViewerConfig) -> Result<()> {
    ViewerApp::new(config)?.run()
}
