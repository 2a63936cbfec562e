//! # Graphics Module
//!
//! Everything between a loaded model and pixels on screen.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Virtual trackball, zoom and view translation
//! - **Frame State** ([`frame_state`]) - Toggles, LOD and light read by each frame
//! - **Scene** ([`scene`]) - Model loading, normalisation and hierarchy traversal
//! - **Resources** ([`resources`]) - Uniforms, patch storage and surface maps
//! - **Rendering** ([`rendering`]) - Tessellation templates, pipelines and the frame loop
//!
//! ## Usage
//!
//! ```no_run
//! use tessview::{config::ViewerConfig, gfx::{frame_state::FrameState, scene::Model}};
//!
//! let config = ViewerConfig::default();
//! let model = Model::load(config.model_path(), config.invert_model)?;
//! let state = FrameState::new(&config);
//! println!("drawing {} patches at level {}", model.vertex_count() / 3, state.effective_lod());
//! # Ok::<(), tessview::ViewerError>(())
//! ```

pub mod camera;
pub mod frame_state;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use frame_state::{FrameState, LodMode, RenderMode};
pub use rendering::render_engine::RenderEngine;
