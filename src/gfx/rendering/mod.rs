// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Handles tessellation templates, render pipelines, per-frame draw batching
//! and frame rendering.

pub mod frame_batch;
pub mod pipeline_manager;
pub mod render_engine;
pub mod tessellation;

// Re-export main types
pub use frame_batch::{DrawCommand, FrameBatch};
pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
pub use tessellation::TessellationTemplates;
