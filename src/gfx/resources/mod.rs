//! GPU resource management
//!
//! Handles textures, buffers, and bind groups for rendering.

pub mod global_bindings;
pub mod mesh_buffers;
pub mod texture_resource;

// Re-export main types
pub use global_bindings::{GlobalBindings, GlobalUBO, GlobalUniformContent};
pub use mesh_buffers::{create_patch_buffer, patch_vertices, PatchBuffer, PatchVertex};
pub use texture_resource::{decode_rgb, RgbImage, SurfaceMaps, TextureResource};
