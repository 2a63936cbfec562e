//! # Scene Module
//!
//! Loading and walking the model hierarchy.
//!
//! ## Key Components
//!
//! - [`import`] - Importer-neutral [`SceneGraph`] plus the OBJ and glTF importers
//! - [`Model`] - Normalised hierarchy of [`MeshPart`]s over shared [`GeometryBuffers`]
//! - [`render_hierarchy`] - Depth-first draw walk feeding a [`DrawTarget`]
//!
//! ## Usage
//!
//! ```no_run
//! use tessview::gfx::scene::Model;
//!
//! let model = Model::load("models/ico-sphere.obj", false)?;
//! println!("{} vertices", model.vertex_count());
//! # Ok::<(), tessview::ViewerError>(())
//! ```
//!
//! Node transforms coming out of importers are row-major; they are converted
//! once, in [`import::row_major_to_matrix`], and every matrix past that point
//! is cgmath's column-major form.

pub mod import;
pub mod mesh_part;
pub mod model;
pub mod tangents;
pub mod traversal;

// Re-export main types
pub use import::{import_scene, SceneGraph, SceneNode};
pub use mesh_part::{GeometryBuffers, MeshPart, VertexRange};
pub use model::{BoundingBox, Model};
pub use traversal::{render_hierarchy, DrawTarget, NodeTransforms, NodeUniforms};
