//! Error types for the viewer
//!
//! Every failure the viewer can hit is fatal: load-time errors abort startup
//! and backend errors abort the frame loop. There is no partial-success mode.

use std::path::PathBuf;

/// Errors produced while loading assets or driving the GPU backend
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The importer could not read or parse the model source
    #[error("unable to load mesh from {path}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },

    /// A face with other than three indices was encountered
    #[error("only triangle meshes are supported (mesh {mesh}, face {face} has {arity} indices)")]
    UnsupportedTopology {
        mesh: usize,
        face: usize,
        arity: usize,
    },

    /// Attribute arrays disagree in length, an index is out of range, or the
    /// bounding box is degenerate
    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// A texture could not be decoded
    #[error("unable to decode texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The GPU backend reported an invalid-state condition
    #[error("backend error after {operation}: {message}")]
    Backend { operation: String, message: String },

    /// A render mode that the traversal does not implement was requested
    #[error("render mode {0:?} is not supported")]
    UnsupportedMode(crate::gfx::frame_state::RenderMode),

    /// Window, event loop, or surface creation failed
    #[error("window system error: {0}")]
    Window(String),
}

impl ViewerError {
    pub(crate) fn asset_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn backend(operation: &str, message: impl ToString) -> Self {
        Self::Backend {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ViewerError>;
