//! Viewer configuration
//!
//! The viewer is a fixed single-scene demo, so every value here has a fixed
//! default. Paths are resolved against an asset root that defaults to the
//! working directory and can be moved with `VIEWER_ASSET_DIR`.

use std::path::{Path, PathBuf};

/// Environment variable that relocates the asset root
pub const ASSET_DIR_ENV: &str = "VIEWER_ASSET_DIR";

/// Paths of the three surface maps applied to the model
#[derive(Debug, Clone)]
pub struct TexturePaths {
    pub diffuse: PathBuf,
    pub normal: PathBuf,
    pub specular: PathBuf,
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy)]
pub struct ProjectionConfig {
    /// Vertical field of view in degrees (before zoom)
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

/// Complete viewer configuration
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub asset_root: PathBuf,
    pub model: PathBuf,
    pub invert_model: bool,
    pub textures: TexturePaths,
    pub projection: ProjectionConfig,
    /// Distance between eye and model centre along -z
    pub camera_distance: f32,
    /// Uniform scale applied to the whole model on top of normalisation
    pub model_scale: f32,
    pub light_position: [f32; 3],
    pub clear_color: [f64; 3],
    pub min_lod: u32,
    pub max_lod: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Tessellated normal mapping".to_string(),
            window_width: 800,
            window_height: 600,
            asset_root: PathBuf::from("."),
            model: PathBuf::from("models/ico-sphere.obj"),
            invert_model: false,
            textures: TexturePaths {
                diffuse: PathBuf::from("textures/basketball/bball_diffuse.png"),
                normal: PathBuf::from("textures/basketball/bball_normal.png"),
                specular: PathBuf::from("textures/basketball/bball_specular.png"),
            },
            projection: ProjectionConfig {
                fovy: 45.0,
                znear: 0.5,
                zfar: 30.0,
            },
            camera_distance: 10.0,
            model_scale: 3.0,
            light_position: [10.0, 0.0, 0.0],
            clear_color: [0.5, 0.5, 0.5],
            min_lod: 1,
            max_lod: 12,
        }
    }
}

impl ViewerConfig {
    /// Default configuration with the asset root taken from the environment
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(ASSET_DIR_ENV) {
            Some(dir) => config.with_asset_root(dir),
            None => config,
        }
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<PathBuf>, invert: bool) -> Self {
        self.model = model.into();
        self.invert_model = invert;
        self
    }

    /// Resolves a configured path against the asset root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model)
    }

    /// Surface map paths resolved against the asset root
    pub fn texture_paths(&self) -> TexturePaths {
        TexturePaths {
            diffuse: self.resolve(&self.textures.diffuse),
            normal: self.resolve(&self.textures.normal),
            specular: self.resolve(&self.textures.specular),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}
