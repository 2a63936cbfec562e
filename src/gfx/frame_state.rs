//! Per-frame viewer state
//!
//! Everything the renderer reads each frame lives in [`FrameState`]. The window
//! layer queues [`InputEvent`]s and the frame loop drains them into
//! [`FrameState::handle_event`] before drawing, so the renderer only ever sees
//! a consistent snapshot.

use cgmath::{Matrix4, Rad, Vector3, Vector4};
use log::{debug, warn};

use crate::{
    config::ViewerConfig,
    error::{Result, ViewerError},
    input::{InputEvent, Key},
};

use super::camera::CameraManager;

/// How triangles are rasterised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    #[default]
    Phong,
    Wireframe,
    HiddenLine,
    Flat,
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] = [
        RenderMode::Phong,
        RenderMode::Wireframe,
        RenderMode::HiddenLine,
        RenderMode::Flat,
    ];
}

/// Where the tessellation level comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LodMode {
    #[default]
    Manual,
    /// Derived from the camera distance every frame
    Distance,
}

pub struct FrameState {
    pub camera: CameraManager,
    pub light_position: Vector3<f32>,
    pub lighting_enabled: bool,
    /// Colour fragments by their barycentric coordinates
    pub debug_colors: bool,
    pub lod_mode: LodMode,
    pub render_mode: RenderMode,
    /// Modes the renderer has a pipeline for
    available_modes: Vec<RenderMode>,
    lod_level: u32,
    min_lod: u32,
    max_lod: u32,
    exit_requested: bool,
}

impl FrameState {
    pub fn new(config: &ViewerConfig) -> Self {
        let min_lod = config.min_lod.max(1);
        let max_lod = config.max_lod.max(min_lod);
        Self {
            camera: CameraManager::from_config(config),
            light_position: Vector3::from(config.light_position),
            lighting_enabled: true,
            debug_colors: false,
            lod_mode: LodMode::Manual,
            render_mode: RenderMode::Phong,
            available_modes: vec![RenderMode::Phong, RenderMode::Wireframe],
            lod_level: min_lod,
            min_lod,
            max_lod,
            exit_requested: false,
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Manual LOD level
    pub fn lod_level(&self) -> u32 {
        self.lod_level
    }

    /// LOD level to draw with this frame
    pub fn effective_lod(&self) -> u32 {
        match self.lod_mode {
            LodMode::Manual => self.lod_level,
            LodMode::Distance => {
                distance_lod(self.camera.camera.distance(), self.min_lod, self.max_lod)
            }
        }
    }

    /// Wireframe is always drawn lit
    pub fn effective_lighting(&self) -> bool {
        self.lighting_enabled || self.render_mode == RenderMode::Wireframe
    }

    /// Pipeline mode for this frame, rejecting modes without a pipeline
    pub fn pipeline_mode(&self) -> Result<RenderMode> {
        match self.render_mode {
            RenderMode::Phong | RenderMode::Wireframe => Ok(self.render_mode),
            mode => Err(ViewerError::UnsupportedMode(mode)),
        }
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        if self.camera.process_event(event) {
            return;
        }

        match *event {
            InputEvent::Quit => self.exit_requested = true,
            InputEvent::Resize { width, height } => self.camera.resize(width, height),
            InputEvent::Key { key, ctrl } => self.handle_key(key, ctrl),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: Key, ctrl: bool) {
        match key {
            Key::Escape => self.exit_requested = true,
            Key::Q if ctrl => self.exit_requested = true,
            Key::L => {
                self.lighting_enabled = !self.lighting_enabled;
                debug!("Lighting {}", on_off(self.lighting_enabled));
            }
            Key::Z => {
                self.lod_mode = match self.lod_mode {
                    LodMode::Manual => LodMode::Distance,
                    LodMode::Distance => LodMode::Manual,
                };
                debug!("LOD mode {:?}", self.lod_mode);
            }
            Key::Plus => {
                self.lod_level = (self.lod_level + 1).min(self.max_lod);
                debug!("LOD level {}", self.lod_level);
            }
            Key::Minus => {
                self.lod_level = self.lod_level.saturating_sub(1).max(self.min_lod);
                debug!("LOD level {}", self.lod_level);
            }
            Key::Space => {
                self.debug_colors = !self.debug_colors;
                debug!("Barycentric colouring {}", on_off(self.debug_colors));
            }
            Key::Digit2 => {
                self.set_render_mode(RenderMode::Phong);
            }
            Key::Digit3 => {
                self.set_render_mode(RenderMode::Wireframe);
            }
            _ => {}
        }
    }

    /// Restricts mode switches to what the renderer can draw
    pub fn set_available_modes(&mut self, modes: impl IntoIterator<Item = RenderMode>) {
        self.available_modes = modes.into_iter().collect();
    }

    pub fn is_available(&self, mode: RenderMode) -> bool {
        self.available_modes.contains(&mode)
    }

    /// Switches to `mode` if the renderer supports it, otherwise keeps the
    /// current mode and returns false
    pub fn set_render_mode(&mut self, mode: RenderMode) -> bool {
        if !self.is_available(mode) {
            warn!("Render mode {:?} is not available on this adapter", mode);
            return false;
        }
        self.render_mode = mode;
        debug!("Render mode {:?}", mode);
        true
    }

    /// Rotates the light about the Y axis by `elapsed_secs` radians
    pub fn advance(&mut self, elapsed_secs: f32) {
        let rotated = Matrix4::from_angle_y(Rad(elapsed_secs)) * self.light_position.extend(1.0);
        self.light_position = Vector4::truncate(rotated);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.camera.view_matrix()
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.camera.camera.projection()
    }
}

/// Tessellation level for a camera at `distance` from the model
pub fn distance_lod(distance: f32, min_lod: u32, max_lod: u32) -> u32 {
    if distance <= 0.0 {
        return max_lod;
    }
    let level = (max_lod as f32 * 2.0 / distance).round() as u32;
    level.clamp(min_lod, max_lod)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
