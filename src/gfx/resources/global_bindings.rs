//! Global uniform bindings for per-frame shading state
//!
//! One uniform block shared by every draw of a frame: the light, the
//! shading toggles, and the tessellation level.

use cgmath::{Matrix4, Vector3};

use crate::{
    gfx::frame_state::FrameState,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Global uniform buffer content structure
///
/// MUST match the `Globals` struct in the shader exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniformContent {
    /// Light position in view space, w = 1
    pub light_position: [f32; 4],
    pub lighting: u32,
    pub debug_colors: u32,
    pub tess_level: u32,
    _padding: u32,
}

impl GlobalUniformContent {
    pub fn new(light_view: Vector3<f32>, lighting: bool, debug_colors: bool, tess_level: u32) -> Self {
        Self {
            light_position: light_view.extend(1.0).into(),
            lighting: lighting as u32,
            debug_colors: debug_colors as u32,
            tess_level,
            _padding: 0,
        }
    }

    /// Snapshot of `state` for a frame drawn with `view`
    pub fn from_frame(state: &FrameState, view: Matrix4<f32>) -> Self {
        let light = view * state.light_position.extend(1.0);
        Self::new(
            light.truncate(),
            state.effective_lighting(),
            state.debug_colors,
            state.effective_lod(),
        )
    }
}

pub type GlobalUBO = UniformBuffer<GlobalUniformContent>;

/// Layout and bind group for the global uniforms, bound at group 0
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");

        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
