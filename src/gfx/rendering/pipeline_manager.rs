//! Render pipeline management
//!
//! One pipeline per [`RenderMode`], all sharing the tessellating shader and
//! the same bind group layouts. A mode without a registered pipeline is
//! reported as [`ViewerError::UnsupportedMode`].

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::{
    error::{Result, ViewerError},
    gfx::{frame_state::RenderMode, resources::TextureResource},
};

use super::tessellation::template_layout;

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub cull_mode: Option<Face>,
    pub polygon_mode: PolygonMode,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            bind_group_layouts: Vec::new(),
            cull_mode: Some(Face::Back),
            polygon_mode: PolygonMode::Fill,
            color_format: TextureFormat::Bgra8UnormSrgb,
            depth_format: Some(TextureResource::DEPTH_FORMAT),
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_polygon_mode(mut self, mode: PolygonMode) -> Self {
        self.polygon_mode = mode;
        self
    }

    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    /// Pipeline config for `mode`, or `None` if the mode has no pipeline
    ///
    /// Wireframe needs `POLYGON_MODE_LINE`; without it the mode stays
    /// unregistered.
    pub fn for_mode(mode: RenderMode, features: Features) -> Option<Self> {
        match mode {
            RenderMode::Phong => Some(Self::default().with_label("Phong")),
            RenderMode::Wireframe if features.contains(Features::POLYGON_MODE_LINE) => Some(
                Self::default()
                    .with_label("Wireframe")
                    .with_polygon_mode(PolygonMode::Line),
            ),
            _ => None,
        }
    }
}

/// Owns the shader module and one pipeline per supported render mode
pub struct PipelineManager {
    device: Arc<Device>,
    shader: ShaderModule,
    pipelines: HashMap<RenderMode, RenderPipeline>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>, shader_source: &str) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Tessellated Phong"),
            source: ShaderSource::Wgsl(shader_source.into()),
        });

        Self {
            device,
            shader,
            pipelines: HashMap::new(),
        }
    }

    pub fn register_pipeline(&mut self, mode: RenderMode, config: &PipelineConfig) {
        let pipeline = self.create_pipeline_from_config(config);
        self.pipelines.insert(mode, pipeline);
    }

    pub fn get_pipeline(&self, mode: RenderMode) -> Result<&RenderPipeline> {
        self.pipelines
            .get(&mode)
            .ok_or(ViewerError::UnsupportedMode(mode))
    }

    pub fn has_pipeline(&self, mode: RenderMode) -> bool {
        self.pipelines.contains_key(&mode)
    }

    fn create_pipeline_from_config(&self, config: &PipelineConfig) -> RenderPipeline {
        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        self.device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[template_layout()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(ColorTargetState {
                        format: config.color_format,
                        blend: Some(BlendState::REPLACE),
                        write_mask: ColorWrites::ALL,
                    })],
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: config.polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }
}
