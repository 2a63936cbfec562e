//! WGPU-based rendering engine
//!
//! Owns the surface, device and every GPU resource of the single loaded
//! model, and turns a [`FrameState`] into one render pass per frame. Each
//! state-changing backend operation runs inside a validation error scope and
//! any captured error becomes [`ViewerError::Backend`].

use std::sync::Arc;

use cgmath::Matrix4;
use log::{error, info, warn};
use winit::window::Window;

use crate::{
    config::ViewerConfig,
    error::{Result, ViewerError},
    gfx::{
        frame_state::{FrameState, RenderMode},
        resources::{
            create_patch_buffer, GlobalBindings, GlobalUBO, GlobalUniformContent, PatchBuffer,
            SurfaceMaps, TextureResource,
        },
        scene::{render_hierarchy, Model, NodeUniforms},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::{ArrayBuffer, DynamicUniformBuffer},
    },
};

use super::{
    frame_batch::FrameBatch,
    pipeline_manager::{PipelineConfig, PipelineManager},
    tessellation::{Barycentric, TessellationTemplates},
};

/// Runs `operation` inside a validation error scope
fn scoped<T>(device: &wgpu::Device, operation: &str, f: impl FnOnce() -> T) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(ViewerError::backend(operation, error)),
        None => Ok(value),
    }
}

/// Per-node transforms, addressed by dynamic offset
struct NodeBindings {
    layout: BindGroupLayoutWithDesc,
    buffer: DynamicUniformBuffer<NodeUniforms>,
    bind_group: wgpu::BindGroup,
}

impl NodeBindings {
    fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform_dynamic())
            .create(device, "Node Bind Group Layout");
        let buffer = DynamicUniformBuffer::new(device, capacity);
        let bind_group = Self::bind(device, &layout, &buffer);
        Self {
            layout,
            buffer,
            bind_group,
        }
    }

    fn bind(
        device: &wgpu::Device,
        layout: &BindGroupLayoutWithDesc,
        buffer: &DynamicUniformBuffer<NodeUniforms>,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(layout)
            .resource(buffer.binding_resource())
            .create(device, "Node Bind Group")
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, uniforms: &[NodeUniforms]) {
        if self.buffer.write(device, queue, uniforms) {
            self.bind_group = Self::bind(device, &self.layout, &self.buffer);
        }
    }
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline_manager: PipelineManager,
    clear_color: wgpu::Color,
    model_transform: Matrix4<f32>,

    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    nodes: NodeBindings,
    geometry_bind_group: wgpu::BindGroup,
    material_bind_group: wgpu::BindGroup,

    templates: TessellationTemplates,
    template_buffer: ArrayBuffer<Barycentric>,
    _patch_buffer: PatchBuffer,
    _surface_maps: SurfaceMaps,

    batch: FrameBatch,
}

impl RenderEngine {
    /// Creates the device and uploads the model and its surface maps
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig, model: &Model) -> Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| ViewerError::Window(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::backend("request adapter", e))?;
        info!("Using adapter {}", adapter.get_info().name);

        let optional_features = adapter.features() & wgpu::Features::POLYGON_MODE_LINE;
        if optional_features.is_empty() {
            warn!("Adapter lacks line polygon mode, wireframe rendering is unavailable");
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: optional_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ViewerError::backend("request device", e))?;
        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            error!("Uncaptured backend error: {}", e)
        }));

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| ViewerError::Window("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let device: Arc<wgpu::Device> = Arc::new(device);
        let depth_texture = scoped(&device, "create depth texture", || {
            TextureResource::create_depth_texture(&device, &config, "depth_texture")
        })?;

        let surface_maps = SurfaceMaps::load(&device, &queue, &viewer.texture_paths())?;

        let templates = TessellationTemplates::new(viewer.min_lod, viewer.max_lod);
        let (template_buffer, patch_buffer) = scoped(&device, "upload geometry", || {
            (
                ArrayBuffer::new_with_data(&device, templates.vertices(), wgpu::BufferUsages::VERTEX),
                create_patch_buffer(&device, &model.geometry),
            )
        })?;

        let global_ubo = GlobalUBO::new(&device);
        let global_bindings = GlobalBindings::new(&device, &global_ubo);
        let nodes = NodeBindings::new(&device, model.root.node_count());

        let geometry_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::storage_buffer_read_only())
            .create(&device, "Geometry Bind Group Layout");
        let geometry_bind_group = BindGroupBuilder::new(&geometry_layout)
            .resource(patch_buffer.binding_resource())
            .create(&device, "Geometry Bind Group");

        let filtering = binding_types::sampler(wgpu::SamplerBindingType::Filtering);
        let material_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(filtering.clone())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(filtering.clone())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(filtering)
            .create(&device, "Material Bind Group Layout");
        let material_bind_group = BindGroupBuilder::new(&material_layout)
            .texture(&surface_maps.diffuse.view)
            .sampler(&surface_maps.diffuse.sampler)
            .texture(&surface_maps.normal.view)
            .sampler(&surface_maps.normal.sampler)
            .texture(&surface_maps.specular.view)
            .sampler(&surface_maps.specular.sampler)
            .create(&device, "Material Bind Group");

        let mut pipeline_manager =
            PipelineManager::new(device.clone(), include_str!("tessellated_phong.wgsl"));
        let layouts = vec![
            global_bindings.bind_group_layout().clone(),
            nodes.layout.layout.clone(),
            geometry_layout.layout.clone(),
            material_layout.layout.clone(),
        ];
        scoped(&device, "create pipelines", || {
            for mode in [RenderMode::Phong, RenderMode::Wireframe] {
                if let Some(pipeline_config) = PipelineConfig::for_mode(mode, device.features()) {
                    pipeline_manager.register_pipeline(
                        mode,
                        &pipeline_config
                            .with_color_format(format)
                            .with_bind_group_layouts(layouts.clone()),
                    );
                }
            }
        })?;

        let [r, g, b] = viewer.clear_color;
        Ok(RenderEngine {
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline_manager,
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
            model_transform: Matrix4::from_scale(viewer.model_scale),
            global_ubo,
            global_bindings,
            nodes,
            geometry_bind_group,
            material_bind_group,
            templates,
            template_buffer,
            _patch_buffer: patch_buffer,
            _surface_maps: surface_maps,
            batch: FrameBatch::default(),
        })
    }

    /// Draws one frame of `model` as described by `state`
    pub fn render_frame(&mut self, state: &FrameState, model: &Model) -> Result<()> {
        let mode = state.pipeline_mode()?;
        let view = state.view_matrix();

        self.batch.clear();
        render_hierarchy(
            &model.root,
            view,
            self.model_transform,
            state.projection(),
            &mut self.batch,
        );

        let device = self.device.clone();
        scoped(&device, "update uniforms", || {
            self.global_ubo
                .update_content(&self.queue, GlobalUniformContent::from_frame(state, view));
            self.nodes.upload(&self.device, &self.queue, &self.batch.uniforms);
        })?;

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring surface texture, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(ViewerError::backend("acquire surface texture", e)),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let pipeline = self.pipeline_manager.get_pipeline(mode)?;
        let template = self.templates.range(state.effective_lod());

        scoped(&device, "render frame", || {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

            {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Main Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &surface_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
                render_pass.set_bind_group(2, &self.geometry_bind_group, &[]);
                render_pass.set_bind_group(3, &self.material_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.template_buffer.buffer().slice(..));

                for draw in &self.batch.draws {
                    render_pass.set_bind_group(
                        1,
                        &self.nodes.bind_group,
                        &[self.nodes.buffer.offset(draw.slot)],
                    );
                    render_pass.draw(template.clone(), draw.patches());
                }
            }

            self.queue.submit(std::iter::once(encoder.finish()));
        })?;

        surface_texture.present();
        Ok(())
    }

    /// Resizes the surface and recreates the depth buffer
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    pub fn supports_mode(&self, mode: RenderMode) -> bool {
        self.pipeline_manager.has_pipeline(mode)
    }
}
