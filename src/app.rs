use std::{collections::VecDeque, sync::Arc, time::Instant};

use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::ViewerConfig,
    error::{Result, ViewerError},
    gfx::{
        frame_state::{FrameState, RenderMode},
        scene::Model,
        RenderEngine,
    },
    input::{InputEvent, InputTranslator},
};

const CONTROLS: &str = "\
== Movement ==
[W] / [S]: move towards / away from the model
[Arrows]: pan the view
Mouse wheel: zoom in / out (does not affect LOD)
Hold the left button and drag to rotate the model
== Options ==
[L]: toggle Blinn-Phong lighting and normal mapping
[Z]: switch between distance-based and manual LOD
[+] / [-]: increase / decrease the manual LOD
[Space]: toggle barycentric face colouring
== Render modes ==
[2]: filled polygons
[3]: wireframe
[Esc] / [Ctrl+Q]: quit";

/// The viewer application: one window, one model
pub struct ViewerApp {
    event_loop: EventLoop<()>,
    app_state: AppState,
}

struct AppState {
    config: ViewerConfig,
    model: Model,
    frame: FrameState,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    translator: InputTranslator,
    pending: VecDeque<InputEvent>,
    last_frame: Instant,
    error: Option<ViewerError>,
}

impl ViewerApp {
    /// Loads the model and creates the event loop; the window and GPU
    /// resources are created once the event loop resumes
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let model = Model::load(config.model_path(), config.invert_model)?;
        let event_loop = EventLoop::new().map_err(|e| ViewerError::Window(e.to_string()))?;

        Ok(Self {
            event_loop,
            app_state: AppState {
                frame: FrameState::new(&config),
                config,
                model,
                window: None,
                render_engine: None,
                translator: InputTranslator::new(),
                pending: VecDeque::new(),
                last_frame: Instant::now(),
                error: None,
            },
        })
    }

    /// Runs until the user quits or a fatal error occurs
    pub fn run(mut self) -> Result<()> {
        self.event_loop.set_control_flow(ControlFlow::Poll);
        self.event_loop
            .run_app(&mut self.app_state)
            .map_err(|e| ViewerError::Window(e.to_string()))?;

        match self.app_state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: ViewerError) {
        error!("{}", e);
        self.error = Some(e);
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = WindowAttributes::default()
            .with_title(self.config.title.as_str())
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|e| ViewerError::Window(e.to_string()))?,
        );

        let renderer = pollster::block_on(RenderEngine::new(
            window.clone(),
            &self.config,
            &self.model,
        ))?;

        self.frame.set_available_modes(
            RenderMode::ALL
                .into_iter()
                .filter(|&mode| renderer.supports_mode(mode)),
        );

        // the window manager may not honour the requested size
        let PhysicalSize { width, height } = window.inner_size();
        self.pending.push_back(InputEvent::Resize { width, height });

        self.window = Some(window);
        self.render_engine = Some(renderer);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        for event in self.pending.drain(..) {
            self.frame.handle_event(&event);
        }
        if self.frame.exit_requested() {
            info!("Exiting");
            event_loop.exit();
            return;
        }
        self.frame.advance(elapsed);

        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };
        if let Err(e) = render_engine.render_frame(&self.frame, &self.model) {
            self.fail(event_loop, e);
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.create_window(event_loop) {
            Ok(()) => info!("Controls:\n{}", CONTROLS),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(input) = self.translator.translate(&event) {
            self.pending.push_back(input);
        }

        match event {
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                // the queued Quit is handled by the next frame
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
