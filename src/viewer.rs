//! Standalone board window backed by winit.
//!
//! ```no_run
//! # use galton::Viewer;
//! Viewer::builder().build().run().unwrap();
//! ```

use std::{sync::Arc, time::Instant};

use glam::Vec3;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    board::{BoardConfig, GaltonBoard},
    camera::Camera,
    error::GaltonError,
    gpu::RenderContext,
    renderer::BoardRenderer,
    util::frame_timing::FrameTiming,
};

// Seconds between FPS / population log lines.
const STATS_INTERVAL_SECS: f32 = 5.0;

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    config: Option<BoardConfig>,
    title: String,
    target_fps: u32,
}

impl ViewerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            config: None,
            title: "Galton".into(),
            target_fps: 0,
        }
    }

    /// Override the default board configuration.
    #[must_use]
    pub fn with_config(mut self, config: BoardConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Cap the frame rate (0 = uncapped, the default).
    #[must_use]
    pub fn with_target_fps(mut self, target_fps: u32) -> Self {
        self.target_fps = target_fps;
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            config: self.config.unwrap_or_default(),
            title: self.title,
            target_fps: self.target_fps,
        }
    }
}

/// A standalone window that runs and displays a board.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
pub struct Viewer {
    config: BoardConfig,
    title: String,
    target_fps: u32,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed or the simulation fails.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::Viewer`] for event-loop failures and
    /// propagates board construction errors.
    pub fn run(self) -> Result<(), GaltonError> {
        let board = GaltonBoard::new(self.config)?;

        let event_loop = EventLoop::new().map_err(|e| GaltonError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            gpu: None,
            renderer: None,
            board,
            camera: None,
            timing: FrameTiming::new(self.target_fps),
            last_stats: Instant::now(),
            title: self.title,
            target_fps: self.target_fps,
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| GaltonError::Viewer(e.to_string()))
    }
}

/// Internal winit application handler.
struct ViewerApp {
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    renderer: Option<BoardRenderer>,
    board: GaltonBoard,
    camera: Option<Camera>,
    timing: FrameTiming,
    last_stats: Instant,
    title: String,
    target_fps: u32,
}

impl ViewerApp {
    /// Frame a default camera around the board geometry: look at the
    /// lattice midpoint from outside the footprint.
    fn default_camera(board: &GaltonBoard, aspect: f32) -> Camera {
        let config = board.config();
        let start = Vec3::from(config.start);
        let target = start - Vec3::new(0.0, config.height * 0.5, 0.0);
        let distance = config.side_length * 1.5;

        Camera {
            eye: target + Vec3::new(0.0, config.height * 0.4, distance),
            target,
            up: Vec3::Y,
            aspect,
            fovy: 45.0,
            znear: 0.1,
            zfar: distance * 20.0,
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(gpu), Some(renderer), Some(camera)) = (
            self.window.as_ref(),
            self.gpu.as_ref(),
            self.renderer.as_mut(),
            self.camera.as_ref(),
        ) else {
            return;
        };

        // Frame limiter: under a target FPS, idle until the frame budget
        // has elapsed.
        if !self.timing.should_render() {
            window.request_redraw();
            return;
        }

        let delta_ms = self.timing.delta_ms().min(100.0);
        if delta_ms > 0.0 {
            if let Err(e) = self.board.update(gpu, delta_ms) {
                log::error!("simulation failed: {e}");
                event_loop.exit();
                return;
            }
        }

        match renderer.render(gpu, &self.board, camera) {
            Ok(()) => {}
            Err(GaltonError::Viewer(msg)) => {
                // Surface outdated or lost; reconfigure and retry next frame.
                log::warn!("{msg}");
                let inner = window.inner_size();
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(inner.width, inner.height);
                }
                if let Some(gpu) = self.gpu.as_ref() {
                    renderer.resize(gpu);
                }
            }
            Err(e) => {
                log::error!("render failed: {e}");
                event_loop.exit();
                return;
            }
        }

        self.timing.end_frame();
        if self.last_stats.elapsed().as_secs_f32() >= STATS_INTERVAL_SECS {
            self.last_stats = Instant::now();
            log::info!(
                "{:.0} fps, {} balls active",
                self.timing.fps(),
                self.board.ball_count()
            );
        }
        window.request_redraw();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes().with_title(self.title.clone());
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        let gpu = match pollster::block_on(RenderContext::new(
            window.clone(),
            (size.width.max(1), size.height.max(1)),
        )) {
            Ok(gpu) => gpu,
            Err(e) => {
                log::error!("GPU initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.board.initialize(&gpu) {
            log::error!("board initialization failed: {e}");
            event_loop.exit();
            return;
        }

        let renderer = match BoardRenderer::new(&gpu, self.board.scene()) {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("renderer initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        self.camera = Some(Self::default_camera(&self.board, aspect));
        // Restart the clock so GPU setup time is not counted as a frame.
        self.timing = FrameTiming::new(self.target_fps);

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.renderer = Some(renderer);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size.width, size.height);
                }
                if let (Some(gpu), Some(renderer)) = (self.gpu.as_ref(), self.renderer.as_mut()) {
                    renderer.resize(gpu);
                }
                if let Some(camera) = self.camera.as_mut() {
                    camera.aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
