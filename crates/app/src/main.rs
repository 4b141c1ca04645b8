//! Vulkan course - Main Entry Point
//!
//! Opens the window, loads the helicopter model and spins it about +Y.

use anyhow::Result;
use glam::Mat4;
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event_loop::ControlFlow;
use winit::window::WindowId;

use course_core::{Config, Timer};
use course_platform::{ActiveEventLoop, EventLoop, Window, WindowEvent};
use course_renderer::{Renderer, RendererError};

const MODEL_FILE: &str = "uh60.obj";

/// Degrees per second.
const ROTATION_SPEED: f32 = 10.0;

/// Advances the spin angle in degrees, wrapping once it passes 350.
fn advance_angle(angle: f32, delta_secs: f32) -> f32 {
    let angle = angle + ROTATION_SPEED * delta_secs;
    if angle > 350.0 { angle - 360.0 } else { angle }
}

/// The model is authored Z-up, so it is tipped onto +Y before spinning.
fn model_transform(angle_degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(angle_degrees.to_radians()) * Mat4::from_rotation_x((-90.0f32).to_radians())
}

/// Counts consecutive frames skipped on an out-of-date swapchain.
#[derive(Debug, Default)]
struct SkippedFrames {
    count: u64,
}

impl SkippedFrames {
    /// Returns true only for the first skip of a run.
    fn record(&mut self) -> bool {
        self.count += 1;
        self.count == 1
    }

    /// Ends the run, returning how many frames it skipped.
    fn recover(&mut self) -> Option<u64> {
        match std::mem::take(&mut self.count) {
            0 => None,
            skipped => Some(skipped),
        }
    }
}

struct App {
    config: Config,
    // Dropped before the window its surface was created from.
    renderer: Option<Renderer>,
    window: Option<Window>,
    model_id: Option<usize>,
    angle: f32,
    timer: Timer,
    skipped: SkippedFrames,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            model_id: None,
            angle: 0.0,
            timer: Timer::new(),
            skipped: SkippedFrames::default(),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Window::new(event_loop, &self.config.window)?;
        let mut renderer = Renderer::new(&window, &self.config)?;

        match renderer.create_mesh_model(MODEL_FILE) {
            Ok(id) => self.model_id = Some(id),
            Err(e) => error!("Failed to load {}: {}", MODEL_FILE, e),
        }

        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let delta = self.timer.delta_secs();
        self.angle = advance_angle(self.angle, delta);

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        if let Some(model_id) = self.model_id {
            renderer.update_model(model_id, model_transform(self.angle));
        }

        match renderer.draw() {
            Ok(()) => {
                if let Some(skipped) = self.skipped.recover() {
                    info!("Swapchain usable again after {} skipped frames", skipped);
                }
            }
            Err(RendererError::SwapchainOutOfDate) => {
                if self.skipped.record() {
                    warn!("Swapchain out of date, skipping frames");
                }
            }
            Err(e) => {
                error!("Render error: {}", e);
                event_loop.exit();
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.init(event_loop) {
            Ok(()) => {
                info!("Initialization complete, entering main loop");
                self.timer = Timer::new();
            }
            Err(e) => {
                error!("Failed to initialize: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.renderer = None;
        self.window = None;
    }
}

fn main() -> Result<()> {
    course_core::init_logging();
    info!("Starting Vulkan course");

    let config = Config::from_env()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
