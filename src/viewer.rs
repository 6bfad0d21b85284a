//! A window that shows one particle engine.
//!
//! [`Viewer`] wires a [`MeshSource`] and an [`EngineConfig`] to a winit window:
//! the cursor drives repulsion, right-drag orbits the camera and the scroll
//! wheel zooms. Space pauses, R snaps every particle home.
//!
//! ```ignore
//! Viewer::new()
//!     .with_source(MeshSource::uv_sphere(1.0, 64, 128))
//!     .with_config(EngineConfig::new().with_stride(2))
//!     .run()?;
//! ```

use std::sync::Arc;

use glam::Vec3;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::EngineConfig;
use crate::engine::ParticleEngine;
use crate::error::ViewerError;
use crate::gpu::{Camera, GpuState};
use crate::mesh::{MeshSource, SkeletonId};
use crate::pointer::PointerTracker;
use crate::time::FrameClock;

/// Called once per frame with the source and the elapsed time, before the
/// engine update. Joint world matrices are refreshed after it returns.
pub type Animator = Box<dyn FnMut(&mut MeshSource, f32)>;

/// Builder for the interactive viewer.
pub struct Viewer {
    source: Option<MeshSource>,
    config: EngineConfig,
    animator: Option<Animator>,
    title: String,
    camera: Camera,
}

impl Viewer {
    pub fn new() -> Self {
        Self {
            source: None,
            config: EngineConfig::default(),
            animator: None,
            title: "VPE - Vertex Particle Engine".to_string(),
            camera: Camera::default(),
        }
    }

    pub fn with_source(mut self, source: MeshSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Animate the source every frame, typically by posing skeleton joints.
    pub fn with_animator<F>(mut self, animator: F) -> Self
    where
        F: FnMut(&mut MeshSource, f32) + 'static,
    {
        self.animator = Some(Box::new(animator));
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    /// Open the window and block until it is closed.
    pub fn run(self) -> Result<(), ViewerError> {
        let source = self.source.ok_or(ViewerError::NoSource)?;
        let engine = ParticleEngine::from_source(&source, self.config)?;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            window: None,
            gpu_state: None,
            engine,
            source,
            animator: self.animator,
            title: self.title,
            camera: self.camera,
            pointer: PointerTracker::new(),
            clock: FrameClock::new(),
            orbiting: false,
            last_mouse_pos: None,
            shown_fps: 0.0,
            error: None,
        };
        event_loop.run_app(&mut app)?;

        match app.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    engine: ParticleEngine,
    source: MeshSource,
    animator: Option<Animator>,
    title: String,
    camera: Camera,
    pointer: PointerTracker,
    clock: FrameClock,
    orbiting: bool,
    last_mouse_pos: Option<(f64, f64)>,
    /// FPS currently shown in the window title.
    shown_fps: f32,
    /// First fatal error; returned from `run` after the loop exits.
    error: Option<ViewerError>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ViewerError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = window.inner_size();
        self.pointer.set_window_size(size.width, size.height);
        self.window = Some(window.clone());
        self.gpu_state = Some(pollster::block_on(GpuState::new(window, self.camera))?);
        log::info!("viewer ready: {} samples", self.engine.sample_count());
        Ok(())
    }

    fn frame(&mut self) {
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        // Interaction plane: through the object's origin, facing the camera.
        let plane_point = self.engine.world_transform().transform_point3(Vec3::ZERO);
        let pointer = self
            .pointer
            .world_position(gpu_state.inverse_view_proj(), plane_point, gpu_state.camera.facing());
        let frame = self.clock.frame_input(pointer);

        if self.clock.fps() != self.shown_fps {
            self.shown_fps = self.clock.fps();
            if let Some(window) = &self.window {
                window.set_title(&title_with_fps(&self.title, self.shown_fps));
            }
        }

        if let Some(animator) = &mut self.animator {
            animator(&mut self.source, frame.elapsed_time);
            for id in 0..self.source.skeletons().len() {
                if let Some(skeleton) = self.source.skeleton_mut(SkeletonId(id)) {
                    skeleton.update_world_matrices();
                }
            }
        }
        self.engine.update(&frame, Some(&self.source));

        match gpu_state.render(&self.engine) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost) => gpu_state.resize(winit::dpi::PhysicalSize {
                width: gpu_state.config.width,
                height: gpu_state.config.height,
            }),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory, closing viewer");
                self.gpu_state = None;
                self.window = None;
            }
            Err(e) => log::error!("Render error: {:?}", e),
        }
    }
}

fn title_with_fps(title: &str, fps: f32) -> String {
    format!("{} - {:.0} fps", title, fps)
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                log::error!("{}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.pointer.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.release();
                }
                self.engine.release();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Space) => self.clock.toggle_pause(),
                        PhysicalKey::Code(KeyCode::KeyR) => self.engine.reset_motion(),
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Right {
                    self.orbiting = state == ElementState::Pressed;
                    if !self.orbiting {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.orbiting {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        let dx = position.x - last_x;
                        let dy = position.y - last_y;
                        if let Some(gpu_state) = &mut self.gpu_state {
                            gpu_state.camera.orbit(-dx as f32 * 0.005, dy as f32 * 0.005);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.camera.zoom(scroll * 0.3);
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame();
                match &self.window {
                    Some(window) => window.request_redraw(),
                    None => event_loop.exit(),
                }
            }
            _ => {}
        }
    }
}
