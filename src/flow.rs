//! Application event loop.
//!
//! [`run`] opens a window, creates a [`WgpuDevice`] and a [`Scene`], hands
//! the scene to [`GraphicsFlow::on_init`] and then renders a frame on every
//! redraw until the window is closed or the flow calls
//! [`Scene::request_close`].
//!
//! # Lifecycle Flow
//!
//! 1. Collect window events and pass them to `on_window_events`
//! 2. Measure the time since the last frame
//! 3. [`Scene::frame`]: clear, `on_update`, scene graph update (if
//!    enabled), `on_draw`,
//!    draw the scene graph, present
//! 4. Request the next redraw
//!
//! On exit the scene graph and the resource registry are disposed.

use std::sync::Arc;

use futures::executor::block_on;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    gpu::wgpu_device::WgpuDevice,
    scene::{EngineConfig, GraphicsFlow, Scene},
};

struct App<F: GraphicsFlow<WgpuDevice>> {
    config: EngineConfig,
    flow: F,
    scene: Option<Scene<WgpuDevice>>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl<F: GraphicsFlow<WgpuDevice>> App<F> {
    fn new(config: EngineConfig, flow: F) -> Self {
        Self {
            config,
            flow,
            scene: None,
            last_time: Instant::now(),
            error: None,
        }
    }

    /// Keep the first start-up error for `run` and stop the loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<Scene<WgpuDevice>> {
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let device = block_on(WgpuDevice::new(window, self.config.vsync))?;
        let mut scene = Scene::new(device, &self.config);
        self.flow.on_init(&mut scene)?;
        Ok(scene)
    }
}

impl<F: GraphicsFlow<WgpuDevice>> ApplicationHandler for App<F> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(scene) => {
                scene.renderer.device_ref().window().request_redraw();
                self.last_time = Instant::now();
                self.scene = Some(scene);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let scene = match &mut self.scene {
            Some(scene) => scene,
            None => return,
        };

        self.flow.on_window_events(scene, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => scene.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                scene.frame(&mut self.flow, dt);

                if scene.is_close_requested() {
                    event_loop.exit();
                } else {
                    scene.renderer.device_ref().window().request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = &mut self.scene {
            scene.dispose();
        }
    }
}

/// Open a window and drive `flow` until the window closes.
pub fn run<F: GraphicsFlow<WgpuDevice>>(config: EngineConfig, flow: F) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<()> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<()> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<()> = EventLoop::new()?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, flow);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
