//! Scene state and the per-frame sequence.
//!
//! A [`Scene`] bundles the renderer (and through it the device and camera),
//! the resource registry and the root of the scene graph. Application logic
//! lives in a [`GraphicsFlow`], which the engine loop drives:
//!
//! 1. clear the frame
//! 2. [`GraphicsFlow::on_update`]
//! 3. only with [`EngineConfig::update_graph`]:
//!    [`SceneObject::update`](crate::data_structures::scene_graph::SceneObject::update)
//!    on every node, then global matrices are refreshed
//! 4. [`GraphicsFlow::on_draw`] for immediate draws
//! 5. draw the scene graph
//! 6. present
//!
//! Without `update_graph` the scene graph is left alone between frames; the
//! flow calls `update_all` and `update_global_matrix` itself when it moves
//! things.
//!
//! [`Scene::frame`] runs exactly this sequence and does not need a window,
//! so it can be driven with any [`GraphicsDevice`].

use std::time::Duration;

use cgmath::Deg;

use crate::{
    camera::{Camera, Projection},
    data_structures::scene_graph::Transform,
    gpu::GraphicsDevice,
    render::BasicRenderer,
    resources::ResourceManager,
};

/// Window and camera settings.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_colour: [f32; 4],
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub vsync: bool,
    /// Run `update_all` and `update_global_matrix` on the root every frame.
    pub update_graph: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "graph-ngin".to_string(),
            width: 800,
            height: 600,
            clear_colour: [0.1, 0.1, 0.1, 1.0],
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            vsync: true,
            update_graph: false,
        }
    }
}

/// Application callbacks.
///
/// 1. `on_init()` is called once after the device exists; load resources and
///    build the scene graph here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame before the scene graph update
/// 4. `on_draw()` is called every frame before the scene graph is drawn
pub trait GraphicsFlow<D: GraphicsDevice> {
    fn on_init(&mut self, scene: &mut Scene<D>) -> anyhow::Result<()>;

    /// Per-frame logic with the time since the last frame.
    fn on_update(&mut self, _scene: &mut Scene<D>, _dt: Duration) {}

    /// Draw things outside the scene graph.
    fn on_draw(&mut self, _renderer: &mut BasicRenderer<D>) {}

    #[cfg(feature = "window")]
    fn on_window_events(&mut self, _scene: &mut Scene<D>, _event: &winit::event::WindowEvent) {}
}

pub struct Scene<D: GraphicsDevice> {
    pub renderer: BasicRenderer<D>,
    pub resources: ResourceManager,
    pub clear_colour: [f32; 4],
    pub update_graph: bool,
    root: Transform,
    close_requested: bool,
}

impl<D: GraphicsDevice> Scene<D> {
    /// A scene with a light-tracking root and a camera at `(0, 0, 3)`
    /// looking down -z.
    pub fn new(device: D, config: &EngineConfig) -> Self {
        let projection = Projection::new(
            config.width,
            config.height,
            Deg(config.fov),
            config.near,
            config.far,
        );
        let camera = Camera::new((0.0, 0.0, 3.0), Deg(-90.0), Deg(0.0)).with_projection(projection);
        let root = Transform::light_tracking();
        let mut renderer = BasicRenderer::new(device, camera);
        renderer.set_lighting_tracker(Some(&root));
        Self {
            renderer,
            resources: ResourceManager::new(),
            clear_colour: config.clear_colour,
            update_graph: config.update_graph,
            root,
            close_requested: false,
        }
    }

    pub fn root(&self) -> &Transform {
        &self.root
    }

    pub fn device(&mut self) -> &mut D {
        self.renderer.device_mut()
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        self.renderer.camera_mut()
    }

    /// Ask the engine loop to stop after the current frame.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn is_close_requested(&self) -> bool {
        self.close_requested
    }

    /// Render one frame.
    pub fn frame<F: GraphicsFlow<D> + ?Sized>(&mut self, flow: &mut F, dt: Duration) {
        self.renderer.device_mut().clear(self.clear_colour);
        flow.on_update(self, dt);
        if self.update_graph {
            self.root.update_all(dt.as_secs_f32());
            self.root.update_global_matrix();
        }
        flow.on_draw(&mut self.renderer);
        self.renderer.render_tree(&self.root);
        self.renderer.device_mut().present();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.renderer.camera_mut().projection.resize(width, height);
        self.renderer.device_mut().resize(width, height);
    }

    /// Release the GPU resources of the scene graph and the registry.
    pub fn dispose(&mut self) {
        let device = self.renderer.device_mut();
        self.root.dispose(device);
        self.resources.dispose(device);
    }
}
