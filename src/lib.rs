//! graph-ngin
//!
//! A small scene-graph engine: a tree of transforms carrying meshes, models
//! and lights, a forward renderer that binds materials and lights per draw,
//! a resource registry and a Wavefront OBJ loader. Rendering goes through an
//! immediate-mode device trait so the whole engine can run headless.
//!
//! High-level modules
//! - `camera`: perspective camera producing view/projection matrices
//! - `data_structures`: tree, scene graph, lights, materials, meshes, textures
//! - `flow`: winit application loop (feature `window`)
//! - `gpu`: the device trait, a recording device and the wgpu backend
//! - `render`: scene traversal and the material/light binding protocol
//! - `resources`: named resource registry and the OBJ loader
//! - `scene`: scene state, per-frame sequence and application callbacks
//!

pub mod camera;
pub mod data_structures;
#[cfg(feature = "window")]
pub mod flow;
pub mod gpu;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
#[cfg(feature = "window")]
pub use winit::event::WindowEvent;
