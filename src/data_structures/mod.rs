//! Engine data structures: the tree, the scene graph and what hangs in it.
//!
//! - `node` is the generic parent/children tree with change notifications
//! - `scene_graph` contains transforms, scene objects, light tracking and switchers
//! - `light` holds light sources and their uniform layout
//! - `material` pairs a shader program with uniform values and textures
//! - `mesh` contains GPU meshes, mesh nodes and models
//! - `shader` wraps programs and caches uniform locations
//! - `shapes` provides built-in cube, plane and icosahedron geometry
//! - `texture` contains 2D textures and image decoding

pub mod light;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene_graph;
pub mod shader;
pub mod shapes;
pub mod texture;
