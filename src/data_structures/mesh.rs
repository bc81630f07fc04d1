//! GPU meshes and the scene objects that draw them.

use std::{cell::Cell, rc::Rc};

use cgmath::Matrix4;

use crate::{
    data_structures::{
        material::SharedMaterial,
        scene_graph::{Disposable, SceneObject},
    },
    gpu::{GraphicsDevice, VertexArrayHandle, VertexLayout},
    render::{Drawable, DrawableRenderer},
};

/// Vertex data uploaded to the device, optionally with a material.
#[derive(Debug)]
pub struct Mesh {
    vertex_array: Cell<Option<VertexArrayHandle>>,
    count: u32,
    indexed: bool,
    material: Option<SharedMaterial>,
}

impl Mesh {
    /// Mesh drawn with an index buffer; `count` is the number of indices.
    pub fn indexed(
        device: &mut dyn GraphicsDevice,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        material: Option<SharedMaterial>,
    ) -> Self {
        let vertex_array = device.create_vertex_array(vertices, layout, Some(indices));
        Self {
            vertex_array: Cell::new(Some(vertex_array)),
            count: indices.len() as u32,
            indexed: true,
            material,
        }
    }

    /// Mesh drawn straight from its vertices, three per triangle.
    pub fn non_indexed(
        device: &mut dyn GraphicsDevice,
        vertices: &[f32],
        layout: VertexLayout,
        material: Option<SharedMaterial>,
    ) -> Self {
        let vertex_array = device.create_vertex_array(vertices, layout, None);
        Self {
            vertex_array: Cell::new(Some(vertex_array)),
            count: vertices.len() as u32 / layout.stride(),
            indexed: false,
            material,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// `None` once disposed.
    pub fn vertex_array(&self) -> Option<VertexArrayHandle> {
        self.vertex_array.get()
    }

    pub fn shared_material(&self) -> Option<&SharedMaterial> {
        self.material.as_ref()
    }
}

impl Drawable for Mesh {
    fn material(&self) -> Option<SharedMaterial> {
        self.material.clone()
    }

    fn draw(&self, renderer: &mut dyn DrawableRenderer, _model: &Matrix4<f32>) {
        match self.vertex_array.get() {
            Some(vertex_array) => renderer.device().draw(vertex_array, self.count, self.indexed),
            None => log::warn!("skipping draw of a disposed mesh"),
        }
    }
}

impl Disposable for Mesh {
    fn dispose(&self, device: &mut dyn GraphicsDevice) {
        if let Some(vertex_array) = self.vertex_array.take() {
            log::debug!("deleting vertex array {:?}", vertex_array);
            device.delete_vertex_array(vertex_array);
        }
    }
}

/// Scene object drawing one shared mesh.
#[derive(Debug)]
pub struct MeshNode {
    pub mesh: Rc<Mesh>,
}

impl MeshNode {
    pub fn new(mesh: Rc<Mesh>) -> Self {
        Self { mesh }
    }
}

impl SceneObject for MeshNode {
    fn drawable(&self) -> Option<&dyn Drawable> {
        Some(self.mesh.as_ref())
    }

    fn disposable(&self) -> Option<&dyn Disposable> {
        Some(self.mesh.as_ref())
    }
}

/// Several meshes drawn with the same model matrix, each with its own
/// material.
#[derive(Debug, Default)]
pub struct Model {
    meshes: Vec<Rc<Mesh>>,
}

impl Model {
    pub fn new(meshes: Vec<Rc<Mesh>>) -> Self {
        Self { meshes }
    }

    pub fn meshes(&self) -> &[Rc<Mesh>] {
        &self.meshes
    }
}

impl Drawable for Model {
    fn material(&self) -> Option<SharedMaterial> {
        None
    }

    fn draw(&self, renderer: &mut dyn DrawableRenderer, model: &Matrix4<f32>) {
        for mesh in &self.meshes {
            renderer.render(mesh.as_ref(), model);
        }
    }
}

impl Disposable for Model {
    fn dispose(&self, device: &mut dyn GraphicsDevice) {
        for mesh in &self.meshes {
            mesh.dispose(device);
        }
    }
}

impl SceneObject for Model {
    fn drawable(&self) -> Option<&dyn Drawable> {
        Some(self)
    }

    fn disposable(&self) -> Option<&dyn Disposable> {
        Some(self)
    }
}
