//! Named registry of GPU resources and the loaders that fill it.
//!
//! [`ResourceManager`] owns shaders, textures, meshes and materials under
//! unique names. Registering a name twice keeps the first resource and
//! returns `None` without creating anything on the device. `dispose`
//! releases everything the manager holds and may be called repeatedly.
//!
//! - `obj` parses Wavefront OBJ files into [`obj::RawModel`]s

pub mod obj;

use std::{collections::HashMap, path::Path, rc::Rc};

use thiserror::Error;

use crate::{
    data_structures::{
        material::{Material, SharedMaterial},
        mesh::Mesh,
        scene_graph::Disposable,
        shader::ShaderProgram,
        texture::Texture2D,
    },
    gpu::{GraphicsDevice, ShaderError, TextureOptions, VertexLayout},
};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("unknown shader '{shader}' for material '{material}'")]
    UnknownShader { material: String, shader: String },
}

#[derive(Debug, Default)]
pub struct ResourceManager {
    shaders: HashMap<String, Rc<ShaderProgram>>,
    textures: HashMap<String, Rc<Texture2D>>,
    meshes: HashMap<String, Rc<Mesh>>,
    materials: HashMap<String, SharedMaterial>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a program from sources. `Ok(None)` if `name` is taken.
    pub fn load_shader_from_str(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Option<Rc<ShaderProgram>>, ShaderError> {
        if self.shaders.contains_key(name) {
            return Ok(None);
        }
        let program = Rc::new(ShaderProgram::new(device, vertex_source, fragment_source)?);
        self.shaders.insert(name.to_string(), Rc::clone(&program));
        Ok(Some(program))
    }

    /// Build a program from two source files. `Ok(None)` if `name` is taken.
    pub fn load_shader(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> anyhow::Result<Option<Rc<ShaderProgram>>> {
        if self.shaders.contains_key(name) {
            return Ok(None);
        }
        let program = Rc::new(ShaderProgram::from_files(device, vertex_path, fragment_path)?);
        self.shaders.insert(name.to_string(), Rc::clone(&program));
        Ok(Some(program))
    }

    /// Decode and upload an image file. `Ok(None)` if `name` is taken.
    pub fn load_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> anyhow::Result<Option<Rc<Texture2D>>> {
        if self.textures.contains_key(name) {
            return Ok(None);
        }
        let texture = Rc::new(Texture2D::from_file(device, path, options)?);
        self.textures.insert(name.to_string(), Rc::clone(&texture));
        Ok(Some(texture))
    }

    pub fn add_texture(&mut self, name: &str, texture: Texture2D) -> Option<Rc<Texture2D>> {
        if self.textures.contains_key(name) {
            return None;
        }
        let texture = Rc::new(texture);
        self.textures.insert(name.to_string(), Rc::clone(&texture));
        Some(texture)
    }

    /// Create an unlit material for the shader registered as `shader_name`.
    ///
    /// `Ok(None)` if `name` is taken, an error if the shader is unknown.
    pub fn load_material(
        &mut self,
        name: &str,
        shader_name: &str,
    ) -> Result<Option<SharedMaterial>, ResourceError> {
        if self.materials.contains_key(name) {
            return Ok(None);
        }
        let program = self
            .shader(shader_name)
            .ok_or_else(|| ResourceError::UnknownShader {
                material: name.to_string(),
                shader: shader_name.to_string(),
            })?;
        let material = Material::new(program).into_shared();
        self.materials.insert(name.to_string(), Rc::clone(&material));
        Ok(Some(material))
    }

    pub fn add_material(&mut self, name: &str, material: Material) -> Option<SharedMaterial> {
        self.insert_material(name, material.into_shared())
    }

    /// Register an already shared material.
    pub fn insert_material(&mut self, name: &str, material: SharedMaterial) -> Option<SharedMaterial> {
        if self.materials.contains_key(name) {
            return None;
        }
        self.materials.insert(name.to_string(), Rc::clone(&material));
        Some(material)
    }

    pub fn add_mesh(&mut self, name: &str, mesh: Mesh) -> Option<Rc<Mesh>> {
        self.insert_mesh(name, Rc::new(mesh))
    }

    pub fn insert_mesh(&mut self, name: &str, mesh: Rc<Mesh>) -> Option<Rc<Mesh>> {
        if self.meshes.contains_key(name) {
            return None;
        }
        self.meshes.insert(name.to_string(), Rc::clone(&mesh));
        Some(mesh)
    }

    /// Upload an indexed mesh. `None` if `name` is taken.
    pub fn create_indexed_mesh(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        material: Option<SharedMaterial>,
    ) -> Option<Rc<Mesh>> {
        if self.meshes.contains_key(name) {
            return None;
        }
        self.add_mesh(name, Mesh::indexed(device, vertices, indices, layout, material))
    }

    /// Upload a non-indexed mesh. `None` if `name` is taken.
    pub fn create_mesh(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        vertices: &[f32],
        layout: VertexLayout,
        material: Option<SharedMaterial>,
    ) -> Option<Rc<Mesh>> {
        if self.meshes.contains_key(name) {
            return None;
        }
        self.add_mesh(name, Mesh::non_indexed(device, vertices, layout, material))
    }

    /// [`create_indexed_mesh`](Self::create_indexed_mesh) with the material
    /// registered as `material_name`. An unknown material gives a mesh
    /// without one.
    pub fn create_indexed_mesh_by_material(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        material_name: &str,
    ) -> Option<Rc<Mesh>> {
        let material = self.material_or_warn(name, material_name);
        self.create_indexed_mesh(device, name, vertices, indices, layout, material)
    }

    /// [`create_mesh`](Self::create_mesh) with the material registered as
    /// `material_name`. An unknown material gives a mesh without one.
    pub fn create_mesh_by_material(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        vertices: &[f32],
        layout: VertexLayout,
        material_name: &str,
    ) -> Option<Rc<Mesh>> {
        let material = self.material_or_warn(name, material_name);
        self.create_mesh(device, name, vertices, layout, material)
    }

    fn material_or_warn(&self, mesh_name: &str, material_name: &str) -> Option<SharedMaterial> {
        let material = self.material(material_name);
        if material.is_none() {
            log::warn!("mesh '{}': unknown material '{}', drawing without one", mesh_name, material_name);
        }
        material
    }

    pub fn shader(&self, name: &str) -> Option<Rc<ShaderProgram>> {
        self.shaders.get(name).cloned()
    }

    pub fn texture(&self, name: &str) -> Option<Rc<Texture2D>> {
        self.textures.get(name).cloned()
    }

    /// Look up several textures at once, keeping misses as `None`.
    pub fn textures(&self, names: &[&str]) -> Vec<Option<Rc<Texture2D>>> {
        names.iter().map(|name| self.texture(name)).collect()
    }

    pub fn mesh(&self, name: &str) -> Option<Rc<Mesh>> {
        self.meshes.get(name).cloned()
    }

    pub fn material(&self, name: &str) -> Option<SharedMaterial> {
        self.materials.get(name).cloned()
    }

    /// Release every shader, texture and mesh and forget all names.
    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        log::debug!(
            "disposing {} shaders, {} textures, {} meshes",
            self.shaders.len(),
            self.textures.len(),
            self.meshes.len()
        );
        for shader in self.shaders.values() {
            shader.dispose(device);
        }
        for texture in self.textures.values() {
            texture.dispose(device);
        }
        for mesh in self.meshes.values() {
            mesh.dispose(device);
        }
        self.shaders.clear();
        self.textures.clear();
        self.meshes.clear();
        self.materials.clear();
    }
}
