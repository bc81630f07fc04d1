//! Materials: a shader program plus the uniform values and textures bound
//! with it for every draw.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    data_structures::{shader::ShaderProgram, texture::Texture2D},
    gpu::UniformValue,
};

/// A material shared between meshes.
pub type SharedMaterial = Rc<RefCell<Material>>;

/// A named texture slot. The slot's position in [`Material::textures`] is
/// its texture unit.
#[derive(Clone, Debug)]
pub struct TextureAttribute {
    pub name: String,
    pub texture: Rc<Texture2D>,
}

#[derive(Debug)]
pub struct Material {
    program: Rc<ShaderProgram>,
    attributes: HashMap<String, UniformValue>,
    textures: Vec<TextureAttribute>,
    lighting_supported: bool,
}

impl Material {
    /// Material without attributes and without lighting.
    pub fn new(program: Rc<ShaderProgram>) -> Self {
        Self {
            program,
            attributes: HashMap::new(),
            textures: Vec::new(),
            lighting_supported: false,
        }
    }

    /// Lit material with `material.shininess` set to 32.
    pub fn standard(program: Rc<ShaderProgram>) -> Self {
        let mut material = Self::new(program);
        material.lighting_supported = true;
        material.set_shininess(32.0);
        material
    }

    /// A new material with its own copy of the attributes. Program and
    /// textures stay shared.
    pub fn copy(&self) -> Self {
        Self {
            program: Rc::clone(&self.program),
            attributes: self.attributes.clone(),
            textures: self.textures.clone(),
            lighting_supported: self.lighting_supported,
        }
    }

    pub fn into_shared(self) -> SharedMaterial {
        Rc::new(RefCell::new(self))
    }

    pub fn program(&self) -> &Rc<ShaderProgram> {
        &self.program
    }

    pub fn lighting_supported(&self) -> bool {
        self.lighting_supported
    }

    pub fn set_lighting_supported(&mut self, supported: bool) {
        self.lighting_supported = supported;
    }

    /// Set or replace a uniform value.
    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<UniformValue> {
        self.attributes.get(name).copied()
    }

    pub fn attributes(&self) -> &HashMap<String, UniformValue> {
        &self.attributes
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<UniformValue> {
        self.attributes.remove(name)
    }

    pub fn textures(&self) -> &[TextureAttribute] {
        &self.textures
    }

    /// Bind `texture` to the sampler `name`, or remove the slot with `None`.
    ///
    /// Replacing a slot moves it to the last texture unit.
    pub fn set_texture(&mut self, name: &str, texture: Option<Rc<Texture2D>>) {
        self.textures.retain(|attribute| attribute.name != name);
        if let Some(texture) = texture {
            self.textures.push(TextureAttribute {
                name: name.to_string(),
                texture,
            });
        }
    }

    pub fn set_shininess(&mut self, shininess: f32) {
        self.add_attribute("material.shininess", shininess);
    }

    pub fn set_diffuse_texture(&mut self, texture: Option<Rc<Texture2D>>) {
        self.set_texture("material.diffuse", texture);
    }

    pub fn set_specular_texture(&mut self, texture: Option<Rc<Texture2D>>) {
        self.set_texture("material.specular", texture);
    }
}
