//! Shader programs with cached uniform locations.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::Path,
};

use anyhow::Context;
use cgmath::{Matrix4, Point3, Vector3};

use crate::gpu::{GraphicsDevice, ProgramHandle, ShaderError, UniformLocation, UniformValue};

/// A linked vertex + fragment program.
///
/// Uniform locations are looked up once per name and cached. Names that are
/// not active uniforms of the program log one warning and writes to them are
/// dropped.
#[derive(Debug)]
pub struct ShaderProgram {
    handle: ProgramHandle,
    disposed: Cell<bool>,
    locations: RefCell<HashMap<String, Option<UniformLocation>>>,
}

impl ShaderProgram {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let handle = device.create_program(vertex_source, fragment_source)?;
        Ok(Self {
            handle,
            disposed: Cell::new(false),
            locations: RefCell::new(HashMap::new()),
        })
    }

    /// Read both stages from disk and build the program.
    pub fn from_files(
        device: &mut dyn GraphicsDevice,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();
        let vertex_source = std::fs::read_to_string(vertex_path)
            .with_context(|| format!("reading vertex shader {}", vertex_path.display()))?;
        let fragment_source = std::fs::read_to_string(fragment_path)
            .with_context(|| format!("reading fragment shader {}", fragment_path.display()))?;
        let program = Self::new(device, &vertex_source, &fragment_source).with_context(|| {
            format!(
                "building program from {} and {}",
                vertex_path.display(),
                fragment_path.display()
            )
        })?;
        Ok(program)
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        if !self.disposed.get() {
            device.use_program(Some(self.handle));
        }
    }

    pub fn unbind(&self, device: &mut dyn GraphicsDevice) {
        device.use_program(None);
    }

    /// Write a uniform of the bound program. Unknown names are ignored.
    pub fn set_uniform(
        &self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        value: impl Into<UniformValue>,
    ) {
        if let Some(location) = self.location(device, name) {
            device.set_uniform(location, &value.into());
        }
    }

    /// `projection`, `view` and `viewPos`.
    pub fn set_camera_uniforms(
        &self,
        device: &mut dyn GraphicsDevice,
        projection: Matrix4<f32>,
        view: Matrix4<f32>,
        position: Point3<f32>,
    ) {
        self.set_uniform(device, "projection", projection);
        self.set_uniform(device, "view", view);
        self.set_uniform(device, "viewPos", Vector3::new(position.x, position.y, position.z));
    }

    fn location(&self, device: &mut dyn GraphicsDevice, name: &str) -> Option<UniformLocation> {
        if let Some(cached) = self.locations.borrow().get(name) {
            return *cached;
        }
        let location = device.uniform_location(self.handle, name);
        if location.is_none() {
            log::warn!(
                "uniform '{}' is not active in program {:?}, writes to it are dropped",
                name,
                self.handle
            );
        }
        self.locations.borrow_mut().insert(name.to_string(), location);
        location
    }

    /// Delete the program. Later calls do nothing.
    pub fn dispose(&self, device: &mut dyn GraphicsDevice) {
        if !self.disposed.replace(true) {
            log::debug!("deleting program {:?}", self.handle);
            device.delete_program(self.handle);
        }
    }
}
