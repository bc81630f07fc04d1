//! A device without a GPU.
//!
//! [`RecordingDevice`] accepts every call of the [`GraphicsDevice`] trait and
//! appends it to a command log, resolving uniform locations back to their
//! names. Renderers, materials and loaders can be driven and inspected without
//! a window or adapter.

use std::collections::{HashMap, HashSet};

use super::{
    GraphicsDevice, ImageData, ProgramHandle, ShaderError, ShaderStage, TextureHandle,
    TextureOptions, UniformLocation, UniformValue, VertexArrayHandle, VertexLayout,
};

/// One recorded device call.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCommand {
    CreateProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    SetUniform { name: String, value: UniformValue },
    CreateTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
    },
    BindTexture {
        unit: u32,
        texture: Option<TextureHandle>,
    },
    DeleteTexture(TextureHandle),
    /// `vertices` counts vertices, not floats.
    CreateVertexArray {
        vertex_array: VertexArrayHandle,
        layout: VertexLayout,
        vertices: usize,
        indices: Option<usize>,
    },
    DeleteVertexArray(VertexArrayHandle),
    Draw {
        vertex_array: VertexArrayHandle,
        count: u32,
        indexed: bool,
    },
    Clear([f32; 4]),
    Present,
    Resize { width: u32, height: u32 },
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    known_uniforms: Option<HashSet<String>>,
    locations: HashMap<(ProgramHandle, String), UniformLocation>,
    location_names: Vec<String>,
    location_lookups: usize,
    next_handle: u32,
}

impl RecordingDevice {
    /// A device on which every uniform name resolves.
    pub fn new() -> Self {
        Self::default()
    }

    /// A device on which only `names` resolve to uniform locations.
    pub fn with_known_uniforms<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_uniforms: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drain the log.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// How often [`GraphicsDevice::uniform_location`] was asked.
    pub fn location_lookups(&self) -> usize {
        self.location_lookups
    }

    /// All `SetUniform` writes in order, as `(name, value)`.
    pub fn uniform_writes(&self) -> Vec<(&str, UniformValue)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::SetUniform { name, value } => Some((name.as_str(), *value)),
                _ => None,
            })
            .collect()
    }

    /// Number of `Draw` commands.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DeviceCommand::Draw { .. }))
            .count()
    }

    fn next_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, ShaderError> {
        if vertex_source.trim().is_empty() {
            return Err(ShaderError::Compile {
                stage: ShaderStage::Vertex,
                log: "empty source".to_string(),
            });
        }
        if fragment_source.trim().is_empty() {
            return Err(ShaderError::Compile {
                stage: ShaderStage::Fragment,
                log: "empty source".to_string(),
            });
        }
        let handle = ProgramHandle(self.next_handle());
        self.commands.push(DeviceCommand::CreateProgram(handle));
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.commands.push(DeviceCommand::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.location_lookups += 1;
        if let Some(known) = &self.known_uniforms {
            if !known.contains(name) {
                return None;
            }
        }
        let key = (program, name.to_string());
        if let Some(location) = self.locations.get(&key) {
            return Some(*location);
        }
        let location = UniformLocation(self.location_names.len() as u32);
        self.location_names.push(name.to_string());
        self.locations.insert(key, location);
        Some(location)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let name = self
            .location_names
            .get(location.0 as usize)
            .cloned()
            .unwrap_or_else(|| format!("<location {}>", location.0));
        self.commands.push(DeviceCommand::SetUniform {
            name,
            value: *value,
        });
    }

    fn create_texture(&mut self, image: &ImageData, _options: TextureOptions) -> TextureHandle {
        let texture = TextureHandle(self.next_handle());
        self.commands.push(DeviceCommand::CreateTexture {
            texture,
            width: image.width,
            height: image.height,
        });
        texture
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.commands.push(DeviceCommand::BindTexture { unit, texture });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.commands.push(DeviceCommand::DeleteTexture(texture));
    }

    fn create_vertex_array(
        &mut self,
        vertices: &[f32],
        layout: VertexLayout,
        indices: Option<&[u32]>,
    ) -> VertexArrayHandle {
        let vertex_array = VertexArrayHandle(self.next_handle());
        self.commands.push(DeviceCommand::CreateVertexArray {
            vertex_array,
            layout,
            vertices: vertices.len() / layout.stride() as usize,
            indices: indices.map(<[u32]>::len),
        });
        vertex_array
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.commands.push(DeviceCommand::DeleteVertexArray(vertex_array));
    }

    fn draw(&mut self, vertex_array: VertexArrayHandle, count: u32, indexed: bool) {
        self.commands.push(DeviceCommand::Draw {
            vertex_array,
            count,
            indexed,
        });
    }

    fn clear(&mut self, colour: [f32; 4]) {
        self.commands.push(DeviceCommand::Clear(colour));
    }

    fn present(&mut self) {
        self.commands.push(DeviceCommand::Present);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.commands.push(DeviceCommand::Resize { width, height });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_reject_empty_shader_sources() {
        let mut device = RecordingDevice::new();
        let err = device.create_program("  \n", "void main() {}").unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        assert!(device.commands().is_empty());
    }

    #[test]
    fn should_map_locations_back_to_names() {
        let mut device = RecordingDevice::new();
        let program = device.create_program("vs", "fs").unwrap();
        let a = device.uniform_location(program, "model").unwrap();
        let b = device.uniform_location(program, "model").unwrap();
        assert_eq!(a, b);
        device.set_uniform(a, &UniformValue::Float(2.0));
        assert_eq!(device.uniform_writes(), vec![("model", UniformValue::Float(2.0))]);
    }

    #[test]
    fn should_only_resolve_known_uniforms() {
        let mut device = RecordingDevice::with_known_uniforms(["view"]);
        let program = device.create_program("vs", "fs").unwrap();
        assert!(device.uniform_location(program, "view").is_some());
        assert!(device.uniform_location(program, "projection").is_none());
        assert_eq!(device.location_lookups(), 2);
    }
}
