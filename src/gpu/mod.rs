//! Immediate-mode GPU collaborator.
//!
//! Everything the engine needs from a graphics API goes through the
//! [`GraphicsDevice`] trait: programs and uniforms, 2D textures, vertex arrays,
//! draws and frame control. Resources are referred to by small `Copy` handles
//! that the device hands out.
//!
//! - [`headless::RecordingDevice`] records every call and is always built.
//! - `wgpu_device::WgpuDevice` (feature `window`) replays the calls with wgpu.
//! - [`reflect`] turns WGSL uniform declarations into GL-style uniform names.

pub mod headless;
pub mod reflect;
#[cfg(feature = "window")]
pub mod wgpu_device;

use cgmath::{Matrix3, Matrix4, Vector3};
use thiserror::Error;

pub use headless::{DeviceCommand, RecordingDevice};

/// Number of texture units a device exposes.
pub const MAX_TEXTURE_UNITS: u32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

/// Resolved uniform slot of one program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A typed uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Vec3(Vector3<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(value: Vector3<f32>) -> Self {
        Self::Vec3(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vec3(value.into())
    }
}

impl From<Matrix3<f32>> for UniformValue {
    fn from(value: Matrix3<f32>) -> Self {
        Self::Mat3(value)
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(value: Matrix4<f32>) -> Self {
        Self::Mat4(value)
    }
}

/// Interleaved float vertex layouts. Each number is the component count of
/// one attribute, bound to consecutive locations starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// position
    Float3,
    /// position, normal
    Float3x3,
    /// position, uv
    Float3x2,
    /// position, normal, uv
    Float3x3x2,
}

impl VertexLayout {
    pub fn components(&self) -> &'static [u32] {
        match self {
            VertexLayout::Float3 => &[3],
            VertexLayout::Float3x3 => &[3, 3],
            VertexLayout::Float3x2 => &[3, 2],
            VertexLayout::Float3x3x2 => &[3, 3, 2],
        }
    }

    /// Floats per vertex.
    pub fn stride(&self) -> u32 {
        self.components().iter().sum()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Sampling setup of a 2D texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureOptions {
    pub wrap: WrapMode,
    pub filter: FilterMode,
    pub mipmaps: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            wrap: WrapMode::Repeat,
            filter: FilterMode::Linear,
            mipmaps: true,
        }
    }
}

/// Decoded RGBA8 pixels, first row at the bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Bytes of RGBA8 pixel data for a `width` x `height` image.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// A single-colour image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to compile {stage:?} shader: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link shader program: {0}")]
    Link(String),
    #[error(transparent)]
    Reflect(#[from] reflect::ReflectError),
}

/// The immediate-mode graphics API the engine draws with.
///
/// State is global to the device: one bound program, one texture per unit.
/// Uniform writes apply to the currently bound program.
pub trait GraphicsDevice {
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, ShaderError>;

    fn delete_program(&mut self, program: ProgramHandle);

    /// Bind a program, or unbind with `None`.
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Location of an active uniform, `None` if the program has no such uniform.
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    fn create_texture(&mut self, image: &ImageData, options: TextureOptions) -> TextureHandle;

    /// Bind a texture to a unit, or clear the unit with `None`.
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    fn delete_texture(&mut self, texture: TextureHandle);

    /// Upload interleaved float vertices and optional triangle indices.
    fn create_vertex_array(
        &mut self,
        vertices: &[f32],
        layout: VertexLayout,
        indices: Option<&[u32]>,
    ) -> VertexArrayHandle;

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Draw `count` indices (or vertices when not `indexed`) as triangles with
    /// the bound program, uniforms and textures.
    fn draw(&mut self, vertex_array: VertexArrayHandle, count: u32, indexed: bool);

    fn clear(&mut self, colour: [f32; 4]);

    fn present(&mut self);

    fn resize(&mut self, _width: u32, _height: u32) {}
}
