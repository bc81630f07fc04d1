//! Light sources and their uniform layout.
//!
//! A light writes itself into an array of uniform structs named after its
//! kind (`dirLights`, `pointLights`, `spotLights`). The renderer picks the
//! array index; the light's position is the origin of its node's global
//! matrix.

use cgmath::{InnerSpace, Matrix4, Vector3, Zero};

use crate::{data_structures::shader::ShaderProgram, gpu::GraphicsDevice};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Directional {
        direction: Vector3<f32>,
    },
    Point {
        constant: f32,
        linear: f32,
        quadratic: f32,
    },
    Spot {
        direction: Vector3<f32>,
        constant: f32,
        linear: f32,
        quadratic: f32,
        /// Cosine of the inner cone angle.
        cut_off: f32,
        /// Cosine of the outer cone angle.
        outer_cut_off: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub kind: LightKind,
}

fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    if v.is_zero() { v } else { v.normalize() }
}

impl Light {
    pub fn directional(
        direction: Vector3<f32>,
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
    ) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            kind: LightKind::Directional {
                direction: normalize_or_zero(direction),
            },
        }
    }

    /// Point light with attenuation `1 / (constant + linear d + quadratic d^2)`.
    pub fn point(
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
        constant: f32,
        linear: f32,
        quadratic: f32,
    ) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            kind: LightKind::Point {
                constant,
                linear,
                quadratic,
            },
        }
    }

    /// Spot light. Angles are given as cosines.
    #[allow(clippy::too_many_arguments)]
    pub fn spot(
        direction: Vector3<f32>,
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
        constant: f32,
        linear: f32,
        quadratic: f32,
        cut_off: f32,
        outer_cut_off: f32,
    ) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            kind: LightKind::Spot {
                direction: normalize_or_zero(direction),
                constant,
                linear,
                quadratic,
                cut_off,
                outer_cut_off,
            },
        }
    }

    /// Name of the uniform array this light is written into.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            LightKind::Directional { .. } => "dirLights",
            LightKind::Point { .. } => "pointLights",
            LightKind::Spot { .. } => "spotLights",
        }
    }

    /// Write this light into `<type_name>[index]` of the bound program.
    pub fn apply(
        &self,
        index: u32,
        global: &Matrix4<f32>,
        program: &ShaderProgram,
        device: &mut dyn GraphicsDevice,
    ) {
        let prefix = format!("{}[{}]", self.type_name(), index);
        let mut set = |field: &str, value: crate::gpu::UniformValue| {
            program.set_uniform(device, &format!("{prefix}.{field}"), value);
        };
        set("enabled", true.into());
        set("position", global.w.truncate().into());
        set("ambient", self.ambient.into());
        set("diffuse", self.diffuse.into());
        set("specular", self.specular.into());
        match self.kind {
            LightKind::Directional { direction } => {
                set("direction", direction.into());
            }
            LightKind::Point {
                constant,
                linear,
                quadratic,
            } => {
                set("constant", constant.into());
                set("linear", linear.into());
                set("quadratic", quadratic.into());
            }
            LightKind::Spot {
                direction,
                constant,
                linear,
                quadratic,
                cut_off,
                outer_cut_off,
            } => {
                set("direction", direction.into());
                set("constant", constant.into());
                set("linear", linear.into());
                set("quadratic", quadratic.into());
                set("cutOff", cut_off.into());
                set("outerCutOff", outer_cut_off.into());
            }
        }
    }
}
