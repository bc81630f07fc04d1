//! WGSL uniform reflection.
//!
//! The engine addresses uniforms by GL-style names (`model`,
//! `material.shininess`, `pointLights[2].position`). WGSL has no such names,
//! only a uniform buffer whose struct layout follows the WGSL alignment rules.
//! This module parses a WGSL module with naga, takes the byte layout of the
//! uniform buffer at `@group(0) @binding(0)` and flattens it into one named
//! field per scalar, vector and matrix.
//!
//! Texture and sampler variables are collected as well; they are expected in
//! group 1, texture unit `i` using binding `2i` (texture) and `2i + 1`
//! (sampler).

use std::collections::HashMap;

use cgmath::Matrix3;
use naga::{
    AddressSpace, ArraySize, Handle, ImageClass, ImageDimension, Module, Scalar, ScalarKind,
    Type, TypeInner, VectorSize, proc::Layouter,
};
use thiserror::Error;

use super::UniformValue;

/// Group holding the uniform buffer.
pub const UNIFORM_GROUP: u32 = 0;
/// Group holding textures and samplers.
pub const TEXTURE_GROUP: u32 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum ReflectError {
    #[error("failed to parse WGSL:\n{0}")]
    Parse(String),
    #[error("failed to lay out WGSL types: {0}")]
    Layout(String),
    #[error("array '{0}' in a uniform buffer needs a fixed length")]
    UnsupportedArrayLength(String),
    #[error("'{name}' at group {group} binding {binding} is not supported")]
    UnsupportedBinding { name: String, group: u32, binding: u32 },
}

/// Storage type of one flattened uniform field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    F32,
    I32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub offset: u32,
    pub kind: FieldKind,
}

/// Byte layout of a uniform buffer, by flattened field name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformLayout {
    pub size: u32,
    fields: HashMap<String, UniformField>,
}

impl UniformLayout {
    pub fn field(&self, name: &str) -> Option<UniformField> {
        self.fields.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Encode `value` into `bytes` at `field`. Returns `false` if the value
    /// does not fit the field's type.
    pub fn write(bytes: &mut [u8], field: UniformField, value: &UniformValue) -> bool {
        let offset = field.offset as usize;
        let mut put = |at: usize, data: &[u8]| {
            if let Some(target) = bytes.get_mut(offset + at..offset + at + data.len()) {
                target.copy_from_slice(data);
            }
        };
        match (field.kind, value) {
            (FieldKind::F32, UniformValue::Float(v)) => put(0, bytemuck::bytes_of(v)),
            (FieldKind::F32, UniformValue::Int(v)) => put(0, bytemuck::bytes_of(&(*v as f32))),
            (FieldKind::F32, UniformValue::Bool(v)) => {
                put(0, bytemuck::bytes_of(&if *v { 1.0f32 } else { 0.0 }))
            }
            (FieldKind::I32, UniformValue::Int(v)) => put(0, bytemuck::bytes_of(v)),
            (FieldKind::I32, UniformValue::Bool(v)) => put(0, bytemuck::bytes_of(&(*v as i32))),
            (FieldKind::I32, UniformValue::Float(v)) => put(0, bytemuck::bytes_of(&(*v as i32))),
            (FieldKind::U32, UniformValue::Int(v)) => put(0, bytemuck::bytes_of(&(*v as u32))),
            (FieldKind::U32, UniformValue::Bool(v)) => put(0, bytemuck::bytes_of(&(*v as u32))),
            (FieldKind::Vec3 | FieldKind::Vec4, UniformValue::Vec3(v)) => {
                let data: [f32; 3] = (*v).into();
                put(0, bytemuck::cast_slice(&data))
            }
            (FieldKind::Mat3, UniformValue::Mat3(m)) => write_mat3(&mut put, m),
            (FieldKind::Mat3, UniformValue::Mat4(m)) => {
                let m = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
                write_mat3(&mut put, &m)
            }
            (FieldKind::Mat4, UniformValue::Mat4(m)) => {
                let data: [[f32; 4]; 4] = (*m).into();
                put(0, bytemuck::cast_slice(&data))
            }
            _ => return false,
        }
        true
    }
}

/// mat3x3 columns are padded to 16 bytes.
fn write_mat3(put: &mut impl FnMut(usize, &[u8]), m: &Matrix3<f32>) {
    let cols: [[f32; 3]; 3] = (*m).into();
    for (i, col) in cols.iter().enumerate() {
        put(i * 16, bytemuck::cast_slice(col));
    }
}

/// A texture or sampler variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceBinding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
}

impl ResourceBinding {
    /// Texture unit served by this binding.
    pub fn unit(&self) -> u32 {
        self.binding / 2
    }
}

/// What a WGSL module declares.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderReflection {
    pub uniforms: Option<UniformLayout>,
    pub textures: Vec<ResourceBinding>,
    pub samplers: Vec<ResourceBinding>,
}

impl ShaderReflection {
    /// Combine the declarations of two stages. The first uniform layout wins;
    /// bindings are deduplicated.
    pub fn merge(mut self, other: ShaderReflection) -> Self {
        if self.uniforms.is_none() {
            self.uniforms = other.uniforms;
        }
        for texture in other.textures {
            if !self.textures.contains(&texture) {
                self.textures.push(texture);
            }
        }
        for sampler in other.samplers {
            if !self.samplers.contains(&sampler) {
                self.samplers.push(sampler);
            }
        }
        self
    }

    /// Highest texture unit used plus one.
    pub fn texture_units(&self) -> u32 {
        self.textures
            .iter()
            .chain(&self.samplers)
            .map(|b| b.unit() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Read the declarations of a WGSL module.
pub fn reflect(source: &str) -> Result<ShaderReflection, ReflectError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| ReflectError::Parse(err.emit_to_string(source)))?;
    let mut layouter = Layouter::default();
    layouter
        .update(module.to_ctx())
        .map_err(|err| ReflectError::Layout(err.to_string()))?;
    let cx = LayoutCx {
        module: &module,
        layouter: &layouter,
    };

    let mut reflection = ShaderReflection::default();
    for (_, var) in module.global_variables.iter() {
        let name = var.name.clone().unwrap_or_default();
        let (group, binding) = var.binding.as_ref().map_or((0, 0), |b| (b.group, b.binding));
        let unsupported = || ReflectError::UnsupportedBinding {
            name: name.clone(),
            group,
            binding,
        };
        let target = || ResourceBinding {
            name: name.clone(),
            group,
            binding,
        };
        match (var.space, &module.types[var.ty].inner) {
            (
                AddressSpace::Handle,
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class: ImageClass::Sampled { .. },
                },
            ) => {
                if group != TEXTURE_GROUP {
                    return Err(unsupported());
                }
                reflection.textures.push(target());
            }
            (AddressSpace::Handle, TypeInner::Sampler { .. }) => {
                if group != TEXTURE_GROUP {
                    return Err(unsupported());
                }
                reflection.samplers.push(target());
            }
            (AddressSpace::Uniform, _) => {
                if group != UNIFORM_GROUP || binding != 0 || reflection.uniforms.is_some() {
                    return Err(unsupported());
                }
                reflection.uniforms = Some(cx.uniform_layout(&name, var.ty)?);
            }
            _ => {}
        }
    }
    reflection.textures.sort_by_key(|b| (b.group, b.binding));
    reflection.samplers.sort_by_key(|b| (b.group, b.binding));
    Ok(reflection)
}

const F32: Scalar = Scalar {
    kind: ScalarKind::Float,
    width: 4,
};

struct LayoutCx<'a> {
    module: &'a Module,
    layouter: &'a Layouter,
}

impl LayoutCx<'_> {
    fn uniform_layout(&self, var_name: &str, ty: Handle<Type>) -> Result<UniformLayout, ReflectError> {
        let mut layout = UniformLayout {
            size: self.layouter[ty].size,
            fields: HashMap::new(),
        };
        match &self.module.types[ty].inner {
            // members of the block struct are top-level names
            TypeInner::Struct { members, .. } => {
                for member in members {
                    let name = member.name.as_deref().unwrap_or_default();
                    self.flatten(name, member.ty, member.offset, &mut layout.fields)?;
                }
            }
            _ => self.flatten(var_name, ty, 0, &mut layout.fields)?,
        }
        Ok(layout)
    }

    fn flatten(
        &self,
        name: &str,
        ty: Handle<Type>,
        offset: u32,
        out: &mut HashMap<String, UniformField>,
    ) -> Result<(), ReflectError> {
        let mut leaf = |kind| {
            out.insert(name.to_string(), UniformField { offset, kind });
        };
        match &self.module.types[ty].inner {
            TypeInner::Scalar(scalar) => match scalar.kind {
                ScalarKind::Float if scalar.width == 4 => leaf(FieldKind::F32),
                ScalarKind::Sint if scalar.width == 4 => leaf(FieldKind::I32),
                ScalarKind::Uint if scalar.width == 4 => leaf(FieldKind::U32),
                _ => {}
            },
            TypeInner::Vector { size, scalar } if *scalar == F32 => match size {
                VectorSize::Bi => leaf(FieldKind::Vec2),
                VectorSize::Tri => leaf(FieldKind::Vec3),
                VectorSize::Quad => leaf(FieldKind::Vec4),
            },
            TypeInner::Matrix {
                columns: VectorSize::Tri,
                rows: VectorSize::Tri,
                scalar,
            } if *scalar == F32 => leaf(FieldKind::Mat3),
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if *scalar == F32 => leaf(FieldKind::Mat4),
            TypeInner::Array { base, size, stride } => {
                let ArraySize::Constant(len) = size else {
                    return Err(ReflectError::UnsupportedArrayLength(name.to_string()));
                };
                for i in 0..len.get() {
                    self.flatten(&format!("{name}[{i}]"), *base, offset + i * stride, out)?;
                }
                // `name` alone addresses the first element
                if let Some(first) = out.get(&format!("{name}[0]")).copied() {
                    out.insert(name.to_string(), first);
                }
            }
            TypeInner::Struct { members, .. } => {
                for member in members {
                    let member_name = member.name.as_deref().unwrap_or_default();
                    self.flatten(
                        &format!("{name}.{member_name}"),
                        member.ty,
                        offset + member.offset,
                        out,
                    )?;
                }
            }
            // not addressable from the engine side, still occupies its space
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix4, SquareMatrix, Vector3};

    const SHADER: &str = r#"
        const MAX_POINT_LIGHTS: u32 = 2u;

        // lights
        struct PointLight {
            position: vec3<f32>,
            constant: f32,
            diffuse: vec3f,
            enabled: i32,
        }

        struct Material {
            diffuse: i32,
            specular: i32,
            shininess: f32,
        }

        /* block /* nested */ comment */
        struct Uniforms {
            projection: mat4x4<f32>,
            modelNormal: mat3x3<f32>,
            viewPos: vec3<f32>,
            @align(16) material: Material,
            pointLights: array<PointLight, MAX_POINT_LIGHTS>,
            @align(16) tint: f32,
        }

        @group(0) @binding(0) var<uniform> u: Uniforms;
        @group(1) @binding(0) var diffuse_texture: texture_2d<f32>;
        @group(1) @binding(1) var diffuse_sampler: sampler;
        @group(1) @binding(2) var specular_texture: texture_2d<f32>;

        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
            let m = u.projection;
            if (true) { return m * vec4<f32>(position, 1.0); }
            return vec4<f32>(0.0);
        }
    "#;

    #[test]
    fn should_lay_out_uniform_struct() {
        let reflection = reflect(SHADER).unwrap();
        let layout = reflection.uniforms.unwrap();
        let offset = |name: &str| layout.field(name).map(|f| f.offset);

        assert_eq!(offset("projection"), Some(0));
        assert_eq!(offset("modelNormal"), Some(64));
        assert_eq!(offset("viewPos"), Some(112));
        assert_eq!(offset("material.diffuse"), Some(128));
        assert_eq!(offset("material.specular"), Some(132));
        assert_eq!(offset("material.shininess"), Some(136));
        assert_eq!(offset("pointLights[0].position"), Some(144));
        assert_eq!(offset("pointLights[0].constant"), Some(156));
        assert_eq!(offset("pointLights[0].diffuse"), Some(160));
        assert_eq!(offset("pointLights[0].enabled"), Some(172));
        assert_eq!(offset("pointLights[1].position"), Some(176));
        assert_eq!(offset("pointLights[2].position"), None);
        assert_eq!(offset("tint"), Some(208));
        assert_eq!(layout.size, 224);
        assert_eq!(layout.field("material.shininess").unwrap().kind, FieldKind::F32);
        assert_eq!(layout.field("modelNormal").unwrap().kind, FieldKind::Mat3);
    }

    #[test]
    fn should_size_arrays_by_const_and_hex_lengths() {
        let reflection = reflect(
            r#"
            struct Palette {
                colours: array<vec4<f32>, 0x4>,
                count: u32,
            }
            @group(0) @binding(0) var<uniform> palette: Palette;
            "#,
        )
        .unwrap();
        let layout = reflection.uniforms.unwrap();
        assert_eq!(layout.field("colours[3]").map(|f| f.offset), Some(48));
        assert_eq!(layout.field("colours").map(|f| f.offset), Some(0));
        assert_eq!(layout.field("count").map(|f| f.offset), Some(64));
        assert_eq!(layout.size, 80);

        let reflection = reflect(
            r#"
            const LIGHTS = 3u;
            @group(0) @binding(0) var<uniform> lights: array<vec4<f32>, LIGHTS>;
            "#,
        )
        .unwrap();
        let layout = reflection.uniforms.unwrap();
        assert_eq!(layout.field("lights[2]").map(|f| f.offset), Some(32));
        assert_eq!(layout.field("lights[3]"), None);
        assert_eq!(layout.size, 48);
    }

    #[test]
    fn should_reflect_demo_shader() {
        let reflection = reflect(include_str!("../../demos/shaders/lit.wgsl")).unwrap();
        let layout = reflection.uniforms.as_ref().unwrap();
        let offset = |name: &str| layout.field(name).map(|f| f.offset);

        assert_eq!(offset("modelNormal"), Some(192));
        assert_eq!(offset("viewPos"), Some(240));
        assert_eq!(offset("material.shininess"), Some(264));
        assert_eq!(offset("dirLights[1].specular"), Some(272 + 80 + 64));
        assert_eq!(offset("pointLights[3].enabled"), Some(432 + 3 * 64 + 60));
        assert_eq!(offset("spotLights[1].enabled"), Some(688 + 96 + 80));
        assert_eq!(layout.size, 880);
        assert_eq!(reflection.samplers.len(), 2);
        assert_eq!(reflection.texture_units(), 2);
    }

    #[test]
    fn should_collect_texture_bindings() {
        let reflection = reflect(SHADER).unwrap();
        let names: Vec<_> = reflection.textures.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["diffuse_texture", "specular_texture"]);
        assert_eq!(reflection.samplers.len(), 1);
        assert_eq!(reflection.texture_units(), 2);
    }

    #[test]
    fn should_reject_unknown_struct() {
        let err = reflect("@group(0) @binding(0) var<uniform> u: Missing;").unwrap_err();
        assert!(matches!(err, ReflectError::Parse(log) if log.contains("Missing")));
    }

    #[test]
    fn should_reject_textures_outside_texture_group() {
        let err = reflect("@group(0) @binding(3) var t: texture_2d<f32>;").unwrap_err();
        assert!(matches!(err, ReflectError::UnsupportedBinding { binding: 3, .. }));
    }

    #[test]
    fn should_pad_mat3_columns() {
        let field = UniformField {
            offset: 0,
            kind: FieldKind::Mat3,
        };
        let mut bytes = vec![0u8; 48];
        assert!(UniformLayout::write(
            &mut bytes,
            field,
            &UniformValue::Mat3(Matrix3::identity())
        ));
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[5], 1.0);
        assert_eq!(floats[10], 1.0);
        assert_eq!(floats[3], 0.0);
    }

    #[test]
    fn should_refuse_mismatched_values() {
        let field = UniformField {
            offset: 0,
            kind: FieldKind::Mat4,
        };
        let mut bytes = vec![0u8; 64];
        assert!(!UniformLayout::write(
            &mut bytes,
            field,
            &UniformValue::Vec3(Vector3::new(1.0, 2.0, 3.0))
        ));
        assert!(UniformLayout::write(
            &mut bytes,
            field,
            &UniformValue::Mat4(Matrix4::identity())
        ));
    }
}
