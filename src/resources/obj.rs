//! Wavefront OBJ loading.
//!
//! Supported directives: `v`, `vt`, `vn`, `f` (triangles with
//! `position/uv/normal` references), `o` and `usemtl`. `mtllib`, `g`, `s`
//! and comments are skipped, as are `o` and `usemtl` lines without a name.
//!
//! OBJ references position, uv and normal independently, while a vertex
//! buffer needs one index per (position, normal, uv) combination. Every
//! position starts out as one vertex slot. The first face corner that uses it
//! fixes its normal and uv; a later corner with a different pair gets a
//! duplicate slot with the same position, appended at the end and chained to
//! the first slot so that further corners can find and reuse it.
//!
//! Indices are global to the file, so every object's [`RawMesh`] carries the
//! whole vertex table and only its own indices.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    rc::Rc,
};

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::{
    data_structures::{material::SharedMaterial, mesh::Mesh},
    gpu::{GraphicsDevice, VertexLayout},
    resources::ResourceManager,
};

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to read OBJ data: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: faces must be triangles, found {found} corners")]
    NotTriangle { line: usize, found: usize },
    #[error("line {line}: face corners need position, uv and normal references")]
    MissingComponents { line: usize },
    #[error("line {line}: face corners reference different attribute sets")]
    InconsistentFace { line: usize },
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: '{directive}' is missing a value")]
    MissingValue { line: usize, directive: String },
    #[error("line {line}: {kind} index {index} is out of range")]
    IndexOutOfRange {
        line: usize,
        kind: &'static str,
        index: i64,
    },
}

/// Interleaved vertex, matching [`VertexLayout::Float3x3x2`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Parsed, not yet uploaded mesh of one OBJ object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMesh {
    pub name: Option<String>,
    pub material_name: Option<String>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl RawMesh {
    /// Vertices as a flat float slice.
    pub fn vertex_buffer(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn to_mesh(&self, device: &mut dyn GraphicsDevice, material: Option<SharedMaterial>) -> Mesh {
        Mesh::indexed(
            device,
            self.vertex_buffer(),
            &self.indices,
            VertexLayout::Float3x3x2,
            material,
        )
    }
}

/// All objects of one OBJ file, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawModel {
    meshes: Vec<RawMesh>,
}

impl RawModel {
    pub fn new(meshes: Vec<RawMesh>) -> Self {
        Self { meshes }
    }

    pub fn meshes(&self) -> &[RawMesh] {
        &self.meshes
    }

    pub fn into_meshes(self) -> Vec<RawMesh> {
        self.meshes
    }

    /// Mesh by object name. With repeated names the last object wins.
    pub fn mesh(&self, name: &str) -> Option<&RawMesh> {
        self.meshes
            .iter()
            .rev()
            .find(|mesh| mesh.name.as_deref() == Some(name))
    }

    pub fn mesh_at(&self, index: usize) -> Option<&RawMesh> {
        self.meshes.get(index)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Upload every mesh with the material registered under its
    /// `usemtl` name, or `default_material` if there is none.
    pub fn to_meshes(
        &self,
        device: &mut dyn GraphicsDevice,
        resources: &ResourceManager,
        default_material: Option<SharedMaterial>,
    ) -> Vec<Rc<Mesh>> {
        self.meshes
            .iter()
            .map(|raw| {
                let material = raw
                    .material_name
                    .as_deref()
                    .and_then(|name| resources.material(name));
                let material = match material {
                    Some(material) => Some(material),
                    None => {
                        log::warn!(
                            "no material '{}' for mesh '{}', using the default material",
                            raw.material_name.as_deref().unwrap_or("<none>"),
                            raw.name.as_deref().unwrap_or("<unnamed>")
                        );
                        default_material.clone()
                    }
                };
                Rc::new(raw.to_mesh(device, material))
            })
            .collect()
    }
}

struct Vert {
    position: [f32; 3],
    /// (normal, uv) once a face used this slot.
    attributes: Option<(usize, usize)>,
    duplicate: Option<usize>,
}

#[derive(Default)]
struct ObjParser {
    verts: Vec<Vert>,
    /// Slot of the first vert of each `v` line.
    position_slots: Vec<usize>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    object_name: Option<String>,
    material_name: Option<String>,
    meshes: Vec<RawMesh>,
}

fn parse_floats<const N: usize>(
    tokens: &[&str],
    line: usize,
    directive: &str,
) -> Result<[f32; N], ObjError> {
    if tokens.len() < N {
        return Err(ObjError::MissingValue {
            line,
            directive: directive.to_string(),
        });
    }
    let mut out = [0.0; N];
    for (value, token) in out.iter_mut().zip(tokens) {
        *value = token.parse().map_err(|_| ObjError::InvalidNumber {
            line,
            token: token.to_string(),
        })?;
    }
    Ok(out)
}

/// Resolve a 1-based (or negative, relative) OBJ reference to a 0-based index.
fn resolve_index(token: &str, len: usize, kind: &'static str, line: usize) -> Result<usize, ObjError> {
    let raw: i64 = token.parse().map_err(|_| ObjError::InvalidNumber {
        line,
        token: token.to_string(),
    })?;
    let index = if raw < 0 { len as i64 + raw } else { raw - 1 };
    if raw == 0 || index < 0 || index >= len as i64 {
        return Err(ObjError::IndexOutOfRange {
            line,
            kind,
            index: raw,
        });
    }
    Ok(index as usize)
}

impl ObjParser {
    fn parse_line(&mut self, text: &str, line: usize) -> Result<(), ObjError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let Some((&directive, args)) = tokens.split_first() else {
            return Ok(());
        };
        match directive {
            "v" => {
                let position = parse_floats::<3>(args, line, directive)?;
                self.position_slots.push(self.verts.len());
                self.verts.push(Vert {
                    position,
                    attributes: None,
                    duplicate: None,
                });
            }
            "vt" => self.uvs.push(parse_floats::<2>(args, line, directive)?),
            "vn" => self.normals.push(parse_floats::<3>(args, line, directive)?),
            "f" => self.parse_face(args, line)?,
            "usemtl" | "o" if args.is_empty() => {
                log::warn!("line {}: '{}' without a name, skipping", line, directive);
            }
            "usemtl" => self.material_name = Some(args.join(" ")),
            "o" => {
                let name = args.join(" ");
                if self.object_name.is_some() || !self.indices.is_empty() {
                    self.finish_object();
                }
                self.object_name = Some(name);
            }
            "mtllib" | "g" | "s" => {}
            d if d.starts_with('#') => {}
            other => log::debug!("line {}: skipping unsupported OBJ directive '{}'", line, other),
        }
        Ok(())
    }

    fn parse_face(&mut self, groups: &[&str], line: usize) -> Result<(), ObjError> {
        if groups.len() != 3 {
            return Err(ObjError::NotTriangle {
                line,
                found: groups.len(),
            });
        }
        let corners: Vec<Vec<&str>> = groups.iter().map(|g| g.split('/').collect()).collect();
        if corners[0].len() != 3 {
            return Err(ObjError::MissingComponents { line });
        }
        if corners.iter().any(|c| c.len() != corners[0].len()) {
            return Err(ObjError::InconsistentFace { line });
        }
        if corners.iter().flatten().any(|component| component.is_empty()) {
            return Err(ObjError::MissingComponents { line });
        }

        // validate all corners before touching any vertex slot
        let mut resolved = [(0, 0, 0); 3];
        for (entry, corner) in resolved.iter_mut().zip(&corners) {
            let position = resolve_index(corner[0], self.position_slots.len(), "position", line)?;
            *entry = (
                self.position_slots[position],
                resolve_index(corner[2], self.normals.len(), "normal", line)?,
                resolve_index(corner[1], self.uvs.len(), "uv", line)?,
            );
        }
        for (slot, normal, uv) in resolved {
            let index = self.vertex_index(slot, normal, uv);
            self.indices.push(index as u32);
        }
        Ok(())
    }

    /// Slot for a position with the given normal and uv, following and
    /// extending the duplicate chain that starts at `slot`.
    fn vertex_index(&mut self, slot: usize, normal: usize, uv: usize) -> usize {
        let mut current = slot;
        loop {
            let vert = &self.verts[current];
            let (attributes, duplicate, shared_position) =
                (vert.attributes, vert.duplicate, vert.position);
            match attributes {
                None => {
                    self.verts[current].attributes = Some((normal, uv));
                    return current;
                }
                Some(existing) if existing == (normal, uv) => return current,
                Some(_) => {}
            }
            match duplicate {
                Some(next) => current = next,
                None => {
                    let new_index = self.verts.len();
                    self.verts[current].duplicate = Some(new_index);
                    self.verts.push(Vert {
                        position: shared_position,
                        attributes: Some((normal, uv)),
                        duplicate: None,
                    });
                    return new_index;
                }
            }
        }
    }

    fn finish_object(&mut self) {
        let vertices = self
            .verts
            .iter()
            .map(|vert| match vert.attributes {
                Some((normal, uv)) => Vertex {
                    position: vert.position,
                    normal: self.normals[normal],
                    uv: self.uvs[uv],
                },
                None => Vertex {
                    position: vert.position,
                    ..Vertex::default()
                },
            })
            .collect();
        self.meshes.push(RawMesh {
            name: self.object_name.take(),
            material_name: self.material_name.clone(),
            vertices,
            indices: std::mem::take(&mut self.indices),
        });
    }

    fn finish(mut self) -> RawModel {
        if self.object_name.is_some() || !self.indices.is_empty() || self.meshes.is_empty() {
            self.finish_object();
        }
        RawModel::new(self.meshes)
    }
}

/// Parse OBJ text from a reader.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<RawModel, ObjError> {
    let mut parser = ObjParser::default();
    for (number, text) in reader.lines().enumerate() {
        parser.parse_line(&text?, number + 1)?;
    }
    Ok(parser.finish())
}

pub fn parse_obj_str(source: &str) -> Result<RawModel, ObjError> {
    parse_obj(source.as_bytes())
}

/// Load and parse an OBJ file.
pub fn load_obj(path: impl AsRef<Path>) -> anyhow::Result<RawModel> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening OBJ file {}", path.display()))?;
    let model = parse_obj(BufReader::new(file))
        .with_context(|| format!("parsing OBJ file {}", path.display()))?;

    log::info!("loaded {} with {} mesh(es)", path.display(), model.len());
    for mesh in model.meshes() {
        log::info!(
            "  mesh '{}': material '{}', {} vertices, {} indices",
            mesh.name.as_deref().unwrap_or("<unnamed>"),
            mesh.material_name.as_deref().unwrap_or("<none>"),
            mesh.vertices.len(),
            mesh.indices.len()
        );
    }
    Ok(model)
}
