//! Built-in geometry.

use std::rc::Rc;

use crate::{
    data_structures::{material::SharedMaterial, mesh::Mesh},
    gpu::{GraphicsDevice, VertexLayout},
};

const T: f32 = 0.618; // (sqrt(5) - 1) / 2

/// Icosahedron positions, [`VertexLayout::Float3`].
#[rustfmt::skip]
pub const ICOSAHEDRON_VERTICES: [f32; 36] = [
     0.0,  1.0,    T,
     0.0,  1.0,   -T,
     1.0,    T,  0.0,
     1.0,   -T,  0.0,
     0.0, -1.0,   -T,
     0.0, -1.0,    T,
       T,  0.0,  1.0,
      -T,  0.0,  1.0,
       T,  0.0, -1.0,
      -T,  0.0, -1.0,
    -1.0,    T,  0.0,
    -1.0,   -T,  0.0,
];

#[rustfmt::skip]
pub const ICOSAHEDRON_INDICES: [u32; 60] = [
    0, 6, 2,    2, 6, 3,    3, 6, 5,    7, 5, 6,
    0, 7, 6,    8, 2, 3,    8, 1, 2,    0, 2, 1,
    10, 0, 1,   10, 1, 9,   9, 1, 8,    8, 3, 4,
    3, 5, 4,    11, 4, 5,   11, 7, 10,  0, 10, 7,
    4, 11, 9,   4, 9, 8,    11, 5, 7,   9, 11, 10,
];

/// Unit cube as 36 non-indexed vertices, [`VertexLayout::Float3x3x2`].
#[rustfmt::skip]
pub const CUBE_VERTICES: [f32; 288] = [
    // positions        normals            uv
    -0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 0.0,
     0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 0.0,
     0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 1.0,
     0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 1.0,
    -0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 1.0,
    -0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 0.0,

    -0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 0.0,
     0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 0.0,
     0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 1.0,
     0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 1.0,
    -0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 1.0,
    -0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 0.0,

    -0.5,  0.5,  0.5,  -1.0,  0.0,  0.0,   1.0, 0.0,
    -0.5,  0.5, -0.5,  -1.0,  0.0,  0.0,   1.0, 1.0,
    -0.5, -0.5, -0.5,  -1.0,  0.0,  0.0,   0.0, 1.0,
    -0.5, -0.5, -0.5,  -1.0,  0.0,  0.0,   0.0, 1.0,
    -0.5, -0.5,  0.5,  -1.0,  0.0,  0.0,   0.0, 0.0,
    -0.5,  0.5,  0.5,  -1.0,  0.0,  0.0,   1.0, 0.0,

     0.5,  0.5,  0.5,   1.0,  0.0,  0.0,   1.0, 0.0,
     0.5,  0.5, -0.5,   1.0,  0.0,  0.0,   1.0, 1.0,
     0.5, -0.5, -0.5,   1.0,  0.0,  0.0,   0.0, 1.0,
     0.5, -0.5, -0.5,   1.0,  0.0,  0.0,   0.0, 1.0,
     0.5, -0.5,  0.5,   1.0,  0.0,  0.0,   0.0, 0.0,
     0.5,  0.5,  0.5,   1.0,  0.0,  0.0,   1.0, 0.0,

    -0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   0.0, 1.0,
     0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   1.0, 1.0,
     0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   1.0, 0.0,
     0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   1.0, 0.0,
    -0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   0.0, 0.0,
    -0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   0.0, 1.0,

    -0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   0.0, 1.0,
     0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   1.0, 1.0,
     0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   1.0, 0.0,
     0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   1.0, 0.0,
    -0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   0.0, 0.0,
    -0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   0.0, 1.0,
];

pub const CUBE_VERTEX_COUNT: u32 = 36;

/// Unit plane in the xz plane facing +y, [`VertexLayout::Float3x3x2`].
/// The uvs repeat `tile_u` by `tile_v` times.
#[rustfmt::skip]
pub fn plane_vertices(tile_u: u32, tile_v: u32) -> [f32; 32] {
    let (u, v) = (tile_u as f32, tile_v as f32);
    [
         0.5, 0.0,  0.5,   0.0, 1.0, 0.0,   u,   v,
         0.5, 0.0, -0.5,   0.0, 1.0, 0.0,   u,   0.0,
        -0.5, 0.0, -0.5,   0.0, 1.0, 0.0,   0.0, 0.0,
        -0.5, 0.0,  0.5,   0.0, 1.0, 0.0,   0.0, v,
    ]
}

pub const PLANE_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

pub fn cube(device: &mut dyn GraphicsDevice, material: Option<SharedMaterial>) -> Rc<Mesh> {
    Rc::new(Mesh::non_indexed(
        device,
        &CUBE_VERTICES,
        VertexLayout::Float3x3x2,
        material,
    ))
}

pub fn plane(
    device: &mut dyn GraphicsDevice,
    tile_u: u32,
    tile_v: u32,
    material: Option<SharedMaterial>,
) -> Rc<Mesh> {
    Rc::new(Mesh::indexed(
        device,
        &plane_vertices(tile_u, tile_v),
        &PLANE_INDICES,
        VertexLayout::Float3x3x2,
        material,
    ))
}

pub fn icosahedron(device: &mut dyn GraphicsDevice, material: Option<SharedMaterial>) -> Rc<Mesh> {
    Rc::new(Mesh::indexed(
        device,
        &ICOSAHEDRON_VERTICES,
        &ICOSAHEDRON_INDICES,
        VertexLayout::Float3,
        material,
    ))
}
