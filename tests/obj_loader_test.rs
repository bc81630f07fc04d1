use std::rc::Rc;

use graph_ngin::{
    gpu::{DeviceCommand, RecordingDevice, VertexLayout},
    resources::{
        ResourceManager,
        obj::{ObjError, load_obj, parse_obj_str},
    },
};

use crate::common::test_utils::{lit_material, unlit_material};

mod common;

const TRIANGLE_OBJ: &str = "\
# one triangle
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vn 0 0 1
f 1/1/1 2/1/1 3/1/1
";

const SPLIT_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
vt 0 0
vn 0 0 1
vn 0 1 0
f 1/1/1 2/1/1 3/1/1
f 1/1/2 3/1/2 4/1/2
f 1/1/2 2/1/1 4/1/2
";

const TWO_OBJECTS_OBJ: &str = "\
mtllib scene.mtl
o first
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vn 0 0 1
usemtl red
s off
f 1/1/1 2/1/1 3/1/1
o second
v 1 1 0
usemtl green
usemtl blue
f 1/1/1 3/1/1 4/1/1
";

#[test]
fn should_parse_single_triangle() {
    let model = parse_obj_str(TRIANGLE_OBJ).unwrap();

    assert_eq!(model.len(), 1);
    let mesh = &model.meshes()[0];
    assert_eq!(mesh.name, None);
    assert_eq!(mesh.material_name, None);
    assert_eq!(mesh.indices, [0, 1, 2]);
    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
    assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    assert_eq!(mesh.vertex_buffer().len(), 3 * 8);
}

#[test]
fn should_split_positions_used_with_different_normals() {
    let model = parse_obj_str(SPLIT_OBJ).unwrap();
    let mesh = &model.meshes()[0];

    assert_eq!(mesh.indices, [0, 1, 2, 4, 5, 3, 4, 1, 3]);
    assert_eq!(mesh.vertices.len(), 6);
    assert_eq!(mesh.vertices[4].position, mesh.vertices[0].position);
    assert_eq!(mesh.vertices[4].normal, [0.0, 1.0, 0.0]);
    assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    assert_eq!(mesh.vertices[5].position, [0.0, 1.0, 0.0]);
}

#[test]
fn should_emit_one_mesh_per_object() {
    let model = parse_obj_str(TWO_OBJECTS_OBJ).unwrap();

    assert_eq!(model.len(), 2);
    let first = model.mesh("first").unwrap();
    assert_eq!(first.material_name.as_deref(), Some("red"));
    assert_eq!(first.indices, [0, 1, 2]);
    assert_eq!(first.vertices.len(), 3);

    let second = model.mesh("second").unwrap();
    assert_eq!(second.material_name.as_deref(), Some("blue"));
    assert_eq!(second.indices, [0, 2, 3]);
    assert_eq!(second.vertices.len(), 4);
    assert!(model.mesh("third").is_none());
}

#[test]
fn should_skip_unnamed_objects_and_materials() {
    let source = format!("o\nusemtl\n{TRIANGLE_OBJ}o\n");
    let model = parse_obj_str(&source).unwrap();

    assert_eq!(model.len(), 1);
    let mesh = &model.meshes()[0];
    assert_eq!(mesh.name, None);
    assert_eq!(mesh.material_name, None);
    assert_eq!(mesh.indices, [0, 1, 2]);
}

#[test]
fn should_resolve_negative_references() {
    let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf -3/-1/-1 -2/-1/-1 -1/-1/-1\n";
    let model = parse_obj_str(source).unwrap();
    assert_eq!(model.meshes()[0].indices, [0, 1, 2]);
}

#[test]
fn should_reject_quads() {
    let source = format!("{TRIANGLE_OBJ}v 1 1 0\nf 1/1/1 2/1/1 4/1/1 3/1/1\n");
    let err = parse_obj_str(&source).unwrap_err();
    assert!(matches!(err, ObjError::NotTriangle { line: 9, found: 4 }), "{err}");
}

#[test]
fn should_reject_corners_without_uv_and_normal() {
    let base = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\n";
    for face in ["f 1 2 3", "f 1//1 2//1 3//1", "f 1/1 2/1 3/1"] {
        let err = parse_obj_str(&format!("{base}{face}\n")).unwrap_err();
        assert!(matches!(err, ObjError::MissingComponents { line: 6 }), "{face}: {err}");
    }
}

#[test]
fn should_reject_mixed_corner_formats() {
    let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1 3/1/1\n";
    let err = parse_obj_str(source).unwrap_err();
    assert!(matches!(err, ObjError::InconsistentFace { line: 6 }), "{err}");
}

#[test]
fn should_reject_out_of_range_references() {
    let source = format!("{TRIANGLE_OBJ}f 1/1/1 2/1/1 5/1/1\n");
    let err = parse_obj_str(&source).unwrap_err();
    assert!(
        matches!(
            err,
            ObjError::IndexOutOfRange {
                line: 8,
                kind: "position",
                index: 5
            }
        ),
        "{err}"
    );

    let source = format!("{TRIANGLE_OBJ}f 1/1/0 2/1/1 3/1/1\n");
    let err = parse_obj_str(&source).unwrap_err();
    assert!(matches!(err, ObjError::IndexOutOfRange { kind: "normal", .. }), "{err}");
}

#[test]
fn should_report_bad_numbers() {
    let err = parse_obj_str("v 0 zero 0\n").unwrap_err();
    assert!(matches!(err, ObjError::InvalidNumber { line: 1, ref token } if token == "zero"));

    let err = parse_obj_str("vn 0 1\n").unwrap_err();
    assert!(matches!(err, ObjError::MissingValue { line: 1, .. }));
}

#[test]
fn should_upload_meshes_with_registered_materials() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();
    let red = lit_material(&mut device);
    resources.insert_material("red", Rc::clone(&red)).unwrap();
    let fallback = unlit_material(&mut device);
    device.take_commands();

    let model = parse_obj_str(TWO_OBJECTS_OBJ).unwrap();
    let meshes = model.to_meshes(&mut device, &resources, Some(Rc::clone(&fallback)));

    assert_eq!(meshes.len(), 2);
    assert!(Rc::ptr_eq(meshes[0].shared_material().unwrap(), &red));
    assert!(Rc::ptr_eq(meshes[1].shared_material().unwrap(), &fallback));
    assert_eq!(meshes[1].count(), 3);
    assert!(matches!(
        device.commands()[1],
        DeviceCommand::CreateVertexArray {
            layout: VertexLayout::Float3x3x2,
            vertices: 4,
            indices: Some(3),
            ..
        }
    ));
}

#[test]
fn should_load_obj_files() {
    let path = std::env::temp_dir().join(format!("graph-ngin-{}-triangle.obj", std::process::id()));
    std::fs::write(&path, TRIANGLE_OBJ).unwrap();

    let model = load_obj(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(model.meshes()[0].indices, [0, 1, 2]);
    assert!(load_obj(&path).is_err());
}
