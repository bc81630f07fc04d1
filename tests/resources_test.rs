use std::rc::Rc;

use graph_ngin::{
    data_structures::{material::Material, texture::Texture2D},
    gpu::{DeviceCommand, ImageData, RecordingDevice, TextureOptions, VertexLayout},
    resources::{ResourceError, ResourceManager},
};

use crate::common::test_utils::{FRAGMENT_SOURCE, TRIANGLE, VERTEX_SOURCE};

mod common;

fn count(device: &RecordingDevice, matches: impl Fn(&DeviceCommand) -> bool) -> usize {
    device.commands().iter().filter(|c| matches(c)).count()
}

fn pixel(device: &mut RecordingDevice) -> Texture2D {
    Texture2D::new(device, &ImageData::solid(1, 1, [0; 4]), TextureOptions::default())
}

#[test]
fn should_keep_first_resource_for_duplicate_names() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();

    let first = resources
        .load_shader_from_str(&mut device, "basic", VERTEX_SOURCE, FRAGMENT_SOURCE)
        .unwrap()
        .unwrap();
    let second = resources
        .load_shader_from_str(&mut device, "basic", VERTEX_SOURCE, FRAGMENT_SOURCE)
        .unwrap();

    assert!(second.is_none());
    assert_eq!(resources.shader("basic").unwrap().handle(), first.handle());
    assert_eq!(
        count(&device, |c| matches!(c, DeviceCommand::CreateProgram(_))),
        1
    );

    let mesh = resources.create_mesh(&mut device, "tri", &TRIANGLE, VertexLayout::Float3, None);
    assert!(mesh.is_some());
    let again = resources.create_indexed_mesh(
        &mut device,
        "tri",
        &TRIANGLE,
        &[0, 1, 2],
        VertexLayout::Float3,
        None,
    );
    assert!(again.is_none());
    assert_eq!(
        count(&device, |c| matches!(c, DeviceCommand::CreateVertexArray { .. })),
        1
    );

    let texture = pixel(&mut device);
    assert!(resources.add_texture("white", texture).is_some());
    let texture = pixel(&mut device);
    assert!(resources.add_texture("white", texture).is_none());
}

#[test]
fn should_attach_registered_material_by_name() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();
    resources
        .load_shader_from_str(&mut device, "basic", VERTEX_SOURCE, FRAGMENT_SOURCE)
        .unwrap();
    let flat = resources.load_material("flat", "basic").unwrap().unwrap();

    let found = resources
        .create_indexed_mesh_by_material(
            &mut device,
            "tri",
            &TRIANGLE,
            &[0, 1, 2],
            VertexLayout::Float3,
            "flat",
        )
        .unwrap();
    let missing = resources
        .create_mesh_by_material(&mut device, "bare", &TRIANGLE, VertexLayout::Float3, "glossy")
        .unwrap();

    assert!(Rc::ptr_eq(found.shared_material().unwrap(), &flat));
    assert!(found.is_indexed());
    assert!(missing.shared_material().is_none());
    assert!(!missing.is_indexed());
    assert!(
        resources
            .create_mesh_by_material(&mut device, "bare", &TRIANGLE, VertexLayout::Float3, "flat")
            .is_none()
    );
}

#[test]
fn should_not_compile_shader_under_taken_name() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();
    resources
        .load_shader_from_str(&mut device, "basic", VERTEX_SOURCE, FRAGMENT_SOURCE)
        .unwrap();

    let result = resources.load_shader_from_str(&mut device, "basic", "", "");

    assert!(matches!(result, Ok(None)));
}

#[test]
fn should_report_compile_errors() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();

    let result = resources.load_shader_from_str(&mut device, "broken", VERTEX_SOURCE, " ");

    assert!(result.is_err());
    assert!(resources.shader("broken").is_none());
}

#[test]
fn should_create_unlit_material_for_known_shader() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();
    let program = resources
        .load_shader_from_str(&mut device, "basic", VERTEX_SOURCE, FRAGMENT_SOURCE)
        .unwrap()
        .unwrap();

    let material = resources.load_material("plain", "basic").unwrap().unwrap();
    assert!(!material.borrow().lighting_supported());
    assert_eq!(material.borrow().program().handle(), program.handle());
    assert!(resources.load_material("plain", "basic").unwrap().is_none());

    let err = resources.load_material("fancy", "missing").unwrap_err();
    assert!(matches!(
        err,
        ResourceError::UnknownShader { ref material, ref shader }
            if material == "fancy" && shader == "missing"
    ));
    assert!(resources.material("fancy").is_none());
}

#[test]
fn should_look_up_textures_in_bulk() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();
    let texture = Texture2D::new(
        &mut device,
        &ImageData::solid(2, 2, [9; 4]),
        TextureOptions::default(),
    );
    resources.add_texture("a", texture);

    let found = resources.textures(&["a", "b"]);

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].as_ref().unwrap().width(), 2);
    assert!(found[1].is_none());
}

#[test]
fn should_dispose_everything_once() {
    let mut device = RecordingDevice::new();
    let mut resources = ResourceManager::new();
    let program = resources
        .load_shader_from_str(&mut device, "basic", VERTEX_SOURCE, FRAGMENT_SOURCE)
        .unwrap()
        .unwrap();
    let texture = pixel(&mut device);
    let texture = resources.add_texture("white", texture).unwrap();
    resources.add_material("plain", Material::new(program.clone()));
    resources.create_mesh(&mut device, "tri", &TRIANGLE, VertexLayout::Float3, None);
    device.take_commands();

    resources.dispose(&mut device);
    resources.dispose(&mut device);
    program.dispose(&mut device);

    assert_eq!(device.commands().len(), 3);
    assert!(device.commands().contains(&DeviceCommand::DeleteProgram(program.handle())));
    assert!(program.is_disposed());
    assert!(texture.handle().is_none());
    assert!(resources.shader("basic").is_none());
    assert!(resources.material("plain").is_none());
    assert!(resources.mesh("tri").is_none());
}
