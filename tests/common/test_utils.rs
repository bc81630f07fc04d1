use std::{cell::RefCell, rc::Rc};

use graph_ngin::{
    Deg, Matrix4,
    camera::Camera,
    data_structures::{
        material::{Material, SharedMaterial},
        mesh::Mesh,
        node::{Node, NodeEvents},
        shader::ShaderProgram,
    },
    gpu::{DeviceCommand, RecordingDevice, VertexLayout},
    render::BasicRenderer,
};

pub const VERTEX_SOURCE: &str = "@vertex fn vs_main() {}";
pub const FRAGMENT_SOURCE: &str = "@fragment fn fs_main() {}";

pub const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

pub fn program(device: &mut RecordingDevice) -> Rc<ShaderProgram> {
    Rc::new(ShaderProgram::new(device, VERTEX_SOURCE, FRAGMENT_SOURCE).expect("test program"))
}

pub fn camera() -> Camera {
    Camera::new((0.0, 0.0, 3.0), Deg(-90.0), Deg(0.0))
}

pub fn renderer() -> BasicRenderer<RecordingDevice> {
    BasicRenderer::new(RecordingDevice::new(), camera())
}

pub fn lit_material(device: &mut RecordingDevice) -> SharedMaterial {
    Material::standard(program(device)).into_shared()
}

pub fn unlit_material(device: &mut RecordingDevice) -> SharedMaterial {
    Material::new(program(device)).into_shared()
}

pub fn triangle(device: &mut RecordingDevice, material: Option<SharedMaterial>) -> Rc<Mesh> {
    Rc::new(Mesh::indexed(
        device,
        &TRIANGLE,
        &[0, 1, 2],
        VertexLayout::Float3,
        material,
    ))
}

/// Names of all uniforms written, in order.
pub fn written_names(device: &RecordingDevice) -> Vec<String> {
    device
        .uniform_writes()
        .into_iter()
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Commands without uniform writes, for checking the binding order.
pub fn non_uniform_commands(device: &RecordingDevice) -> Vec<DeviceCommand> {
    device
        .commands()
        .iter()
        .filter(|command| !matches!(command, DeviceCommand::SetUniform { .. }))
        .cloned()
        .collect()
}

pub fn assert_matrix_eq(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    let actual: [[f32; 4]; 4] = actual.into();
    let expected: [[f32; 4]; 4] = expected.into();
    for (a, e) in actual.iter().flatten().zip(expected.iter().flatten()) {
        assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
    }
}

/// Tree value that logs every structural notification.
pub struct Recorder {
    pub name: &'static str,
    pub log: Rc<RefCell<Vec<String>>>,
}

pub type RecorderNode = Node<Recorder>;

pub fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> RecorderNode {
    Node::new(Recorder {
        name,
        log: Rc::clone(log),
    })
}

fn push(node: &RecorderNode, entry: String) {
    let log = Rc::clone(&node.borrow().log);
    log.borrow_mut().push(entry);
}

impl NodeEvents for Recorder {
    fn on_children_changed(node: &RecorderNode, child: &RecorderNode, added: bool) {
        let entry = format!(
            "children {} {} {}",
            node.borrow().name,
            if added { "+" } else { "-" },
            child.borrow().name
        );
        push(node, entry);
    }

    fn on_parent_changed(node: &RecorderNode) {
        let entry = format!("parent {}", node.borrow().name);
        push(node, entry);
    }

    fn on_tree_changed(node: &RecorderNode, changed: &RecorderNode, added: bool) {
        let entry = format!(
            "tree {} {} {}",
            node.borrow().name,
            if added { "+" } else { "-" },
            changed.borrow().name
        );
        push(node, entry);
    }
}
