use std::{cell::RefCell, rc::Rc};

use graph_ngin::{
    Deg, Matrix4, SquareMatrix, Vector3,
    data_structures::{
        mesh::{MeshNode, Model},
        scene_graph::{SceneObject, Switcher, Transform},
    },
    gpu::{DeviceCommand, RecordingDevice},
};

use crate::common::test_utils::{assert_matrix_eq, triangle, unlit_material};

mod common;

fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(x, y, z))
}

/// Counts update calls and moves its node along x.
struct Mover {
    calls: Rc<RefCell<Vec<f32>>>,
}

impl SceneObject for Mover {
    fn update(&mut self, local_matrix: &mut Matrix4<f32>, dt: f32) {
        self.calls.borrow_mut().push(dt);
        *local_matrix = *local_matrix * translation(dt, 0.0, 0.0);
    }
}

#[test]
fn should_compose_global_matrices_down_the_tree() {
    let root = Transform::group();
    let arm = Transform::group();
    let hand = Transform::group();
    root.set_local_matrix(translation(1.0, 0.0, 0.0));
    arm.set_local_matrix(Matrix4::from_angle_z(Deg(90.0)));
    hand.set_local_matrix(translation(2.0, 0.0, 0.0));
    root.add_child(&arm);
    arm.add_child(&hand);

    root.update_global_matrix();

    for node in [&root, &arm, &hand] {
        let parent_global = node
            .parent()
            .map(|parent| parent.global_matrix())
            .unwrap_or_else(Matrix4::identity);
        assert_matrix_eq(node.global_matrix(), parent_global * node.local_matrix());
    }
    assert_matrix_eq(
        hand.global_matrix(),
        translation(1.0, 2.0, 0.0) * Matrix4::from_angle_z(Deg(90.0)),
    );
}

#[test]
fn should_refresh_moved_subtree_on_reparent() {
    let left = Transform::group();
    let right = Transform::group();
    let child = Transform::group();
    let grandchild = Transform::group();
    left.set_local_matrix(translation(-5.0, 0.0, 0.0));
    right.set_local_matrix(translation(5.0, 0.0, 0.0));
    grandchild.set_local_matrix(translation(0.0, 1.0, 0.0));
    left.update_global_matrix();
    right.update_global_matrix();
    child.add_child(&grandchild);
    left.add_child(&child);
    assert_matrix_eq(grandchild.global_matrix(), translation(-5.0, 1.0, 0.0));

    right.add_child(&child);

    assert_matrix_eq(child.global_matrix(), translation(5.0, 0.0, 0.0));
    assert_matrix_eq(grandchild.global_matrix(), translation(5.0, 1.0, 0.0));
}

#[test]
fn should_keep_stale_globals_until_updated() {
    let root = Transform::group();
    let child = Transform::group();
    root.add_child(&child);

    child.set_local_matrix(translation(0.0, 0.0, 2.0));
    assert_matrix_eq(child.global_matrix(), Matrix4::identity());

    root.update_global_matrix();
    assert_matrix_eq(child.global_matrix(), translation(0.0, 0.0, 2.0));
}

#[test]
fn should_update_every_node_once_per_step() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let root = Transform::with_object(Mover {
        calls: Rc::clone(&calls),
    });
    let child = Transform::with_object(Mover {
        calls: Rc::clone(&calls),
    });
    root.add_child(&child);
    root.add_child(&Transform::group());

    root.update_all(0.5);
    root.update_global_matrix();

    assert_eq!(*calls.borrow(), [0.5, 0.5]);
    assert_matrix_eq(child.global_matrix(), translation(1.0, 0.0, 0.0));
}

#[test]
fn should_activate_first_child_of_switcher() {
    let switcher = Transform::with_object(Switcher::default());
    let a = Transform::group();
    let b = Transform::group();
    let c = Transform::group();
    assert!(Switcher::active(&switcher).is_none());

    switcher.add_child(&a);
    switcher.add_child(&b);
    switcher.add_child(&c);
    assert!(Switcher::active(&switcher).unwrap().ptr_eq(&a));

    assert!(Switcher::set_active(&switcher, 2));
    assert!(Switcher::active(&switcher).unwrap().ptr_eq(&c));
    assert!(Switcher::next_active(&switcher));
    assert!(Switcher::active(&switcher).unwrap().ptr_eq(&a));
    assert!(!Switcher::set_active(&switcher, 3));
    assert!(!Switcher::set_active(&Transform::group(), 0));
}

#[test]
fn should_forget_removed_active_child() {
    let switcher = Transform::with_object(Switcher::default());
    let a = Transform::group();
    let b = Transform::group();
    switcher.add_child(&a);
    switcher.add_child(&b);

    a.set_parent(None);
    assert!(Switcher::active(&switcher).is_none());

    let c = Transform::group();
    switcher.add_child(&c);
    assert!(Switcher::active(&switcher).unwrap().ptr_eq(&c));
}

#[test]
fn should_dispose_subtree_once() {
    let mut device = RecordingDevice::new();
    let material = unlit_material(&mut device);
    let shared = triangle(&mut device, Some(Rc::clone(&material)));
    let other = triangle(&mut device, None);
    let root = Transform::group();
    root.add_child(&Transform::with_object(MeshNode::new(Rc::clone(&shared))));
    root.add_child(&Transform::with_object(MeshNode::new(Rc::clone(&shared))));
    root.add_child(&Transform::with_object(Model::new(vec![other])));
    device.take_commands();

    root.dispose(&mut device);
    root.dispose(&mut device);

    let deleted = device
        .commands()
        .iter()
        .filter(|command| matches!(command, DeviceCommand::DeleteVertexArray(_)))
        .count();
    assert_eq!(deleted, 2);
    assert!(shared.vertex_array().is_none());
}

#[test]
fn should_downcast_scene_objects() {
    let node = Transform::with_object(Switcher::default());
    assert!(node.borrow().downcast_ref::<Switcher>().is_some());
    assert!(node.borrow().downcast_ref::<MeshNode>().is_none());
    assert!(node.borrow().kind().ends_with("Switcher"));
}
