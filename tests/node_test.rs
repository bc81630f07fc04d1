use std::{cell::RefCell, rc::Rc};

use crate::common::test_utils::{RecorderNode, recorder};

mod common;

fn names(nodes: &[RecorderNode]) -> Vec<&'static str> {
    nodes.iter().map(|node| node.borrow().name).collect()
}

fn take(log: &Rc<RefCell<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

#[test]
fn should_notify_attach_in_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let root = recorder("root", &log);
    let a = recorder("a", &log);
    let b = recorder("b", &log);
    root.add_child(&a);
    take(&log);

    b.set_parent(Some(&a));

    assert_eq!(
        take(&log),
        [
            "children a + b",
            "tree a + b",
            "tree b + b",
            "tree root + b",
            "parent b",
        ]
    );
}

#[test]
fn should_notify_detach_before_attach_when_reparenting() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let a = recorder("a", &log);
    let c = recorder("c", &log);
    let b = recorder("b", &log);
    a.add_child(&b);
    take(&log);

    b.set_parent(Some(&c));

    assert_eq!(
        take(&log),
        [
            "children a - b",
            "tree a - b",
            "children c + b",
            "tree c + b",
            "tree b + b",
            "parent b",
        ]
    );
    assert_eq!(a.child_count(), 0);
    assert!(b.parent().unwrap().ptr_eq(&c));
}

#[test]
fn should_notify_whole_subtree_of_new_parent() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let root = recorder("root", &log);
    let sibling = recorder("sibling", &log);
    let nephew = recorder("nephew", &log);
    let moved = recorder("moved", &log);
    let grandchild = recorder("grandchild", &log);
    root.add_child(&sibling);
    sibling.add_child(&nephew);
    moved.add_child(&grandchild);
    take(&log);

    moved.set_parent(Some(&root));

    assert_eq!(
        take(&log),
        [
            "children root + moved",
            "tree root + moved",
            "tree sibling + moved",
            "tree nephew + moved",
            "tree moved + moved",
            "tree grandchild + moved",
            "parent moved",
        ]
    );
}

#[test]
fn should_ignore_reparenting_to_the_same_parent() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let parent = recorder("parent", &log);
    let first = recorder("first", &log);
    let second = recorder("second", &log);
    parent.add_child(&first);
    parent.add_child(&second);
    take(&log);

    first.set_parent(Some(&parent));
    parent.set_parent(None);

    assert!(take(&log).is_empty());
    assert_eq!(names(&parent.children()), ["first", "second"]);
}

#[test]
fn should_keep_parent_and_children_consistent() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let nodes: Vec<_> = ["n0", "n1", "n2", "n3", "n4", "n5"]
        .into_iter()
        .map(|name| recorder(name, &log))
        .collect();
    let moves: [(usize, Option<usize>); 10] = [
        (1, Some(0)),
        (2, Some(0)),
        (3, Some(1)),
        (4, Some(3)),
        (2, Some(4)),
        (5, Some(2)),
        (1, None),
        (3, Some(0)),
        (4, Some(1)),
        (2, Some(0)),
    ];
    for (moved, parent) in moves {
        nodes[moved].set_parent(parent.map(|p| &nodes[p]));

        for node in &nodes {
            let children = node.children();
            for child in &children {
                assert!(child.parent().unwrap().ptr_eq(node));
                assert_eq!(children.iter().filter(|c| c.ptr_eq(child)).count(), 1);
            }
            if let Some(parent) = node.parent() {
                assert!(parent.index_of(node).is_some());
            }
        }
    }
    assert_eq!(names(&nodes[0].children()), ["n3", "n2"]);
    assert_eq!(names(&nodes[0].descendants()), ["n3", "n2", "n5"]);
    assert_eq!(names(&nodes[1].descendants()), ["n4"]);
}

#[test]
fn should_only_count_attached_childless_nodes_as_leaves() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let root = recorder("root", &log);
    let child = recorder("child", &log);
    assert!(!root.is_leaf());
    assert!(!child.is_leaf());

    root.add_child(&child);
    assert!(child.is_leaf());
    assert!(!root.is_leaf());
    assert!(root.is_root());

    child.set_parent(None);
    assert!(!child.is_leaf());
    assert!(child.is_root());
}

#[test]
fn should_walk_in_pre_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let root = recorder("root", &log);
    let a = recorder("a", &log);
    let a1 = recorder("a1", &log);
    let b = recorder("b", &log);
    root.add_child(&a);
    a.add_child(&a1);
    root.add_child(&b);

    let mut visited = Vec::new();
    root.walk(&mut |node| visited.push(node.borrow().name));

    assert_eq!(visited, ["root", "a", "a1", "b"]);
    assert!(a1.root().ptr_eq(&root));
    assert!(root.is_ancestor_of(&a1));
    assert!(!a.is_ancestor_of(&b));
    assert!(!a.is_ancestor_of(&a));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "cycle")]
fn should_reject_cycles_in_debug_builds() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let parent = recorder("parent", &log);
    let child = recorder("child", &log);
    parent.add_child(&child);
    parent.set_parent(Some(&child));
}
