//! Generic parent/children tree.
//!
//! A [`Node<T>`] is a shared handle to a tree element. Parents hold their
//! children strongly and in insertion order, children point back to their
//! parent weakly. Structural changes go through [`Node::set_parent`], which
//! fires the [`NodeEvents`] hooks of the value type:
//!
//! - `on_children_changed` on the parent that gained or lost the child
//! - `on_tree_changed` on that parent, then on all of its descendants in
//!   pre-order, then on all of its ancestors up to the root
//! - `on_parent_changed` on the moved node itself
//!
//! Detach notifications fire after the node has been unlinked, attach
//! notifications after it has been linked in.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};

struct NodeData<T> {
    value: T,
    parent: Weak<RefCell<NodeData<T>>>,
    children: Vec<Node<T>>,
}

/// Shared handle to a tree element.
///
/// Cloning the handle does not clone the node; use [`Node::ptr_eq`] to
/// compare identity.
pub struct Node<T>(Rc<RefCell<NodeData<T>>>);

/// Non-owning handle to a tree element.
pub struct WeakNode<T>(Weak<RefCell<NodeData<T>>>);

/// Structural change hooks. All hooks default to doing nothing.
///
/// Hooks receive node handles rather than `&mut self` so that they can walk
/// the tree. No borrow of any node is held while a hook runs.
pub trait NodeEvents: Sized {
    /// `child` was appended to (`added`) or removed from `node`'s children.
    fn on_children_changed(_node: &Node<Self>, _child: &Node<Self>, _added: bool) {}

    /// `node` has a new parent (or became a root).
    fn on_parent_changed(_node: &Node<Self>) {}

    /// `changed` was attached or detached somewhere in the tree `node` is in.
    fn on_tree_changed(_node: &Node<Self>, _changed: &Node<Self>, _added: bool) {}
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> Clone for WeakNode<T> {
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}

impl<T> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Node<T> {}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Node")
                .field("value", &data.value)
                .field("children", &data.children.len())
                .field("is_root", &(data.parent.strong_count() == 0))
                .finish(),
            Err(_) => f.write_str("Node(<borrowed>)"),
        }
    }
}

impl<T> fmt::Debug for WeakNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakNode(alive: {})", self.0.strong_count() > 0)
    }
}

impl<T> WeakNode<T> {
    pub fn upgrade(&self) -> Option<Node<T>> {
        self.0.upgrade().map(Node)
    }

    pub fn ptr_eq(&self, other: &WeakNode<T>) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }

    /// True if this handle refers to `node`.
    pub fn points_to(&self, node: &Node<T>) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&node.0))
    }
}

impl<T> Node<T> {
    /// Create a detached root node.
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            value,
            parent: Weak::new(),
            children: Vec::new(),
        })))
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        Ref::map(self.0.borrow(), |data| &data.value)
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        RefMut::map(self.0.borrow_mut(), |data| &mut data.value)
    }

    pub fn downgrade(&self) -> WeakNode<T> {
        WeakNode(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Node<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn parent(&self) -> Option<Node<T>> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    /// Snapshot of the children in traversal order.
    pub fn children(&self) -> Vec<Node<T>> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node<T>> {
        self.0.borrow().children.get(index).cloned()
    }

    /// Position of `child` in this node's children.
    pub fn index_of(&self, child: &Node<T>) -> Option<usize> {
        self.0.borrow().children.iter().position(|c| c.ptr_eq(child))
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// True if the node has no children and has a parent.
    ///
    /// A detached node without children is not a leaf.
    pub fn is_leaf(&self) -> bool {
        !self.is_root() && self.child_count() == 0
    }

    pub fn root(&self) -> Node<T> {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// True if `other` is a strict descendant of this node.
    pub fn is_ancestor_of(&self, other: &Node<T>) -> bool {
        let mut current = other.parent();
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Visit this node and all descendants in pre-order.
    pub fn walk(&self, visit: &mut dyn FnMut(&Node<T>)) {
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            visit(&node);
            let data = node.0.borrow();
            stack.extend(data.children.iter().rev().cloned());
        }
    }

    /// All descendants in pre-order, excluding this node.
    pub fn descendants(&self) -> Vec<Node<T>> {
        let mut nodes = Vec::new();
        self.walk(&mut |node| nodes.push(node.clone()));
        nodes.remove(0);
        nodes
    }
}

impl<T: NodeEvents> Node<T> {
    /// Attach this node to `parent`, or make it a root with `None`.
    ///
    /// The node is first detached from its current parent (if any), then
    /// appended to the new parent's children. Reparenting to the current
    /// parent does nothing.
    pub fn set_parent(&self, parent: Option<&Node<T>>) {
        let old = self.parent();
        let unchanged = match (&old, parent) {
            (Some(old), Some(new)) => old.ptr_eq(new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        if let Some(old) = old {
            let removed = {
                let mut data = old.0.borrow_mut();
                let before = data.children.len();
                data.children.retain(|child| !child.ptr_eq(self));
                before != data.children.len()
            };
            self.0.borrow_mut().parent = Weak::new();
            if removed {
                T::on_children_changed(&old, self, false);
                old.notify_tree_changed(self, false);
            }
        }

        if let Some(new) = parent {
            debug_assert!(
                !self.ptr_eq(new) && !self.is_ancestor_of(new),
                "set_parent would create a cycle"
            );
            new.0.borrow_mut().children.push(self.clone());
            self.0.borrow_mut().parent = Rc::downgrade(&new.0);
            T::on_children_changed(new, self, true);
            new.notify_tree_changed(self, true);
        }

        T::on_parent_changed(self);
    }

    /// Append `child` to this node. Shorthand for `child.set_parent(Some(self))`.
    pub fn add_child(&self, child: &Node<T>) {
        child.set_parent(Some(self));
    }

    fn notify_tree_changed(&self, changed: &Node<T>, added: bool) {
        T::on_tree_changed(self, changed, added);
        self.notify_descendants_tree_changed(changed, added);
        self.notify_ancestors_tree_changed(changed, added);
    }

    fn notify_descendants_tree_changed(&self, changed: &Node<T>, added: bool) {
        for child in self.children() {
            T::on_tree_changed(&child, changed, added);
            child.notify_descendants_tree_changed(changed, added);
        }
    }

    fn notify_ancestors_tree_changed(&self, changed: &Node<T>, added: bool) {
        let mut current = self.parent();
        while let Some(ancestor) = current {
            T::on_tree_changed(&ancestor, changed, added);
            current = ancestor.parent();
        }
    }
}
