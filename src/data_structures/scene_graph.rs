//! Scene graph and hierarchical scene organization.
//!
//! A scene is a tree of [`Transform`] nodes. Every node owns a local matrix,
//! a derived global matrix and one [`SceneObject`] that gives the node its
//! behaviour: plain groups, lights, meshes, models, light trackers and
//! switchers are all scene objects.
//!
//! Global matrices are not kept up to date on every local write. Call
//! [`Transform::update_global_matrix`] (on the node or one of its ancestors)
//! after changing local matrices; attaching a node to a new parent does it for
//! the moved subtree.

use std::{any::Any, fmt};

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    data_structures::{
        light::Light,
        node::{Node, NodeEvents, WeakNode},
    },
    gpu::GraphicsDevice,
    render::Drawable,
};

/// Type-erased access to a scene object. Implemented for every `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Something that holds GPU resources.
pub trait Disposable {
    /// Release the resources. Calling it again does nothing.
    fn dispose(&self, device: &mut dyn GraphicsDevice);
}

/// Behaviour attached to a scene node.
///
/// Every capability is optional; the renderer and the light tracking query
/// them while walking the tree.
pub trait SceneObject: AsAny {
    /// Game logic step, `dt` in seconds. May move the node.
    fn update(&mut self, _local_matrix: &mut Matrix4<f32>, _dt: f32) {}

    fn drawable(&self) -> Option<&dyn Drawable> {
        None
    }

    fn light(&self) -> Option<&Light> {
        None
    }

    fn lighting_tracker(&self) -> Option<&LightTracker> {
        None
    }

    fn lighting_tracker_mut(&mut self) -> Option<&mut LightTracker> {
        None
    }

    fn disposable(&self) -> Option<&dyn Disposable> {
        None
    }

    /// The node owning this object gained or lost `child`.
    fn on_children_changed(&mut self, _child: &Transform, _added: bool) {}

    /// Children the renderer descends into, in draw order.
    fn select_children(&self, children: Vec<Transform>) -> Vec<Transform> {
        children
    }
}

/// Value of a scene node.
pub struct Object3D {
    pub local_matrix: Matrix4<f32>,
    global_matrix: Matrix4<f32>,
    pub object: Box<dyn SceneObject>,
}

/// A scene node.
pub type Transform = Node<Object3D>;

impl Object3D {
    pub fn new(object: impl SceneObject + 'static) -> Self {
        Self {
            local_matrix: Matrix4::identity(),
            global_matrix: Matrix4::identity(),
            object: Box::new(object),
        }
    }

    pub fn global_matrix(&self) -> Matrix4<f32> {
        self.global_matrix
    }

    pub fn downcast_ref<O: SceneObject + 'static>(&self) -> Option<&O> {
        (*self.object).as_any().downcast_ref()
    }

    pub fn downcast_mut<O: SceneObject + 'static>(&mut self) -> Option<&mut O> {
        (*self.object).as_any_mut().downcast_mut()
    }

    pub fn kind(&self) -> &'static str {
        (*self.object).type_name()
    }
}

impl fmt::Debug for Object3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object3D")
            .field("kind", &self.kind())
            .field("local_matrix", &self.local_matrix)
            .field("global_matrix", &self.global_matrix)
            .finish()
    }
}

impl NodeEvents for Object3D {
    fn on_children_changed(node: &Transform, child: &Transform, added: bool) {
        node.borrow_mut().object.on_children_changed(child, added);
    }

    fn on_parent_changed(node: &Transform) {
        node.update_global_matrix();
    }

    fn on_tree_changed(node: &Transform, changed: &Transform, added: bool) {
        if node.borrow().object.lighting_tracker().is_none() {
            return;
        }
        // only lights inside the tracker's own subtree are tracked
        if added && !(node.ptr_eq(changed) || node.is_ancestor_of(changed)) {
            return;
        }
        let mut lights = Vec::new();
        changed.walk(&mut |n| {
            if n.borrow().object.light().is_some() {
                lights.push(n.downgrade());
            }
        });
        if lights.is_empty() {
            return;
        }
        let mut value = node.borrow_mut();
        if let Some(tracker) = value.object.lighting_tracker_mut() {
            for light in lights {
                if added {
                    tracker.track(light);
                } else {
                    tracker.untrack(&light);
                }
            }
        }
    }
}

impl Node<Object3D> {
    /// An empty node.
    pub fn group() -> Self {
        Self::with_object(Group)
    }

    pub fn with_object(object: impl SceneObject + 'static) -> Self {
        Node::new(Object3D::new(object))
    }

    /// An empty node keeping a registry of every light below it.
    pub fn light_tracking() -> Self {
        Self::with_object(LightTracker::default())
    }

    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.borrow().local_matrix
    }

    /// Set the local matrix. The global matrix is stale until
    /// [`update_global_matrix`](Self::update_global_matrix) runs.
    pub fn set_local_matrix(&self, matrix: Matrix4<f32>) {
        self.borrow_mut().local_matrix = matrix;
    }

    pub fn global_matrix(&self) -> Matrix4<f32> {
        self.borrow().global_matrix
    }

    /// `global = parent.global * local` for this node and its whole subtree.
    pub fn update_global_matrix(&self) {
        let parent_global = self
            .parent()
            .map(|parent| parent.global_matrix())
            .unwrap_or_else(Matrix4::identity);
        {
            let mut value = self.borrow_mut();
            value.global_matrix = parent_global * value.local_matrix;
        }
        for child in self.children() {
            child.update_global_matrix();
        }
    }

    /// Run [`SceneObject::update`] on every node in pre-order.
    pub fn update_all(&self, dt: f32) {
        self.walk(&mut |node| {
            let mut value = node.borrow_mut();
            let Object3D {
                local_matrix,
                object,
                ..
            } = &mut *value;
            object.update(local_matrix, dt);
        });
    }

    /// Release the GPU resources of every node in the subtree.
    pub fn dispose(&self, device: &mut dyn GraphicsDevice) {
        self.walk(&mut |node| {
            if let Some(disposable) = node.borrow().object.disposable() {
                disposable.dispose(device);
            }
        });
    }

    /// Lights tracked by this node, if it is a light tracker.
    pub fn tracked_lights(&self) -> Option<Vec<Transform>> {
        self.borrow()
            .object
            .lighting_tracker()
            .map(|tracker| tracker.lights().iter().filter_map(WeakNode::upgrade).collect())
    }
}

/// Node without behaviour.
#[derive(Debug, Default)]
pub struct Group;

impl SceneObject for Group {}

impl SceneObject for Light {
    fn light(&self) -> Option<&Light> {
        Some(self)
    }
}

/// Registry of light nodes.
///
/// Kept in sync by the tree notifications of the node that owns it: lights
/// attached anywhere below the node are appended once, detached lights are
/// removed.
#[derive(Debug, Default)]
pub struct LightTracker {
    lights: Vec<WeakNode<Object3D>>,
}

impl LightTracker {
    pub fn lights(&self) -> &[WeakNode<Object3D>] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn contains(&self, node: &Transform) -> bool {
        self.lights.iter().any(|light| light.points_to(node))
    }

    pub fn track(&mut self, light: WeakNode<Object3D>) {
        if !self.lights.iter().any(|l| l.ptr_eq(&light)) {
            self.lights.push(light);
        }
    }

    pub fn untrack(&mut self, light: &WeakNode<Object3D>) {
        self.lights.retain(|l| !l.ptr_eq(light));
    }
}

impl SceneObject for LightTracker {
    fn lighting_tracker(&self) -> Option<&LightTracker> {
        Some(self)
    }

    fn lighting_tracker_mut(&mut self) -> Option<&mut LightTracker> {
        Some(self)
    }
}

/// Only its active child is rendered.
///
/// The first child added becomes active. Removing the active child leaves
/// the switcher without an active child.
#[derive(Debug, Default)]
pub struct Switcher {
    active: Option<WeakNode<Object3D>>,
}

impl Switcher {
    fn is_active(&self, child: &Transform) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.points_to(child))
    }

    /// Active child of a switcher node.
    pub fn active(node: &Transform) -> Option<Transform> {
        node.borrow()
            .downcast_ref::<Switcher>()
            .and_then(|switcher| switcher.active.as_ref())
            .and_then(WeakNode::upgrade)
    }

    /// Activate child `index`. Returns `false` if `node` is not a switcher or
    /// has no such child.
    pub fn set_active(node: &Transform, index: usize) -> bool {
        let Some(child) = node.child(index) else {
            return false;
        };
        let mut value = node.borrow_mut();
        match value.downcast_mut::<Switcher>() {
            Some(switcher) => {
                switcher.active = Some(child.downgrade());
                true
            }
            None => false,
        }
    }

    /// Activate the child after the active one, wrapping around.
    pub fn next_active(node: &Transform) -> bool {
        let count = node.child_count();
        if count == 0 {
            return false;
        }
        let next = Self::active(node)
            .and_then(|active| node.index_of(&active))
            .map(|index| (index + 1) % count)
            .unwrap_or(0);
        Self::set_active(node, next)
    }
}

impl SceneObject for Switcher {
    fn on_children_changed(&mut self, child: &Transform, added: bool) {
        if added {
            let has_active = self
                .active
                .as_ref()
                .is_some_and(|active| active.upgrade().is_some());
            if !has_active {
                self.active = Some(child.downgrade());
            }
        } else if self.is_active(child) {
            self.active = None;
        }
    }

    fn select_children(&self, children: Vec<Transform>) -> Vec<Transform> {
        children
            .into_iter()
            .filter(|child| self.is_active(child))
            .collect()
    }
}
