//! Scene traversal and the per-draw binding protocol.
//!
//! [`BasicRenderer`] walks a scene graph in pre-order and draws every node
//! that has a [`Drawable`]. For a drawable with a material the renderer binds,
//! in this order:
//!
//! 1. the material's program and the camera uniforms (`projection`, `view`,
//!    `viewPos`)
//! 2. the material's textures, each to the unit given by its position, with
//!    the sampler uniform set to that unit
//! 3. the material attributes
//! 4. the tracked lights, indexed per light type (only for lit materials)
//! 5. `model`, and `modelNormal` for lit materials
//!
//! then lets the drawable issue its draw calls and unbinds textures and
//! program again. Drawables without a material draw directly and may call
//! back into the renderer (a model rendering its meshes).

use std::collections::HashMap;

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix};

use crate::{
    camera::Camera,
    data_structures::{
        material::SharedMaterial,
        node::WeakNode,
        scene_graph::{Object3D, Transform},
    },
    gpu::{GraphicsDevice, MAX_TEXTURE_UNITS},
};

/// Something the renderer can draw.
pub trait Drawable {
    /// `None` draws without any binding.
    fn material(&self) -> Option<SharedMaterial>;

    /// Issue the draw calls. Bindings are in place when a material is set.
    fn draw(&self, renderer: &mut dyn DrawableRenderer, model: &Matrix4<f32>);
}

/// The renderer as seen from inside [`Drawable::draw`].
pub trait DrawableRenderer {
    fn device(&mut self) -> &mut dyn GraphicsDevice;

    /// Run the full binding protocol for `drawable`.
    fn render(&mut self, drawable: &dyn Drawable, model: &Matrix4<f32>);
}

/// Normal matrix: inverse transpose of the model matrix's 3x3 part after
/// normalising its basis columns. Falls back to identity for singular input.
pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    let normalize = |v: cgmath::Vector3<f32>| {
        let len = v.magnitude();
        if len > 0.0 { v / len } else { v }
    };
    let basis = Matrix3::from_cols(
        normalize(model.x.truncate()),
        normalize(model.y.truncate()),
        normalize(model.z.truncate()),
    );
    basis
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix3::identity)
}

/// Forward renderer over a [`GraphicsDevice`].
pub struct BasicRenderer<D: GraphicsDevice> {
    device: D,
    camera: Camera,
    tracker: Option<WeakNode<Object3D>>,
    light_indices: HashMap<&'static str, u32>,
}

impl<D: GraphicsDevice> BasicRenderer<D> {
    pub fn new(device: D, camera: Camera) -> Self {
        Self {
            device,
            camera,
            tracker: None,
            light_indices: HashMap::new(),
        }
    }

    pub fn device_ref(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Use the lights of `tracker` for lit materials, or forget the current
    /// tracker with `None` so the next traversal picks one up again.
    pub fn set_lighting_tracker(&mut self, tracker: Option<&Transform>) {
        self.tracker = tracker.map(Transform::downgrade);
    }

    pub fn lighting_tracker(&self) -> Option<Transform> {
        self.tracker.as_ref().and_then(WeakNode::upgrade)
    }

    /// Draw `root` and its subtree.
    ///
    /// The first light tracker met is bound if none is bound yet. Children
    /// are visited in order, filtered by their parent's
    /// [`SceneObject::select_children`](crate::data_structures::scene_graph::SceneObject::select_children).
    pub fn render_tree(&mut self, root: &Transform) {
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let value = node.borrow();
            if value.object.lighting_tracker().is_some() && self.lighting_tracker().is_none() {
                self.tracker = Some(node.downgrade());
            }
            if let Some(drawable) = value.object.drawable() {
                let model = value.global_matrix();
                DrawableRenderer::render(self, drawable, &model);
            }
            let children = value.object.select_children(node.children());
            stack.extend(children.into_iter().rev());
        }
    }

    fn bind_lights(&mut self, material: &SharedMaterial) {
        let Some(tracker) = self.lighting_tracker() else {
            return;
        };
        let Some(lights) = tracker.tracked_lights() else {
            return;
        };
        self.light_indices.clear();
        let material = material.borrow();
        let program = material.program();
        for node in lights {
            let value = node.borrow();
            let Some(light) = value.object.light() else {
                continue;
            };
            let index = self.light_indices.entry(light.type_name()).or_insert(0);
            light.apply(*index, &value.global_matrix(), program, &mut self.device);
            *index += 1;
        }
    }
}

impl<D: GraphicsDevice> DrawableRenderer for BasicRenderer<D> {
    fn device(&mut self) -> &mut dyn GraphicsDevice {
        &mut self.device
    }

    fn render(&mut self, drawable: &dyn Drawable, model: &Matrix4<f32>) {
        let Some(shared) = drawable.material() else {
            drawable.draw(self, model);
            return;
        };

        let (program, textures, lit) = {
            let material = shared.borrow();
            (
                material.program().clone(),
                material.textures().to_vec(),
                material.lighting_supported(),
            )
        };

        program.bind(&mut self.device);
        program.set_camera_uniforms(
            &mut self.device,
            self.camera.projection_matrix(),
            self.camera.view_matrix(),
            self.camera.position,
        );

        let mut bound = Vec::with_capacity(textures.len());
        for (unit, attribute) in textures.iter().enumerate() {
            let unit = unit as u32;
            if unit >= MAX_TEXTURE_UNITS {
                log::warn!(
                    "material has {} textures, only {} units are available",
                    textures.len(),
                    MAX_TEXTURE_UNITS
                );
                break;
            }
            program.set_uniform(&mut self.device, &attribute.name, unit as i32);
            attribute.texture.bind(&mut self.device, unit);
            bound.push((unit, attribute));
        }

        for (name, value) in shared.borrow().attributes() {
            program.set_uniform(&mut self.device, name, *value);
        }

        if lit {
            self.bind_lights(&shared);
        }

        program.set_uniform(&mut self.device, "model", *model);
        if lit {
            program.set_uniform(&mut self.device, "modelNormal", normal_matrix(model));
        }

        drawable.draw(self, model);

        for (unit, attribute) in bound.into_iter().rev() {
            attribute.texture.unbind(&mut self.device, unit);
        }
        program.unbind(&mut self.device);
    }
}
