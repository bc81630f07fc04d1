//! A ring of textured cubes spinning around a point light, lit by a sun and a
//! spot light. Escape closes the window, space toggles the ring's spin.

use std::rc::Rc;

use anyhow::anyhow;
use graph_ngin::{
    Deg, Matrix4, Point3, Vector3, WindowEvent,
    data_structures::{
        light::Light,
        material::Material,
        mesh::MeshNode,
        scene_graph::{SceneObject, Transform},
        shapes,
        texture::Texture2D,
    },
    flow::run,
    gpu::{ImageData, TextureOptions, wgpu_device::WgpuDevice},
    scene::{EngineConfig, GraphicsFlow, Scene},
};
use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{Key, NamedKey},
};

const SHADER: &str = include_str!("shaders/lit.wgsl");

/// Rotates its node around y.
struct Spin {
    speed: Deg<f32>,
    paused: bool,
}

impl SceneObject for Spin {
    fn update(&mut self, local_matrix: &mut Matrix4<f32>, dt: f32) {
        if !self.paused {
            *local_matrix = *local_matrix * Matrix4::from_angle_y(self.speed * dt);
        }
    }
}

fn checkerboard(size: u32, a: [u8; 4], b: [u8; 4]) -> ImageData {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let colour = if (x / 8 + y / 8) % 2 == 0 { a } else { b };
            pixels.extend_from_slice(&colour);
        }
    }
    ImageData {
        width: size,
        height: size,
        pixels,
    }
}

#[derive(Default)]
struct LitCubes {
    ring: Option<Transform>,
}

impl GraphicsFlow<WgpuDevice> for LitCubes {
    fn on_init(&mut self, scene: &mut Scene<WgpuDevice>) -> anyhow::Result<()> {
        let device = scene.renderer.device_mut();
        let program = scene
            .resources
            .load_shader_from_str(device, "lit", SHADER, SHADER)?
            .ok_or_else(|| anyhow!("shader 'lit' registered twice"))?;

        let checker = Texture2D::new(
            device,
            &checkerboard(64, [230, 230, 230, 255], [40, 90, 160, 255]),
            TextureOptions::default(),
        );
        let checker = scene
            .resources
            .add_texture("checker", checker)
            .ok_or_else(|| anyhow!("texture 'checker' registered twice"))?;

        let mut material = Material::standard(Rc::clone(&program));
        material.set_diffuse_texture(Some(Rc::clone(&checker)));
        material.set_shininess(64.0);
        let material = scene
            .resources
            .add_material("checker", material)
            .ok_or_else(|| anyhow!("material 'checker' registered twice"))?;

        let mut floor_material = Material::standard(program);
        floor_material.set_diffuse_texture(Some(checker));
        floor_material.set_shininess(8.0);
        let floor_material = floor_material.into_shared();

        let cube = shapes::cube(device, Some(Rc::clone(&material)));
        let floor = shapes::plane(device, 8, 8, Some(floor_material));
        scene.resources.insert_mesh("cube", Rc::clone(&cube));
        scene.resources.insert_mesh("floor", Rc::clone(&floor));

        let root = scene.root().clone();

        let floor = Transform::with_object(MeshNode::new(floor));
        floor.set_local_matrix(
            Matrix4::from_translation(Vector3::new(0.0, -1.0, 0.0)) * Matrix4::from_scale(12.0),
        );
        root.add_child(&floor);

        let ring = Transform::with_object(Spin {
            speed: Deg(30.0),
            paused: false,
        });
        root.add_child(&ring);
        for i in 0..6 {
            let angle = Deg(60.0 * i as f32);
            let node = Transform::with_object(MeshNode::new(Rc::clone(&cube)));
            node.set_local_matrix(
                Matrix4::from_angle_y(angle)
                    * Matrix4::from_translation(Vector3::new(2.5, 0.0, 0.0))
                    * Matrix4::from_scale(0.75),
            );
            ring.add_child(&node);
        }

        let grey = |v: f32| Vector3::new(v, v, v);
        root.add_child(&Transform::with_object(Light::directional(
            Vector3::new(-0.2, -1.0, -0.3),
            grey(0.05),
            grey(0.3),
            grey(0.4),
        )));

        let lamp = Transform::with_object(Light::point(
            grey(0.05),
            Vector3::new(1.0, 0.8, 0.6),
            grey(1.0),
            1.0,
            0.09,
            0.032,
        ));
        lamp.set_local_matrix(Matrix4::from_translation(Vector3::new(0.0, 0.5, 0.0)));
        root.add_child(&lamp);

        let spot = Transform::with_object(Light::spot(
            Vector3::new(0.0, -1.0, 0.0),
            grey(0.0),
            Vector3::new(0.4, 0.6, 1.0),
            grey(1.0),
            1.0,
            0.09,
            0.032,
            Deg(15.0).0.to_radians().cos(),
            Deg(22.0).0.to_radians().cos(),
        ));
        spot.set_local_matrix(Matrix4::from_translation(Vector3::new(2.5, 4.0, 0.0)));
        ring.add_child(&spot);

        root.update_global_matrix();

        let camera = scene.camera_mut();
        camera.position = Point3::new(0.0, 3.0, 8.0);
        camera.look_at(Deg(-20.0), Deg(-90.0));

        self.ring = Some(ring);
        Ok(())
    }

    fn on_window_events(&mut self, scene: &mut Scene<WgpuDevice>, event: &WindowEvent) {
        let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    logical_key: Key::Named(key),
                    state: ElementState::Pressed,
                    ..
                },
            ..
        } = event
        else {
            return;
        };
        match key {
            NamedKey::Escape => scene.request_close(),
            NamedKey::Space => {
                if let Some(ring) = &self.ring {
                    let mut value = ring.borrow_mut();
                    if let Some(spin) = value.downcast_mut::<Spin>() {
                        spin.paused = !spin.paused;
                    }
                }
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    run(
        EngineConfig {
            title: "lit cubes".to_string(),
            update_graph: true,
            ..Default::default()
        },
        LitCubes::default(),
    )
}
