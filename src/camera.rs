//! Perspective camera.
//!
//! The camera is a position plus an orthonormal `front`/`right`/`up` basis
//! derived from a yaw and pitch. [`Projection`] holds the perspective
//! parameters and is resized with the window.
//!
//! Matrices use the OpenGL clip-space convention (z in -1..1). Backends with
//! a 0..1 depth range remap z in their vertex stage.

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

/// World up direction.
pub const UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    pub projection: Projection,
}

impl Camera {
    /// Camera at `position` looking along `yaw`/`pitch`, with a 800x600
    /// 45° projection until the first resize.
    pub fn new<V: Into<Point3<f32>>, Y: Into<Deg<f32>>, P: Into<Deg<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            front: -Vector3::unit_z(),
            up: UP,
            right: Vector3::unit_x(),
            projection: Projection::new(800, 600, Deg(45.0), 0.1, 100.0),
        };
        camera.look_at(pitch.into(), yaw.into());
        camera
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Point the camera along the given pitch and yaw.
    pub fn look_at(&mut self, pitch: Deg<f32>, yaw: Deg<f32>) {
        let (pitch, yaw) = (Rad::from(pitch).0, Rad::from(yaw).0);
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.update();
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    /// Replace the view direction. Does not need to be normalised.
    pub fn set_front(&mut self, front: Vector3<f32>) {
        self.front = front;
        self.update();
    }

    /// Re-derive `right` and `up` from `front`.
    pub fn update(&mut self) {
        self.front = self.front.normalize();
        self.right = self.front.cross(UP).normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.front, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.calc_matrix()
    }

    pub fn position_vec(&self) -> Vector3<f32> {
        self.position.to_vec()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_fovy<F: Into<Rad<f32>>>(&mut self, fovy: F) {
        self.fovy = fovy.into();
    }

    pub fn set_clip(&mut self, znear: f32, zfar: f32) {
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Transform;

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn should_look_down_negative_z_at_yaw_minus_90() {
        let camera = Camera::new((0.0, 0.0, 5.0), Deg(-90.0), Deg(0.0));
        assert!(close(camera.front(), Vector3::new(0.0, 0.0, -1.0)));
        assert!(close(camera.up(), UP));
        assert!(close(camera.right(), Vector3::unit_x()));
    }

    #[test]
    fn should_move_points_into_view_space() {
        let camera = Camera::new((0.0, 0.0, 5.0), Deg(-90.0), Deg(0.0));
        let p = camera.view_matrix().transform_point(Point3::new(0.0, 0.0, 0.0));
        assert!(close(p.to_vec(), Vector3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn should_track_aspect_on_resize() {
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        projection.resize(1000, 500);
        assert_eq!(projection.aspect(), 2.0);
    }
}
