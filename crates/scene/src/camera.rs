//! Look-at camera with a Vulkan-ready perspective projection.

use glam::{Mat4, Vec3};

/// Camera looking from `eye` towards `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(10.0, 0.0, 20.0),
            target: Vec3::new(0.0, 0.0, -2.0),
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Default camera with the aspect ratio of a `width` x `height` target.
    pub fn for_extent(width: u32, height: u32) -> Self {
        let mut camera = Self::default();
        camera.set_extent(width, height);
        camera
    }

    /// Zero-sized extents leave the aspect ratio untouched.
    pub fn set_extent(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Perspective projection with Y flipped for Vulkan clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        let mut proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
        proj.y_axis.y *= -1.0;
        proj
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_default_camera() {
        let camera = Camera::default();
        assert_eq!(camera.eye, Vec3::new(10.0, 0.0, 20.0));
        assert_eq!(camera.target, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 100.0);
    }

    #[test]
    fn test_for_extent_sets_aspect() {
        let camera = Camera::for_extent(1366, 768);
        assert!((camera.aspect - 1366.0 / 768.0).abs() < EPSILON);

        let mut unchanged = Camera::default();
        unchanged.set_extent(0, 768);
        assert_eq!(unchanged.aspect, Camera::default().aspect);
    }

    #[test]
    fn test_view_maps_eye_to_origin() {
        let camera = Camera::default();
        let eye = camera.view_matrix() * camera.eye.extend(1.0);
        assert!(eye.truncate().length() < EPSILON);

        // Target lies straight down -Z in view space.
        let target = camera.view_matrix() * camera.target.extend(1.0);
        assert!(target.x.abs() < EPSILON);
        assert!(target.y.abs() < EPSILON);
        assert!(target.z < 0.0);
    }

    #[test]
    fn test_projection_flips_y() {
        let camera = Camera::default();
        let flipped = camera.projection_matrix();
        let plain = Mat4::perspective_rh(camera.fov_y, camera.aspect, camera.near, camera.far);
        assert_eq!(flipped.y_axis.y, -plain.y_axis.y);
        assert_eq!(flipped.x_axis, plain.x_axis);

        // A point above the view axis lands in the negative-Y half of clip space.
        let clip = flipped * Vec4::new(0.0, 1.0, -10.0, 1.0);
        assert!(clip.y < 0.0);
    }

    #[test]
    fn test_depth_range_is_zero_to_one() {
        let camera = Camera::default();
        let proj = camera.projection_matrix();

        let near = proj * Vec4::new(0.0, 0.0, -camera.near, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -camera.far, 1.0);
        assert!((near.z / near.w).abs() < EPSILON);
        assert!((far.z / far.w - 1.0).abs() < EPSILON);
    }
}
