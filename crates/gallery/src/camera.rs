use glam::{Mat4, Vec3};
use galleryconfig::CameraParams;

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 200.0;

/// Fixed look-at camera on the +Z axis facing the cylinder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_y: f32,
    pub eye: Vec3,
    pub target: Vec3,
}

impl Camera {
    pub fn from_params(params: &CameraParams) -> Self {
        Self {
            fov_y: params.fov_degrees.to_radians(),
            eye: Vec3::new(0.0, 0.0, params.distance),
            target: Vec3::new(0.0, params.look_at_y, 0.0),
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    /// Projection into wgpu clip space (depth in `[0, 1]`).
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov_y, aspect, NEAR_PLANE, FAR_PLANE)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_params(&CameraParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn look_at_point_projects_to_screen_centre() {
        let camera = Camera::default();
        let clip = camera.view_projection(16.0 / 9.0) * Vec4::new(0.0, 0.1, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn nearer_cards_sit_closer_in_depth() {
        let camera = Camera::default();
        let matrix = camera.view_projection(1.0);
        let depth = |z: f32| {
            let clip = matrix * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert!(depth(6.0) < depth(-6.0));
    }

    #[test]
    fn degenerate_aspect_falls_back_to_square() {
        let camera = Camera::default();
        assert_eq!(camera.projection(0.0), camera.projection(1.0));
        assert_eq!(camera.projection(f32::NAN), camera.projection(1.0));
    }
}
