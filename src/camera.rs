//! Perspective camera and its GPU uniform.

use glam::{Mat4, Vec3};

/// Perspective camera defined by eye position, target, and projection
/// parameters.
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Look-at target position.
    pub target: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
/// GPU uniform buffer holding the view-projection matrix and camera metadata.
pub struct CameraUniform {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Camera world-space position.
    pub position: [f32; 3],
    /// Padding for GPU alignment.
    pub(crate) _pad: f32,
}

impl Camera {
    /// Build the view matrix, falling back to identity when the eye and
    /// target coincide or the up vector is parallel to the view
    /// direction. The frame keeps rendering with the previous valid
    /// orientation rather than propagating NaNs into the uniform.
    pub fn build_view(&self) -> Mat4 {
        let forward = self.target - self.eye;
        if forward.length_squared() < f32::EPSILON
            || forward.cross(self.up).length_squared() < f32::EPSILON
        {
            log::warn!("degenerate camera orientation, holding identity view");
            return Mat4::IDENTITY;
        }
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Build the combined view-projection matrix.
    pub fn build_matrix(&self) -> Mat4 {
        // perspective_rh already uses [0,1] depth range (wgpu/Vulkan
        // convention)
        let proj = Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        );
        proj * self.build_view()
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    /// Create a new camera uniform with identity view-projection.
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 3],
            _pad: 0.0,
        }
    }

    /// Update uniform fields from the given camera's current state.
    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_proj = camera.build_matrix().to_cols_array_2d();
        self.position = camera.eye.to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera {
            eye: Vec3::new(0.0, 20.0, 120.0),
            target: Vec3::new(0.0, -25.0, 0.0),
            up: Vec3::Y,
            aspect: 1.6,
            fovy: 45.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    #[test]
    fn test_view_matrix_is_finite() {
        let matrix = test_camera().build_matrix();
        assert!(matrix.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_coincident_eye_and_target_falls_back_to_identity() {
        let mut camera = test_camera();
        camera.target = camera.eye;
        assert_eq!(camera.build_view(), Mat4::IDENTITY);
    }

    #[test]
    fn test_up_parallel_to_view_falls_back_to_identity() {
        let mut camera = test_camera();
        camera.eye = Vec3::ZERO;
        camera.target = Vec3::new(0.0, 10.0, 0.0);
        camera.up = Vec3::Y;
        assert_eq!(camera.build_view(), Mat4::IDENTITY);
    }

    #[test]
    fn test_uniform_tracks_camera() {
        let camera = test_camera();
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera);
        assert_eq!(uniform.position, camera.eye.to_array());
        assert_ne!(uniform.view_proj, Mat4::IDENTITY.to_cols_array_2d());
    }
}
