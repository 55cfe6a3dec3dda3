//! Math utilities and types
//!
//! Provides fundamental math types for 3D scene evaluation and culling.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform decomposed as translation, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Translation in 3D space
    pub translation: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from its three components
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * std::f32::consts::PI / 180.0
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * 180.0 / std::f32::consts::PI
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a right-handed perspective projection matrix with depth mapped
    /// to [0,1].
    ///
    /// The camera looks down -Z in view space. A non-finite `far` produces
    /// the infinite-far-plane variant of the matrix.
    fn perspective(vfov: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix (camera looks down -Z in
    /// view space)
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(vfov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_vfov = (vfov * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_vfov);
        result[(1, 1)] = 1.0 / tan_half_vfov;
        if far.is_finite() {
            result[(2, 2)] = far / (near - far);
            result[(2, 3)] = -(far * near) / (far - near);
        } else {
            // Limit of the finite formula as far goes to infinity
            result[(2, 2)] = -1.0;
            result[(2, 3)] = -near;
        }
        result[(3, 2)] = -1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_to_matrix_order() {
        // Scale applies before translation: the matrix is T * R * S.
        let transform = Transform::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::identity(),
            Vec3::new(2.0, 2.0, 2.0),
        );
        let m = transform.to_matrix();
        let p = m.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);

        let near_point = proj * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(near_point.z / near_point.w, 0.0, epsilon = 1e-6);

        let far_point = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(far_point.z / far_point.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_infinite_far() {
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, f32::INFINITY);

        let near_point = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert_relative_eq!(near_point.z / near_point.w, 0.0, epsilon = 1e-6);

        let deep_point = proj * Vec4::new(0.0, 0.0, -1.0e7, 1.0);
        assert_relative_eq!(deep_point.z / deep_point.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_look_at_forward_maps_to_negative_z() {
        let view = Mat4::look_at(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let p = view.transform_point(&nalgebra::Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(p.z, -5.0, epsilon = 1e-6);
    }
}
