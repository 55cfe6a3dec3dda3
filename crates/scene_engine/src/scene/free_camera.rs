//! Free-fly user camera
//!
//! The camera controller is an explicit state object: the application polls
//! its input layer, builds an [`InputSnapshot`], and applies it here once per
//! frame. Selecting [`FreeCamera::NAME`] as the render camera bypasses the
//! scene camera lookup and derives both the projection and the culling
//! frustum from this state.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::input::InputSnapshot;
use crate::scene::objects::Perspective;

/// Free-fly camera state: position, yaw/pitch orientation and zoomable fov
#[derive(Debug, Clone)]
pub struct FreeCamera {
    /// Camera position in world space
    pub position: Vec3,
    /// Heading in radians; 0 looks down -Z
    pub yaw: f32,
    /// Elevation in radians, clamped shy of straight up/down
    pub pitch: f32,
    /// Vertical field of view in radians, adjusted by scrolling
    pub fov: f32,
    /// Viewport aspect ratio, updated on resize
    pub aspect: f32,
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,

    move_speed: f32,
    look_sensitivity: f32,
}

impl FreeCamera {
    /// Sentinel camera name that selects the free-fly camera
    pub const NAME: &'static str = "user";

    const MIN_FOV: f32 = 1.0;
    const MAX_FOV: f32 = 45.0;
    const MAX_PITCH: f32 = 89.0;

    /// Create a camera at a default vantage point for the given aspect ratio
    pub fn new(aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            yaw: 0.0,
            pitch: 0.0,
            fov: utils::deg_to_rad(45.0),
            aspect,
            near: 0.1,
            far: 1000.0,
            move_speed: 2.5,
            look_sensitivity: 0.1,
        }
    }

    /// Apply one frame of polled input
    pub fn update(&mut self, input: &InputSnapshot, delta_time: f32) {
        if let Some((width, height)) = input.resized {
            if height > 0 {
                self.aspect = width as f32 / height as f32;
            }
        }

        self.yaw += utils::deg_to_rad(input.mouse_delta.0 * self.look_sensitivity);
        self.pitch -= utils::deg_to_rad(input.mouse_delta.1 * self.look_sensitivity);
        let pitch_limit = utils::deg_to_rad(Self::MAX_PITCH);
        self.pitch = self.pitch.clamp(-pitch_limit, pitch_limit);

        self.fov = (self.fov - utils::deg_to_rad(input.scroll_delta)).clamp(
            utils::deg_to_rad(Self::MIN_FOV),
            utils::deg_to_rad(Self::MAX_FOV),
        );

        let forward = self.forward();
        let right = forward.cross(&Vec3::y()).normalize();
        let step = self.move_speed * delta_time;
        if input.move_forward {
            self.position += forward * step;
        }
        if input.move_backward {
            self.position -= forward * step;
        }
        if input.move_right {
            self.position += right * step;
        }
        if input.move_left {
            self.position -= right * step;
        }
        if input.move_up {
            self.position += Vec3::y() * step;
        }
        if input.move_down {
            self.position -= Vec3::y() * step;
        }
    }

    /// Unit view direction derived from yaw and pitch
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
    }

    /// World-to-view matrix for the current state
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.forward(), Vec3::y())
    }

    /// Perspective parameters shared by projection and culling
    pub fn perspective(&self) -> Perspective {
        Perspective {
            aspect: self.aspect,
            vfov: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_motion_follows_view_direction() {
        let mut camera = FreeCamera::new(1.0);
        let input = InputSnapshot {
            move_forward: true,
            ..InputSnapshot::default()
        };
        camera.update(&input, 1.0);
        // Default orientation looks down -Z.
        assert_relative_eq!(camera.position.z, 5.0 - 2.5, epsilon = 1e-5);
        assert_relative_eq!(camera.position.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_scroll_zooms_within_limits() {
        let mut camera = FreeCamera::new(1.0);
        let zoom_in = InputSnapshot {
            scroll_delta: 1000.0,
            ..InputSnapshot::default()
        };
        camera.update(&zoom_in, 0.016);
        assert_relative_eq!(camera.fov, utils::deg_to_rad(1.0), epsilon = 1e-6);

        let zoom_out = InputSnapshot {
            scroll_delta: -1000.0,
            ..InputSnapshot::default()
        };
        camera.update(&zoom_out, 0.016);
        assert_relative_eq!(camera.fov, utils::deg_to_rad(45.0), epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = FreeCamera::new(1.0);
        let look_up = InputSnapshot {
            mouse_delta: (0.0, -100000.0),
            ..InputSnapshot::default()
        };
        camera.update(&look_up, 0.016);
        assert!(camera.pitch <= utils::deg_to_rad(89.0) + 1e-6);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut camera = FreeCamera::new(1.0);
        let resize = InputSnapshot {
            resized: Some((1920, 1080)),
            ..InputSnapshot::default()
        };
        camera.update(&resize, 0.016);
        assert_relative_eq!(camera.aspect, 16.0 / 9.0, epsilon = 1e-5);
    }
}
