//! Fixed look-at camera for the viewer.

use glam::{Mat4, Vec3};

/// Perspective camera looking at a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Camera at `position` looking at `target`, 45 degree field of view.
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }

    /// Unit vector from the target towards the camera.
    pub fn facing(&self) -> Vec3 {
        (self.position - self.target).normalize_or_zero()
    }

    /// Rotate around the target. Pitch stays clear of the poles.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        let offset = self.position - self.target;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }
        let yaw = offset.x.atan2(offset.z) + delta_yaw;
        let pitch = ((offset.y / distance).asin() + delta_pitch).clamp(-1.5, 1.5);
        self.position = self.target
            + Vec3::new(
                distance * pitch.cos() * yaw.sin(),
                distance * pitch.sin(),
                distance * pitch.cos() * yaw.cos(),
            );
    }

    /// Move towards (positive) or away from the target, keeping 0.5..50 units.
    pub fn zoom(&mut self, amount: f32) {
        let distance = (self.position - self.target).length();
        let new_distance = (distance - amount).clamp(0.5, 50.0);
        self.position = self.target + self.facing() * new_distance;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.5, 4.0), Vec3::ZERO)
    }
}
