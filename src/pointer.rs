//! Pointer tracking for repulsion.
//!
//! [`PointerTracker`] follows the cursor over the window and turns it into a
//! world-space point by casting a ray through the cursor and intersecting it
//! with an interaction plane. When the cursor is outside the window, or the
//! ray misses the plane, the pointer is parked at [`FAR_AWAY`] so nothing is
//! repelled.

use glam::{Mat4, Vec2, Vec3};
use winit::event::WindowEvent;

use crate::simulation::FAR_AWAY;

/// Cursor state for one window.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    position: Option<Vec2>,
    window_size: (u32, u32),
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self {
            position: None,
            window_size: (800, 600),
        }
    }

    /// Cursor position in window pixels, `None` when it left the window.
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Cursor in normalized device coordinates, Y up.
    pub fn ndc(&self) -> Option<Vec2> {
        let pos = self.position?;
        let (w, h) = self.window_size;
        if w == 0 || h == 0 {
            return None;
        }
        Some(Vec2::new(
            (pos.x / w as f32) * 2.0 - 1.0,
            1.0 - (pos.y / h as f32) * 2.0,
        ))
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.position = Some(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.position = None;
            }
            WindowEvent::Resized(size) => {
                self.set_window_size(size.width, size.height);
            }
            _ => {}
        }
    }

    /// World-space pointer on the plane through `plane_point` with normal
    /// `plane_normal`, or [`FAR_AWAY`] when there is none.
    pub fn world_position(&self, inverse_view_proj: Mat4, plane_point: Vec3, plane_normal: Vec3) -> Vec3 {
        self.ndc()
            .and_then(|ndc| unproject_to_plane(ndc, inverse_view_proj, plane_point, plane_normal))
            .unwrap_or(FAR_AWAY)
    }
}

/// Intersect the camera ray through `ndc` with a plane.
pub fn unproject_to_plane(ndc: Vec2, inverse_view_proj: Mat4, plane_point: Vec3, plane_normal: Vec3) -> Option<Vec3> {
    // wgpu clip depth runs 0..1.
    let near = inverse_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
    let far = inverse_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
    let dir = (far - near).normalize_or_zero();

    let denom = plane_normal.dot(dir);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (plane_point - near).dot(plane_normal) / denom;
    if !t.is_finite() || t < 0.0 {
        return None;
    }
    Some(near + dir * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Camera;

    fn tracker_at(x: f32, y: f32) -> PointerTracker {
        let mut tracker = PointerTracker::new();
        tracker.set_window_size(800, 600);
        tracker.position = Some(Vec2::new(x, y));
        tracker
    }

    #[test]
    fn test_ndc_centre() {
        let ndc = tracker_at(400.0, 300.0).ndc().unwrap();
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);

        let corner = tracker_at(0.0, 0.0).ndc().unwrap();
        assert_eq!(corner, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn test_no_cursor_is_far_away() {
        let tracker = PointerTracker::new();
        let p = tracker.world_position(Mat4::IDENTITY, Vec3::ZERO, Vec3::Z);
        assert_eq!(p, FAR_AWAY);
    }

    #[test]
    fn test_centre_hits_target() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let inv = camera.view_proj(800.0 / 600.0).inverse();
        let p = tracker_at(400.0, 300.0).world_position(inv, Vec3::ZERO, Vec3::Z);
        assert!(p.length() < 1e-3, "got {:?}", p);
    }

    #[test]
    fn test_parallel_plane_misses() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let inv = camera.view_proj(1.0).inverse();
        let p = tracker_at(400.0, 300.0).world_position(inv, Vec3::ZERO, Vec3::X);
        assert_eq!(p, FAR_AWAY);
    }

    #[test]
    fn test_zero_sized_window() {
        let mut tracker = tracker_at(10.0, 10.0);
        tracker.set_window_size(0, 0);
        assert!(tracker.ndc().is_none());
    }
}
