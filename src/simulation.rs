//! Pointer repulsion with a spring-damper return.
//!
//! Each frame, samples within `repulsion_radius` of the pointer get a target
//! displacement pushing them away from it; everything else targets zero. The
//! displacement chases its target through a damped spring integrated with
//! semi-implicit Euler:
//!
//! ```text
//! velocity     += (target - displacement) * stiffness * dt
//! velocity     *= damping
//! displacement += velocity * dt * 60
//! ```
//!
//! The `* 60` ties the tuning to a 60 updates/second baseline. At other frame
//! rates motion runs proportionally faster or slower per real second.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::particle_set::ParticleSet;

/// Frame rate the integration constants are tuned for.
pub const FRAME_RATE_BASELINE: f32 = 60.0;

/// Velocity damping applied every step unless overridden.
pub const DEFAULT_DAMPING: f32 = 0.8;

/// Spatial frequency of the strength noise along local X.
pub const NOISE_FREQUENCY: f32 = 0.1;

/// Amplitude of the strength noise (+/- 30%).
pub const NOISE_AMPLITUDE: f32 = 0.3;

/// Pointer position used when there is no pointer (or interaction is off).
/// Far enough away that no sample is ever inside the radius.
pub const FAR_AWAY: Vec3 = Vec3::splat(10_000.0);

/// Per-frame inputs from the host render loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// Seconds since the engine started.
    pub elapsed_time: f32,
    /// Pointer projected into world space.
    pub pointer: Vec3,
}

impl FrameInput {
    pub fn new(delta_time: f32, elapsed_time: f32, pointer: Vec3) -> Self {
        Self {
            delta_time,
            elapsed_time,
            pointer,
        }
    }

    /// Frame with the pointer parked at [`FAR_AWAY`].
    pub fn without_pointer(delta_time: f32, elapsed_time: f32) -> Self {
        Self::new(delta_time, elapsed_time, FAR_AWAY)
    }
}

/// Tuning for one engine instance. Fixed once the engine is built, apart
/// from `repulsion_enabled` (see `ParticleEngine::set_interactive`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Base point size in world units.
    pub point_size: f32,
    /// Modulate point size with a travelling sine wave.
    pub pulse_enabled: bool,
    /// Run the repulsion step at all.
    pub repulsion_enabled: bool,
    /// World-space distance within which the pointer affects a sample.
    pub repulsion_radius: f32,
    /// Peak displacement at the pointer.
    pub repulsion_strength: f32,
    /// Spring constant pulling displacement toward its target.
    pub return_stiffness: f32,
    /// Velocity multiplier applied every step, in (0, 1).
    pub damping_factor: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            point_size: 0.05,
            pulse_enabled: false,
            repulsion_enabled: true,
            repulsion_radius: 2.0,
            repulsion_strength: 1.0,
            return_stiffness: 5.0,
            damping_factor: DEFAULT_DAMPING,
        }
    }
}

impl SimulationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }

    pub fn with_pulse(mut self, enabled: bool) -> Self {
        self.pulse_enabled = enabled;
        self
    }

    pub fn with_interactive(mut self, enabled: bool) -> Self {
        self.repulsion_enabled = enabled;
        self
    }

    pub fn with_repulsion(mut self, radius: f32, strength: f32) -> Self {
        self.repulsion_radius = radius;
        self.repulsion_strength = strength;
        self
    }

    pub fn with_return_stiffness(mut self, stiffness: f32) -> Self {
        self.return_stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping_factor = damping;
        self
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(self.point_size, "point_size", "a finite value > 0", |v| v > 0.0)?;
        check(self.repulsion_radius, "repulsion_radius", "a finite value >= 0", |v| v >= 0.0)?;
        check(self.repulsion_strength, "repulsion_strength", "a finite value >= 0", |v| v >= 0.0)?;
        check(self.return_stiffness, "return_stiffness", "a finite value > 0", |v| v > 0.0)?;
        check(self.damping_factor, "damping_factor", "a value in (0, 1)", |v| v > 0.0 && v < 1.0)?;
        Ok(())
    }
}

fn check(value: f32, name: &'static str, expected: &'static str, ok: impl Fn(f32) -> bool) -> Result<(), ConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParam { name, expected, value })
    }
}

/// Target displacement for one sample, plus its proximity to the pointer.
///
/// Proximity is `1 - dist / radius` inside the radius and 0 outside; it feeds
/// the size growth in [`crate::visuals`].
#[inline]
pub fn repulsion_target(
    world_pos: Vec3,
    pointer: Vec3,
    original_x: f32,
    elapsed_time: f32,
    params: &SimulationParams,
) -> (Vec3, f32) {
    let offset = world_pos - pointer;
    let dist = offset.length();
    if !dist.is_finite() || dist >= params.repulsion_radius {
        return (Vec3::ZERO, 0.0);
    }

    let proximity = 1.0 - dist / params.repulsion_radius;
    let influence = proximity * proximity;
    let direction = offset.normalize_or_zero();
    let noise = (original_x * NOISE_FREQUENCY + elapsed_time).sin() * NOISE_AMPLITUDE;
    let target = direction * influence * params.repulsion_strength * (1.0 + noise);
    (target, proximity)
}

/// One spring-damper step of `displacement` toward `target`.
#[inline]
pub fn integrate(displacement: &mut Vec3, velocity: &mut Vec3, target: Vec3, params: &SimulationParams, delta_time: f32) {
    *velocity += (target - *displacement) * params.return_stiffness * delta_time;
    *velocity *= params.damping_factor;
    *displacement += *velocity * delta_time * FRAME_RATE_BASELINE;
}

impl ParticleSet {
    /// Advance the repulsion simulation by one frame.
    ///
    /// Does nothing when repulsion is disabled; displacements keep whatever
    /// value they had.
    pub fn step(&mut self, frame: &FrameInput, params: &SimulationParams, world_from_local: Mat4) {
        if !params.repulsion_enabled {
            return;
        }

        for i in 0..self.original.len() {
            let world_pos = world_from_local.transform_point3(self.current[i]);
            let (target, proximity) = repulsion_target(
                world_pos,
                frame.pointer,
                self.original[i].x,
                frame.elapsed_time,
                params,
            );
            self.proximity[i] = proximity;
            integrate(
                &mut self.displacement[i],
                &mut self.velocity[i],
                target,
                params,
                frame.delta_time,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshSource;

    const DT: f32 = 0.016;

    fn params() -> SimulationParams {
        SimulationParams::default().with_repulsion(2.0, 10.0)
    }

    #[test]
    fn test_default_params_valid() {
        SimulationParams::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(SimulationParams::default().with_point_size(0.0).validate().is_err());
        assert!(SimulationParams::default().with_damping(1.0).validate().is_err());
        assert!(SimulationParams::default().with_damping(0.0).validate().is_err());
        assert!(SimulationParams::default().with_return_stiffness(0.0).validate().is_err());
        assert!(SimulationParams::default().with_repulsion(-1.0, 1.0).validate().is_err());
        assert!(SimulationParams::default().with_repulsion(1.0, f32::NAN).validate().is_err());

        match SimulationParams::default().with_damping(1.5).validate() {
            Err(ConfigError::InvalidParam { name, .. }) => assert_eq!(name, "damping_factor"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_target_zero_outside_radius() {
        let p = params();
        let (t, prox) = repulsion_target(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, 0.0, 0.0, &p);
        assert_eq!(t, Vec3::ZERO);
        assert_eq!(prox, 0.0);
        let (t, _) = repulsion_target(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 0.0, 0.0, &p);
        assert_eq!(t, Vec3::ZERO);
    }

    #[test]
    fn test_target_pushes_away() {
        let p = params();
        // original_x = 0, elapsed = 0 -> noise term is sin(0) = 0
        let (t, prox) = repulsion_target(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, 0.0, 0.0, &p);
        assert!((prox - 0.5).abs() < 1e-6);
        assert!((t - Vec3::new(2.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_zero_radius_never_repels() {
        let p = SimulationParams::default().with_repulsion(0.0, 10.0);
        let (t, _) = repulsion_target(Vec3::ZERO, Vec3::ZERO, 0.0, 0.0, &p);
        assert_eq!(t, Vec3::ZERO);
    }

    #[test]
    fn test_pointer_on_sample_is_finite() {
        let (t, _) = repulsion_target(Vec3::ONE, Vec3::ONE, 0.0, 0.0, &params());
        assert_eq!(t, Vec3::ZERO);
    }

    #[test]
    fn test_integrate_matches_formula() {
        let p = params();
        let mut d = Vec3::ZERO;
        let mut v = Vec3::ZERO;
        integrate(&mut d, &mut v, Vec3::X, &p, DT);
        let expected_v = 1.0 * p.return_stiffness * DT * p.damping_factor;
        assert!((v.x - expected_v).abs() < 1e-6);
        assert!((d.x - expected_v * DT * 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_converges_to_rest() {
        let p = params();
        let mut d = Vec3::new(3.0, -2.0, 1.0);
        let mut v = Vec3::ZERO;
        let mut steps = 0;
        while d.length() >= 1e-4 {
            integrate(&mut d, &mut v, Vec3::ZERO, &p, DT);
            steps += 1;
            assert!(steps < 1000, "did not converge");
        }
    }

    #[test]
    fn test_disabled_freezes_displacement() {
        let mut set = ParticleSet::from_source(&MeshSource::grid(1.0, 1), 1);
        set.displacement[0] = Vec3::X;
        set.velocity[0] = Vec3::Y;
        let p = params().with_interactive(false);
        set.step(&FrameInput::without_pointer(DT, 1.0), &p, Mat4::IDENTITY);
        assert_eq!(set.displacement[0], Vec3::X);
        assert_eq!(set.velocity[0], Vec3::Y);
    }

    #[test]
    fn test_step_uses_world_transform() {
        let source = MeshSource::from_positions(vec![0.0, 0.0, 0.0]).unwrap();
        let mut set = ParticleSet::from_source(&source, 1);
        let p = params();
        let frame = FrameInput::new(DT, 0.0, Vec3::new(0.0, 0.0, 0.0));

        // Moved 10 units away in world space: the pointer at the origin no longer reaches it.
        set.step(&frame, &p, Mat4::from_translation(Vec3::X * 10.0));
        assert_eq!(set.velocity[0], Vec3::ZERO);
    }
}
