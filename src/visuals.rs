//! How samples look: color, point-sprite falloff and size.
//!
//! Everything here has a WGSL twin in [`crate::gpu`]; the Rust versions are
//! the reference used by tests and by hosts that shade on the CPU.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::gradient::GradientSpec;

/// Color used when no gradient is configured.
pub const DEFAULT_PARTICLE_COLOR: Vec3 = Vec3::new(1.0, 1.0, 1.0);

/// Default gradient blend sharpness.
pub const DEFAULT_BLEND_POWER: f32 = 2.0;

/// Point-sprite radius beyond which fragments are discarded.
pub const SPRITE_RADIUS: f32 = 0.5;

/// How samples are colored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColorMode {
    /// Every sample gets the same color.
    Flat { color: Vec3 },
    /// Inverse-distance blend of gradient anchors over normalized position.
    Gradient {
        spec: GradientSpec,
        #[serde(default = "default_blend_power")]
        blend_power: f32,
    },
}

fn default_blend_power() -> f32 {
    DEFAULT_BLEND_POWER
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Flat {
            color: DEFAULT_PARTICLE_COLOR,
        }
    }
}

impl ColorMode {
    pub fn gradient(spec: GradientSpec, blend_power: f32) -> Self {
        ColorMode::Gradient { spec, blend_power }
    }

    /// Gradient in use, if any. Empty gradients count as none.
    pub fn active_gradient(&self) -> Option<(&GradientSpec, f32)> {
        match self {
            ColorMode::Gradient { spec, blend_power } if !spec.is_empty() => Some((spec, *blend_power)),
            _ => None,
        }
    }

    /// Color for a sample at `normalized` (position mapped into `[0, 1]^3`).
    ///
    /// An empty gradient falls back to [`DEFAULT_PARTICLE_COLOR`].
    pub fn resolve(&self, normalized: Vec3) -> Vec3 {
        match self {
            ColorMode::Flat { color } => *color,
            ColorMode::Gradient { spec, blend_power } => spec
                .resolve(normalized, *blend_power)
                .unwrap_or(DEFAULT_PARTICLE_COLOR),
        }
    }

    /// Color used for the flat path of the shader.
    pub fn flat_color(&self) -> Vec3 {
        match self {
            ColorMode::Flat { color } => *color,
            ColorMode::Gradient { .. } => DEFAULT_PARTICLE_COLOR,
        }
    }
}

/// Soft disk intensity at sprite radius `r` (0 at the centre, 0.5 at the edge).
///
/// `None` means the fragment is discarded.
#[inline]
pub fn radial_falloff(r: f32) -> Option<f32> {
    if r > SPRITE_RADIUS {
        return None;
    }
    let edge = 1.0 - 2.0 * r;
    Some(edge * edge)
}

/// Final fragment color: RGB scaled by intensity, alpha = intensity.
#[inline]
pub fn shade(color: Vec3, r: f32) -> Option<Vec4> {
    radial_falloff(r).map(|i| (color * i).extend(i))
}

/// Size multiplier of the pulse wave for a sample at `original`.
#[inline]
pub fn pulse_factor(elapsed_time: f32, original: Vec3) -> f32 {
    (elapsed_time * 2.0 + original.x * 10.0 + original.y * 10.0).sin() * 0.5 + 1.0
}

#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Growth for a sample near the pointer; `proximity` is `1 - dist / radius`.
#[inline]
pub fn proximity_growth(proximity: f32) -> f32 {
    if proximity <= 0.0 {
        return 1.0;
    }
    1.0 + 0.5 * ease_out_cubic(proximity.min(1.0))
}

/// Perspective size attenuation: world-space size to pixels at `depth`.
#[inline]
pub fn attenuated_size(world_size: f32, depth: f32, viewport_height: f32) -> f32 {
    world_size * (viewport_height * 0.5) / depth.max(1e-3)
}

/// Everything that scales one sample's point size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeInputs {
    pub point_size: f32,
    pub pulse_enabled: bool,
    pub interactive: bool,
    pub elapsed_time: f32,
    pub original: Vec3,
    pub proximity: f32,
    pub depth: f32,
    pub viewport_height: f32,
}

/// Point size in pixels.
pub fn point_size(inputs: &SizeInputs) -> f32 {
    let mut size = inputs.point_size;
    if inputs.pulse_enabled {
        size *= pulse_factor(inputs.elapsed_time, inputs.original);
    }
    if inputs.interactive {
        size *= proximity_growth(inputs.proximity);
    }
    attenuated_size(size, inputs.depth, inputs.viewport_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::GradientStop;

    #[test]
    fn test_falloff_shape() {
        assert_eq!(radial_falloff(0.0), Some(1.0));
        assert_eq!(radial_falloff(0.25), Some(0.25));
        assert_eq!(radial_falloff(0.5), Some(0.0));
        assert_eq!(radial_falloff(0.51), None);
    }

    #[test]
    fn test_shade_premultiplies() {
        let c = shade(Vec3::new(1.0, 0.5, 0.0), 0.25).unwrap();
        assert_eq!(c, Vec4::new(0.25, 0.125, 0.0, 0.25));
        assert!(shade(Vec3::ONE, 0.7).is_none());
    }

    #[test]
    fn test_pulse_range() {
        for i in 0..100 {
            let f = pulse_factor(i as f32 * 0.37, Vec3::new(i as f32 * 0.01, 0.3, 0.0));
            assert!((0.5..=1.5).contains(&f));
        }
        assert!((pulse_factor(0.0, Vec3::ZERO) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ease_out_cubic() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn test_proximity_growth() {
        assert_eq!(proximity_growth(0.0), 1.0);
        assert_eq!(proximity_growth(1.0), 1.5);
        assert_eq!(proximity_growth(3.0), 1.5);
    }

    #[test]
    fn test_size_attenuates_with_depth() {
        let mut inputs = SizeInputs {
            point_size: 0.1,
            pulse_enabled: false,
            interactive: false,
            elapsed_time: 0.0,
            original: Vec3::ZERO,
            proximity: 0.0,
            depth: 2.0,
            viewport_height: 800.0,
        };
        let near = point_size(&inputs);
        inputs.depth = 4.0;
        let far = point_size(&inputs);
        assert!((near - 20.0).abs() < 1e-4);
        assert!((far - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_growth_only_when_interactive() {
        let mut inputs = SizeInputs {
            point_size: 0.1,
            pulse_enabled: false,
            interactive: false,
            elapsed_time: 0.0,
            original: Vec3::ZERO,
            proximity: 1.0,
            depth: 1.0,
            viewport_height: 2.0,
        };
        let base = point_size(&inputs);
        inputs.interactive = true;
        assert!((point_size(&inputs) - base * 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_color_mode_fallbacks() {
        assert_eq!(ColorMode::default().resolve(Vec3::ZERO), DEFAULT_PARTICLE_COLOR);
        let empty = ColorMode::gradient(GradientSpec::default(), 2.0);
        assert_eq!(empty.resolve(Vec3::ONE), DEFAULT_PARTICLE_COLOR);
        assert!(empty.active_gradient().is_none());

        let red = ColorMode::gradient(GradientSpec::new(vec![GradientStop::new(Vec3::X, Vec3::ZERO)]), 2.0);
        assert!((red.resolve(Vec3::ONE) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_color_mode_json() {
        let json = r#"{"mode":"gradient","spec":[{"color":[1,0,0],"anchor":[0,0,0]}]}"#;
        let mode: ColorMode = serde_json::from_str(json).unwrap();
        match mode {
            ColorMode::Gradient { spec, blend_power } => {
                assert_eq!(spec.len(), 1);
                assert_eq!(blend_power, DEFAULT_BLEND_POWER);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
