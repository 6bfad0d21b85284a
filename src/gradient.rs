//! Spatial color gradients.
//!
//! A [`GradientSpec`] is a small set of anchors in the unit cube, each with a
//! color. A sample's position is normalized against the particle set's
//! bounds and its color is an inverse-distance-weighted blend of the anchors:
//!
//! ```text
//! weight_k = 1 / (|p - anchor_k| + 0.1) ^ blend_power
//! color    = sum(weight_k * color_k) / sum(weight_k)
//! ```
//!
//! Higher `blend_power` gives sharper transitions between anchors.
//!
//! Weights are evaluated relative to the nearest anchor,
//! `((d_min + 0.1) / (d_k + 0.1)) ^ blend_power`, which is the same blend
//! scaled by a common factor but stays in `(0, 1]` for any power.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Maximum number of anchors a gradient keeps.
pub const MAX_GRADIENT_STOPS: usize = 8;

/// Added to every anchor distance so a sample sitting on an anchor does not
/// produce an infinite weight.
pub const DISTANCE_BIAS: f32 = 0.1;

/// One gradient anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Linear RGB, 0.0-1.0.
    pub color: Vec3,
    /// Anchor position in `[0, 1]^3`.
    pub anchor: Vec3,
}

impl GradientStop {
    pub fn new(color: Vec3, anchor: Vec3) -> Self {
        Self { color, anchor }
    }
}

/// Ordered list of at most [`MAX_GRADIENT_STOPS`] anchors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<GradientStop>", into = "Vec<GradientStop>")]
pub struct GradientSpec {
    stops: Vec<GradientStop>,
}

impl GradientSpec {
    /// Build a gradient, silently keeping only the first eight stops.
    pub fn new(mut stops: Vec<GradientStop>) -> Self {
        if stops.len() > MAX_GRADIENT_STOPS {
            log::debug!(
                "gradient has {} stops, keeping the first {}",
                stops.len(),
                MAX_GRADIENT_STOPS
            );
            stops.truncate(MAX_GRADIENT_STOPS);
        }
        Self { stops }
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Blend the anchors at a normalized position. `None` for an empty gradient.
    pub fn resolve(&self, normalized: Vec3, blend_power: f32) -> Option<Vec3> {
        if self.stops.is_empty() {
            return None;
        }

        let nearest = self
            .stops
            .iter()
            .map(|stop| normalized.distance(stop.anchor))
            .fold(f32::INFINITY, f32::min);

        let mut sum = Vec3::ZERO;
        let mut total = 0.0;
        for stop in &self.stops {
            let w = anchor_weight(normalized.distance(stop.anchor), nearest, blend_power);
            sum += stop.color * w;
            total += w;
        }
        Some(sum / total)
    }
}

impl From<Vec<GradientStop>> for GradientSpec {
    fn from(stops: Vec<GradientStop>) -> Self {
        Self::new(stops)
    }
}

impl From<GradientSpec> for Vec<GradientStop> {
    fn from(spec: GradientSpec) -> Self {
        spec.stops
    }
}

/// Inverse-distance weight of an anchor `distance` away, relative to the
/// nearest anchor at `nearest`. The nearest anchor weighs 1.
#[inline]
pub fn anchor_weight(distance: f32, nearest: f32, blend_power: f32) -> f32 {
    ((nearest + DISTANCE_BIAS) / (distance + DISTANCE_BIAS)).powf(blend_power)
}

/// Pre-defined gradients.
///
/// Each palette lays its five colors out evenly along one axis of the unit
/// cube, so a model fades from one end to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Palette {
    /// Perceptually uniform, purple to yellow.
    #[default]
    Viridis,
    /// Black to yellow through red.
    Magma,
    /// Dark purple, pink, orange, yellow.
    Sunset,
    /// Deep blue to cyan.
    Ocean,
    /// Dark red through orange to white.
    Fire,
    /// Pink, purple, blue, cyan, green.
    Neon,
}

impl Palette {
    /// The five color stops for this palette.
    pub fn colors(&self) -> [Vec3; 5] {
        match self {
            Palette::Viridis => [
                Vec3::new(0.267, 0.004, 0.329),
                Vec3::new(0.282, 0.140, 0.458),
                Vec3::new(0.127, 0.566, 0.551),
                Vec3::new(0.369, 0.789, 0.383),
                Vec3::new(0.993, 0.906, 0.144),
            ],
            Palette::Magma => [
                Vec3::new(0.001, 0.0, 0.014),
                Vec3::new(0.329, 0.071, 0.435),
                Vec3::new(0.716, 0.215, 0.475),
                Vec3::new(0.994, 0.541, 0.380),
                Vec3::new(0.987, 0.991, 0.749),
            ],
            Palette::Sunset => [
                Vec3::new(0.1, 0.0, 0.2),
                Vec3::new(0.5, 0.0, 0.5),
                Vec3::new(1.0, 0.2, 0.4),
                Vec3::new(1.0, 0.5, 0.2),
                Vec3::new(1.0, 0.9, 0.4),
            ],
            Palette::Ocean => [
                Vec3::new(0.0, 0.05, 0.15),
                Vec3::new(0.0, 0.2, 0.4),
                Vec3::new(0.0, 0.4, 0.6),
                Vec3::new(0.2, 0.6, 0.8),
                Vec3::new(0.6, 0.9, 1.0),
            ],
            Palette::Fire => [
                Vec3::new(0.1, 0.0, 0.0),
                Vec3::new(0.5, 0.0, 0.0),
                Vec3::new(1.0, 0.3, 0.0),
                Vec3::new(1.0, 0.7, 0.0),
                Vec3::new(1.0, 1.0, 0.8),
            ],
            Palette::Neon => [
                Vec3::new(1.0, 0.0, 0.5),
                Vec3::new(0.5, 0.0, 1.0),
                Vec3::new(0.0, 0.5, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(0.5, 1.0, 0.5),
            ],
        }
    }

    /// Gradient running from the low to the high end of `axis` (0 = X, 1 = Y,
    /// anything else = Z). Anchors sit on the centre line of the cube.
    pub fn gradient(&self, axis: usize) -> GradientSpec {
        let colors = self.colors();
        let last = (colors.len() - 1) as f32;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| {
                let mut anchor = Vec3::splat(0.5);
                let t = i as f32 / last;
                match axis {
                    0 => anchor.x = t,
                    1 => anchor.y = t,
                    _ => anchor.z = t,
                }
                GradientStop::new(color, anchor)
            })
            .collect();
        GradientSpec::new(stops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stop() -> GradientSpec {
        GradientSpec::new(vec![
            GradientStop::new(Vec3::X, Vec3::ZERO),
            GradientStop::new(Vec3::Z, Vec3::ONE),
        ])
    }

    #[test]
    fn test_empty_resolves_none() {
        assert_eq!(GradientSpec::default().resolve(Vec3::ZERO, 2.0), None);
    }

    #[test]
    fn test_truncates_to_eight() {
        let stops = (0..12)
            .map(|i| GradientStop::new(Vec3::splat(i as f32), Vec3::ZERO))
            .collect();
        let spec = GradientSpec::new(stops);
        assert_eq!(spec.len(), MAX_GRADIENT_STOPS);
        assert_eq!(spec.stops()[7].color, Vec3::splat(7.0));
    }

    #[test]
    fn test_single_stop_is_flat() {
        let spec = GradientSpec::new(vec![GradientStop::new(Vec3::new(0.2, 0.4, 0.6), Vec3::ONE)]);
        let c = spec.resolve(Vec3::new(0.1, 0.9, 0.3), 3.0).unwrap();
        assert!((c - Vec3::new(0.2, 0.4, 0.6)).length() < 1e-6);
    }

    #[test]
    fn test_midpoint_is_even_blend() {
        let c = two_stop().resolve(Vec3::splat(0.5), 2.0).unwrap();
        assert!((c - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_sharper_power_favors_nearest() {
        let spec = two_stop();
        let soft = spec.resolve(Vec3::ZERO, 1.0).unwrap();
        let sharp = spec.resolve(Vec3::ZERO, 8.0).unwrap();
        assert!(sharp.x > soft.x);
        assert!(sharp.x > 0.999);
    }

    #[test]
    fn test_extreme_power_stays_finite() {
        let spec = two_stop();
        for power in [32.0, 64.0, 256.0, 1.0e4] {
            let c = spec.resolve(Vec3::ZERO, power).unwrap();
            assert!(c.is_finite(), "power {} gave {:?}", power, c);
            assert!((c - Vec3::X).length() < 1e-6);
        }
        let mid = spec.resolve(Vec3::splat(0.5), 256.0).unwrap();
        assert!((mid - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_weight_matches_absolute_form() {
        // Relative weights are the absolute ones scaled by (nearest + bias)^p.
        let (d, nearest, p) = (0.7, 0.2, 3.0);
        let absolute = 1.0 / (d + DISTANCE_BIAS).powf(p);
        let scale = (nearest + DISTANCE_BIAS).powf(p);
        assert!((anchor_weight(d, nearest, p) - absolute * scale).abs() < 1e-6);
        assert_eq!(anchor_weight(nearest, nearest, p), 1.0);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let spec = Palette::Sunset.gradient(1);
        let a = spec.resolve(Vec3::new(0.3, 0.7, 0.2), 2.5).unwrap();
        let b = spec.resolve(Vec3::new(0.3, 0.7, 0.2), 2.5).unwrap();
        assert_eq!(a.to_array().map(f32::to_bits), b.to_array().map(f32::to_bits));
    }

    #[test]
    fn test_palette_gradient_layout() {
        let spec = Palette::Ocean.gradient(1);
        assert_eq!(spec.len(), 5);
        assert_eq!(spec.stops()[0].anchor, Vec3::new(0.5, 0.0, 0.5));
        assert_eq!(spec.stops()[4].anchor, Vec3::new(0.5, 1.0, 0.5));
    }

    #[test]
    fn test_serde_truncates() {
        let stops: Vec<GradientStop> = (0..10)
            .map(|_| GradientStop::new(Vec3::ONE, Vec3::ZERO))
            .collect();
        let json = serde_json::to_string(&stops).unwrap();
        let spec: GradientSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec.len(), MAX_GRADIENT_STOPS);
    }
}
