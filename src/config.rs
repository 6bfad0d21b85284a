//! Engine configuration.
//!
//! [`EngineConfig`] bundles everything an engine needs besides the mesh:
//! sampling stride, simulation tuning, color mode and the world transform
//! of the particle set. It round-trips through JSON so scenes can be tuned
//! without recompiling; fields left out take their defaults.
//!
//! ```ignore
//! let config = EngineConfig::from_json(r#"{
//!     "stride": 3,
//!     "params": { "repulsion_radius": 1.5, "pulse_enabled": true },
//!     "color": { "mode": "flat", "color": [0.9, 0.6, 1.0] }
//! }"#)?;
//! ```

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gradient::GradientSpec;
use crate::simulation::SimulationParams;
use crate::visuals::ColorMode;

fn default_stride() -> usize {
    1
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Take every `stride`-th vertex. Must be at least 1.
    #[serde(default = "default_stride")]
    pub stride: usize,
    #[serde(default)]
    pub params: SimulationParams,
    #[serde(default)]
    pub color: ColorMode,
    /// Maps particle-set local space into world space.
    #[serde(default = "Mat4::default")]
    pub world_transform: Mat4,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stride: default_stride(),
            params: SimulationParams::default(),
            color: ColorMode::default(),
            world_transform: Mat4::IDENTITY,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_params(mut self, params: SimulationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    /// Shorthand for a gradient color mode.
    pub fn with_gradient(mut self, spec: GradientSpec, blend_power: f32) -> Self {
        self.color = ColorMode::gradient(spec, blend_power);
        self
    }

    pub fn with_world_transform(mut self, transform: Mat4) -> Self {
        self.world_transform = transform;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stride == 0 {
            return Err(ConfigError::ZeroStride);
        }
        self.params.validate()?;
        if let ColorMode::Gradient { blend_power, .. } = &self.color {
            if !blend_power.is_finite() || *blend_power < 0.0 {
                return Err(ConfigError::InvalidParam {
                    name: "blend_power",
                    expected: "a finite value >= 0",
                    value: *blend_power,
                });
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::Palette;
    use glam::Vec3;

    #[test]
    fn test_empty_json_is_default() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_params() {
        let config = EngineConfig::from_json(
            r#"{ "stride": 3, "params": { "repulsion_radius": 1.5, "pulse_enabled": true } }"#,
        )
        .unwrap();
        assert_eq!(config.stride, 3);
        assert_eq!(config.params.repulsion_radius, 1.5);
        assert!(config.params.pulse_enabled);
        assert_eq!(config.params.damping_factor, 0.8);
    }

    #[test]
    fn test_round_trip() {
        let config = EngineConfig::new()
            .with_stride(2)
            .with_gradient(Palette::Fire.gradient(1), 3.0)
            .with_world_transform(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_stride() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "stride": 0 }"#),
            Err(ConfigError::ZeroStride)
        ));
    }

    #[test]
    fn test_rejects_bad_params() {
        let err = EngineConfig::from_json(r#"{ "params": { "damping_factor": 1.2 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParam { name: "damping_factor", .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(EngineConfig::from_json("{ stride"), Err(ConfigError::Json(_))));
    }
}
