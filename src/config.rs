//! Configuration for the disturbance driver and its subscribers
//!
//! Every struct carries the values the reference scene ships with as its
//! `Default`, and all of them deserialize with missing fields falling back to
//! those defaults.

use serde::{Deserialize, Serialize};

use crate::sinks::ClipHandle;
use crate::QuakeError;

/// Discrete intensity preset applied on top of the base intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl IntensityTier {
    pub fn multiplier(self) -> f64 {
        match self {
            IntensityTier::Low => 0.5,
            IntensityTier::Medium => 1.0,
            IntensityTier::High => 2.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IntensityTier::Low => "low",
            IntensityTier::Medium => "medium",
            IntensityTier::High => "high",
        }
    }
}

/// Settings for one activation of the disturbance driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisturbanceConfig {
    /// Total shaking time [s]
    pub duration: f64,
    pub tier: IntensityTier,
    /// Translational strength before the tier multiplier is applied
    pub base_intensity: f64,
    /// Vignette aperture while shaking (0 = closed, 1 = fully open)
    pub vignette_size_during_quake: f64,
    /// Clips picked at random for falling debris
    pub debris_clips: Vec<ClipHandle>,
    /// Clips picked at random for sharp structural cracks
    pub stress_clips: Vec<ClipHandle>,
}

impl Default for DisturbanceConfig {
    fn default() -> Self {
        Self {
            duration: 60.0,
            tier: IntensityTier::Medium,
            base_intensity: 0.05,
            vignette_size_during_quake: 0.3,
            debris_clips: Vec::new(),
            stress_clips: Vec::new(),
        }
    }
}

impl DisturbanceConfig {
    pub fn validate(&self) -> Result<(), QuakeError> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(QuakeError::InvalidConfig(format!(
                "duration must be finite and > 0, got {}",
                self.duration
            )));
        }

        if !self.base_intensity.is_finite() || self.base_intensity < 0.0 {
            return Err(QuakeError::InvalidConfig(format!(
                "base_intensity must be finite and >= 0, got {}",
                self.base_intensity
            )));
        }

        if !(0.0..=1.0).contains(&self.vignette_size_during_quake) {
            return Err(QuakeError::InvalidConfig(format!(
                "vignette_size_during_quake must be in [0, 1], got {}",
                self.vignette_size_during_quake
            )));
        }

        Ok(())
    }

    /// Peak strength of the activation, reached while the envelope holds at 1.
    pub fn target_strength(&self) -> f64 {
        self.base_intensity * self.tier.multiplier()
    }
}

/// Flicker settings for a light subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Published intensity the light must exceed before it flickers
    pub flicker_threshold: f64,
    /// Scales the longest wait between flicker steps (`flicker_speed * 5` s)
    pub flicker_speed: f64,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            flicker_threshold: 0.1,
            flicker_speed: 0.05,
        }
    }
}

impl LightConfig {
    pub fn validate(&self) -> Result<(), QuakeError> {
        if !self.flicker_threshold.is_finite() || self.flicker_threshold < 0.0 {
            return Err(QuakeError::InvalidConfig(
                "flicker_threshold must be finite and >= 0".to_string(),
            ));
        }
        if !self.flicker_speed.is_finite() || self.flicker_speed <= 0.0 {
            return Err(QuakeError::InvalidConfig(
                "flicker_speed must be finite and > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Axis that never receives translational shake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockedAxis {
    X,
    #[default]
    Y,
    Z,
}

/// Shake settings for a prop subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakerConfig {
    pub position_multiplier: f64,
    pub rotation_multiplier: f64,
    pub locked_axis: LockedAxis,
}

impl Default for ShakerConfig {
    fn default() -> Self {
        Self {
            position_multiplier: 0.2,
            rotation_multiplier: 0.5,
            locked_axis: LockedAxis::Y,
        }
    }
}

impl ShakerConfig {
    pub fn validate(&self) -> Result<(), QuakeError> {
        if !self.position_multiplier.is_finite() || !self.rotation_multiplier.is_finite() {
            return Err(QuakeError::InvalidConfig(
                "shake multipliers must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_multipliers_match_presets() {
        assert_eq!(IntensityTier::Low.multiplier(), 0.5);
        assert_eq!(IntensityTier::Medium.multiplier(), 1.0);
        assert_eq!(IntensityTier::High.multiplier(), 2.5);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let cfg = DisturbanceConfig {
            duration: 0.0,
            ..DisturbanceConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(QuakeError::InvalidConfig(_))));

        let cfg = DisturbanceConfig {
            duration: -3.0,
            ..DisturbanceConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let cfg: DisturbanceConfig =
            serde_json::from_str(r#"{ "duration": 10.0, "tier": "high" }"#).expect("parse");
        assert_eq!(cfg.duration, 10.0);
        assert_eq!(cfg.tier, IntensityTier::High);
        assert_eq!(cfg.base_intensity, 0.05);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn flicker_speed_must_be_positive() {
        let cfg = LightConfig {
            flicker_speed: 0.0,
            ..LightConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
