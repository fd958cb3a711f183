//! Scenario file loaded from TOML and checked before a run

use anyhow::{bail, Context, Result};
use quakesim::{DisturbanceConfig, LightConfig, ShakerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which optional collaborators the scenario wires into the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collaborators {
    pub audio: bool,
    pub haptics: bool,
    pub vignette: bool,
    pub controllers: bool,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            audio: true,
            haptics: true,
            vignette: true,
            controllers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSpec {
    pub intensity: f64,
    pub enabled: bool,
    pub flicker: LightConfig,
}

impl Default for LightSpec {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            enabled: true,
            flicker: LightConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSpec {
    pub position: [f64; 3],
    /// Heading about the up axis [deg]
    pub yaw_deg: f64,
    /// Shake through velocity changes instead of writing the pose
    pub physical: bool,
    pub shake: ShakerConfig,
}

impl Default for ObjectSpec {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            yaw_deg: 0.0,
            physical: false,
            shake: ShakerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Ticks per simulated second
    pub tick_rate: f64,
    /// Noise seed; drawn at random when absent
    pub seed: Option<u64>,
    /// Issue a second start this many seconds in
    pub restart_at: Option<f64>,
    pub disturbance: DisturbanceConfig,
    pub collaborators: Collaborators,
    pub lights: Vec<LightSpec>,
    pub objects: Vec<ObjectSpec>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            tick_rate: 72.0,
            seed: None,
            restart_at: None,
            disturbance: DisturbanceConfig::default(),
            collaborators: Collaborators::default(),
            lights: vec![LightSpec::default()],
            objects: vec![ObjectSpec::default()],
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file: {}", path.display()))?;
        let cfg: ScenarioConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse TOML scenario: {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            bail!("tick_rate must be finite and > 0");
        }
        if let Some(at) = self.restart_at {
            if !at.is_finite() || at < 0.0 {
                bail!("restart_at must be finite and >= 0");
            }
        }
        self.disturbance
            .validate()
            .context("invalid [disturbance] section")?;
        for (i, light) in self.lights.iter().enumerate() {
            light
                .flicker
                .validate()
                .with_context(|| format!("invalid light #{i}"))?;
        }
        for (i, object) in self.objects.iter().enumerate() {
            object
                .shake
                .validate()
                .with_context(|| format!("invalid object #{i}"))?;
        }
        Ok(())
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate
    }
}
