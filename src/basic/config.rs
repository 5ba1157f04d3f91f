use std::{f64::consts::PI, fs, path::Path};

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// System-wide settings shared by the assembler, the power-flow solver and the element models.
///
/// Every field has a default, so a partial JSON document such as `{"s_base_mva": 50.0}` is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Common power base in MVA.
    pub s_base_mva: f64,
    /// Nominal frequency in Hz.
    pub frequency_hz: f64,
    /// Convergence tolerance on the largest power mismatch, in p.u.
    pub tolerance: f64,
    /// Newton-Raphson iteration bound.
    pub max_iterations: usize,
    /// Angle of the slack bus voltage, in degrees.
    pub slack_angle_deg: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            s_base_mva: 100.0,
            frequency_hz: 60.0,
            tolerance: 1e-3,
            max_iterations: 50,
            slack_angle_deg: 0.0,
        }
    }
}

impl SystemConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: SystemConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Checks that the bases and solver bounds are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.s_base_mva.is_finite() && self.s_base_mva > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "s_base_mva must be positive, got {}",
                self.s_base_mva
            )));
        }
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frequency_hz must be positive, got {}",
                self.frequency_hz
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be at least 1".into()));
        }
        Ok(())
    }

    /// Base angular frequency `2πf` in rad/s.
    #[inline(always)]
    pub fn wbase(&self) -> f64 {
        2.0 * PI * self.frequency_hz
    }

    /// Base impedance in ohms at a bus of `v_base_kv`.
    #[inline(always)]
    pub fn z_base(&self, v_base_kv: f64) -> f64 {
        v_base_kv * v_base_kv / self.s_base_mva
    }

    #[inline(always)]
    pub fn slack_angle_rad(&self) -> f64 {
        self.slack_angle_deg.to_radians()
    }
}
