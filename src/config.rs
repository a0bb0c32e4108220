//! Engine construction settings.
//!
//! Loaded off the audio thread from JSON. Everything here is fixed at
//! `prepare()` time; live control values live in `params`.

use crate::dsp::compressor::{
    DEFAULT_ATTACK_MS, DEFAULT_DRY_WET, DEFAULT_KNEE_DB, DEFAULT_RATIO, DEFAULT_RELEASE_MS,
    DEFAULT_THRESHOLD_DB,
};
use crate::dsp::{AutoClock, SidechainParams};
use crate::params::ParamValues;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MANUAL_RAMP_MS: f32 = 20.0;
pub const DEFAULT_AUTO_RAMP_MS: f32 = 50.0;
pub const DEFAULT_MIX_RAMP_MS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidechainConfig {
    pub attack_ms: f32,
    pub release_ms: f32,
    pub dry_wet: f32,
    pub threshold_db: f32,
    pub ratio: f32,
    pub knee_db: f32,
}

impl Default for SidechainConfig {
    fn default() -> Self {
        Self {
            attack_ms: DEFAULT_ATTACK_MS,
            release_ms: DEFAULT_RELEASE_MS,
            dry_wet: DEFAULT_DRY_WET,
            threshold_db: DEFAULT_THRESHOLD_DB,
            ratio: DEFAULT_RATIO,
            knee_db: DEFAULT_KNEE_DB,
        }
    }
}

impl SidechainConfig {
    pub fn apply_to(&self, params: &SidechainParams) {
        params.set_attack_ms(self.attack_ms);
        params.set_release_ms(self.release_ms);
        params.set_dry_wet(self.dry_wet);
        params.set_threshold_db(self.threshold_db);
        params.set_ratio(self.ratio);
        params.set_knee_db(self.knee_db);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub manual_ramp_ms: f32,
    pub auto_ramp_ms: f32,
    pub mix_ramp_ms: f32,
    pub auto_clock: AutoClock,
    pub sidechain: SidechainConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            manual_ramp_ms: DEFAULT_MANUAL_RAMP_MS,
            auto_ramp_ms: DEFAULT_AUTO_RAMP_MS,
            mix_ramp_ms: DEFAULT_MIX_RAMP_MS,
            auto_clock: AutoClock::default(),
            sidechain: SidechainConfig::default(),
        }
    }
}

fn check_positive(name: &str, v: f64) -> Result<()> {
    if !(v.is_finite() && v > 0.0) {
        bail!("{name} must be a positive number, got {v}");
    }
    Ok(())
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json).context("failed to parse engine config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config '{}'", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid engine config '{}'", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("manual_ramp_ms", self.manual_ramp_ms as f64)?;
        check_positive("auto_ramp_ms", self.auto_ramp_ms as f64)?;
        check_positive("mix_ramp_ms", self.mix_ramp_ms as f64)?;
        if let AutoClock::FixedTick { tick_seconds } = self.auto_clock {
            check_positive("auto_clock.tick_seconds", tick_seconds)?;
        }
        Ok(())
    }
}

/// Engine config plus initial control values, as read by the render tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub params: ParamValues,
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).context("failed to parse settings")?;
        settings.engine.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings '{}'", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid settings '{}'", path.display()))
    }
}
