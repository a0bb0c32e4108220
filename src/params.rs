//! Control-path parameters.
//!
//! `EngineParams` is a set of independent atomic cells in host units that any
//! thread may write. The audio thread takes a `BlockParams` snapshot once per
//! block; each field is a single-word load, so a writer never blocks it and a
//! snapshot may mix values from before and after a concurrent write.

use crate::tones::NUM_TONES;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub const TONE_GAIN_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const MASTER_MIX_RANGE: RangeInclusive<f32> = 0.0..=100.0;
pub const CYCLE_TIME_RANGE: RangeInclusive<f32> = 15.0..=120.0;
pub const INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=100.0;
pub const SC_TIME_RANGE: RangeInclusive<f32> = 1.0..=1000.0;
pub const SC_DRY_WET_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Clamp into `range`; NaN lands on the lower bound.
fn clamp_to(v: f32, range: &RangeInclusive<f32>) -> f32 {
    if v.is_nan() {
        *range.start()
    } else {
        v.clamp(*range.start(), *range.end())
    }
}

struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
}

// =============================================================================
// Serializable values (host units)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamValues {
    pub tone_gains: [f32; NUM_TONES],
    pub tone_enabled: [bool; NUM_TONES],
    /// Percent, 0..100.
    pub master_mix: f32,
    pub auto_mode: bool,
    /// Seconds, 15..120.
    pub cycle_time_s: f32,
    /// Percent, 0..100.
    pub auto_intensity: f32,
    pub sc_attack_ms: f32,
    pub sc_release_ms: f32,
    pub sc_dry_wet: f32,
}

impl Default for ParamValues {
    fn default() -> Self {
        Self {
            tone_gains: [0.0; NUM_TONES],
            tone_enabled: [false; NUM_TONES],
            master_mix: 15.0,
            auto_mode: true,
            cycle_time_s: 45.0,
            auto_intensity: 60.0,
            sc_attack_ms: 10.0,
            sc_release_ms: 100.0,
            sc_dry_wet: 0.5,
        }
    }
}

// =============================================================================
// Per-block snapshot (engine units)
// =============================================================================

/// Everything `MixEngine::process` needs for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockParams {
    /// Already zero for disabled tones.
    pub manual_gains: [f32; NUM_TONES],
    /// 0..1
    pub master_mix: f32,
    pub auto_mode: bool,
    pub cycle_time_s: f32,
    /// 0..1
    pub auto_intensity: f32,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self::from(&ParamValues::default())
    }
}

impl From<&ParamValues> for BlockParams {
    fn from(v: &ParamValues) -> Self {
        let mut manual_gains = [0.0; NUM_TONES];
        for (i, g) in manual_gains.iter_mut().enumerate() {
            if v.tone_enabled[i] {
                *g = clamp_to(v.tone_gains[i], &TONE_GAIN_RANGE);
            }
        }
        Self {
            manual_gains,
            master_mix: clamp_to(v.master_mix, &MASTER_MIX_RANGE) / 100.0,
            auto_mode: v.auto_mode,
            cycle_time_s: clamp_to(v.cycle_time_s, &CYCLE_TIME_RANGE),
            auto_intensity: clamp_to(v.auto_intensity, &INTENSITY_RANGE) / 100.0,
        }
    }
}

// =============================================================================
// Shared atomic cells
// =============================================================================

pub struct EngineParams {
    tone_gains: [AtomicF32; NUM_TONES],
    tone_enabled: [AtomicBool; NUM_TONES],
    master_mix: AtomicF32,
    auto_mode: AtomicBool,
    cycle_time_s: AtomicF32,
    auto_intensity: AtomicF32,
    sc_attack_ms: AtomicF32,
    sc_release_ms: AtomicF32,
    sc_dry_wet: AtomicF32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::from_values(&ParamValues::default())
    }
}

impl EngineParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: &ParamValues) -> Self {
        let params = Self {
            tone_gains: std::array::from_fn(|_| AtomicF32::new(0.0)),
            tone_enabled: std::array::from_fn(|_| AtomicBool::new(false)),
            master_mix: AtomicF32::new(0.0),
            auto_mode: AtomicBool::new(false),
            cycle_time_s: AtomicF32::new(0.0),
            auto_intensity: AtomicF32::new(0.0),
            sc_attack_ms: AtomicF32::new(0.0),
            sc_release_ms: AtomicF32::new(0.0),
            sc_dry_wet: AtomicF32::new(0.0),
        };
        params.apply(values);
        params
    }

    /// Write every field, clamping each to its range.
    pub fn apply(&self, values: &ParamValues) {
        for i in 0..NUM_TONES {
            self.set_tone_gain(i, values.tone_gains[i]);
            self.set_tone_enabled(i, values.tone_enabled[i]);
        }
        self.set_master_mix(values.master_mix);
        self.set_auto_mode(values.auto_mode);
        self.set_cycle_time_s(values.cycle_time_s);
        self.set_auto_intensity(values.auto_intensity);
        self.set_sc_attack_ms(values.sc_attack_ms);
        self.set_sc_release_ms(values.sc_release_ms);
        self.set_sc_dry_wet(values.sc_dry_wet);
    }

    pub fn values(&self) -> ParamValues {
        ParamValues {
            tone_gains: std::array::from_fn(|i| self.tone_gain(i)),
            tone_enabled: std::array::from_fn(|i| self.tone_enabled(i)),
            master_mix: self.master_mix.load(),
            auto_mode: self.auto_mode(),
            cycle_time_s: self.cycle_time_s.load(),
            auto_intensity: self.auto_intensity.load(),
            sc_attack_ms: self.sc_attack_ms(),
            sc_release_ms: self.sc_release_ms(),
            sc_dry_wet: self.sc_dry_wet(),
        }
    }

    /// Audio-thread view for one block, in engine units.
    pub fn snapshot(&self) -> BlockParams {
        let mut manual_gains = [0.0; NUM_TONES];
        for (i, g) in manual_gains.iter_mut().enumerate() {
            if self.tone_enabled(i) {
                *g = self.tone_gain(i);
            }
        }
        BlockParams {
            manual_gains,
            master_mix: self.master_mix.load() / 100.0,
            auto_mode: self.auto_mode(),
            cycle_time_s: self.cycle_time_s.load(),
            auto_intensity: self.auto_intensity.load() / 100.0,
        }
    }

    /// Out-of-range tones are ignored.
    pub fn set_tone_gain(&self, tone: usize, gain: f32) {
        if let Some(cell) = self.tone_gains.get(tone) {
            cell.store(clamp_to(gain, &TONE_GAIN_RANGE));
        }
    }

    pub fn set_tone_enabled(&self, tone: usize, enabled: bool) {
        if let Some(cell) = self.tone_enabled.get(tone) {
            cell.store(enabled, Ordering::Relaxed);
        }
    }

    pub fn tone_gain(&self, tone: usize) -> f32 {
        self.tone_gains.get(tone).map_or(0.0, AtomicF32::load)
    }

    pub fn tone_enabled(&self, tone: usize) -> bool {
        self.tone_enabled
            .get(tone)
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Percent.
    pub fn set_master_mix(&self, percent: f32) {
        self.master_mix.store(clamp_to(percent, &MASTER_MIX_RANGE));
    }

    pub fn set_auto_mode(&self, on: bool) {
        self.auto_mode.store(on, Ordering::Relaxed);
    }

    pub fn auto_mode(&self) -> bool {
        self.auto_mode.load(Ordering::Relaxed)
    }

    pub fn set_cycle_time_s(&self, seconds: f32) {
        self.cycle_time_s.store(clamp_to(seconds, &CYCLE_TIME_RANGE));
    }

    /// Percent.
    pub fn set_auto_intensity(&self, percent: f32) {
        self.auto_intensity.store(clamp_to(percent, &INTENSITY_RANGE));
    }

    pub fn set_sc_attack_ms(&self, ms: f32) {
        self.sc_attack_ms.store(clamp_to(ms, &SC_TIME_RANGE));
    }

    pub fn set_sc_release_ms(&self, ms: f32) {
        self.sc_release_ms.store(clamp_to(ms, &SC_TIME_RANGE));
    }

    pub fn set_sc_dry_wet(&self, wet: f32) {
        self.sc_dry_wet.store(clamp_to(wet, &SC_DRY_WET_RANGE));
    }

    pub fn sc_attack_ms(&self) -> f32 {
        self.sc_attack_ms.load()
    }

    pub fn sc_release_ms(&self) -> f32 {
        self.sc_release_ms.load()
    }

    pub fn sc_dry_wet(&self) -> f32 {
        self.sc_dry_wet.load()
    }
}
