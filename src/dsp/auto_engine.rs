//! Smart Auto Engine (Automatic Tone Selection)
//!
//! # Contract
//! - **Input**: The reference channel of every block, pre-mix.
//! - **Output**: Ten target gains in `[0, 1]`, three of them non-zero in
//!   steady state, up to six while a crossfade is running.
//! - **Will Not Do**:
//!   - Touch audio. It only produces gain targets; the mix engine smooths them.
//!
//! # State Machine
//! `Steady` (progress == 1) → cycle timer expires and the profile picks a
//! different set → `Crossfading` (progress 0 → 1 over 5 s) → commit the pending
//! set → `Steady`. A selection equal to the active set does not transition.
//!
//! # Clock
//! By default the engine advances a fixed 1/60 s per `target_gains()` call,
//! independent of the block length. Cycle and crossfade timing therefore
//! follow the call rate, not elapsed audio time. `AutoClock::SampleAccurate`
//! advances by the length of the last analysed block instead.

use super::band_analyzer::{BandAnalyzer, BandEnergies};
use super::profile::{classify, select_set, FrequencySet, MusicProfile};
use crate::tones::NUM_TONES;
use serde::{Deserialize, Serialize};

/// Nominal seconds per `target_gains()` call with the fixed-tick clock.
pub const DEFAULT_TICK_SECONDS: f64 = 1.0 / 60.0;

/// Length of an auto crossfade.
pub const CROSSFADE_SECONDS: f64 = 5.0;

/// Above this smoothed energy the tone layer is scaled down with loudness.
const ADAPTIVE_ENERGY_FLOOR: f32 = 0.01;
const ADAPTIVE_MIN: f32 = 0.2;
const ADAPTIVE_MAX: f32 = 1.0;

const INITIAL_ACTIVE: FrequencySet = [0, 5, 9];
const INITIAL_NEXT: FrequencySet = [1, 6, 8];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AutoClock {
    /// Advance `tick_seconds` per call.
    FixedTick { tick_seconds: f64 },
    /// Advance by the duration of the last analysed block.
    SampleAccurate,
}

impl Default for AutoClock {
    fn default() -> Self {
        AutoClock::FixedTick {
            tick_seconds: DEFAULT_TICK_SECONDS,
        }
    }
}

pub struct SmartAutoEngine {
    sample_rate: f32,
    clock: AutoClock,
    analyzer: BandAnalyzer,
    profile: MusicProfile,
    last_block_len: usize,

    cycle_timer: f64,
    cycle_slot: u32,
    active_set: FrequencySet,
    next_set: FrequencySet,
    crossfade_progress: f32,
    is_crossfading: bool,
}

impl SmartAutoEngine {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_clock(sample_rate, AutoClock::default())
    }

    pub fn with_clock(sample_rate: f32, clock: AutoClock) -> Self {
        let mut engine = Self {
            sample_rate,
            clock,
            analyzer: BandAnalyzer::new(sample_rate),
            profile: MusicProfile::Quiet,
            last_block_len: 0,
            cycle_timer: 0.0,
            cycle_slot: 0,
            active_set: INITIAL_ACTIVE,
            next_set: INITIAL_NEXT,
            crossfade_progress: 1.0,
            is_crossfading: false,
        };
        engine.prepare(sample_rate);
        engine
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.analyzer.prepare(sample_rate);
        self.reset();
    }

    pub fn set_clock(&mut self, clock: AutoClock) {
        self.clock = clock;
    }

    /// Back to the power-on state: filters, energies, timers and tone sets.
    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.profile = MusicProfile::Quiet;
        self.last_block_len = 0;
        self.cycle_timer = 0.0;
        self.cycle_slot = 0;
        self.active_set = INITIAL_ACTIVE;
        self.next_set = INITIAL_NEXT;
        self.crossfade_progress = 1.0;
        self.is_crossfading = false;
    }

    /// Update band energies from one block of the reference channel and
    /// reclassify the music profile.
    pub fn analyze_block(&mut self, data: &[f32]) {
        let e = *self.analyzer.analyze_block(data);
        self.last_block_len = data.len();
        let profile = classify(e.smooth_bass, e.smooth_mid, e.smooth_high);
        if profile != self.profile {
            crate::sf_log!(
                "auto: profile {} -> {}",
                self.profile.name(),
                profile.name()
            );
        }
        self.profile = profile;
    }

    fn tick_seconds(&self) -> f64 {
        match self.clock {
            AutoClock::FixedTick { tick_seconds } => tick_seconds,
            AutoClock::SampleAccurate => {
                self.last_block_len as f64 / self.sample_rate.max(1.0) as f64
            }
        }
    }

    /// Advance the clock by one call, run the cycle/crossfade state machine
    /// and write the resulting target gains into `out`.
    pub fn target_gains(&mut self, out: &mut [f32; NUM_TONES], cycle_time_s: f32, intensity: f32) {
        let tick = self.tick_seconds();
        self.cycle_timer += tick;

        if self.is_crossfading {
            self.crossfade_progress += (tick / CROSSFADE_SECONDS) as f32;
            if self.crossfade_progress >= 1.0 {
                self.crossfade_progress = 1.0;
                self.is_crossfading = false;
                self.active_set = self.next_set;
                crate::sf_log!("auto: committed set {:?}", self.active_set);
            }
        }

        if !self.is_crossfading && self.cycle_timer >= cycle_time_s as f64 {
            self.cycle_timer = 0.0;
            self.cycle_slot = self.cycle_slot.wrapping_add(1);
            self.next_set = select_set(self.profile, self.cycle_slot);
            if self.next_set != self.active_set {
                self.is_crossfading = true;
                self.crossfade_progress = 0.0;
                crate::sf_log!(
                    "auto: crossfade {:?} -> {:?} ({})",
                    self.active_set,
                    self.next_set,
                    self.profile.name()
                );
            }
        }

        out.fill(0.0);
        let active_gain = if self.is_crossfading {
            1.0 - self.crossfade_progress
        } else {
            1.0
        };
        for &i in &self.active_set {
            out[i] += active_gain;
        }
        if self.is_crossfading {
            for &i in &self.next_set {
                out[i] += self.crossfade_progress;
            }
        }

        let scale = intensity * self.adaptive_volume();
        for g in out.iter_mut() {
            *g = (*g * scale).clamp(0.0, 1.0);
        }
    }

    /// Louder detected music pulls the tone layer further down.
    pub fn adaptive_volume(&self) -> f32 {
        let total = self.analyzer.energies().smooth_total;
        if total > ADAPTIVE_ENERGY_FLOOR {
            (0.5 / (total + 0.5)).clamp(ADAPTIVE_MIN, ADAPTIVE_MAX)
        } else {
            1.0
        }
    }

    pub fn profile(&self) -> MusicProfile {
        self.profile
    }

    pub fn energies(&self) -> &BandEnergies {
        self.analyzer.energies()
    }

    pub fn active_set(&self) -> FrequencySet {
        self.active_set
    }

    pub fn next_set(&self) -> FrequencySet {
        self.next_set
    }

    pub fn crossfade_progress(&self) -> f32 {
        self.crossfade_progress
    }

    pub fn is_crossfading(&self) -> bool {
        self.is_crossfading
    }

    pub fn cycle_slot(&self) -> u32 {
        self.cycle_slot
    }

    pub fn cycle_timer(&self) -> f64 {
        self.cycle_timer
    }
}
