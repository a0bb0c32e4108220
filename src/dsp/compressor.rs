//! Sidechain Compressor (Post-Mix Ducker)
//!
//! # Perceptual Contract
//! - **Target Source**: The finished blend of music and tone layer.
//! - **Intended Effect**: Pull the whole blend down under loud mid-band passages
//!   so the tone layer never pokes out of dense material.
//! - **Failure Modes**:
//!   - Audible pumping with very short release times.
//! - **Will Not Do**:
//!   - Makeup gain (the blend is never louder than its input).
//!   - Brickwall limiting.
//!
//! # Detector
//! The key signal runs through a fixed 800 Hz / Q 1.5 band-pass before the
//! envelope follower, so kick drums and cymbals do not drive the reduction.
//! The envelope is a one-pole follower on the rectified key with separate
//! attack and release coefficients.
//!
//! # Gain Computer
//! Inside the knee the reduction is `(diff + knee/2)^2 / (2 * knee)` times
//! `(1 - 1/ratio)`, which meets the straight segment in value and slope at
//! `threshold + knee/2`. The `4 * knee` denominator found in some
//! descriptions of this curve leaves a step there and gives half this
//! reduction across the knee, so with the default 6 dB knee this compressor
//! reduces up to twice as much as that variant near the threshold.
//! `knee = 0` is a hard knee.
//!
//! # Parameters
//! All control values live in [`SidechainParams`], shared through an `Arc` and
//! written from any thread. The audio thread loads each cell once per block.

use crate::dsp::biquad::Biquad;
use crate::dsp::utils::{db_to_lin, lin_to_db, one_pole_coeff};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Key conditioning band-pass.
const KEY_FILTER_HZ: f32 = 800.0;
const KEY_FILTER_Q: f32 = 1.5;

/// Length of the sliding RMS meter window (samples).
pub const RMS_WINDOW: usize = 256;

pub const DEFAULT_ATTACK_MS: f32 = 10.0;
pub const DEFAULT_RELEASE_MS: f32 = 100.0;
pub const DEFAULT_DRY_WET: f32 = 0.5;
pub const DEFAULT_THRESHOLD_DB: f32 = -18.0;
pub const DEFAULT_RATIO: f32 = 4.0;
pub const DEFAULT_KNEE_DB: f32 = 6.0;

const MIN_TIME_MS: f32 = 1.0;
const MAX_TIME_MS: f32 = 1000.0;

// =============================================================================
// Shared parameters
// =============================================================================

/// Lock-free compressor controls. Every cell is an independent `f32` stored
/// as bits; readers see either the old or the new value, never a mix.
#[derive(Debug)]
pub struct SidechainParams {
    attack_ms: AtomicU32,
    release_ms: AtomicU32,
    dry_wet: AtomicU32,
    threshold_db: AtomicU32,
    ratio: AtomicU32,
    knee_db: AtomicU32,
}

impl Default for SidechainParams {
    fn default() -> Self {
        Self {
            attack_ms: AtomicU32::new(DEFAULT_ATTACK_MS.to_bits()),
            release_ms: AtomicU32::new(DEFAULT_RELEASE_MS.to_bits()),
            dry_wet: AtomicU32::new(DEFAULT_DRY_WET.to_bits()),
            threshold_db: AtomicU32::new(DEFAULT_THRESHOLD_DB.to_bits()),
            ratio: AtomicU32::new(DEFAULT_RATIO.to_bits()),
            knee_db: AtomicU32::new(DEFAULT_KNEE_DB.to_bits()),
        }
    }
}

#[inline]
fn load(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

#[inline]
fn store(cell: &AtomicU32, val: f32) {
    cell.store(val.to_bits(), Ordering::Relaxed);
}

impl SidechainParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attack_ms(&self, ms: f32) {
        store(&self.attack_ms, ms.clamp(MIN_TIME_MS, MAX_TIME_MS));
    }

    pub fn set_release_ms(&self, ms: f32) {
        store(&self.release_ms, ms.clamp(MIN_TIME_MS, MAX_TIME_MS));
    }

    pub fn set_dry_wet(&self, wet: f32) {
        store(&self.dry_wet, wet.clamp(0.0, 1.0));
    }

    pub fn set_threshold_db(&self, db: f32) {
        store(&self.threshold_db, db.clamp(-100.0, 0.0));
    }

    /// Ratios below 1:1 would expand; they are floored at 1.
    pub fn set_ratio(&self, ratio: f32) {
        store(&self.ratio, ratio.max(1.0));
    }

    pub fn set_knee_db(&self, knee: f32) {
        store(&self.knee_db, knee.max(0.0));
    }

    pub fn attack_ms(&self) -> f32 {
        load(&self.attack_ms)
    }

    pub fn release_ms(&self) -> f32 {
        load(&self.release_ms)
    }

    pub fn dry_wet(&self) -> f32 {
        load(&self.dry_wet)
    }

    pub fn threshold_db(&self) -> f32 {
        load(&self.threshold_db)
    }

    pub fn ratio(&self) -> f32 {
        load(&self.ratio)
    }

    pub fn knee_db(&self) -> f32 {
        load(&self.knee_db)
    }
}

// =============================================================================
// Gain computer
// =============================================================================

/// Soft-knee gain reduction in dB (positive = attenuation).
///
/// Zero below the knee, `(level - threshold) * (1 - 1/ratio)` above it, and a
/// quadratic blend inside that matches both neighbours in value and slope.
#[inline]
pub fn soft_knee_reduction_db(level_db: f32, threshold_db: f32, ratio: f32, knee_db: f32) -> f32 {
    let slope = 1.0 - 1.0 / ratio.max(1.0);
    let half = 0.5 * knee_db.max(0.0);
    let diff = level_db - threshold_db;
    if diff <= -half {
        0.0
    } else if diff >= half {
        diff * slope
    } else {
        let x = diff + half;
        (x * x) / (2.0 * knee_db) * slope
    }
}

// =============================================================================
// Compressor
// =============================================================================

/// Control values loaded once per block.
#[derive(Clone, Copy)]
struct BlockControls {
    wet: f32,
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
}

pub struct SidechainCompressor {
    params: Arc<SidechainParams>,
    sample_rate: f32,

    key_filter: Biquad,
    envelope_level: f32,
    attack_coeff: f32,
    release_coeff: f32,
    // Times the coefficients were derived from
    coeff_attack_ms: f32,
    coeff_release_ms: f32,

    // Sliding RMS of the filtered key (metering only)
    rms_buffer: [f32; RMS_WINDOW],
    rms_write_pos: usize,
    rms_sum: f32,

    block_peak: f32,
    last_reduction_db: f32,
}

impl SidechainCompressor {
    pub fn new(params: Arc<SidechainParams>) -> Self {
        let mut comp = Self {
            params,
            sample_rate: 44100.0,
            key_filter: Biquad::new(),
            envelope_level: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            coeff_attack_ms: 0.0,
            coeff_release_ms: 0.0,
            rms_buffer: [0.0; RMS_WINDOW],
            rms_write_pos: 0,
            rms_sum: 0.0,
            block_peak: 0.0,
            last_reduction_db: 0.0,
        };
        comp.prepare(44100.0, 0);
        comp
    }

    pub fn params(&self) -> &Arc<SidechainParams> {
        &self.params
    }

    /// Build the key filter, clear all detector state and derive coefficients.
    pub fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.key_filter
            .update_bpf(KEY_FILTER_HZ, KEY_FILTER_Q, sample_rate);
        self.reset();
        self.update_coeffs(self.params.attack_ms(), self.params.release_ms());
    }

    pub fn reset(&mut self) {
        self.key_filter.reset();
        self.envelope_level = 0.0;
        self.rms_buffer = [0.0; RMS_WINDOW];
        self.rms_write_pos = 0;
        self.rms_sum = 0.0;
        self.block_peak = 0.0;
        self.last_reduction_db = 0.0;
    }

    fn update_coeffs(&mut self, attack_ms: f32, release_ms: f32) {
        self.attack_coeff = one_pole_coeff(attack_ms, self.sample_rate);
        self.release_coeff = one_pole_coeff(release_ms, self.sample_rate);
        self.coeff_attack_ms = attack_ms;
        self.coeff_release_ms = release_ms;
    }

    fn begin_block(&mut self) -> BlockControls {
        let atk = self.params.attack_ms();
        let rel = self.params.release_ms();
        if atk != self.coeff_attack_ms || rel != self.coeff_release_ms {
            self.update_coeffs(atk, rel);
        }
        self.block_peak = 0.0;
        BlockControls {
            wet: self.params.dry_wet(),
            threshold_db: self.params.threshold_db(),
            ratio: self.params.ratio(),
            knee_db: self.params.knee_db(),
        }
    }

    /// Run the detector on one key sample and return the linear gain.
    #[inline]
    fn detect(&mut self, key: f32, ctl: &BlockControls) -> f32 {
        let filtered = self.key_filter.process(key);
        let level = filtered.abs();

        let coeff = if level > self.envelope_level {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope_level += coeff * (level - self.envelope_level);

        let sq = filtered * filtered;
        self.rms_sum -= self.rms_buffer[self.rms_write_pos];
        self.rms_buffer[self.rms_write_pos] = sq;
        self.rms_sum += sq;
        self.rms_write_pos = (self.rms_write_pos + 1) % RMS_WINDOW;
        self.block_peak = self.block_peak.max(level);

        let level_db = lin_to_db(self.envelope_level);
        let reduction_db =
            soft_knee_reduction_db(level_db, ctl.threshold_db, ctl.ratio, ctl.knee_db);
        self.last_reduction_db = reduction_db;
        db_to_lin(-reduction_db)
    }

    #[inline]
    fn blend(dry: f32, gain: f32, wet: f32) -> f32 {
        dry * (1.0 - wet) + (dry * gain) * wet
    }

    /// Compress `data` in place, keyed by `key`. Only the overlapping length
    /// of the two slices is processed.
    pub fn process(&mut self, data: &mut [f32], key: &[f32]) {
        let ctl = self.begin_block();
        for (out, &k) in data.iter_mut().zip(key.iter()) {
            let gain = self.detect(k, &ctl);
            *out = Self::blend(*out, gain, ctl.wet);
        }
    }

    /// Compress `data` in place using its own content as key. Each key
    /// sample is read before the output overwrites it.
    pub fn process_self_keyed(&mut self, data: &mut [f32]) {
        let ctl = self.begin_block();
        for sample in data.iter_mut() {
            let dry = *sample;
            let gain = self.detect(dry, &ctl);
            *sample = Self::blend(dry, gain, ctl.wet);
        }
    }

    /// Current detector envelope in dB (floored at -100).
    pub fn envelope_db(&self) -> f32 {
        lin_to_db(self.envelope_level)
    }

    /// Sliding RMS of the filtered key.
    pub fn rms_level(&self) -> f32 {
        (self.rms_sum.max(0.0) / RMS_WINDOW as f32).sqrt()
    }

    /// Peak of the filtered key over the last processed block.
    pub fn peak_level(&self) -> f32 {
        self.block_peak
    }

    /// Reduction computed for the most recent sample.
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_reduction_db
    }
}
