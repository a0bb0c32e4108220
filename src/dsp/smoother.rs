//! Exponential gain ramps.
//!
//! Every gain that reaches the audio path (per-tone gains, master mix) moves
//! toward its target through one of these. The ramp is nih-plug's
//! step-counted exponential smoother: it covers 99.99% of the distance in
//! `ramp_ms` and lands exactly on the target on the last step.

use crate::tones::NUM_TONES;
use nih_plug::prelude::{Smoother, SmoothingStyle};

// =============================================================================
// Single smoothed value
// =============================================================================

pub struct SmoothedGain {
    smoother: Smoother<f32>,
    target: f32,
    sample_rate: f32,
}

impl Default for SmoothedGain {
    fn default() -> Self {
        Self::new()
    }
}

impl SmoothedGain {
    pub fn new() -> Self {
        Self {
            smoother: Smoother::new(SmoothingStyle::None),
            target: 0.0,
            sample_rate: 44100.0,
        }
    }

    /// Fix the ramp length and jump to `value` with no ramp in flight.
    pub fn prepare(&mut self, sample_rate: f32, ramp_ms: f32, value: f32) {
        self.sample_rate = sample_rate;
        self.smoother = Smoother::new(SmoothingStyle::Exponential(ramp_ms));
        self.reset(value);
    }

    pub fn reset(&mut self, value: f32) {
        let v = value.clamp(0.0, 1.0);
        self.target = v;
        self.smoother.reset(v);
    }

    /// Start a ramp toward `target`. Re-sending the current target keeps the
    /// ramp in flight instead of restarting its step count.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        let t = target.clamp(0.0, 1.0);
        if t != self.target {
            self.target = t;
            self.smoother.set_target(self.sample_rate, t);
        }
    }

    /// Advance one sample and return the new current value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.smoother.next()
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.smoother.previous_value()
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.smoother.is_smoothing()
    }
}

// =============================================================================
// Per-tone bank
// =============================================================================

/// One smoother per tone, all sharing a ramp length.
pub struct GainSmootherBank {
    gains: [SmoothedGain; NUM_TONES],
}

impl Default for GainSmootherBank {
    fn default() -> Self {
        Self::new()
    }
}

impl GainSmootherBank {
    pub fn new() -> Self {
        Self {
            gains: std::array::from_fn(|_| SmoothedGain::new()),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, ramp_ms: f32) {
        for g in &mut self.gains {
            g.prepare(sample_rate, ramp_ms, 0.0);
        }
    }

    pub fn set_targets(&mut self, targets: &[f32; NUM_TONES]) {
        for (g, &t) in self.gains.iter_mut().zip(targets.iter()) {
            g.set_target(t);
        }
    }

    #[inline]
    pub fn next(&mut self, tone: usize) -> f32 {
        self.gains[tone].next()
    }

    pub fn current(&self, tone: usize) -> f32 {
        self.gains[tone].current()
    }

    pub fn is_smoothing(&self) -> bool {
        self.gains.iter().any(SmoothedGain::is_smoothing)
    }

    pub fn reset(&mut self) {
        for g in &mut self.gains {
            g.reset(0.0);
        }
    }
}
