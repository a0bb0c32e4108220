//! Biquad Filter (IIR 2nd Order)
//!
//! The three analysis filters of the auto engine and the sidechain key
//! conditioner are all plain RBJ-cookbook biquads in transposed direct form II.
//!
//! # Design Notes
//! - Coefficient updates never touch the delay state; call `reset()` for that.
//! - All operations are safe for the audio thread (no allocations).

use std::f32::consts::PI;

/// Butterworth Q, used for the plain low/high-pass sections.
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Biquad filter implementation (IIR 2nd order)
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Biquad {
    /// Pass-through filter with cleared state.
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn lowpass(cutoff: f32, q: f32, sr: f32) -> Self {
        let mut f = Self::new();
        f.update_lpf(cutoff, q, sr);
        f
    }

    pub fn highpass(cutoff: f32, q: f32, sr: f32) -> Self {
        let mut f = Self::new();
        f.update_hpf(cutoff, q, sr);
        f
    }

    pub fn bandpass(center: f32, q: f32, sr: f32) -> Self {
        let mut f = Self::new();
        f.update_bpf(center, q, sr);
        f
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = input * self.b0 + self.z1;

        // Anti-denormal: tiny DC offset
        self.z1 = input * self.b1 + self.z2 - self.a1 * out + 1e-25;
        self.z2 = input * self.b2 - self.a2 * out + 1e-25;

        out
    }

    /// Clear the delay line. Coefficients are kept.
    #[inline]
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    // ---------------------------------------------------------------------
    // Filter design helpers (RBJ-style)
    // ---------------------------------------------------------------------

    /// Returns `(cos(w0), alpha)` for the given corner.
    #[inline]
    fn prewarp(freq: f32, q: f32, sr: f32) -> (f32, f32) {
        let nyquist_safe = freq.clamp(1.0, sr * 0.49);
        let w0 = 2.0 * PI * nyquist_safe / sr;
        (w0.cos(), w0.sin() / (2.0 * q.max(1e-6)))
    }

    #[inline]
    fn set_normalized(&mut self, b: [f32; 3], a0: f32, a1: f32, a2: f32) {
        let inv_a0 = 1.0 / a0;
        self.b0 = b[0] * inv_a0;
        self.b1 = b[1] * inv_a0;
        self.b2 = b[2] * inv_a0;
        self.a1 = a1 * inv_a0;
        self.a2 = a2 * inv_a0;
    }

    pub fn update_lpf(&mut self, cutoff: f32, q: f32, sr: f32) {
        let (cw0, alpha) = Self::prewarp(cutoff, q, sr);
        let b1 = 1.0 - cw0;
        self.set_normalized(
            [b1 * 0.5, b1, b1 * 0.5],
            1.0 + alpha,
            -2.0 * cw0,
            1.0 - alpha,
        );
    }

    pub fn update_hpf(&mut self, cutoff: f32, q: f32, sr: f32) {
        let (cw0, alpha) = Self::prewarp(cutoff, q, sr);
        let b1 = -(1.0 + cw0);
        self.set_normalized(
            [-b1 * 0.5, b1, -b1 * 0.5],
            1.0 + alpha,
            -2.0 * cw0,
            1.0 - alpha,
        );
    }

    /// Band-pass with 0 dB gain at `center`.
    pub fn update_bpf(&mut self, center: f32, q: f32, sr: f32) {
        let (cw0, alpha) = Self::prewarp(center, q, sr);
        self.set_normalized([alpha, 0.0, -alpha], 1.0 + alpha, -2.0 * cw0, 1.0 - alpha);
    }
}
