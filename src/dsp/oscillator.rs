//! Sine oscillator bank.
//!
//! One phase accumulator per tone. Phase lives in `[0, 2π)` and is only ever
//! reset by `reset()` (stream restart), so tones stay continuous across blocks.

use crate::tones::{NUM_TONES, TONES};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, Default)]
pub struct SineOscillator {
    phase: f32,
    phase_increment: f32,
}

impl SineOscillator {
    pub fn set_frequency(&mut self, freq_hz: f32, sample_rate: f32) {
        // Wrapping below assumes a single subtraction suffices.
        let freq = freq_hz.clamp(0.0, sample_rate * 0.5);
        self.phase_increment = freq * TAU / sample_rate.max(1.0);
    }

    /// Returns `sin(phase)` and advances by one sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let s = self.phase.sin();
        self.phase += self.phase_increment;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        s
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    #[inline]
    pub fn phase_increment(&self) -> f32 {
        self.phase_increment
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Ten independent oscillators, one per entry of [`TONES`].
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    oscillators: [SineOscillator; NUM_TONES],
}

impl Default for OscillatorBank {
    fn default() -> Self {
        Self::new()
    }
}

impl OscillatorBank {
    pub fn new() -> Self {
        Self {
            oscillators: [SineOscillator::default(); NUM_TONES],
        }
    }

    /// Tune every oscillator to its table frequency and zero all phases.
    pub fn prepare(&mut self, sample_rate: f32) {
        for (osc, tone) in self.oscillators.iter_mut().zip(TONES.iter()) {
            osc.set_frequency(tone.frequency_hz, sample_rate);
        }
        self.reset();
    }

    pub fn set_frequency(&mut self, tone: usize, freq_hz: f32, sample_rate: f32) {
        if let Some(osc) = self.oscillators.get_mut(tone) {
            osc.set_frequency(freq_hz, sample_rate);
        }
    }

    #[inline]
    pub fn next_sample(&mut self, tone: usize) -> f32 {
        self.oscillators[tone].next_sample()
    }

    pub fn oscillator(&self, tone: usize) -> &SineOscillator {
        &self.oscillators[tone]
    }

    pub fn reset(&mut self) {
        for osc in &mut self.oscillators {
            osc.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_stays_wrapped() {
        for &sr in &[8000.0f32, 22050.0, 44100.0, 48000.0, 96000.0, 192000.0] {
            let mut bank = OscillatorBank::new();
            bank.prepare(sr);
            for _ in 0..50_000 {
                for tone in 0..NUM_TONES {
                    bank.next_sample(tone);
                    let p = bank.oscillator(tone).phase();
                    assert!((0.0..TAU).contains(&p), "phase {p} at sr {sr}");
                }
            }
        }
    }

    #[test]
    fn test_first_sample_is_zero_phase() {
        let mut bank = OscillatorBank::new();
        bank.prepare(48000.0);
        assert_eq!(bank.next_sample(0), 0.0);
        let expected = (174.0f32 * TAU / 48000.0).sin();
        assert!((bank.next_sample(0) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_continuity_across_calls() {
        // Sine recurrence: y[n+1] = 2cos(w) y[n] - y[n-1]
        let mut osc = SineOscillator::default();
        osc.set_frequency(432.0, 44100.0);
        let two_cos = 2.0 * osc.phase_increment().cos();
        let mut prev = osc.next_sample();
        let mut cur = osc.next_sample();
        for _ in 0..10_000 {
            let next = osc.next_sample();
            assert!((next - (two_cos * cur - prev)).abs() < 1e-3);
            prev = cur;
            cur = next;
        }
    }

    #[test]
    fn test_reset_restarts_phase() {
        let mut bank = OscillatorBank::new();
        bank.prepare(48000.0);
        for _ in 0..123 {
            bank.next_sample(3);
        }
        bank.reset();
        assert_eq!(bank.oscillator(3).phase(), 0.0);
    }

    #[test]
    fn test_out_of_range_tone_ignored() {
        let mut bank = OscillatorBank::new();
        bank.set_frequency(NUM_TONES, 100.0, 48000.0);
        bank.prepare(48000.0);
        assert!(bank.oscillator(0).phase_increment() > 0.0);
    }
}
