//! Spectrum snapshot handoff.
//!
//! The audio thread feeds the post-mix reference channel into a
//! `SpectrumCollector`. Every `FFT_SIZE` samples it runs one forward FFT and
//! publishes the magnitude of the first `NUM_BINS` bins into a shared
//! `SpectrumSnapshot`, then raises the ready flag with a release store.
//! Readers consume the flag with an acquire swap, so each published frame is
//! seen at most once.
//!
//! ## Audio Thread Safety
//! - FFT plan, frame, transform buffer and scratch are allocated in `new()`
//! - `push()` never blocks
//! - Readers copy with `read_into()` straight after `take_ready()` returns
//!   true. The next frame is not written until another `FFT_SIZE` samples
//!   have arrived, so a copy made then sees one whole frame
//! - Windows do not overlap and no window function is applied

use ringbuf::{Consumer, Producer, RingBuffer};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

pub const FFT_SIZE: usize = 2048;
pub const NUM_BINS: usize = FFT_SIZE / 2;

// =============================================================================
// Shared snapshot
// =============================================================================

pub struct SpectrumSnapshot {
    bins: Box<[AtomicU32]>,
    sample_rate: AtomicU32,
    ready: AtomicBool,
}

impl Default for SpectrumSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumSnapshot {
    pub fn new() -> Self {
        Self {
            bins: (0..NUM_BINS).map(|_| AtomicU32::new(0)).collect(),
            sample_rate: AtomicU32::new(44100.0f32.to_bits()),
            ready: AtomicBool::new(false),
        }
    }

    fn publish(&self, magnitudes: &[f32], sample_rate: f32) {
        for (cell, &m) in self.bins.iter().zip(magnitudes) {
            cell.store(m.to_bits(), Ordering::Relaxed);
        }
        self.sample_rate
            .store(sample_rate.to_bits(), Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
    }

    /// Consume the ready flag. True at most once per published frame.
    pub fn take_ready(&self) -> bool {
        self.ready.swap(false, Ordering::Acquire)
    }

    /// Peek without consuming.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Copy up to `out.len()` bins; returns the number copied.
    ///
    /// Call this right after [`take_ready`](Self::take_ready) returns true.
    /// The copy must finish within one window (`FFT_SIZE` samples) or the
    /// bins may mix two frames.
    pub fn read_into(&self, out: &mut [f32]) -> usize {
        let n = out.len().min(NUM_BINS);
        for (dst, cell) in out[..n].iter_mut().zip(self.bins.iter()) {
            *dst = f32::from_bits(cell.load(Ordering::Relaxed));
        }
        n
    }

    pub fn magnitude(&self, bin: usize) -> f32 {
        self.bins
            .get(bin)
            .map_or(0.0, |c| f32::from_bits(c.load(Ordering::Relaxed)))
    }

    /// Sample rate of the most recent frame.
    pub fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate.load(Ordering::Relaxed))
    }

    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate() / FFT_SIZE as f32
    }

    fn clear(&self) {
        for cell in self.bins.iter() {
            cell.store(0, Ordering::Relaxed);
        }
        self.ready.store(false, Ordering::Release);
    }
}

// =============================================================================
// Audio-thread collector
// =============================================================================

pub struct SpectrumCollector {
    fft: Arc<dyn Fft<f32>>,
    producer: Producer<f32>,
    consumer: Consumer<f32>,
    frame: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    snapshot: Arc<SpectrumSnapshot>,
    sample_rate: f32,
}

impl SpectrumCollector {
    pub fn new(snapshot: Arc<SpectrumSnapshot>) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        // One full window plus headroom so a push never fails before draining
        let (producer, consumer) = RingBuffer::<f32>::new(FFT_SIZE * 2).split();

        Self {
            fft,
            producer,
            consumer,
            frame: vec![0.0; FFT_SIZE],
            buffer: vec![Complex::default(); FFT_SIZE],
            scratch,
            magnitudes: vec![0.0; NUM_BINS],
            snapshot,
            sample_rate: 44100.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.reset();
    }

    /// Drop any partial window and clear the published snapshot.
    pub fn reset(&mut self) {
        while self.consumer.pop().is_some() {}
        self.magnitudes.fill(0.0);
        self.snapshot.clear();
    }

    pub fn snapshot(&self) -> Arc<SpectrumSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Samples waiting for the next window.
    pub fn pending(&self) -> usize {
        self.consumer.len()
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        let _ = self.producer.push(sample);
        if self.consumer.len() >= FFT_SIZE {
            self.transform();
        }
    }

    fn transform(&mut self) {
        let n = self.consumer.pop_slice(&mut self.frame);
        debug_assert_eq!(n, FFT_SIZE);

        for (dst, &x) in self.buffer.iter_mut().zip(self.frame.iter()) {
            *dst = Complex::new(x, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (m, c) in self.magnitudes.iter_mut().zip(self.buffer.iter()) {
            *m = c.norm();
        }
        self.snapshot.publish(&self.magnitudes, self.sample_rate);
    }
}

// =============================================================================
// Scope mapping (reader side)
// =============================================================================

pub const SCOPE_SIZE: usize = 512;
pub const SCOPE_MIN_HZ: f32 = 20.0;
pub const SCOPE_MAX_HZ: f32 = 20000.0;
pub const SCOPE_MIN_DB: f32 = -80.0;
pub const SCOPE_MAX_DB: f32 = 0.0;
const SCOPE_RETAIN: f32 = 0.7;

/// Frequency shown at scope position `index` on a log axis.
pub fn scope_index_to_freq(index: usize) -> f32 {
    let min_log = SCOPE_MIN_HZ.log10();
    let max_log = SCOPE_MAX_HZ.log10();
    let t = index as f32 / SCOPE_SIZE as f32;
    10.0f32.powf(min_log + t * (max_log - min_log))
}

/// Log-frequency display curve, normalised to [0, 1] over -80..0 dB.
pub struct SpectrumScope {
    data: Vec<f32>,
    bins: Vec<f32>,
}

impl Default for SpectrumScope {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumScope {
    pub fn new() -> Self {
        Self {
            data: vec![0.0; SCOPE_SIZE],
            bins: vec![0.0; NUM_BINS],
        }
    }

    /// Fold in a new frame if one is ready. Returns whether the curve moved.
    pub fn update(&mut self, snapshot: &SpectrumSnapshot) -> bool {
        if !snapshot.take_ready() {
            return false;
        }
        snapshot.read_into(&mut self.bins);
        let bin_hz = snapshot.sample_rate() / FFT_SIZE as f32;

        for (i, slot) in self.data.iter_mut().enumerate() {
            let freq = scope_index_to_freq(i);
            let bin = ((freq / bin_hz) as usize).min(NUM_BINS - 1);
            let mag = self.bins[bin];
            let db = if mag > 0.0 {
                (20.0 * mag.log10()).max(SCOPE_MIN_DB)
            } else {
                SCOPE_MIN_DB
            };
            let normalised = ((db - SCOPE_MIN_DB) / (SCOPE_MAX_DB - SCOPE_MIN_DB)).clamp(0.0, 1.0);
            *slot = *slot * SCOPE_RETAIN + normalised * (1.0 - SCOPE_RETAIN);
        }
        true
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn feed_sine(c: &mut SpectrumCollector, bin: usize, amp: f32, sr: f32, n: usize) {
        let freq = bin as f32 * sr / FFT_SIZE as f32;
        for i in 0..n {
            c.push(amp * (2.0 * PI * freq * i as f32 / sr).sin());
        }
    }

    #[test]
    fn test_not_ready_before_full_window() {
        let snap = Arc::new(SpectrumSnapshot::new());
        let mut c = SpectrumCollector::new(Arc::clone(&snap));
        c.prepare(48000.0);
        feed_sine(&mut c, 64, 0.5, 48000.0, FFT_SIZE - 1);
        assert!(!snap.take_ready());
        c.push(0.0);
        assert!(snap.take_ready());
    }

    #[test]
    fn test_ready_is_consumed_once() {
        let snap = Arc::new(SpectrumSnapshot::new());
        let mut c = SpectrumCollector::new(Arc::clone(&snap));
        c.prepare(48000.0);
        feed_sine(&mut c, 64, 0.5, 48000.0, FFT_SIZE);
        assert!(snap.is_ready());
        assert!(snap.take_ready());
        assert!(!snap.take_ready());
    }

    #[test]
    fn test_peak_lands_in_tone_bin() {
        let snap = Arc::new(SpectrumSnapshot::new());
        let mut c = SpectrumCollector::new(Arc::clone(&snap));
        c.prepare(48000.0);
        feed_sine(&mut c, 100, 0.5, 48000.0, FFT_SIZE);

        let mut bins = vec![0.0; NUM_BINS];
        assert_eq!(snap.read_into(&mut bins), NUM_BINS);
        let peak = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(100));
        // Unnormalised forward FFT: amplitude * N / 2
        assert!((bins[100] - 0.5 * FFT_SIZE as f32 / 2.0).abs() < 1.0);
        assert!((snap.bin_frequency(100) - 2343.75).abs() < 1e-3);
    }

    #[test]
    fn test_partial_window_carries_over() {
        let snap = Arc::new(SpectrumSnapshot::new());
        let mut c = SpectrumCollector::new(Arc::clone(&snap));
        c.prepare(44100.0);
        for _ in 0..3000 {
            c.push(0.1);
        }
        assert!(snap.take_ready());
        assert_eq!(c.pending(), 3000 - FFT_SIZE);
        for _ in 0..(2 * FFT_SIZE - 3000) {
            c.push(0.1);
        }
        assert!(snap.take_ready());
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let snap = Arc::new(SpectrumSnapshot::new());
        let mut c = SpectrumCollector::new(Arc::clone(&snap));
        c.prepare(48000.0);
        feed_sine(&mut c, 10, 0.5, 48000.0, FFT_SIZE + 100);
        c.reset();
        assert_eq!(c.pending(), 0);
        assert!(!snap.is_ready());
        assert_eq!(snap.magnitude(10), 0.0);
    }

    #[test]
    fn test_scope_axis_endpoints() {
        assert!((scope_index_to_freq(0) - 20.0).abs() < 1e-3);
        let last = scope_index_to_freq(SCOPE_SIZE - 1);
        assert!(last < 20000.0 && last > 19000.0);
    }

    #[test]
    fn test_scope_tracks_tone() {
        let sr = 48000.0;
        let snap = Arc::new(SpectrumSnapshot::new());
        let mut c = SpectrumCollector::new(Arc::clone(&snap));
        c.prepare(sr);
        let mut scope = SpectrumScope::new();
        assert!(!scope.update(&snap));

        // Each scope point reads one bin, so drive the bin that point 350 reads
        let idx = 350;
        let bin = (scope_index_to_freq(idx) / (sr / FFT_SIZE as f32)) as usize;
        assert!(bin > 0 && bin < NUM_BINS);

        for _ in 0..20 {
            feed_sine(&mut c, bin, 0.5, sr, FFT_SIZE);
            assert!(scope.update(&snap));
        }
        let data = scope.data();
        assert!(data[idx] > 0.9, "data[{idx}] = {}", data[idx]);
        assert!(data[10] < data[idx]);
        assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
