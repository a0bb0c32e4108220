//! Mix Engine
//!
//! Owns every piece of per-stream state and runs one host block at a time:
//!
//! 1. Master mix target from the block parameters.
//! 2. Tone targets: the smart auto engine (analysing channel 0) or the manual
//!    gains. Only the bank that matches the current mode advances.
//! 3. Per sample: synthesize the tone layer once, blend it under every
//!    channel with level-dependent ducking, feed channel 0 to the spectrum
//!    collector.
//! 4. Self-keyed sidechain compression per channel.
//! 5. Publish meters.
//!
//! Channels past `MAX_CHANNELS` are left untouched. Blocks longer than the
//! prepared maximum are still processed in full.

use crate::config::EngineConfig;
use crate::dsp::{
    GainSmootherBank, MusicProfile, OscillatorBank, SidechainCompressor, SidechainParams,
    SmartAutoEngine, SmoothedGain, SpectrumCollector, SpectrumSnapshot,
};
use crate::meters::Meters;
use crate::params::{BlockParams, EngineParams};
use crate::tones::NUM_TONES;
use std::sync::Arc;

pub const MAX_CHANNELS: usize = 8;

const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
const DEFAULT_MAX_BLOCK: usize = 512;

/// Level of a full-scale tone relative to the music.
const TONE_ATTENUATION: f32 = 0.1;
/// Tones whose smoothed gain is at or below this are skipped and do not
/// advance their oscillator.
const ACTIVE_GAIN_FLOOR: f32 = 0.001;
/// Music attenuation at full mix.
const MUSIC_DIP: f32 = 0.3;
const DUCK_DEPTH: f32 = 0.5;
const DUCK_FLOOR: f32 = 0.3;

/// Tone-layer gain for a music sample: loud music pushes the layer down.
#[inline]
pub fn ducking_factor(music: f32) -> f32 {
    (1.0 - music.abs() * DUCK_DEPTH).clamp(DUCK_FLOOR, 1.0)
}

pub struct MixEngine {
    config: EngineConfig,
    sample_rate: f32,
    max_block_size: usize,

    oscillators: OscillatorBank,
    manual_gains: GainSmootherBank,
    auto_gains: GainSmootherBank,
    mix: SmoothedGain,
    auto_engine: SmartAutoEngine,
    auto_targets: [f32; NUM_TONES],

    sidechain_params: Arc<SidechainParams>,
    compressors: [SidechainCompressor; MAX_CHANNELS],

    spectrum: SpectrumCollector,
    meters: Arc<Meters>,
}

impl Default for MixEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MixEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let sidechain_params = Arc::new(SidechainParams::new());
        config.sidechain.apply_to(&sidechain_params);

        let mut engine = Self {
            config,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_MAX_BLOCK,
            oscillators: OscillatorBank::new(),
            manual_gains: GainSmootherBank::new(),
            auto_gains: GainSmootherBank::new(),
            mix: SmoothedGain::new(),
            auto_engine: SmartAutoEngine::with_clock(DEFAULT_SAMPLE_RATE, config.auto_clock),
            auto_targets: [0.0; NUM_TONES],
            compressors: std::array::from_fn(|_| {
                SidechainCompressor::new(Arc::clone(&sidechain_params))
            }),
            sidechain_params,
            spectrum: SpectrumCollector::new(Arc::new(SpectrumSnapshot::new())),
            meters: Arc::new(Meters::new()),
        };
        engine.prepare(DEFAULT_SAMPLE_RATE, DEFAULT_MAX_BLOCK);
        engine
    }

    /// Rebuild everything for a new stream. All ramps, filters, envelopes,
    /// phases and the auto engine return to their power-on state.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        self.oscillators.prepare(sample_rate);
        self.manual_gains
            .prepare(sample_rate, self.config.manual_ramp_ms);
        self.auto_gains.prepare(sample_rate, self.config.auto_ramp_ms);
        self.mix.prepare(sample_rate, self.config.mix_ramp_ms, 0.0);

        self.auto_engine.set_clock(self.config.auto_clock);
        self.auto_engine.prepare(sample_rate);
        self.auto_targets = [0.0; NUM_TONES];

        for comp in &mut self.compressors {
            comp.prepare(sample_rate, max_block_size);
        }
        self.spectrum.prepare(sample_rate);
        self.meters.reset();

        log::debug!(
            "mix engine prepared: {} Hz, max block {}",
            sample_rate,
            max_block_size
        );
    }

    /// Clear all stream state, keeping the sample rate and configuration.
    pub fn reset(&mut self) {
        self.oscillators.reset();
        self.manual_gains.reset();
        self.auto_gains.reset();
        self.mix.reset(0.0);
        self.auto_engine.reset();
        self.auto_targets = [0.0; NUM_TONES];
        for comp in &mut self.compressors {
            comp.reset();
        }
        self.spectrum.reset();
        self.meters.reset();
    }

    /// Process one block in place. `channels[0]` is the analysis reference.
    pub fn process(&mut self, channels: &mut [&mut [f32]], params: &BlockParams) {
        #[cfg(feature = "assert_process_allocs")]
        assert_no_alloc::assert_no_alloc(|| self.process_block(channels, params));
        #[cfg(not(feature = "assert_process_allocs"))]
        self.process_block(channels, params);
    }

    /// Snapshot `params`, push its sidechain values and process one block.
    pub fn process_with_params(&mut self, channels: &mut [&mut [f32]], params: &EngineParams) {
        self.set_sidechain_params(
            params.sc_attack_ms(),
            params.sc_release_ms(),
            params.sc_dry_wet(),
        );
        let block = params.snapshot();
        self.process(channels, &block);
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]], params: &BlockParams) {
        let num_channels = channels.len().min(MAX_CHANNELS);
        if num_channels == 0 {
            return;
        }
        let channels = &mut channels[..num_channels];
        let num_samples = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        if num_samples > self.max_block_size {
            crate::sf_log!(
                "mix engine: block of {} exceeds prepared {}",
                num_samples,
                self.max_block_size
            );
        }

        self.mix.set_target(params.master_mix);

        let bank = if params.auto_mode {
            self.auto_engine.analyze_block(&channels[0][..num_samples]);
            self.auto_engine.target_gains(
                &mut self.auto_targets,
                params.cycle_time_s,
                params.auto_intensity,
            );
            self.auto_gains.set_targets(&self.auto_targets);
            &mut self.auto_gains
        } else {
            self.manual_gains.set_targets(&params.manual_gains);
            &mut self.manual_gains
        };

        for i in 0..num_samples {
            let mix = self.mix.next();

            let mut tone_sum = 0.0f32;
            for tone in 0..NUM_TONES {
                let gain = bank.next(tone);
                if gain > ACTIVE_GAIN_FLOOR {
                    tone_sum += self.oscillators.next_sample(tone) * gain * TONE_ATTENUATION;
                }
            }

            let music_gain = 1.0 - mix * MUSIC_DIP;
            for ch in channels.iter_mut() {
                let music = ch[i];
                ch[i] = music * music_gain + tone_sum * mix * ducking_factor(music);
            }
            self.spectrum.push(channels[0][i]);
        }

        for (ch, comp) in channels.iter_mut().zip(self.compressors.iter_mut()) {
            comp.process_self_keyed(&mut ch[..num_samples]);
        }

        self.publish_meters(channels, num_samples);
    }

    fn publish_meters(&self, channels: &[&mut [f32]], num_samples: usize) {
        for (ch, data) in channels.iter().enumerate() {
            let peak = data[..num_samples]
                .iter()
                .fold(0.0f32, |acc, &x| acc.max(x.abs()));
            self.meters.set_output_peak(ch, peak);
            self.meters
                .set_gain_reduction_db(ch, self.compressors[ch].gain_reduction_db());
        }
        self.meters.set_sidechain_rms(self.compressors[0].rms_level());
        self.meters.set_sidechain_peak(self.compressors[0].peak_level());
        self.meters.set_mix_level(self.mix.current());
        self.meters.set_profile(self.auto_engine.profile());
    }

    /// Convenience for the three host-facing sidechain controls.
    pub fn set_sidechain_params(&self, attack_ms: f32, release_ms: f32, dry_wet: f32) {
        self.sidechain_params.set_attack_ms(attack_ms);
        self.sidechain_params.set_release_ms(release_ms);
        self.sidechain_params.set_dry_wet(dry_wet);
    }

    pub fn sidechain_params(&self) -> Arc<SidechainParams> {
        Arc::clone(&self.sidechain_params)
    }

    /// Shared spectrum handoff for visualizers.
    pub fn spectrum(&self) -> Arc<SpectrumSnapshot> {
        self.spectrum.snapshot()
    }

    pub fn meters(&self) -> Arc<Meters> {
        Arc::clone(&self.meters)
    }

    pub fn current_profile(&self) -> MusicProfile {
        self.auto_engine.profile()
    }

    pub fn auto_engine(&self) -> &SmartAutoEngine {
        &self.auto_engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_params(tone: usize, gain: f32, mix: f32) -> BlockParams {
        let mut p = BlockParams {
            auto_mode: false,
            master_mix: mix,
            ..BlockParams::default()
        };
        p.manual_gains[tone] = gain;
        p
    }

    #[test]
    fn test_ducking_factor_bounds() {
        assert_eq!(ducking_factor(0.0), 1.0);
        assert!((ducking_factor(0.5) - 0.75).abs() < 1e-6);
        assert_eq!(ducking_factor(-2.0), DUCK_FLOOR);
    }

    #[test]
    fn test_empty_channel_list_is_noop() {
        let mut engine = MixEngine::new();
        let mut channels: [&mut [f32]; 0] = [];
        engine.process(&mut channels, &BlockParams::default());
    }

    #[test]
    fn test_zero_mix_passes_music_through() {
        let mut engine = MixEngine::new();
        engine.prepare(48000.0, 256);
        let p = manual_params(0, 1.0, 0.0);
        let mut left = vec![0.01f32; 256];
        let mut right = vec![-0.01f32; 256];
        {
            let mut chans: [&mut [f32]; 2] = [&mut left, &mut right];
            engine.process(&mut chans, &p);
        }
        // Quiet DC sits far below the compressor threshold
        assert!(left.iter().all(|&x| (x - 0.01).abs() < 1e-6));
        assert!(right.iter().all(|&x| (x + 0.01).abs() < 1e-6));
    }

    #[test]
    fn test_idle_tone_does_not_advance_oscillator() {
        let mut engine = MixEngine::new();
        engine.prepare(48000.0, 128);
        let p = manual_params(2, 1.0, 0.5);
        let mut buf = vec![0.0f32; 128];
        engine.process(&mut [&mut buf[..]], &p);
        assert_eq!(engine.oscillators.oscillator(0).phase(), 0.0);
        assert!(engine.oscillators.oscillator(2).phase() > 0.0);
    }

    #[test]
    fn test_only_active_bank_advances() {
        let mut engine = MixEngine::new();
        engine.prepare(48000.0, 512);
        let mut buf = vec![0.0f32; 512];
        engine.process(&mut [&mut buf[..]], &manual_params(4, 1.0, 1.0));
        let manual_after = engine.manual_gains.current(4);
        assert!(manual_after > 0.0);

        let auto = BlockParams {
            auto_mode: true,
            ..BlockParams::default()
        };
        engine.process(&mut [&mut buf[..]], &auto);
        assert_eq!(engine.manual_gains.current(4), manual_after);
        assert!(engine.auto_gains.current(0) > 0.0);
    }

    #[test]
    fn test_sidechain_convenience_clamps() {
        let engine = MixEngine::new();
        engine.set_sidechain_params(0.0, 2000.0, 1.5);
        let p = engine.sidechain_params();
        assert_eq!(p.attack_ms(), 1.0);
        assert_eq!(p.release_ms(), 1000.0);
        assert_eq!(p.dry_wet(), 1.0);
    }

    #[test]
    fn test_meters_follow_output() {
        let mut engine = MixEngine::new();
        engine.prepare(48000.0, 512);
        let meters = engine.meters();
        let mut buf = vec![0.0f32; 512];
        for _ in 0..20 {
            engine.process(&mut [&mut buf[..]], &manual_params(9, 1.0, 1.0));
            buf.fill(0.0);
        }
        assert!(meters.get_output_peak(0) > 0.05);
        assert!(meters.get_output_peak(0) <= 0.1 + 1e-4);
        assert!((meters.get_mix_level() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_extra_channels_untouched() {
        let mut engine = MixEngine::new();
        engine.prepare(48000.0, 64);
        let mut bufs = vec![vec![0.0f32; 64]; MAX_CHANNELS + 1];
        let p = manual_params(5, 1.0, 1.0);
        for _ in 0..50 {
            let mut chans: Vec<&mut [f32]> = bufs.iter_mut().map(|b| b.as_mut_slice()).collect();
            engine.process(&mut chans, &p);
        }
        assert!(bufs[MAX_CHANNELS].iter().all(|&x| x == 0.0));
        assert!(bufs[0].iter().any(|&x| x != 0.0));
    }
}
