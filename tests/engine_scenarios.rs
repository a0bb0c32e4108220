use solfeggio::dsp::{MusicProfile, SineOscillator};
use solfeggio::{BlockParams, EngineParams, MixEngine, ParamValues, NUM_TONES};
use std::f32::consts::PI;

const SR: f32 = 48000.0;

fn manual(tone: usize, gain: f32, mix: f32) -> BlockParams {
    let mut p = BlockParams {
        auto_mode: false,
        master_mix: mix,
        ..BlockParams::default()
    };
    p.manual_gains[tone] = gain;
    p
}

fn auto(cycle_time_s: f32) -> BlockParams {
    BlockParams {
        auto_mode: true,
        cycle_time_s,
        auto_intensity: 0.6,
        master_mix: 0.15,
        ..BlockParams::default()
    }
}

/// Continuous sine source that survives block boundaries.
struct SineSource {
    freq: f32,
    amp: f32,
    n: u64,
}

impl SineSource {
    fn new(freq: f32, amp: f32) -> Self {
        Self { freq, amp, n: 0 }
    }

    fn fill(&mut self, buf: &mut [f32]) {
        for s in buf.iter_mut() {
            let t = (self.n % SR as u64) as f32 / SR;
            *s = self.amp * (2.0 * PI * self.freq * t).sin();
            self.n += 1;
        }
    }
}

#[test]
fn manual_single_tone_on_silence() {
    let mut engine = MixEngine::new();
    engine.prepare(SR, 256);
    let p = manual(0, 1.0, 0.5);

    // Gain stays above the oscillator floor from the first sample, so a
    // free-running oscillator at 174 Hz tracks the engine's phase exactly.
    let mut reference = SineOscillator::default();
    reference.set_frequency(174.0, SR);

    let mut left = vec![0.0f32; 256];
    let mut right = vec![0.0f32; 256];
    for block in 0..40 {
        left.fill(0.0);
        right.fill(0.0);
        {
            let mut chans: [&mut [f32]; 2] = [&mut left, &mut right];
            engine.process(&mut chans, &p);
        }
        for i in 0..256 {
            let expected = 0.1 * reference.next_sample() * 0.5;
            assert_eq!(left[i], right[i]);
            assert!(left[i].abs() <= 0.05 + 1e-6);
            // Ramps are done after 20 ms (960 samples)
            if block >= 8 {
                assert!(
                    (left[i] - expected).abs() < 1e-6,
                    "block {block} sample {i}: {} vs {expected}",
                    left[i]
                );
            }
        }
    }
}

#[test]
fn auto_mode_follows_bass_heavy_music() {
    let mut engine = MixEngine::new();
    engine.prepare(SR, 64);
    let p = auto(15.0);
    let mut source = SineSource::new(60.0, 0.8);
    let mut buf = vec![0.0f32; 64];

    // 15 s of ticks at 1/60 s per block, then a 5 s crossfade
    for _ in 0..1300 {
        source.fill(&mut buf);
        engine.process(&mut [&mut buf[..]], &p);
    }

    assert_eq!(engine.current_profile(), MusicProfile::BassHeavy);
    assert_eq!(engine.meters().get_profile(), MusicProfile::BassHeavy);
    let auto = engine.auto_engine();
    assert!(auto.cycle_slot() >= 1);
    assert!(!auto.is_crossfading());
    let rotations = [[5, 6, 7], [6, 7, 8], [7, 8, 9]];
    assert!(
        rotations.contains(&auto.active_set()),
        "active set {:?}",
        auto.active_set()
    );
}

#[test]
fn reset_then_prepare_matches_fresh_engine() {
    let mut fresh = MixEngine::new();
    fresh.prepare(SR, 128);

    let mut used = MixEngine::new();
    used.prepare(44100.0, 512);
    let mut warm = vec![0.0f32; 512];
    let mut warm_src = SineSource::new(220.0, 0.9);
    for _ in 0..200 {
        warm_src.fill(&mut warm);
        used.process(&mut [&mut warm[..]], &auto(15.0));
    }
    used.reset();
    used.prepare(SR, 128);

    let mut src_a = SineSource::new(300.0, 0.6);
    let mut src_b = SineSource::new(300.0, 0.6);
    let mut a = vec![0.0f32; 128];
    let mut b = vec![0.0f32; 128];
    for block in 0..1000 {
        let p = if block < 500 { auto(15.0) } else { manual(3, 0.7, 0.8) };
        src_a.fill(&mut a);
        src_b.fill(&mut b);
        fresh.process(&mut [&mut a[..]], &p);
        used.process(&mut [&mut b[..]], &p);
        assert_eq!(a, b, "diverged at block {block}");
    }
    assert_eq!(fresh.auto_engine().active_set(), used.auto_engine().active_set());
}

#[test]
fn spectrum_frames_publish_after_full_window() {
    let mut engine = MixEngine::new();
    engine.prepare(SR, 512);
    let spectrum = engine.spectrum();
    let p = manual(5, 1.0, 1.0);
    let mut buf = vec![0.0f32; 512];

    for _ in 0..3 {
        buf.fill(0.0);
        engine.process(&mut [&mut buf[..]], &p);
    }
    assert!(!spectrum.take_ready());

    buf.fill(0.0);
    engine.process(&mut [&mut buf[..]], &p);
    assert!(spectrum.take_ready());
    assert!(!spectrum.take_ready());

    let mut bins = vec![0.0f32; solfeggio::dsp::NUM_BINS];
    spectrum.read_into(&mut bins);
    let peak = bins
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    // 528 Hz sits between bins 22 and 23 at 48 kHz / 2048
    assert!((spectrum.bin_frequency(peak) - 528.0).abs() < 30.0);
}

#[test]
fn loud_mid_band_music_is_compressed() {
    let mut engine = MixEngine::new();
    engine.prepare(SR, 256);
    let p = manual(0, 0.0, 0.0);
    let mut source = SineSource::new(800.0, 0.9);
    let mut buf = vec![0.0f32; 256];
    let mut dry = vec![0.0f32; 256];

    for _ in 0..200 {
        source.fill(&mut buf);
        dry.copy_from_slice(&buf);
        engine.process(&mut [&mut buf[..]], &p);
    }
    let peak_in = dry.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
    let peak_out = buf.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
    assert!(peak_out < peak_in * 0.9);
    // Dry/wet 0.5 keeps at least half the signal
    assert!(peak_out > peak_in * 0.5);
    assert!(engine.meters().get_gain_reduction_db(0) > 3.0);
}

#[test]
fn engine_params_drive_processing() {
    let values = ParamValues {
        auto_mode: false,
        master_mix: 100.0,
        tone_gains: [1.0; NUM_TONES],
        tone_enabled: {
            let mut on = [false; NUM_TONES];
            on[9] = true;
            on
        },
        sc_dry_wet: 0.0,
        ..ParamValues::default()
    };
    let params = EngineParams::from_values(&values);
    let mut engine = MixEngine::new();
    engine.prepare(SR, 512);
    let mut buf = vec![0.0f32; 512];
    for _ in 0..10 {
        buf.fill(0.0);
        engine.process_with_params(&mut [&mut buf[..]], &params);
    }
    assert_eq!(engine.sidechain_params().dry_wet(), 0.0);
    let peak = buf.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
    // One tone at full gain and full mix: 0.1 peak
    assert!((peak - 0.1).abs() < 2e-3, "peak {peak}");
}
