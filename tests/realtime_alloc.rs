//! The audio path must not touch the allocator once prepared.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};
use solfeggio::{BlockParams, EngineParams, MixEngine};
use std::f32::consts::PI;

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

fn fill_music(buf: &mut [f32], offset: usize) {
    for (i, s) in buf.iter_mut().enumerate() {
        let n = (offset + i) as f32;
        *s = 0.7 * (2.0 * PI * 80.0 * n / 48000.0).sin()
            + 0.3 * (2.0 * PI * 3000.0 * n / 48000.0).sin();
    }
}

#[test]
fn process_does_not_allocate() {
    let mut engine = MixEngine::new();
    engine.prepare(48000.0, 256);
    let spectrum = engine.spectrum();
    let params = EngineParams::new();
    params.set_cycle_time_s(15.0);

    let mut left = vec![0.0f32; 256];
    let mut right = vec![0.0f32; 256];
    let mut bins = vec![0.0f32; solfeggio::dsp::NUM_BINS];

    let mut manual = BlockParams {
        auto_mode: false,
        master_mix: 0.5,
        ..BlockParams::default()
    };
    manual.manual_gains[2] = 0.8;

    assert_no_alloc(|| {
        // Long enough to cross a cycle boundary, start a crossfade and
        // publish several spectrum frames.
        for block in 0..4000 {
            fill_music(&mut left, block * 256);
            fill_music(&mut right, block * 256);
            let mut chans: [&mut [f32]; 2] = [&mut left, &mut right];
            if block % 1000 < 800 {
                engine.process_with_params(&mut chans, &params);
            } else {
                engine.process(&mut chans, &manual);
            }
            if spectrum.take_ready() {
                spectrum.read_into(&mut bins);
            }
        }
    });

    assert!(engine.auto_engine().cycle_slot() >= 1);
}
