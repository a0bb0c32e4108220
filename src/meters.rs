//! Thread-safe metering for real-time audio processing.
//!
//! Atomic float storage shared between the audio thread and any reader
//! (status display, render tool) without locks. Values are overwritten once
//! per block; readers see the latest block.

use crate::dsp::MusicProfile;
use crate::MAX_CHANNELS;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

#[inline]
fn store_f32(cell: &AtomicU32, val: f32) {
    cell.store(val.to_bits(), Ordering::Relaxed);
}

#[inline]
fn load_f32(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

/// Output levels, sidechain state and the detected music profile.
pub struct Meters {
    output_peak: [AtomicU32; MAX_CHANNELS],
    gain_reduction_db: [AtomicU32; MAX_CHANNELS],
    sidechain_rms: AtomicU32,
    sidechain_peak: AtomicU32,
    mix_level: AtomicU32,
    profile: AtomicU8,
}

impl Default for Meters {
    fn default() -> Self {
        Self {
            output_peak: std::array::from_fn(|_| AtomicU32::new(0)),
            gain_reduction_db: std::array::from_fn(|_| AtomicU32::new(0)),
            sidechain_rms: AtomicU32::new(0),
            sidechain_peak: AtomicU32::new(0),
            mix_level: AtomicU32::new(0),
            profile: AtomicU8::new(MusicProfile::Quiet as u8),
        }
    }
}

impl Meters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        for ch in 0..MAX_CHANNELS {
            store_f32(&self.output_peak[ch], 0.0);
            store_f32(&self.gain_reduction_db[ch], 0.0);
        }
        store_f32(&self.sidechain_rms, 0.0);
        store_f32(&self.sidechain_peak, 0.0);
        store_f32(&self.mix_level, 0.0);
        self.set_profile(MusicProfile::Quiet);
    }

    /// Out-of-range channels are ignored.
    pub fn set_output_peak(&self, channel: usize, val: f32) {
        if let Some(cell) = self.output_peak.get(channel) {
            store_f32(cell, val);
        }
    }

    pub fn set_gain_reduction_db(&self, channel: usize, val: f32) {
        if let Some(cell) = self.gain_reduction_db.get(channel) {
            store_f32(cell, val);
        }
    }

    pub fn set_sidechain_rms(&self, val: f32) {
        store_f32(&self.sidechain_rms, val);
    }

    pub fn set_sidechain_peak(&self, val: f32) {
        store_f32(&self.sidechain_peak, val);
    }

    pub fn set_mix_level(&self, val: f32) {
        store_f32(&self.mix_level, val);
    }

    pub fn set_profile(&self, profile: MusicProfile) {
        self.profile.store(profile as u8, Ordering::Relaxed);
    }

    pub fn get_output_peak(&self, channel: usize) -> f32 {
        self.output_peak.get(channel).map_or(0.0, load_f32)
    }

    pub fn get_gain_reduction_db(&self, channel: usize) -> f32 {
        self.gain_reduction_db.get(channel).map_or(0.0, load_f32)
    }

    pub fn get_sidechain_rms(&self) -> f32 {
        load_f32(&self.sidechain_rms)
    }

    pub fn get_sidechain_peak(&self) -> f32 {
        load_f32(&self.sidechain_peak)
    }

    /// Smoothed master mix at the end of the last block.
    pub fn get_mix_level(&self) -> f32 {
        load_f32(&self.mix_level)
    }

    pub fn get_profile(&self) -> MusicProfile {
        MusicProfile::from_u8(self.profile.load(Ordering::Relaxed))
    }
}
