//! Music profile classification and the profile → tone-set table.
//!
//! Both are pure functions: the classifier only sees the three smoothed band
//! energies, and the table only sees the profile and the rotation counter.

use crate::tones::NUM_TONES;
use serde::{Deserialize, Serialize};

/// Tones played at once by the auto engine.
pub const SET_SIZE: usize = 3;

pub type FrequencySet = [usize; SET_SIZE];

/// Below this summed energy the input counts as silent.
pub const QUIET_ENERGY_FLOOR: f32 = 0.001;

const BASS_RATIO: f32 = 0.5;
const MID_RATIO: f32 = 0.45;
const HIGH_RATIO: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MusicProfile {
    BassHeavy = 0,
    MidFocused = 1,
    Bright = 2,
    FullSpectrum = 3,
    Quiet = 4,
}

impl Default for MusicProfile {
    fn default() -> Self {
        MusicProfile::Quiet
    }
}

impl MusicProfile {
    pub const ALL: [MusicProfile; 5] = [
        MusicProfile::BassHeavy,
        MusicProfile::MidFocused,
        MusicProfile::Bright,
        MusicProfile::FullSpectrum,
        MusicProfile::Quiet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MusicProfile::BassHeavy => "Bass Heavy",
            MusicProfile::MidFocused => "Mid Focused",
            MusicProfile::Bright => "Bright",
            MusicProfile::FullSpectrum => "Full Spectrum",
            MusicProfile::Quiet => "Quiet",
        }
    }

    /// Inverse of `profile as u8`; unknown values map to `Quiet`.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => MusicProfile::BassHeavy,
            1 => MusicProfile::MidFocused,
            2 => MusicProfile::Bright,
            3 => MusicProfile::FullSpectrum,
            _ => MusicProfile::Quiet,
        }
    }

    /// Base tone set (indices into the tone table) before rotation.
    pub fn base_set(&self) -> FrequencySet {
        match self {
            // 528, 639, 741 Hz
            MusicProfile::BassHeavy => [5, 6, 7],
            // 417, 432, 528 Hz
            MusicProfile::MidFocused => [3, 4, 5],
            // 741, 852, 963 Hz
            MusicProfile::Bright => [7, 8, 9],
            // 396, 528, 852 Hz
            MusicProfile::FullSpectrum => [2, 5, 8],
            // 174, 285, 396 Hz
            MusicProfile::Quiet => [0, 1, 2],
        }
    }
}

/// Classify from smoothed band energies.
///
/// Check order is a priority: bass dominance beats mid, mid beats high.
pub fn classify(bass: f32, mid: f32, high: f32) -> MusicProfile {
    let total = bass + mid + high + 1e-10;
    if total < QUIET_ENERGY_FLOOR {
        MusicProfile::Quiet
    } else if bass / total > BASS_RATIO {
        MusicProfile::BassHeavy
    } else if mid / total > MID_RATIO {
        MusicProfile::MidFocused
    } else if high / total > HIGH_RATIO {
        MusicProfile::Bright
    } else {
        MusicProfile::FullSpectrum
    }
}

/// Tone set for `profile` on rotation step `slot`: every index of the base
/// set shifted by `slot % 3`, wrapping around the tone table.
pub fn select_set(profile: MusicProfile, slot: u32) -> FrequencySet {
    let offset = (slot % SET_SIZE as u32) as usize;
    let mut set = profile.base_set();
    for idx in &mut set {
        *idx = (*idx + offset) % NUM_TONES;
    }
    set
}
