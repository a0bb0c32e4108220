//! The fixed tone table.
//!
//! Ten tones, addressed everywhere by their index `0..NUM_TONES`. The table
//! never changes at runtime; parameter ids and display strings derive from it.

/// Number of tones in the bank.
pub const NUM_TONES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub name: &'static str,
    pub description: &'static str,
}

pub const TONES: [Tone; NUM_TONES] = [
    Tone {
        frequency_hz: 174.0,
        name: "174 Hz",
        description: "Pain Relief",
    },
    Tone {
        frequency_hz: 285.0,
        name: "285 Hz",
        description: "Tissue Healing",
    },
    Tone {
        frequency_hz: 396.0,
        name: "396 Hz",
        description: "Liberation",
    },
    Tone {
        frequency_hz: 417.0,
        name: "417 Hz",
        description: "Change",
    },
    Tone {
        frequency_hz: 432.0,
        name: "432 Hz",
        description: "Natural Tuning",
    },
    Tone {
        frequency_hz: 528.0,
        name: "528 Hz",
        description: "Transformation",
    },
    Tone {
        frequency_hz: 639.0,
        name: "639 Hz",
        description: "Connection",
    },
    Tone {
        frequency_hz: 741.0,
        name: "741 Hz",
        description: "Expression",
    },
    Tone {
        frequency_hz: 852.0,
        name: "852 Hz",
        description: "Intuition",
    },
    Tone {
        frequency_hz: 963.0,
        name: "963 Hz",
        description: "Enlightenment",
    },
];

impl Tone {
    /// Host parameter id of this tone's gain, e.g. `"174Hz_Gain"`.
    pub fn gain_param_id(&self) -> String {
        format!("{:.0}Hz_Gain", self.frequency_hz)
    }

    /// Host parameter id of this tone's on/off switch, e.g. `"174Hz_On"`.
    pub fn enabled_param_id(&self) -> String {
        format!("{:.0}Hz_On", self.frequency_hz)
    }
}

/// Index of the tone at exactly `hz`, if any.
pub fn tone_index(hz: f32) -> Option<usize> {
    TONES
        .iter()
        .position(|t| (t.frequency_hz - hz).abs() < 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_ascending() {
        for pair in TONES.windows(2) {
            assert!(pair[0].frequency_hz < pair[1].frequency_hz);
        }
    }

    #[test]
    fn test_param_ids() {
        assert_eq!(TONES[0].gain_param_id(), "174Hz_Gain");
        assert_eq!(TONES[9].enabled_param_id(), "963Hz_On");
    }

    #[test]
    fn test_tone_index_lookup() {
        assert_eq!(tone_index(528.0), Some(5));
        assert_eq!(tone_index(440.0), None);
    }
}
