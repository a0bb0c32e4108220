pub mod auto_engine;
pub mod band_analyzer;
pub mod biquad;
pub mod compressor;
pub mod oscillator;
pub mod profile;
pub mod smoother;
pub mod spectrum;
pub mod utils;

pub use auto_engine::{AutoClock, SmartAutoEngine};
pub use band_analyzer::{BandAnalyzer, BandEnergies};
pub use biquad::Biquad;
pub use compressor::{soft_knee_reduction_db, SidechainCompressor, SidechainParams};
pub use oscillator::{OscillatorBank, SineOscillator};
pub use profile::{classify, select_set, FrequencySet, MusicProfile};
pub use smoother::{GainSmootherBank, SmoothedGain};
pub use spectrum::{SpectrumCollector, SpectrumScope, SpectrumSnapshot, FFT_SIZE, NUM_BINS};
