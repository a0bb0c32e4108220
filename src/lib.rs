//! Real-time tone mixer.
//!
//! Ten fixed sine tones are blended at a low level under a music signal,
//! ducked under loud passages and post-processed by a self-keyed sidechain
//! compressor. In auto mode the tones are chosen from a three-band analysis
//! of the incoming music and crossfaded on a timer.
//!
//! The audio-thread entry point is [`MixEngine::process`]. Control values
//! flow in through [`EngineParams`]; spectrum frames, meters and the detected
//! [`MusicProfile`] flow out through shared lock-free handles.

pub mod config;
pub mod debug;
pub mod dsp;
pub mod engine;
pub mod meters;
pub mod params;
pub mod tones;

pub use config::{EngineConfig, Settings, SidechainConfig};
pub use dsp::{AutoClock, MusicProfile, SpectrumScope, SpectrumSnapshot};
pub use engine::{MixEngine, MAX_CHANNELS};
pub use meters::Meters;
pub use params::{BlockParams, EngineParams, ParamValues};
pub use tones::{Tone, NUM_TONES, TONES};
