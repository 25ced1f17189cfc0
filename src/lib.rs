//! Acoustic ranging via ultrasonic linear-frequency chirps.
//!
//! One or two fixed emitters transmit repeating chirp symbols; a mobile
//! receiver matched-filters its capture stream against the known symbols,
//! locks onto each train with an adaptive per-channel detector, demodulates
//! sub-sample time offsets into distances, and combines two distances into
//! a hyperbolic (x, y) fix.
//!
//! Audio devices, settings storage, and presentation are external
//! collaborators: capture and playback are abstracted behind the blocking
//! [`pipeline::AudioSource`]/[`pipeline::AudioSink`] traits, and results
//! are pushed through an `mpsc` channel.

pub mod config;
pub mod detector;
pub mod dsp;
pub mod pipeline;
pub mod solver;
pub mod stats;
pub mod tracing_init;
pub mod wav;

pub use config::{ConfigError, RangingConfig};
pub use detector::{Channel, ChannelDetector, DetectorEvent};
pub use pipeline::{
    spawn_capture, spawn_playback, AudioSink, AudioSource, DeviceError, MemorySource, NullSink,
    PipelineError, RangingUpdate, WorkerHandle,
};
pub use solver::{Fix, PositionSolver};
