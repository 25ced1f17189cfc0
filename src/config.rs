//! Ranging parameters.
//!
//! The core takes a validated snapshot of the configuration at worker start;
//! persistence and reactive settings plumbing belong to the embedding
//! application. Symbols are derived on demand, so a new snapshot with a
//! changed `cycle_time` or frequency pair automatically yields recomputed
//! symbols.

use snafu::Snafu;

use crate::detector::{Channel, ChannelDetector, DetectorParams};
use crate::dsp;

#[derive(Debug, Snafu, PartialEq)]
pub enum ConfigError {
    /// The statistics window needs at least one slot
    #[snafu(display("buffer_length must be at least 1"))]
    BufferLengthTooSmall,

    /// Cycle time must be a positive finite number of seconds
    #[snafu(display("cycle_time must be positive and finite"))]
    InvalidCycleTime,

    /// Sample rate must be positive
    #[snafu(display("sample_rate must be positive"))]
    InvalidSampleRate,

    /// A channel's sweep must cover a nonzero frequency span
    #[snafu(display("channel {channel} frequency band has zero sweep"))]
    EmptyBand { channel: u8 },

    /// The derived symbol must hold at least two samples
    #[snafu(display("cycle_time * sample_rate rounds below 2 samples"))]
    SymbolTooShort,
}

/// All tunable parameters of the ranging pipeline, with the reference
/// defaults: 44.1 kHz mono capture, 0.1 s chirps, channel bands 2-6 kHz and
/// 7-11 kHz (disjoint so the two trains do not cross-correlate).
#[derive(Debug, Clone)]
pub struct RangingConfig {
    pub sample_rate: f32,
    pub cycle_time: f32,
    pub start_freq1: f32,
    pub end_freq1: f32,
    pub start_freq2: f32,
    pub end_freq2: f32,
    pub start_intensity_threshold: f32,
    pub end_intensity_threshold: f32,
    pub start_index_std_limit: f32,
    pub end_index_std_limit: f32,
    pub buffer_length: usize,
    pub fft_length: usize,
    pub two_dimension_enabled: bool,
    pub use_second_sender: bool,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            cycle_time: 0.1,
            start_freq1: 2000.0,
            end_freq1: 6000.0,
            start_freq2: 7000.0,
            end_freq2: 11000.0,
            start_intensity_threshold: 10.0,
            end_intensity_threshold: 5.0,
            start_index_std_limit: 10.0,
            end_index_std_limit: 20.0,
            buffer_length: 10,
            fft_length: 4096,
            two_dimension_enabled: false,
            use_second_sender: false,
        }
    }
}

impl RangingConfig {
    /// Check the preconditions the pipeline assumes. Call before
    /// constructing detectors or workers; the core does not re-validate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_length < 1 {
            return Err(ConfigError::BufferLengthTooSmall);
        }
        if !(self.cycle_time.is_finite() && self.cycle_time > 0.0) {
            return Err(ConfigError::InvalidCycleTime);
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.symbol_length() < 2 {
            return Err(ConfigError::SymbolTooShort);
        }
        for channel in [Channel::One, Channel::Two] {
            let (f0, f1) = self.band(channel);
            if !(f0.is_finite() && f1.is_finite()) || f0 == f1 {
                return Err(ConfigError::EmptyBand {
                    channel: channel.number(),
                });
            }
        }
        Ok(())
    }

    /// Samples per symbol, `round(cycle_time * sample_rate)`.
    pub fn symbol_length(&self) -> usize {
        dsp::symbol_length(self.cycle_time, self.sample_rate)
    }

    /// Frequency band `(start, end)` of one channel.
    pub fn band(&self, channel: Channel) -> (f32, f32) {
        match channel {
            Channel::One => (self.start_freq1, self.end_freq1),
            Channel::Two => (self.start_freq2, self.end_freq2),
        }
    }

    /// Synthesize one channel's reference symbol.
    pub fn symbol(&self, channel: Channel) -> Vec<f32> {
        let (f0, f1) = self.band(channel);
        dsp::synthesize_symbol(f0, f1, self.cycle_time, self.sample_rate)
    }

    /// Build the detector for one channel.
    pub fn detector(&self, channel: Channel) -> ChannelDetector {
        let (start_freq, end_freq) = self.band(channel);
        ChannelDetector::new(
            channel,
            DetectorParams {
                sample_rate: self.sample_rate,
                cycle_time: self.cycle_time,
                start_freq,
                end_freq,
                start_intensity_threshold: self.start_intensity_threshold,
                end_intensity_threshold: self.end_intensity_threshold,
                start_index_std_limit: self.start_index_std_limit,
                end_index_std_limit: self.end_index_std_limit,
                buffer_length: self.buffer_length,
                fft_length: self.fft_length,
            },
        )
    }
}
