//! Signal processing primitives for acoustic ranging.
//!
//! **Pipeline**:
//! 1. `chirp` synthesizes the linear-sweep reference symbol
//! 2. `xcorr` matched-filters received windows against the symbol
//! 3. `fft` backs both the correlator and the demodulation spectrum
//!
//! The transform works on any length but is only fast for lengths whose
//! prime factors are all in {2, 3, 5, 7}; `smooth_length` finds the nearest
//! such length for padding.

pub mod chirp;
pub mod fft;
pub mod xcorr;

pub use chirp::{chirp, symbol_length, synthesize_symbol};
pub use fft::{forward, inverse, smooth_length};
pub use xcorr::xcorr;
