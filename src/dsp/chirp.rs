//! Linear-frequency chirp synthesis.
//!
//! The chirp is the ranging symbol: a cosine whose instantaneous frequency
//! sweeps linearly from `f0` to `f1` over the time vector. The sweep rate is
//! normalized to the *last* element of the time vector rather than the
//! nominal duration, which matters for short symbols and keeps the sweep
//! exactly on `f1` at the final sample.

use std::f32::consts::PI;

/// Evaluate a linear chirp over the time vector `t`.
///
/// `value[i] = cos(2π·(β/2·t[i]² + f0·t[i]) + phase)` with
/// `β = (f1 - f0) / t[t.len() - 1]`.
///
/// The last element of `t` must be nonzero (a one-sample time vector has no
/// sweep to normalize against).
pub fn chirp(f0: f32, f1: f32, t: &[f32], phase: f32) -> Vec<f32> {
    assert!(!t.is_empty(), "chirp needs a non-empty time vector");
    let beta = (f1 - f0) / t[t.len() - 1];
    t.iter()
        .map(|&ti| (2.0 * PI * (beta / 2.0 * ti * ti + f0 * ti) + phase).cos())
        .collect()
}

/// Number of samples in one ranging symbol.
pub fn symbol_length(cycle_time: f32, sample_rate: f32) -> usize {
    (cycle_time * sample_rate).round() as usize
}

/// Build the reference symbol for one channel: a zero-phase chirp from `f0`
/// to `f1` sampled at `sample_rate` for `cycle_time` seconds.
pub fn synthesize_symbol(f0: f32, f1: f32, cycle_time: f32, sample_rate: f32) -> Vec<f32> {
    let n = symbol_length(cycle_time, sample_rate);
    let dt = 1.0 / sample_rate;
    let t: Vec<f32> = (0..n).map(|i| i as f32 * dt).collect();
    chirp(f0, f1, &t, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chirp_starts_at_one() {
        let t: Vec<f32> = (0..100).map(|i| i as f32 / 44100.0).collect();
        let value = chirp(2000.0, 6000.0, &t, 0.0);
        assert!((value[0] - 1.0).abs() < 1e-6, "chirp(0) = {}", value[0]);
    }

    #[test]
    fn test_zero_sweep_is_pure_tone() {
        let f = 1000.0;
        let t: Vec<f32> = (0..64).map(|i| i as f32 / 8000.0).collect();
        let value = chirp(f, f, &t, 0.0);
        for (i, &v) in value.iter().enumerate() {
            let expected = (2.0 * PI * f * t[i]).cos();
            assert!((v - expected).abs() < 1e-5, "sample {}: {} vs {}", i, v, expected);
        }
    }

    #[test]
    fn test_symbol_length_reference() {
        assert_eq!(symbol_length(0.1, 44100.0), 4410);
        assert_eq!(symbol_length(0.05, 44100.0), 2205);
    }

    #[test]
    fn test_synthesize_symbol_shape() {
        let symbol = synthesize_symbol(2000.0, 6000.0, 0.1, 44100.0);
        assert_eq!(symbol.len(), 4410);
        assert!(symbol.iter().all(|v| v.abs() <= 1.0 + 1e-6));
        assert!((symbol[0] - 1.0).abs() < 1e-6);
    }
}
