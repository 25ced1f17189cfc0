//! FFT-based linear cross-correlation (matched filter).
//!
//! Uses the convolution theorem: pad both signals to a smooth length of at
//! least twice the longer one, transform, multiply one spectrum by the
//! conjugate of the other, inverse-transform, and reorder the circular
//! result into linear-lag order.

use super::fft;

/// Full linear cross-correlation of `x` against `y`.
///
/// With `m = max(x.len(), y.len())` and `mxl = m - 1`, the output has
/// length `2·mxl + 1` and index `mxl` corresponds to zero lag; negative
/// lags precede it, positive lags follow. `cor[mxl + k]` is
/// `Σ x[i + k]·y[i]` over the overlapping range, also when the inputs have
/// different lengths.
///
/// # Panics
/// If both inputs are empty.
pub fn xcorr(x: &[f32], y: &[f32]) -> Vec<f32> {
    let m = x.len().max(y.len());
    assert!(m > 0, "cannot correlate zero-length signals");
    let mxl = m - 1;
    let m2 = fft::smooth_length(2 * m);

    let mut x_real = vec![0.0f32; m2];
    let mut x_imag = vec![0.0f32; m2];
    let mut y_real = vec![0.0f32; m2];
    let mut y_imag = vec![0.0f32; m2];
    x_real[..x.len()].copy_from_slice(x);
    y_real[..y.len()].copy_from_slice(y);

    fft::forward(&mut x_real, &mut x_imag);
    fft::forward(&mut y_real, &mut y_imag);

    // X * conj(Y), in place over the X buffers.
    for i in 0..m2 {
        let re = x_real[i] * y_real[i] + x_imag[i] * y_imag[i];
        let im = x_imag[i] * y_real[i] - x_real[i] * y_imag[i];
        x_real[i] = re;
        x_imag[i] = im;
    }

    fft::inverse(&mut x_real, &mut x_imag);

    // Circular result: negative lags wrap to the tail. Reorder so the
    // output runs from lag -mxl through lag +mxl.
    let mut cor = Vec::with_capacity(2 * mxl + 1);
    cor.extend_from_slice(&x_real[m2 - mxl..]);
    cor.extend_from_slice(&x_real[..mxl + 1]);
    cor
}
