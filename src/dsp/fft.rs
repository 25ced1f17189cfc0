//! Mixed-radix discrete Fourier transform.
//!
//! Works in place on separate real/imaginary `f32` slices like the rest of
//! the pipeline. Lengths factoring into {2, 3, 5, 7} take the Cooley-Tukey
//! fast path; any other length falls back to a direct DFT base case, so the
//! result is correct for arbitrary lengths but callers that care about speed
//! should pad to `smooth_length` first (the correlator does).

use std::f32::consts::PI;

/// Radix factors supported by the fast decomposition.
pub const FACTORS: [usize; 4] = [2, 3, 5, 7];

/// Smallest length `>= n` whose prime factorization uses only {2, 3, 5, 7}.
pub fn smooth_length(n: usize) -> usize {
    let mut m = n.max(1);
    loop {
        let mut r = m;
        for p in FACTORS {
            while r > 1 && r % p == 0 {
                r /= p;
            }
        }
        if r == 1 {
            return m;
        }
        m += 1;
    }
}

/// Forward DFT (`-i` sign convention), in place.
///
/// # Panics
/// On zero-length input or mismatched real/imag lengths.
pub fn forward(real: &mut [f32], imag: &mut [f32]) {
    transform(real, imag, -1.0);
}

/// Inverse DFT (`+i` sign convention, scaled by 1/N), in place.
///
/// Round trip `forward` then `inverse` reproduces the input within
/// floating-point tolerance.
pub fn inverse(real: &mut [f32], imag: &mut [f32]) {
    transform(real, imag, 1.0);
    let scale = 1.0 / real.len() as f32;
    for v in real.iter_mut() {
        *v *= scale;
    }
    for v in imag.iter_mut() {
        *v *= scale;
    }
}

fn transform(real: &mut [f32], imag: &mut [f32], sign: f32) {
    assert!(!real.is_empty(), "cannot transform zero-length input");
    assert_eq!(real.len(), imag.len(), "real/imag length mismatch");

    let input: Vec<(f32, f32)> = real
        .iter()
        .zip(imag.iter())
        .map(|(&re, &im)| (re, im))
        .collect();
    for (k, (re, im)) in dft(&input, sign).into_iter().enumerate() {
        real[k] = re;
        imag[k] = im;
    }
}

/// Recursive mixed-radix decomposition. Splits off the smallest supported
/// factor each level; leftover lengths with no supported factor go through
/// the direct DFT.
fn dft(x: &[(f32, f32)], sign: f32) -> Vec<(f32, f32)> {
    let n = x.len();
    if n == 1 {
        return x.to_vec();
    }
    let radix = match FACTORS.into_iter().find(|p| n % p == 0) {
        Some(p) => p,
        None => return dft_direct(x, sign),
    };
    let m = n / radix;

    // Decimate in time: radix interleaved subsequences of length m.
    let subs: Vec<Vec<(f32, f32)>> = (0..radix)
        .map(|r| {
            let sub: Vec<(f32, f32)> = x.iter().copied().skip(r).step_by(radix).collect();
            dft(&sub, sign)
        })
        .collect();

    // Recombine: X[k] = sum_r W(r*k) * S_r[k mod m].
    let step = sign * 2.0 * PI / n as f32;
    let mut out = vec![(0.0f32, 0.0f32); n];
    for (k, slot) in out.iter_mut().enumerate() {
        let km = k % m;
        let mut acc_re = 0.0f32;
        let mut acc_im = 0.0f32;
        for (r, sub) in subs.iter().enumerate() {
            let theta = step * ((r * k) % n) as f32;
            let (w_re, w_im) = (theta.cos(), theta.sin());
            let (s_re, s_im) = sub[km];
            acc_re += w_re * s_re - w_im * s_im;
            acc_im += w_re * s_im + w_im * s_re;
        }
        *slot = (acc_re, acc_im);
    }
    out
}

fn dft_direct(x: &[(f32, f32)], sign: f32) -> Vec<(f32, f32)> {
    let n = x.len();
    let step = sign * 2.0 * PI / n as f32;
    let mut out = vec![(0.0f32, 0.0f32); n];
    for (k, slot) in out.iter_mut().enumerate() {
        let mut acc_re = 0.0f32;
        let mut acc_im = 0.0f32;
        for (j, &(s_re, s_im)) in x.iter().enumerate() {
            let theta = step * ((j * k) % n) as f32;
            let (w_re, w_im) = (theta.cos(), theta.sin());
            acc_re += w_re * s_re - w_im * s_im;
            acc_im += w_re * s_im + w_im * s_re;
        }
        *slot = (acc_re, acc_im);
    }
    out
}
