//! Numeric helpers for reporting.

use std::num::NonZeroUsize;

/// Resizes `input` to exactly `n` values, keeping its shape by linear
/// interpolation between neighbouring samples.
///
/// An empty input yields zeros, a single sample is repeated, and `n == 1`
/// collapses the series to its mean.
pub fn resample(input: &[f64], n: NonZeroUsize) -> Vec<f64> {
    let n = n.get();

    match input {
        [] => return vec![0.0; n],
        [only] => return vec![*only; n],
        _ => {}
    }

    if n == 1 {
        let mean = input.iter().sum::<f64>() / input.len() as f64;
        return vec![mean];
    }

    let last = input.len() - 1;
    let step = last as f64 / (n - 1) as f64;
    (0..n)
        .map(|i| {
            let exact = i as f64 * step;
            // rounding can push the final index a hair past the end
            let lower = (exact.floor() as usize).min(last);
            let upper = (exact.ceil() as usize).min(last);

            if lower == upper {
                input[lower]
            } else {
                let lower_weight = upper as f64 - exact;
                let upper_weight = exact - lower as f64;
                input[lower] * lower_weight + input[upper] * upper_weight
            }
        })
        .collect()
}
