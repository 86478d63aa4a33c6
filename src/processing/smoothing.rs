use crate::models::Sample;

/// Centered moving average with boundary correction
///
/// Computes a uniform `window`-wide convolution in "same" mode (output aligned
/// with the input, taps outside the sequence count as zero but the divisor
/// stays `window`), then restores the first and last `window / 2` positions to
/// their raw values so the edges are not pulled towards zero.
///
/// Sequences shorter than `window`, and windows of 0 or 1, come back
/// unchanged.
pub fn smooth(samples: &[Sample], window: usize) -> Vec<Sample> {
    let n = samples.len();
    if window <= 1 || n < window {
        return samples.to_vec();
    }

    // prefix[k] = sum of samples[..k]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    for &s in samples {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + s as f64);
    }

    // Output i covers input [i - window/2, i + (window-1)/2].
    let left = window / 2;
    let right = (window - 1) / 2;
    let scale = 1.0 / window as f64;

    let mut smoothed: Vec<Sample> = (0..n)
        .map(|i| {
            let start = i.saturating_sub(left);
            let end = (i + right + 1).min(n);
            ((prefix[end] - prefix[start]) * scale) as Sample
        })
        .collect();

    let edge = window / 2;
    smoothed[..edge].copy_from_slice(&samples[..edge]);
    smoothed[n - edge..].copy_from_slice(&samples[n - edge..]);

    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Direct "same"-mode convolution with a uniform kernel.
    fn reference_same(samples: &[Sample], window: usize) -> Vec<f64> {
        let n = samples.len() as isize;
        let offset = (window / 2) as isize;
        (0..n)
            .map(|i| {
                (0..window as isize)
                    .map(|j| i - offset + j)
                    .filter(|&k| k >= 0 && k < n)
                    .map(|k| samples[k as usize] as f64 / window as f64)
                    .sum()
            })
            .collect()
    }

    #[test]
    fn window_of_four_keeps_edges_and_averages_interior() {
        let input = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let out = smooth(&input, 4);

        assert_eq!(out.len(), 8);
        assert_eq!(&out[..2], &[1.0, 2.0]);
        assert_eq!(&out[6..], &[7.0, 8.0]);
        assert_relative_eq!(out[2], 2.5);
        assert_relative_eq!(out[3], 3.5);
        assert_relative_eq!(out[4], 4.5);
        assert_relative_eq!(out[5], 5.5);
    }

    #[test]
    fn interior_matches_reference_convolution() {
        let input: Vec<Sample> = (0..40).map(|i| ((i * 37) % 11) as Sample - 3.0).collect();

        for window in [2, 3, 5, 8] {
            let out = smooth(&input, window);
            let expected = reference_same(&input, window);
            let edge = window / 2;

            for i in 0..input.len() {
                if i < edge || i >= input.len() - edge {
                    assert_eq!(out[i], input[i]);
                } else {
                    assert_relative_eq!(out[i] as f64, expected[i], epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn short_input_is_returned_unchanged() {
        let input = [3.0, 1.0, 4.0];

        assert_eq!(smooth(&input, 5), input.to_vec());
        assert_eq!(smooth(&[], 3), Vec::<Sample>::new());
    }

    #[test]
    fn length_is_preserved_for_any_window() {
        let input: Vec<Sample> = (0..17).map(|i| i as Sample).collect();

        for window in 0..25 {
            assert_eq!(smooth(&input, window).len(), input.len());
        }
    }

    #[test]
    fn constant_signal_stays_constant() {
        let input = vec![1013.25; 30];

        for value in smooth(&input, 5) {
            assert_relative_eq!(value, 1013.25, epsilon = 1e-3);
        }
    }
}
