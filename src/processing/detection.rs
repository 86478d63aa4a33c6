/// Inhalation onset detection on a (smoothed) sample window
use crate::models::Sample;

/// Lagged values with a smaller magnitude are treated as zero.
const MIN_BASE: f64 = 1e-9;

/// Strictly increasing indices into the window a detector was run on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionResult {
    indices: Vec<usize>,
}

impl DetectionResult {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Translate window indices back to positions in the full sequence.
    pub fn to_absolute(&self, offset: usize) -> Vec<usize> {
        self.indices.iter().map(|&i| i + offset).collect()
    }
}

/// Which heuristic a channel uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionStrategy {
    /// Rise of more than `threshold_pct` percent over `lag` samples.
    PercentChange { lag: usize, threshold_pct: f64 },
    /// Sample-to-sample rise larger than `threshold`.
    FirstDifference { threshold: f64 },
    Disabled,
}

impl DetectionStrategy {
    pub fn detect(&self, samples: &[Sample]) -> DetectionResult {
        match *self {
            DetectionStrategy::PercentChange { lag, threshold_pct } => {
                detect_pct(samples, lag, threshold_pct)
            }
            DetectionStrategy::FirstDifference { threshold } => detect_diff(samples, threshold),
            DetectionStrategy::Disabled => DetectionResult::default(),
        }
    }
}

/// Percent-change-over-lag detector
///
/// For each `i` in `lag..len-1`, compares `samples[i + 1]` against
/// `samples[i + 1 - lag]` and flags `i` when the value rose by more than
/// `threshold_pct` percent. The onset is reported at the sample preceding the
/// rise, so the final index is never flagged.
///
/// Windows whose lagged value is zero (or close to it) are skipped. A sequence
/// shorter than `lag + 1`, or a zero `lag`, yields no detections.
pub fn detect_pct(samples: &[Sample], lag: usize, threshold_pct: f64) -> DetectionResult {
    let n = samples.len();
    if lag == 0 || n < lag + 1 {
        return DetectionResult::default();
    }

    let indices = (lag..n - 1)
        .filter(|&i| {
            let current = samples[i + 1] as f64;
            let base = samples[i + 1 - lag] as f64;
            if !base.is_finite() || base.abs() < MIN_BASE {
                return false;
            }
            let change_pct = (current - base) / base * 100.0;
            change_pct.is_finite() && change_pct > threshold_pct && current > base
        })
        .collect();

    DetectionResult { indices }
}

/// First-difference detector
///
/// Flags every `i` in `1..len` where `samples[i] - samples[i - 1]` exceeds
/// `threshold`, i.e. the later sample of the rising pair.
pub fn detect_diff(samples: &[Sample], threshold: f64) -> DetectionResult {
    if samples.len() < 2 {
        return DetectionResult::default();
    }

    let indices = samples
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| (pair[1] as f64 - pair[0] as f64) > threshold)
        .map(|(k, _)| k + 1)
        .collect();

    DetectionResult { indices }
}
