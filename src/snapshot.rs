/// Bounded, display-ready views of one channel
use crate::config::ProcessingConfig;
use crate::models::{Channel, Sample};
use crate::processing::{smooth, DetectionResult};
use crate::sample_log::SampleLog;

/// Everything presentation needs to draw one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub channel: Channel,
    /// Position of the first window sample in the flattened channel.
    pub window_start: usize,
    /// Seconds, already divided by the slowdown factor.
    pub x_axis: Vec<f64>,
    pub smoothed: Vec<Sample>,
    /// Onsets, indexed into `x_axis`/`smoothed`.
    pub detections: DetectionResult,
}

impl ChannelSnapshot {
    pub fn len(&self) -> usize {
        self.smoothed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smoothed.is_empty()
    }

    /// Onset positions in the flattened channel.
    pub fn absolute_detections(&self) -> Vec<usize> {
        self.detections.to_absolute(self.window_start)
    }
}

/// Build the trailing window of `channel`: keep the last `max_points`
/// samples, smooth them, then run the channel's detector on the smoothed
/// window.
pub fn windowed_view(
    log: &SampleLog,
    channel: Channel,
    config: &ProcessingConfig,
) -> ChannelSnapshot {
    let samples = log.flatten(channel);
    let window_start = samples.len().saturating_sub(config.max_points);
    let window = &samples[window_start..];

    let x_axis = (0..window.len())
        .map(|i| i as f64 * config.sample_period / config.slowdown_factor)
        .collect();

    let smoothed = smooth(window, config.filter_window);
    let detections = config.detector(channel).detect(&smoothed);

    ChannelSnapshot {
        channel,
        window_start,
        x_axis,
        smoothed,
        detections,
    }
}
