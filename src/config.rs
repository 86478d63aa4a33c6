use log::{debug, info};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::Channel;
use crate::processing::DetectionStrategy;

const DEFAULT_DEVICE_NAME: &str = "ID-169";
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 200;
const DEFAULT_FILTER_WINDOW: usize = 5;
const DEFAULT_MAX_POINTS: usize = 100;
const DEFAULT_SAMPLE_PERIOD_MS: u64 = 100;

/// Knobs passed into every smoothing/detection/snapshot call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingConfig {
    pub filter_window: usize,
    pub max_points: usize,
    /// Nominal seconds between two samples of a channel.
    pub sample_period: f64,
    /// Display-only divisor applied to the x axis.
    pub slowdown_factor: f64,
    /// Add the inhalation flag column to exports.
    pub export_flags: bool,
    pub detectors: [DetectionStrategy; Channel::COUNT],
}

impl ProcessingConfig {
    pub fn detector(&self, channel: Channel) -> DetectionStrategy {
        self.detectors[channel.index()]
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        ProcessingConfig {
            filter_window: DEFAULT_FILTER_WINDOW,
            max_points: DEFAULT_MAX_POINTS,
            sample_period: DEFAULT_SAMPLE_PERIOD_MS as f64 / 1000.0,
            slowdown_factor: 1.0,
            export_flags: true,
            detectors: Channel::ALL.map(default_detector),
        }
    }
}

/// Pressure and humidity move by a small fraction of a percent per breath,
/// temperature by more.
fn default_detector(channel: Channel) -> DetectionStrategy {
    match channel {
        Channel::Temperature => DetectionStrategy::PercentChange {
            lag: 10,
            threshold_pct: 0.2,
        },
        Channel::Humidity => DetectionStrategy::PercentChange {
            lag: 10,
            threshold_pct: 0.05,
        },
        Channel::Pressure => DetectionStrategy::PercentChange {
            lag: 10,
            threshold_pct: 0.01,
        },
        Channel::Microphone => DetectionStrategy::Disabled,
    }
}

impl FromStr for DetectionStrategy {
    type Err = String;

    /// `pct:<lag>:<threshold_pct>`, `diff:<threshold>` or `off`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').map(str::trim).collect();
        match parts.as_slice() {
            ["off"] | ["none"] => Ok(DetectionStrategy::Disabled),
            ["pct", lag, threshold] => {
                let lag = lag
                    .parse::<usize>()
                    .map_err(|e| format!("invalid lag '{}': {}", lag, e))?;
                if lag == 0 {
                    return Err("lag must be at least 1".into());
                }
                let threshold_pct = parse_finite(threshold)?;
                Ok(DetectionStrategy::PercentChange { lag, threshold_pct })
            }
            ["diff", threshold] => Ok(DetectionStrategy::FirstDifference {
                threshold: parse_finite(threshold)?,
            }),
            _ => Err(format!(
                "unknown detector '{}', expected pct:<lag>:<threshold>, diff:<threshold> or off",
                s
            )),
        }
    }
}

fn parse_finite(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(format!("threshold '{}' is not finite", value)),
        Err(e) => Err(format!("invalid threshold '{}': {}", value, e)),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub device_name: String,
    pub export_dir: PathBuf,
    pub flush_interval: Duration,
    pub processing: ProcessingConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source. Unset keys take
    /// their defaults; set but malformed keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let device_name = lookup("DEVICE_NAME")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());

        let export_dir = lookup("EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let flush_ms: u64 = parse_var(&lookup, "FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS)?;
        if flush_ms == 0 {
            return Err("FLUSH_INTERVAL_MS must be greater than zero".into());
        }

        let filter_window = parse_var(&lookup, "FILTER_WINDOW", DEFAULT_FILTER_WINDOW)?;
        let max_points: usize = parse_var(&lookup, "MAX_POINTS", DEFAULT_MAX_POINTS)?;
        if max_points == 0 {
            return Err("MAX_POINTS must be greater than zero".into());
        }

        let period_ms: u64 = parse_var(&lookup, "SAMPLE_PERIOD_MS", DEFAULT_SAMPLE_PERIOD_MS)?;
        let slowdown_factor: f64 = parse_var(&lookup, "SLOWDOWN_FACTOR", 1.0)?;
        if !(slowdown_factor.is_finite() && slowdown_factor > 0.0) {
            return Err("SLOWDOWN_FACTOR must be a positive number".into());
        }

        let export_flags = parse_var(&lookup, "EXPORT_FLAGS", true)?;

        let mut detectors = Channel::ALL.map(default_detector);
        for channel in Channel::ALL {
            let key = format!("DETECTOR_{}", channel.key().to_uppercase());
            let detector = &mut detectors[channel.index()];
            if let Some(value) = lookup(&key) {
                *detector = value
                    .parse::<DetectionStrategy>()
                    .map_err(|e| format!("{}: {}", key, e))?;
            }
            debug!("Detector for {}: {:?}", channel, detector);
        }

        info!(
            "Configured for device '{}', flush every {} ms, filter window {}, {} display points",
            device_name, flush_ms, filter_window, max_points
        );

        Ok(AppConfig {
            device_name,
            export_dir,
            flush_interval: Duration::from_millis(flush_ms),
            processing: ProcessingConfig {
                filter_window,
                max_points,
                sample_period: period_ms as f64 / 1000.0,
                slowdown_factor,
                export_flags,
                detectors,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            let message = format!("{} has invalid value '{}': {}", key, value, e);
            Err(message.into())
        }
    }
}
