/// Ingestion and the periodic flush/smooth/detect cycle
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::codec::decode_frame;
use crate::config::ProcessingConfig;
use crate::error::{DecodeError, ExportError};
use crate::export::export_csv;
use crate::models::{Channel, RawFrame};
use crate::sample_log::SampleLog;
use crate::snapshot::{windowed_view, ChannelSnapshot};
use crate::utils::format_datetime;

/// Counters reported at shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub entries: usize,
    pub samples: [usize; Channel::COUNT],
    pub frames: u64,
    pub decode_errors: u64,
    /// 4-byte groups read as raw counts instead of floats.
    pub fallbacks: u64,
}

/// Owns the sample log. Frames go in through `on_notification`, views come
/// out of `tick`; both take `&mut self`, so callers get mutual exclusion from
/// the borrow checker or from whatever single task owns the pipeline.
pub struct Pipeline {
    config: ProcessingConfig,
    log: SampleLog,
    next_sequence: u64,
    decode_errors: u64,
    fallbacks: u64,
    /// Absolute onset positions already reported, per channel.
    reported_until: [usize; Channel::COUNT],
}

impl Pipeline {
    pub fn new(config: ProcessingConfig) -> Self {
        Pipeline {
            config,
            log: SampleLog::new(),
            next_sequence: 0,
            decode_errors: 0,
            fallbacks: 0,
            reported_until: [0; Channel::COUNT],
        }
    }

    pub fn log(&self) -> &SampleLog {
        &self.log
    }

    /// Decode and append one notification payload
    ///
    /// Invalid frames are logged, counted and dropped; the stream carries on.
    ///
    /// # Returns
    /// Number of samples appended
    pub fn on_notification(
        &mut self,
        channel: Channel,
        bytes: Vec<u8>,
    ) -> Result<usize, DecodeError> {
        let frame = RawFrame {
            channel,
            sequence: self.next_sequence,
            bytes,
        };
        self.next_sequence += 1;

        match decode_frame(&frame) {
            Ok(batch) => {
                let count = batch.len();
                self.fallbacks += batch.fallbacks as u64;
                self.log.append(batch);
                Ok(count)
            }
            Err(e) => {
                self.decode_errors += 1;
                warn!(
                    "Dropping {} frame #{} ({} bytes): {}",
                    channel,
                    frame.sequence,
                    frame.bytes.len(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Run one cycle: close the current log entry, then build a view of every
    /// channel that has data.
    ///
    /// # Returns
    /// None when nothing arrived since the previous cycle.
    pub fn tick(&mut self) -> Option<Vec<ChannelSnapshot>> {
        let entry = self.log.flush_entry()?;
        debug!(
            "Logged entry at {}: {} temperature, {} humidity, {} pressure, {} microphone samples",
            format_datetime(&entry.timestamp()),
            entry.sample_count(Channel::Temperature),
            entry.sample_count(Channel::Humidity),
            entry.sample_count(Channel::Pressure),
            entry.sample_count(Channel::Microphone)
        );

        let snapshots: Vec<ChannelSnapshot> = Channel::ALL
            .iter()
            .filter(|&&channel| !self.log.flatten(channel).is_empty())
            .map(|&channel| windowed_view(&self.log, channel, &self.config))
            .collect();

        for snapshot in &snapshots {
            self.report_new_onsets(snapshot);
        }

        Some(snapshots)
    }

    /// Log onsets that earlier cycles have not reported yet.
    fn report_new_onsets(&mut self, snapshot: &ChannelSnapshot) {
        let reported = &mut self.reported_until[snapshot.channel.index()];
        for position in snapshot.absolute_detections() {
            if position >= *reported {
                info!(
                    "Inhalation onset on {} at sample {}",
                    snapshot.channel, position
                );
                *reported = position + 1;
            }
        }
    }

    /// Write the whole log to a CSV file in `dir`. The log is kept either way.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let flags = self
            .config
            .export_flags
            .then(|| self.config.detector(Channel::Pressure));
        export_csv(&self.log, dir, flags)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            entries: self.log.entries().len(),
            samples: Channel::ALL.map(|channel| self.log.flatten(channel).len()),
            frames: self.next_sequence,
            decode_errors: self.decode_errors,
            fallbacks: self.fallbacks,
        }
    }
}
