/// Append-only, per-channel store of decoded sample batches
use time::OffsetDateTime;

use crate::models::{Channel, Sample, SampleBatch};

/// Batches grouped into one flush cycle.
///
/// Every channel has a slot; a channel that was silent during the cycle has an
/// empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    timestamp: OffsetDateTime,
    batches: [Vec<SampleBatch>; Channel::COUNT],
}

impl LogEntry {
    fn new(timestamp: OffsetDateTime) -> Self {
        LogEntry {
            timestamp,
            batches: Default::default(),
        }
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Batches received for `channel` during this cycle, in arrival order.
    pub fn batches(&self, channel: Channel) -> &[SampleBatch] {
        &self.batches[channel.index()]
    }

    /// All samples received for `channel` during this cycle.
    pub fn samples(&self, channel: Channel) -> Vec<Sample> {
        self.batches(channel)
            .iter()
            .flat_map(|batch| batch.samples.iter().copied())
            .collect()
    }

    pub fn sample_count(&self, channel: Channel) -> usize {
        self.batches(channel).iter().map(SampleBatch::len).sum()
    }

    /// Length of the longest channel in this entry.
    pub fn max_len(&self) -> usize {
        Channel::ALL
            .iter()
            .map(|&channel| self.sample_count(channel))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct SampleLog {
    entries: Vec<LogEntry>,
    /// Entry being filled during the current flush cycle.
    pending: Option<LogEntry>,
    /// Per-channel concatenation of every appended batch.
    flattened: [Vec<Sample>; Channel::COUNT],
}

impl SampleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch, stamping the cycle with the current wall-clock time if
    /// this is its first arrival.
    pub fn append(&mut self, batch: SampleBatch) {
        self.append_at(batch, OffsetDateTime::now_utc());
    }

    /// Same as [`append`](Self::append) with an explicit clock reading.
    /// `now` is ignored when the cycle already has a timestamp.
    pub fn append_at(&mut self, batch: SampleBatch, now: OffsetDateTime) {
        let channel = batch.channel;
        self.flattened[channel.index()].extend_from_slice(&batch.samples);
        let entry = self.pending.get_or_insert_with(|| LogEntry::new(now));
        entry.batches[channel.index()].push(batch);
    }

    /// Close the current flush cycle.
    ///
    /// # Returns
    /// The recorded entry, or None when nothing arrived during the cycle.
    pub fn flush_entry(&mut self) -> Option<&LogEntry> {
        let entry = self.pending.take()?;
        self.entries.push(entry);
        self.entries.last()
    }

    /// Every sample ever appended for `channel`, in arrival order, including
    /// the cycle that has not been flushed yet.
    pub fn flatten(&self, channel: Channel) -> &[Sample] {
        &self.flattened[channel.index()]
    }

    /// Flushed entries in append order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.pending.is_none()
    }

    /// Drop everything. Only used between sessions.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
        for samples in self.flattened.iter_mut() {
            samples.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn batch(channel: Channel, sequence: u64, samples: &[Sample]) -> SampleBatch {
        SampleBatch {
            channel,
            sequence,
            samples: samples.to_vec(),
            fallbacks: 0,
        }
    }

    #[test]
    fn silent_channel_gets_an_empty_batch() {
        let mut log = SampleLog::new();
        log.append(batch(Channel::Temperature, 0, &[21.0, 21.1]));
        log.append(batch(Channel::Pressure, 1, &[1013.0]));

        let entry = log.flush_entry().unwrap().clone();

        assert_eq!(log.entries().len(), 1);
        assert_eq!(entry.samples(Channel::Temperature), vec![21.0, 21.1]);
        assert_eq!(entry.samples(Channel::Pressure), vec![1013.0]);
        assert!(entry.batches(Channel::Humidity).is_empty());
        assert!(entry.samples(Channel::Humidity).is_empty());
        assert_eq!(entry.max_len(), 2);
    }

    #[test]
    fn empty_cycle_records_nothing() {
        let mut log = SampleLog::new();
        assert!(log.flush_entry().is_none());

        log.append(batch(Channel::Humidity, 0, &[40.0]));
        assert!(log.flush_entry().is_some());
        assert!(log.flush_entry().is_none());

        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn first_append_of_a_cycle_stamps_the_entry() {
        let first = datetime!(2025-03-01 10:00:00 UTC);
        let later = datetime!(2025-03-01 10:00:00.150 UTC);
        let mut log = SampleLog::new();

        log.append_at(batch(Channel::Temperature, 0, &[1.0]), first);
        log.append_at(batch(Channel::Pressure, 1, &[2.0]), later);
        log.flush_entry();
        log.append_at(batch(Channel::Pressure, 2, &[3.0]), later);
        log.flush_entry();

        assert_eq!(log.entries()[0].timestamp(), first);
        assert_eq!(log.entries()[1].timestamp(), later);
    }

    #[test]
    fn flatten_concatenates_batches_across_entries() {
        let mut log = SampleLog::new();
        log.append(batch(Channel::Pressure, 0, &[1.0, 2.0]));
        log.append(batch(Channel::Pressure, 1, &[3.0]));
        log.flush_entry();
        log.append(batch(Channel::Pressure, 2, &[4.0, 5.0]));

        assert_eq!(log.flatten(Channel::Pressure), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(log.flatten(Channel::Microphone).is_empty());
        assert_eq!(log.entries()[0].batches(Channel::Pressure).len(), 2);
    }

    #[test]
    fn clear_resets_everything() {
        let mut log = SampleLog::new();
        log.append(batch(Channel::Pressure, 0, &[1.0]));
        log.flush_entry();
        log.append(batch(Channel::Pressure, 1, &[2.0]));

        log.clear();

        assert!(log.is_empty());
        assert!(log.entries().is_empty());
        assert!(log.flatten(Channel::Pressure).is_empty());
        assert!(log.flush_entry().is_none());
    }
}
