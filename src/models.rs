use std::fmt;

/// One decoded sensor value. The unit is implied by the channel it came from.
pub type Sample = f32;

/// Sensor streams exposed by the device, one notify characteristic each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Temperature,
    Humidity,
    Pressure,
    Microphone,
}

impl Channel {
    pub const COUNT: usize = 4;

    /// Column order used by the log and the export.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Temperature,
        Channel::Humidity,
        Channel::Pressure,
        Channel::Microphone,
    ];

    pub fn index(self) -> usize {
        match self {
            Channel::Temperature => 0,
            Channel::Humidity => 1,
            Channel::Pressure => 2,
            Channel::Microphone => 3,
        }
    }

    /// Export column header
    pub fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature (°C)",
            Channel::Humidity => "Humidity (%)",
            Channel::Pressure => "Pressure",
            Channel::Microphone => "Microphone",
        }
    }

    /// Lowercase key used in configuration variables and log lines
    pub fn key(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Pressure => "pressure",
            Channel::Microphone => "microphone",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw notification payload for a single channel, as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub channel: Channel,
    /// Arrival order, assigned by the receiver (not wall-clock time).
    pub sequence: u64,
    pub bytes: Vec<u8>,
}

/// Samples decoded from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    pub channel: Channel,
    pub sequence: u64,
    pub samples: Vec<Sample>,
    /// Groups that were not finite as float32 and were read as raw counts.
    pub fallbacks: usize,
}

impl SampleBatch {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Real-time-clock record exchanged with the device at session start.
///
/// `millisecond_tick` is `floor(ms / 256)`, not a millisecond value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcRecord {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Sunday = 0, Monday = 1 .. Saturday = 6
    pub day_of_week: u8,
    pub millisecond_tick: u8,
    pub adjust_reason: u8,
}

impl fmt::Display for RtcRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.millisecond_tick
        )
    }
}

/// A notification handed over by the transport task.
#[derive(Debug, Clone)]
pub struct Notification {
    pub channel: Channel,
    pub bytes: Vec<u8>,
}
