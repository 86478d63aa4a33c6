/// Current Time characteristic payload (10 bytes, little-endian)
///
/// - Bytes 0-1: Year (u16)
/// - Byte 2: Month
/// - Byte 3: Day
/// - Byte 4: Hour
/// - Byte 5: Minute
/// - Byte 6: Second
/// - Byte 7: Day of week (Sunday = 0)
/// - Byte 8: Milliseconds / 256, truncated
/// - Byte 9: Adjust reason
///
/// Encoding is lossy in the millisecond byte and decoding reads it back
/// literally; the device firmware uses the same convention.
use time::OffsetDateTime;

use crate::error::DecodeError;
use crate::models::RtcRecord;

pub const RECORD_LEN: usize = 10;

/// Adjust reason written by the desktop side.
pub const ADJUST_REASON_NONE: u8 = 0x00;

impl RtcRecord {
    pub fn from_datetime(t: OffsetDateTime) -> Self {
        RtcRecord {
            year: t.year().clamp(0, u16::MAX as i32) as u16,
            month: u8::from(t.month()),
            day: t.day(),
            hour: t.hour(),
            minute: t.minute(),
            second: t.second(),
            day_of_week: t.weekday().number_days_from_sunday(),
            millisecond_tick: (t.millisecond() / 256) as u8,
            adjust_reason: ADJUST_REASON_NONE,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let year = self.year.to_le_bytes();
        [
            year[0],
            year[1],
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.day_of_week,
            self.millisecond_tick,
            self.adjust_reason,
        ]
    }
}

/// Pack an instant into the wire layout.
pub fn encode(t: OffsetDateTime) -> [u8; RECORD_LEN] {
    RtcRecord::from_datetime(t).to_bytes()
}

/// Pack the current local time, falling back to UTC when the local offset
/// cannot be determined.
pub fn encode_now() -> [u8; RECORD_LEN] {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    encode(now)
}

/// Read a clock record back from the wire. No correction is applied to the
/// millisecond tick.
pub fn decode(bytes: &[u8]) -> Result<RtcRecord, DecodeError> {
    if bytes.len() != RECORD_LEN {
        return Err(DecodeError::InvalidLength {
            actual: bytes.len(),
            expected: "exactly 10 bytes",
        });
    }

    Ok(RtcRecord {
        year: u16::from_le_bytes([bytes[0], bytes[1]]),
        month: bytes[2],
        day: bytes[3],
        hour: bytes[4],
        minute: bytes[5],
        second: bytes[6],
        day_of_week: bytes[7],
        millisecond_tick: bytes[8],
        adjust_reason: bytes[9],
    })
}
