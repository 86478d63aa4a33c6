/// Sample stream decoding for the sensor notify characteristics
use log::debug;

use crate::error::DecodeError;
use crate::models::{RawFrame, Sample, SampleBatch};

const GROUP_LEN: usize = 4; // one little-endian 32-bit word per sample

/// How a single 4-byte group was interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupValue {
    /// Finite IEEE-754 float32.
    Float(f32),
    /// Bit pattern is NaN/inf as a float, read as an unsigned count instead.
    RawCount(u32),
}

impl GroupValue {
    pub fn sample(self) -> Sample {
        match self {
            GroupValue::Float(v) => v,
            GroupValue::RawCount(count) => count as Sample,
        }
    }
}

/// Interpret one 4-byte little-endian group.
///
/// Firmware that has not calibrated a channel yet emits raw counts whose bit
/// pattern lands in the float NaN/infinity space, so those groups are read as
/// `u32` instead.
pub fn decode_group(group: [u8; GROUP_LEN]) -> GroupValue {
    let value = f32::from_le_bytes(group);
    if value.is_finite() {
        GroupValue::Float(value)
    } else {
        GroupValue::RawCount(u32::from_le_bytes(group))
    }
}

/// Decode a notification payload into a batch of samples
///
/// Payload layout: a positive number of consecutive 4-byte little-endian
/// groups, each decoded independently (float32, falling back to u32).
///
/// # Returns
/// The batch, or `DecodeError::InvalidLength` when the payload is empty or not
/// a multiple of 4 bytes. Nothing is partially decoded.
pub fn decode(raw: &RawFrame) -> Result<SampleBatch, DecodeError> {
    let len = raw.bytes.len();
    if len == 0 || len % GROUP_LEN != 0 {
        return Err(DecodeError::InvalidLength {
            actual: len,
            expected: "a positive multiple of 4 bytes",
        });
    }

    let mut samples = Vec::with_capacity(len / GROUP_LEN);
    let mut fallbacks = 0;

    for chunk in raw.bytes.chunks_exact(GROUP_LEN) {
        let group = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let value = decode_group(group);
        if let GroupValue::RawCount(count) = value {
            fallbacks += 1;
            debug!(
                "{} frame #{}: non-finite float, using raw count {}",
                raw.channel, raw.sequence, count
            );
        }
        samples.push(value.sample());
    }

    Ok(SampleBatch {
        channel: raw.channel,
        sequence: raw.sequence,
        samples,
        fallbacks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;

    fn frame(bytes: Vec<u8>) -> RawFrame {
        RawFrame {
            channel: Channel::Pressure,
            sequence: 7,
            bytes,
        }
    }

    #[test]
    fn decodes_one_sample_per_group_in_order() {
        let values = [1013.25f32, -4.5, 0.0, 36.6];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

        let batch = decode(&frame(bytes)).unwrap();

        assert_eq!(batch.samples, values.to_vec());
        assert_eq!(batch.channel, Channel::Pressure);
        assert_eq!(batch.sequence, 7);
        assert_eq!(batch.fallbacks, 0);
    }

    #[test]
    fn rejects_lengths_that_are_not_multiples_of_four() {
        for len in [1, 2, 3, 5, 7, 10] {
            let err = decode(&frame(vec![0u8; len])).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidLength { actual, .. } if actual == len));
        }
    }

    #[test]
    fn rejects_empty_frame() {
        assert!(decode(&frame(Vec::new())).is_err());
    }

    #[test]
    fn falls_back_per_group_not_per_frame() {
        let nan_bits = 0x7FC0_0001u32;
        let inf_bits = 0x7F80_0000u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&21.5f32.to_le_bytes());
        bytes.extend_from_slice(&nan_bits.to_le_bytes());
        bytes.extend_from_slice(&inf_bits.to_le_bytes());
        bytes.extend_from_slice(&22.0f32.to_le_bytes());

        let batch = decode(&frame(bytes)).unwrap();

        assert_eq!(batch.samples.len(), 4);
        assert_eq!(batch.samples[0], 21.5);
        assert_eq!(batch.samples[1], nan_bits as f32);
        assert_eq!(batch.samples[2], inf_bits as f32);
        assert_eq!(batch.samples[3], 22.0);
        assert_eq!(batch.fallbacks, 2);
        assert!(batch.samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn group_tags_record_the_interpretation() {
        assert_eq!(decode_group(1.5f32.to_le_bytes()), GroupValue::Float(1.5));
        assert_eq!(
            decode_group(u32::MAX.to_le_bytes()),
            GroupValue::RawCount(u32::MAX)
        );
    }
}
