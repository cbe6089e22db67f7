//! Tagged binary point-cloud reports (LD6001A and LD6001B detailed mode)
//!
//! Frame format:
//!
//! ```text
//! 0        8        12       16                28       32
//! | magic  | LEN    | CSUM   | frame info      | TRKLEN | records... | CS |
//! ```
//!
//! - Magic `01 02 03 04 05 06 07 08`
//! - `LEN` (u32 LE) is the frame length excluding the trailing checksum byte
//! - `CS` is the XOR of bytes `12..16` and of every record byte
//! - `TRKLEN` (u32 LE) is the size of the record area, 32 bytes per person
//!
//! Each record holds a u32 id at offset 4 followed by x, y, z, vx, vy, vz as
//! little-endian f32.

use crate::checksum::xor8_ranges;
use crate::error::ParseError;
use crate::frame::{DetailedTarget, Frame, InvalidFrame, InvalidReason};
use crate::parser::{FrameMatcher, MatchResult, ACCUMULATOR_CAPACITY};
use crate::{read_f32, read_u32, Dialect};

/// Frame magic
pub const MAGIC: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

/// Size of one person record
pub const RECORD_LEN: usize = 32;

/// Offset of the first person record
pub const RECORDS_OFFSET: usize = 32;

const LENGTH_OFFSET: usize = 8;
const CHECKSUM_FIELD: std::ops::Range<usize> = 12..16;
const TRACK_LEN_OFFSET: usize = 28;

/// Serialize targets into a complete tagged frame
///
/// `frame_info` fills bytes `12..28`; its first four bytes take part in the
/// checksum.
pub fn encode_frame(frame_info: [u8; 16], targets: &[DetailedTarget]) -> Vec<u8> {
    let track_len = targets.len() * RECORD_LEN;
    let len = RECORDS_OFFSET + track_len;

    let mut frame = Vec::with_capacity(len + 1);
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&(len as u32).to_le_bytes());
    frame.extend_from_slice(&frame_info);
    frame.extend_from_slice(&(track_len as u32).to_le_bytes());
    for target in targets {
        frame.extend_from_slice(&[0; 4]);
        frame.extend_from_slice(&target.id.to_le_bytes());
        for value in [target.x, target.y, target.z, target.vx, target.vy, target.vz] {
            frame.extend_from_slice(&value.to_le_bytes());
        }
    }
    frame.push(xor8_ranges(&frame[CHECKSUM_FIELD], &frame[RECORDS_OFFSET..]));
    frame
}

/// Matcher for magic-prefixed detailed frames
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedBinaryMatcher;

impl TaggedBinaryMatcher {
    fn decode(frame: &[u8]) -> Frame {
        let records_end = frame.len() - 1;
        let track_len = read_u32(frame, TRACK_LEN_OFFSET) as usize;
        let people = track_len / RECORD_LEN;

        if RECORDS_OFFSET + people * RECORD_LEN > records_end {
            return Frame::Invalid(InvalidFrame {
                dialect: Dialect::TaggedBinary,
                reason: InvalidReason::Truncated,
            });
        }

        let targets = (0..people)
            .map(|i| {
                let offset = RECORDS_OFFSET + i * RECORD_LEN;
                DetailedTarget {
                    id: read_u32(frame, offset + 4),
                    x: read_f32(frame, offset + 8),
                    y: read_f32(frame, offset + 12),
                    z: read_f32(frame, offset + 16),
                    vx: read_f32(frame, offset + 20),
                    vy: read_f32(frame, offset + 24),
                    vz: read_f32(frame, offset + 28),
                }
            })
            .collect();

        Frame::DetailedRadar(targets)
    }
}

impl FrameMatcher for TaggedBinaryMatcher {
    fn dialect(&self) -> Dialect {
        Dialect::TaggedBinary
    }

    fn try_match(&self, buffer: &[u8]) -> MatchResult {
        let head = buffer.len().min(MAGIC.len());
        if buffer[..head] != MAGIC[..head] {
            return MatchResult::Invalid(ParseError::HeaderMismatch);
        }
        if buffer.len() < LENGTH_OFFSET + 4 {
            return MatchResult::Partial;
        }

        let total = read_u32(buffer, LENGTH_OFFSET) as usize + 1;
        if !(RECORDS_OFFSET + 1..=ACCUMULATOR_CAPACITY).contains(&total) {
            return MatchResult::Invalid(ParseError::InvalidLength(total));
        }
        if buffer.len() < total {
            return MatchResult::Partial;
        }

        let expected = xor8_ranges(&buffer[CHECKSUM_FIELD], &buffer[RECORDS_OFFSET..total - 1]);
        let actual = buffer[total - 1];
        if expected != actual {
            return MatchResult::Invalid(ParseError::ChecksumMismatch { expected, actual });
        }

        MatchResult::Complete {
            consumed: total,
            frame: Self::decode(&buffer[..total]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_INFO: [u8; 16] = [
        0xA3, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00,
        0x00,
    ];

    fn sample_target(id: u32) -> DetailedTarget {
        DetailedTarget {
            id,
            x: f32::from_le_bytes([0x21, 0x28, 0x96, 0xBF]),
            y: f32::from_le_bytes([0xCB, 0x85, 0x20, 0x40]),
            z: f32::from_le_bytes([0x9A, 0xAB, 0xA3, 0x3E]),
            vx: f32::from_le_bytes([0x8A, 0xBD, 0xC1, 0x3D]),
            vy: f32::from_le_bytes([0x50, 0x98, 0x99, 0xBD]),
            vz: f32::from_le_bytes([0x40, 0x52, 0xC3, 0x3A]),
        }
    }

    #[test]
    fn test_two_person_frame() {
        let bytes = encode_frame(FRAME_INFO, &[sample_target(0), sample_target(1)]);
        assert_eq!(bytes.len(), 97);
        assert_eq!(read_u32(&bytes, LENGTH_OFFSET), 96);
        assert_eq!(read_u32(&bytes, TRACK_LEN_OFFSET), 0x40);
        assert_eq!(bytes[96], 0xA3);

        match TaggedBinaryMatcher.try_match(&bytes) {
            MatchResult::Complete { consumed, frame } => {
                assert_eq!(consumed, 97);
                match frame {
                    Frame::DetailedRadar(targets) => {
                        assert_eq!(targets.len(), 2);
                        assert_eq!(targets[1].id, 1);
                        assert!((targets[0].x - -1.1731).abs() < 1e-3);
                        assert!((targets[0].y - 2.5082).abs() < 1e-3);
                    }
                    other => panic!("Expected detailed radar, got {:?}", other),
                }
            }
            other => panic!("Expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn test_checksum_covers_records() {
        let mut bytes = encode_frame(FRAME_INFO, &[sample_target(0)]);
        bytes[RECORDS_OFFSET + 4] ^= 0x01;
        assert!(matches!(
            TaggedBinaryMatcher.try_match(&bytes),
            MatchResult::Invalid(ParseError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_checksum_ignores_frame_info_tail() {
        let mut bytes = encode_frame(FRAME_INFO, &[sample_target(7)]);
        bytes[20] = 0xFF;
        assert!(matches!(
            TaggedBinaryMatcher.try_match(&bytes),
            MatchResult::Complete { .. }
        ));
    }

    #[test]
    fn test_no_people() {
        let bytes = encode_frame(FRAME_INFO, &[]);
        assert_eq!(bytes.len(), RECORDS_OFFSET + 1);
        assert_eq!(
            TaggedBinaryMatcher.try_match(&bytes),
            MatchResult::Complete {
                consumed: RECORDS_OFFSET + 1,
                frame: Frame::DetailedRadar(vec![]),
            }
        );
    }

    #[test]
    fn test_partial_and_length_limits() {
        let bytes = encode_frame(FRAME_INFO, &[sample_target(0)]);
        assert_eq!(TaggedBinaryMatcher.try_match(&bytes[..3]), MatchResult::Partial);
        assert_eq!(TaggedBinaryMatcher.try_match(&bytes[..40]), MatchResult::Partial);
        assert_eq!(
            TaggedBinaryMatcher.try_match(&[0x01, 0x03]),
            MatchResult::Invalid(ParseError::HeaderMismatch)
        );

        let mut oversized = MAGIC.to_vec();
        oversized.extend_from_slice(&4096u32.to_le_bytes());
        assert_eq!(
            TaggedBinaryMatcher.try_match(&oversized),
            MatchResult::Invalid(ParseError::InvalidLength(4097))
        );

        let mut undersized = MAGIC.to_vec();
        undersized.extend_from_slice(&4u32.to_le_bytes());
        assert_eq!(
            TaggedBinaryMatcher.try_match(&undersized),
            MatchResult::Invalid(ParseError::InvalidLength(5))
        );
    }

    #[test]
    fn test_track_len_beyond_frame_is_truncated() {
        let mut bytes = encode_frame(FRAME_INFO, &[sample_target(0)]);
        // Claim two records while only one is present
        bytes[TRACK_LEN_OFFSET] = 0x40;
        assert!(matches!(
            TaggedBinaryMatcher.try_match(&bytes),
            MatchResult::Complete {
                frame: Frame::Invalid(InvalidFrame {
                    reason: InvalidReason::Truncated,
                    ..
                }),
                ..
            }
        ));
    }
}
