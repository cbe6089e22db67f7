//! LD6001 fixed binary protocol
//!
//! Frame format: `4D TYPE LEN 00 [BODY...] CS 4A`
//!
//! - Header byte `0x4D` (responses) or `0x44` (requests)
//! - `LEN` counts the body bytes between the 4-byte header and the checksum
//! - `CS` is the 8-bit wrapping sum of every byte before it
//! - Terminator `0x4A` (responses) or `0x4B` (requests)
//!
//! The host polls the module: a version request (`0x11`) yields a status
//! response and a radar request (`0x62`) yields the current target list.

use crate::checksum::sum8;
use crate::error::ParseError;
use crate::frame::{
    AngularTarget, Frame, InvalidFrame, InvalidReason, SimpleRadarReport, StatusReport, MAX_TARGETS,
};
use crate::parser::{FrameMatcher, MatchResult};
use crate::Dialect;

/// Response header byte
pub const RESPONSE_HEADER: u8 = 0x4D;
/// Response terminator byte
pub const RESPONSE_TERMINATOR: u8 = 0x4A;
/// Request header byte
pub const REQUEST_HEADER: u8 = 0x44;
/// Request terminator byte
pub const REQUEST_TERMINATOR: u8 = 0x4B;

/// Version query / status report
pub const TYPE_STATUS: u8 = 0x11;
/// Radar query / target report
pub const TYPE_RADAR: u8 = 0x62;

/// Header, type, length and reserved byte
pub const HEADER_LEN: usize = 4;
/// Bytes outside the body: header plus checksum and terminator
pub const FRAME_OVERHEAD: usize = HEADER_LEN + 2;

/// Offset of the first target record in a radar response
const TARGETS_OFFSET: usize = 12;
/// Size of one target record
const TARGET_RECORD_LEN: usize = 8;

/// Build a complete frame around `body`
pub fn encode_frame(header: u8, frame_type: u8, body: &[u8], terminator: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + body.len());
    frame.push(header);
    frame.push(frame_type);
    frame.push(body.len() as u8);
    frame.push(0x00);
    frame.extend_from_slice(body);
    frame.push(sum8(&frame));
    frame.push(terminator);
    frame
}

/// Matcher for `4D ... 4A` response frames
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedBinaryMatcher;

impl FixedBinaryMatcher {
    fn decode(frame: &[u8]) -> Frame {
        // Last byte of body content, checksum and terminator excluded
        let body_end = frame.len() - 2;

        match frame[1] {
            TYPE_STATUS if body_end >= 10 => Frame::Status(StatusReport {
                sw_minor: frame[4],
                sw_major: frame[5],
                hw_minor: frame[6],
                hw_major: frame[7],
                initialized: frame[9] == 0,
            }),
            TYPE_RADAR if body_end >= TARGETS_OFFSET => {
                let fault_status = frame[4];
                let count = frame[5] as usize;
                let needed = TARGETS_OFFSET + count * TARGET_RECORD_LEN;
                if count > MAX_TARGETS || needed > body_end {
                    return Self::invalid(InvalidReason::Truncated);
                }

                let targets = frame[TARGETS_OFFSET..needed]
                    .chunks_exact(TARGET_RECORD_LEN)
                    .map(|record| AngularTarget {
                        id: record[0],
                        distance: record[1] as u16 * 10,
                        pitch_angle: record[2],
                        horizontal_angle: record[3],
                        x: (record[6] as i8) as i16 * 10,
                        y: (record[7] as i8) as i16 * 10,
                    })
                    .collect();

                Frame::SimpleRadar(SimpleRadarReport::Angular {
                    fault_status,
                    targets,
                })
            }
            TYPE_STATUS | TYPE_RADAR => Self::invalid(InvalidReason::Truncated),
            other => Self::invalid(InvalidReason::UnknownType(other)),
        }
    }

    fn invalid(reason: InvalidReason) -> Frame {
        Frame::Invalid(InvalidFrame {
            dialect: Dialect::FixedBinary,
            reason,
        })
    }
}

impl FrameMatcher for FixedBinaryMatcher {
    fn dialect(&self) -> Dialect {
        Dialect::FixedBinary
    }

    fn try_match(&self, buffer: &[u8]) -> MatchResult {
        if buffer[0] != RESPONSE_HEADER {
            return MatchResult::Invalid(ParseError::HeaderMismatch);
        }
        if buffer.len() < 3 {
            return MatchResult::Partial;
        }

        let total = FRAME_OVERHEAD + buffer[2] as usize;
        if buffer.len() < total {
            return MatchResult::Partial;
        }

        let expected = sum8(&buffer[..total - 2]);
        let actual = buffer[total - 2];
        if expected != actual {
            return MatchResult::Invalid(ParseError::ChecksumMismatch { expected, actual });
        }
        if buffer[total - 1] != RESPONSE_TERMINATOR {
            return MatchResult::Invalid(ParseError::BadTerminator {
                expected: RESPONSE_TERMINATOR,
                actual: buffer[total - 1],
            });
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

    fn radar_frame(targets: &[[u8; 8]]) -> Vec<u8> {
        let mut body = vec![0x00, targets.len() as u8, 0, 0, 0, 0, 0, 0];
        for target in targets {
            body.extend_from_slice(target);
        }
        encode_frame(RESPONSE_HEADER, TYPE_RADAR, &body, RESPONSE_TERMINATOR)
    }

    #[test]
    fn test_encode_frame_matches_status_example() {
        let frame = encode_frame(
            RESPONSE_HEADER,
            TYPE_STATUS,
            &[0x01, 0x02, 0x03, 0x04, 0x00, 0x01, 0x00, 0x00],
            RESPONSE_TERMINATOR,
        );
        assert_eq!(
            frame,
            vec![0x4D, 0x11, 0x08, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00, 0x01, 0x00, 0x00, 113, 0x4A]
        );
    }

    #[test]
    fn test_decode_radar_targets() {
        let frame = radar_frame(&[[0x01, 255, 120, 90, 0, 0, (-100i8) as u8, (-110i8) as u8]]);
        assert_eq!(frame.len(), 22);

        match FixedBinaryMatcher.try_match(&frame) {
            MatchResult::Complete { consumed, frame } => {
                assert_eq!(consumed, 22);
                assert_eq!(
                    frame,
                    Frame::SimpleRadar(SimpleRadarReport::Angular {
                        fault_status: 0,
                        targets: vec![AngularTarget {
                            id: 1,
                            distance: 2550,
                            pitch_angle: 120,
                            horizontal_angle: 90,
                            x: -1000,
                            y: -1100,
                        }],
                    })
                );
            }
            other => panic!("Expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_radar_report() {
        let frame = radar_frame(&[]);
        assert!(matches!(
            FixedBinaryMatcher.try_match(&frame),
            MatchResult::Complete {
                frame: Frame::SimpleRadar(SimpleRadarReport::Angular { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_count_beyond_body_is_truncated() {
        let mut body = vec![0x00, 0x03, 0, 0, 0, 0, 0, 0];
        body.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let frame = encode_frame(RESPONSE_HEADER, TYPE_RADAR, &body, RESPONSE_TERMINATOR);

        match FixedBinaryMatcher.try_match(&frame) {
            MatchResult::Complete { frame, .. } => assert_eq!(
                frame,
                Frame::Invalid(InvalidFrame {
                    dialect: Dialect::FixedBinary,
                    reason: InvalidReason::Truncated,
                })
            ),
            other => panic!("Expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_consumed() {
        let frame = encode_frame(RESPONSE_HEADER, 0x33, &[1, 2], RESPONSE_TERMINATOR);
        assert!(matches!(
            FixedBinaryMatcher.try_match(&frame),
            MatchResult::Complete {
                consumed: 8,
                frame: Frame::Invalid(InvalidFrame {
                    reason: InvalidReason::UnknownType(0x33),
                    ..
                }),
            }
        ));
    }

    #[test]
    fn test_partial_and_rejections() {
        let frame = radar_frame(&[]);
        assert_eq!(FixedBinaryMatcher.try_match(&frame[..1]), MatchResult::Partial);
        assert_eq!(FixedBinaryMatcher.try_match(&frame[..10]), MatchResult::Partial);
        assert_eq!(
            FixedBinaryMatcher.try_match(&[0x55]),
            MatchResult::Invalid(ParseError::HeaderMismatch)
        );

        let mut bad_terminator = frame.clone();
        *bad_terminator.last_mut().unwrap() = 0x00;
        assert!(matches!(
            FixedBinaryMatcher.try_match(&bad_terminator),
            MatchResult::Invalid(ParseError::BadTerminator { .. })
        ));

        let mut bad_checksum = frame;
        let cs = bad_checksum.len() - 2;
        bad_checksum[cs] = bad_checksum[cs].wrapping_add(1);
        assert!(matches!(
            FixedBinaryMatcher.try_match(&bad_checksum),
            MatchResult::Invalid(ParseError::ChecksumMismatch { .. })
        ));
    }
}
