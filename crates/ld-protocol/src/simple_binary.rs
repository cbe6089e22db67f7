//! `55 AA` simple binary reports (LD6001A and LD6001B)
//!
//! Frame format: `55 AA LEN TYPE [PAYLOAD...] CS`
//!
//! - `LEN` is the total frame length including header and checksum
//! - `CS` is the XOR of every byte from `LEN` up to, not including, `CS`
//!
//! The payload layout differs between the two revisions, see [`SimpleLayout`].

use crate::checksum::xor8;
use crate::error::ParseError;
use crate::frame::{
    DoorWindow, Frame, Heartbeat, InvalidFrame, InvalidReason, PresenceTarget, SimpleRadarReport,
    DOOR_WINDOWS,
};
use crate::parser::{FrameMatcher, MatchResult};
use crate::{read_u16, read_u32, Dialect};

/// Frame header
pub const HEADER: [u8; 2] = [0x55, 0xAA];

/// Smallest length that still leaves room for a checksum
const MIN_FRAME_LEN: usize = 4;

/// LD6001B frame type carrying a target list
pub const TYPE_TARGET_LIST: u8 = 0x01;

/// Offset of the head count in an LD6001A report
const PEOPLE_COUNT_OFFSET: usize = 8;

const PRESENCE_RECORDS_OFFSET: usize = 6;
const PRESENCE_RECORD_LEN: usize = 5;

const DOOR_WINDOWS_OFFSET: usize = 17;
const DOOR_WINDOW_LEN: usize = 4;

/// Payload layout of a `55 AA` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleLayout {
    /// LD6001A: head count at offset 8
    PeopleCount,
    /// LD6001B: target list when `TYPE == 0x01`, heartbeat otherwise
    TargetList,
}

/// Append the length byte and checksum to a `55 AA` frame
pub fn encode_frame(frame_type: u8, payload: &[u8]) -> Vec<u8> {
    let total = HEADER.len() + 2 + payload.len() + 1;
    let mut frame = Vec::with_capacity(total);
    frame.extend_from_slice(&HEADER);
    frame.push(total as u8);
    frame.push(frame_type);
    frame.extend_from_slice(payload);
    frame.push(xor8(&frame[2..]));
    frame
}

/// Matcher for `55 AA` frames
#[derive(Debug, Clone, Copy)]
pub struct SimpleBinaryMatcher {
    layout: SimpleLayout,
}

impl SimpleBinaryMatcher {
    pub fn new(layout: SimpleLayout) -> Self {
        Self { layout }
    }

    fn decode(&self, frame: &[u8]) -> Frame {
        // Payload ends where the checksum begins
        let end = frame.len() - 1;

        match self.layout {
            SimpleLayout::PeopleCount => {
                if end <= PEOPLE_COUNT_OFFSET {
                    return Self::truncated();
                }
                Frame::SimpleRadar(SimpleRadarReport::PeopleCount(frame[PEOPLE_COUNT_OFFSET]))
            }
            SimpleLayout::TargetList if frame[3] == TYPE_TARGET_LIST => {
                if end <= 4 {
                    return Self::truncated();
                }
                let count = frame[4] as usize;
                let needed = PRESENCE_RECORDS_OFFSET + count * PRESENCE_RECORD_LEN;
                if needed > end {
                    return Self::truncated();
                }

                let targets = frame[PRESENCE_RECORDS_OFFSET..needed]
                    .chunks_exact(PRESENCE_RECORD_LEN)
                    .enumerate()
                    .map(|(index, record)| PresenceTarget {
                        id: index as u32,
                        x: record[0] as f32,
                        y: record[1] as f32,
                        z: record[2] as f32,
                        breath: record[3] as f32,
                        heartbeat: record[4] as f32,
                    })
                    .collect();

                Frame::SimpleRadar(SimpleRadarReport::Presence(targets))
            }
            SimpleLayout::TargetList => {
                if end < DOOR_WINDOWS_OFFSET + DOOR_WINDOWS * DOOR_WINDOW_LEN {
                    return Self::truncated();
                }

                let mut door_windows = [DoorWindow::default(); DOOR_WINDOWS];
                for (i, window) in door_windows.iter_mut().enumerate() {
                    let offset = DOOR_WINDOWS_OFFSET + i * DOOR_WINDOW_LEN;
                    *window = DoorWindow {
                        x1: frame[offset],
                        y1: frame[offset + 1],
                        x2: frame[offset + 2],
                        y2: frame[offset + 3],
                    };
                }

                // scan_interval overlaps interferes at offset 6, as the module lays it out
                Frame::Heartbeat(Heartbeat {
                    method: read_u16(frame, 4),
                    interferes: frame[6],
                    scan_interval: read_u32(frame, 6),
                    monitor_interval: read_u16(frame, 10),
                    heartbeat_interval: read_u16(frame, 12),
                    range: read_u16(frame, 14),
                    sensitivity: frame[16],
                    door_windows,
                })
            }
        }
    }

    fn truncated() -> Frame {
        Frame::Invalid(InvalidFrame {
            dialect: Dialect::SimpleBinary,
            reason: InvalidReason::Truncated,
        })
    }
}

impl FrameMatcher for SimpleBinaryMatcher {
    fn dialect(&self) -> Dialect {
        Dialect::SimpleBinary
    }

    fn try_match(&self, buffer: &[u8]) -> MatchResult {
        let head = buffer.len().min(HEADER.len());
        if buffer[..head] != HEADER[..head] {
            return MatchResult::Invalid(ParseError::HeaderMismatch);
        }
        if buffer.len() < 3 {
            return MatchResult::Partial;
        }

        let total = buffer[2] as usize;
        if total < MIN_FRAME_LEN {
            return MatchResult::Invalid(ParseError::InvalidLength(total));
        }
        if buffer.len() < total {
            return MatchResult::Partial;
        }

        let expected = xor8(&buffer[2..total - 1]);
        let actual = buffer[total - 1];
        if expected != actual {
            return MatchResult::Invalid(ParseError::ChecksumMismatch { expected, actual });
        }

        MatchResult::Complete {
            consumed: total,
            frame: self.decode(&buffer[..total]),
        }
    }
}
