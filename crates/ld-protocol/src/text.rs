//! Line-oriented text replies from the AT command set
//!
//! The module answers each `AT+...` command with a line echoing the
//! `AT+` prefix followed by a result, e.g. `AT+OK\r\n` or `AT+RANGE=300\r\n`.
//! A failed parameter save is reported with a fixed `Save Para Fail` line.

use crate::error::ParseError;
use crate::frame::Frame;
use crate::parser::{FrameMatcher, MatchResult};
use crate::Dialect;

/// Prefix shared by every acknowledgement line
pub const ACK_PREFIX: &[u8] = b"AT+";

/// Reply to a parameter save that the module rejected
pub const SAVE_FAILED: &[u8] = b"Save Para Fail\r\n";

/// Longest acknowledgement line accepted before giving up on a CR
pub const MAX_LINE_LEN: usize = 128;

/// Compare the buffer against a fixed prefix, allowing a short buffer
fn prefix_state(buffer: &[u8], prefix: &[u8]) -> Option<bool> {
    let head = buffer.len().min(prefix.len());
    if buffer[..head] != prefix[..head] {
        None
    } else {
        Some(buffer.len() >= prefix.len())
    }
}

/// Matcher for `AT+<payload>\r\n`
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAckMatcher;

impl FrameMatcher for TextAckMatcher {
    fn dialect(&self) -> Dialect {
        Dialect::TextAck
    }

    fn try_match(&self, buffer: &[u8]) -> MatchResult {
        match prefix_state(buffer, ACK_PREFIX) {
            None => return MatchResult::Invalid(ParseError::HeaderMismatch),
            Some(false) => return MatchResult::Partial,
            Some(true) => {}
        }

        let Some(cr) = buffer.iter().skip(ACK_PREFIX.len()).position(|&b| b == b'\r') else {
            if buffer.len() > MAX_LINE_LEN {
                return MatchResult::Invalid(ParseError::InvalidLength(buffer.len()));
            }
            return MatchResult::Partial;
        };
        let cr = cr + ACK_PREFIX.len();

        match buffer.get(cr + 1) {
            None => MatchResult::Partial,
            Some(b'\n') => MatchResult::Complete {
                consumed: cr + 2,
                frame: Frame::Ack(String::from_utf8_lossy(&buffer[ACK_PREFIX.len()..cr]).into_owned()),
            },
            Some(_) => MatchResult::Invalid(ParseError::BadLineEnding),
        }
    }
}

/// Matcher for the fixed `Save Para Fail\r\n` line
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveFailedMatcher;

impl FrameMatcher for SaveFailedMatcher {
    fn dialect(&self) -> Dialect {
        Dialect::SaveFailed
    }

    fn try_match(&self, buffer: &[u8]) -> MatchResult {
        match prefix_state(buffer, SAVE_FAILED) {
            None => MatchResult::Invalid(ParseError::HeaderMismatch),
            Some(false) => MatchResult::Partial,
            Some(true) => MatchResult::Complete {
                consumed: SAVE_FAILED.len(),
                frame: Frame::SaveFailed,
            },
        }
    }
}
