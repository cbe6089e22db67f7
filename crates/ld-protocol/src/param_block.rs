//! Configuration dump returned by `AT+READ`
//!
//! The module prints something that looks like JSON but is not: lines end in
//! `09 0A`, some keys are unquoted, values carry an `s` unit suffix and the
//! key/value separator is a GBK full-width colon (`A3 BA`). The matcher waits
//! for a per-revision completion marker, repairs the text with a fixed list of
//! substitutions and hands the result to `serde_json`.

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::frame::{Frame, ParamSnapshot};
use crate::parser::{FrameMatcher, MatchResult};
use crate::Dialect;

/// Longest dump either revision prints, with headroom for extra fields
pub const MAX_BLOCK_LEN: usize = 512;

/// Which revision's dump format to expect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDialect {
    /// Ends after `Target exit`, with `}` or a bare `s,`
    Ld6001a,
    /// Ends with `}` after `Monitor_Time`
    Ld6001b,
}

impl ParamDialect {
    fn marker(&self) -> &'static [u8] {
        match self {
            ParamDialect::Ld6001a => b"Target exit",
            ParamDialect::Ld6001b => b"Monitor_Time",
        }
    }

    fn end_tokens(&self) -> &'static [&'static [u8]] {
        // Older LD6001A firmware never prints the closing brace
        const LD6001A: [&[u8]; 2] = [b"}", b"s,"];
        const LD6001B: [&[u8]; 1] = [b"}"];

        match self {
            ParamDialect::Ld6001a => &LD6001A,
            ParamDialect::Ld6001b => &LD6001B,
        }
    }

    fn repairs(&self) -> &'static [(&'static [u8], &'static [u8])] {
        const COMMON: [(&[u8], &[u8]); 2] = [(b"\x09\x0a", b"\r\n"), (b"\xa3\xba", b" ")];
        const LD6001A: [(&[u8], &[u8]); 7] = [
            COMMON[0],
            COMMON[1],
            (b"\nMoving target", b"\n\"Moving target\":"),
            (b"\nStatic target", b"\n\"Static target\":"),
            (b"\nTarget exit", b"\n\"Target exit\":"),
            (b"NOP_1.07-01", b"\"NOP_1.07-01\""),
            (b"s,", b","),
        ];

        match self {
            ParamDialect::Ld6001a => &LD6001A,
            ParamDialect::Ld6001b => &COMMON,
        }
    }
}

/// Dumps are text with `09 0A` line ends; any other control byte means the
/// `{` was not the start of one
fn is_dump_byte(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n') || !byte.is_ascii_control()
}

/// Find the first occurrence of `needle` at or after `from`
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Replace every non-overlapping occurrence of `from`, scanning left to right
fn replace_all(bytes: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while let Some(found) = find(bytes, from, pos) {
        out.extend_from_slice(&bytes[pos..found]);
        out.extend_from_slice(to);
        pos = found + from.len();
    }
    out.extend_from_slice(&bytes[pos..]);
    out
}

/// Turn the raw block (without its end token) into parseable JSON text
pub fn repair(dialect: ParamDialect, raw: &[u8]) -> String {
    let mut bytes = raw.to_vec();
    for (from, to) in dialect.repairs() {
        bytes = replace_all(&bytes, from, to);
    }
    bytes.push(b'}');
    if dialect == ParamDialect::Ld6001a {
        bytes = replace_all(&bytes, b",\r\n}", b"\r\n}");
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key))
}

fn int(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    first(obj, keys).and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
}

fn float(obj: &Map<String, Value>, keys: &[&str]) -> Option<f32> {
    first(obj, keys).and_then(Value::as_f64).map(|f| f as f32)
}

/// Parse repaired text into a snapshot
pub fn decode(text: &str) -> Result<ParamSnapshot, ParseError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseError::MalformedText(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(ParseError::MalformedText("not a JSON object".to_string()));
    };

    Ok(ParamSnapshot {
        software_version: first(
            &obj,
            &["SoftwareVersion", "PeopleCntSoftVerison", "SoftVerison"],
        )
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        range_res: float(&obj, &["RangeRes"]),
        vel_res: float(&obj, &["VelRes"]),
        time: int(&obj, &["TIME", "Time"]),
        prog: int(&obj, &["PROG", "Prog"]),
        range: int(&obj, &["Range"]),
        sensitivity: int(&obj, &["Sen"]),
        heartbeat_interval: int(&obj, &["Heart_Time"]),
        protocol_mode: int(&obj, &["Debug"]),
        detection_height: int(&obj, &["detectionHeight"]),
        x_min: int(&obj, &["XboundaryN"]),
        x_max: int(&obj, &["XboundaryP"]),
        y_min: int(&obj, &["YboundaryN"]),
        y_max: int(&obj, &["YboundaryP"]),
        moving_target_disappearance: float(&obj, &["Moving target"]),
        static_target_disappearance: float(&obj, &["Static target"]),
        target_exit: float(&obj, &["Target exit"]),
        monitor_time: float(&obj, &["Monitor_Time"]),
    })
}

/// Matcher for `{ ... }` parameter dumps
#[derive(Debug, Clone, Copy)]
pub struct ParamBlockMatcher {
    dialect: ParamDialect,
}

impl ParamBlockMatcher {
    pub fn new(dialect: ParamDialect) -> Self {
        Self { dialect }
    }

    fn partial(buffer: &[u8]) -> MatchResult {
        if buffer.len() >= MAX_BLOCK_LEN {
            MatchResult::Invalid(ParseError::InvalidLength(buffer.len()))
        } else {
            MatchResult::Partial
        }
    }
}

impl FrameMatcher for ParamBlockMatcher {
    fn dialect(&self) -> Dialect {
        Dialect::ParamBlock
    }

    fn try_match(&self, buffer: &[u8]) -> MatchResult {
        if buffer[0] != b'{' {
            return MatchResult::Invalid(ParseError::HeaderMismatch);
        }

        if let Some(byte) = buffer.iter().copied().find(|b| !is_dump_byte(*b)) {
            return MatchResult::Invalid(ParseError::MalformedText(format!(
                "unexpected byte 0x{:02X} in parameter block",
                byte
            )));
        }

        let Some(marker) = find(buffer, self.dialect.marker(), 0) else {
            if buffer.contains(&b'}') {
                return MatchResult::Invalid(ParseError::MalformedText(
                    "block closed before its last field".to_string(),
                ));
            }
            return Self::partial(buffer);
        };

        // Earliest end token wins so the result does not depend on chunking
        let end = self
            .dialect
            .end_tokens()
            .iter()
            .filter_map(|token| find(buffer, token, marker).map(|pos| (pos, token.len())))
            .min_by_key(|(pos, _)| *pos);
        let Some((end, token_len)) = end else {
            return Self::partial(buffer);
        };

        let text = repair(self.dialect, &buffer[..end]);
        tracing::debug!("Repaired parameter block: {}", text);

        match decode(&text) {
            Ok(params) => MatchResult::Complete {
                consumed: end + token_len,
                frame: Frame::Params(params),
            },
            Err(err) => MatchResult::Invalid(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LD6001A_BLOCK: &[u8] = b"{\x09\x0a\"SoftwareVersion\":NOP_1.07-01,\x09\x0a\"RangeRes\":0.084,\x09\x0a\"Time\":100,\x09\x0a\"Range\":300,\x09\x0a\"Sen\":5,\x09\x0a\"Debug\":3,\x09\x0a\"detectionHeight\":280,\x09\x0a\"XboundaryN\":-300,\x09\x0a\"XboundaryP\":300,\x09\x0aMoving target\xa3\xba5s,\x09\x0aStatic target\xa3\xba10s,\x09\x0aTarget exit\xa3\xba3s,\x09\x0a}";

    const LD6001B_BLOCK: &[u8] = b"{\x09\x0a\"SoftVerison\":\"1.2D\",\x09\x0a\"RangeRes\":0.055664,\x09\x0a\"VelRes\":0.096055,\x09\x0a\"TIME\":100,\x09\x0a\"PROG\":2,\x09\x0a\"Range\":300,\x09\x0a\"BautRate\":115200,\x09\x0a\"Sen\":2,\x09\x0a\"Heart_Time\":60,\x09\x0a\"Monitor_Time\":1\x09\x0a}";

    #[test]
    fn test_replace_all() {
        assert_eq!(replace_all(b"3s,4s,", b"s,", b","), b"3,4,".to_vec());
        assert_eq!(replace_all(b"none", b"s,", b","), b"none".to_vec());
    }

    #[test]
    fn test_ld6001a_block() {
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001a);
        match matcher.try_match(LD6001A_BLOCK) {
            MatchResult::Complete { consumed, frame } => {
                // Ends on the `s,` after Target exit, trailing `\t\n}` is left behind
                assert_eq!(consumed, LD6001A_BLOCK.len() - 3);
                let Frame::Params(params) = frame else {
                    panic!("Expected params frame");
                };
                assert_eq!(params.software_version.as_deref(), Some("NOP_1.07-01"));
                assert_eq!(params.time, Some(100));
                assert_eq!(params.range, Some(300));
                assert_eq!(params.sensitivity, Some(5));
                assert_eq!(params.protocol_mode, Some(3));
                assert_eq!(params.detection_height, Some(280));
                assert_eq!(params.x_min, Some(-300));
                assert_eq!(params.moving_target_disappearance, Some(5.0));
                assert_eq!(params.static_target_disappearance, Some(10.0));
                assert_eq!(params.target_exit, Some(3.0));
                assert_eq!(params.monitor_time, None);
            }
            other => panic!("Expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn test_ld6001a_block_with_brace_before_unit() {
        let block = b"{\x09\x0a\"Range\":250,\x09\x0aTarget exit\xa3\xba2}";
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001a);
        match matcher.try_match(block) {
            MatchResult::Complete { consumed, frame } => {
                assert_eq!(consumed, block.len());
                let Frame::Params(params) = frame else {
                    panic!("Expected params frame");
                };
                assert_eq!(params.range, Some(250));
                assert_eq!(params.target_exit, Some(2.0));
            }
            other => panic!("Expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn test_ld6001b_block() {
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001b);
        match matcher.try_match(LD6001B_BLOCK) {
            MatchResult::Complete { consumed, frame } => {
                assert_eq!(consumed, LD6001B_BLOCK.len());
                let Frame::Params(params) = frame else {
                    panic!("Expected params frame");
                };
                assert_eq!(params.software_version.as_deref(), Some("1.2D"));
                assert_eq!(params.time, Some(100));
                assert_eq!(params.prog, Some(2));
                assert_eq!(params.sensitivity, Some(2));
                assert_eq!(params.heartbeat_interval, Some(60));
                assert_eq!(params.monitor_time, Some(1.0));
                assert!((params.range_res.unwrap_or_default() - 0.055664).abs() < 1e-6);
            }
            other => panic!("Expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_until_marker_and_end() {
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001b);
        let marker = find(LD6001B_BLOCK, b"Monitor_Time", 0).unwrap_or_default();
        assert_eq!(matcher.try_match(&LD6001B_BLOCK[..marker]), MatchResult::Partial);
        assert_eq!(matcher.try_match(&LD6001B_BLOCK[..marker + 14]), MatchResult::Partial);
        assert_eq!(
            matcher.try_match(b"AT+OK"),
            MatchResult::Invalid(ParseError::HeaderMismatch)
        );
    }

    #[test]
    fn test_control_byte_rejects_block() {
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001a);
        assert_eq!(matcher.try_match(b"{\x09\x0a\"Range\""), MatchResult::Partial);
        assert!(matches!(
            matcher.try_match(b"{AT+OK\r"),
            MatchResult::Invalid(ParseError::MalformedText(_))
        ));
        assert!(matches!(
            matcher.try_match(&[b'{', 0x55, 0xAA, 0x0A, 0x04]),
            MatchResult::Invalid(ParseError::MalformedText(_))
        ));
    }

    #[test]
    fn test_brace_before_marker_rejects_block() {
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001b);
        assert!(matches!(
            matcher.try_match(b"{\"Range\":300}"),
            MatchResult::Invalid(ParseError::MalformedText(_))
        ));
    }

    #[test]
    fn test_block_length_is_bounded() {
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001b);
        let mut block = b"{".to_vec();
        block.resize(MAX_BLOCK_LEN - 1, b'x');
        assert_eq!(matcher.try_match(&block), MatchResult::Partial);
        block.push(b'x');
        assert_eq!(
            matcher.try_match(&block),
            MatchResult::Invalid(ParseError::InvalidLength(MAX_BLOCK_LEN))
        );
    }

    #[test]
    fn test_unrepairable_block() {
        let matcher = ParamBlockMatcher::new(ParamDialect::Ld6001b);
        assert!(matches!(
            matcher.try_match(b"{garbage Monitor_Time}"),
            MatchResult::Invalid(ParseError::MalformedText(_))
        ));
    }
}
