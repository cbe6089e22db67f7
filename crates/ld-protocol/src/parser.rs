//! Streaming frame parser driving a list of per-dialect matchers
//!
//! The parser owns a byte accumulator. After every appended byte it runs each
//! matcher against the accumulator contents:
//!
//! - the first matcher that reports a complete frame wins, its bytes are
//!   drained and the frame is dispatched to the handler, then the pass repeats
//! - otherwise, if any matcher reports a partial frame, the parser waits for
//!   more input without discarding anything
//! - otherwise every matcher rejected the head byte, so exactly one byte is
//!   dropped and the pass repeats
//!
//! Because [`FrameParser::push_bytes`] is a loop over [`FrameParser::push`],
//! the decoded frame sequence does not depend on how the input was chunked.

use crate::error::ParseError;
use crate::frame::{Frame, FrameHandler};
use crate::{Dialect, Variant};

/// Hard cap on pending bytes; exceeding it clears the accumulator
pub const ACCUMULATOR_CAPACITY: usize = 1024;

/// Outcome of running one matcher against the accumulator
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// The bytes at the head cannot start a frame of this dialect
    Invalid(ParseError),
    /// The head looks like this dialect but more bytes are needed
    Partial,
    /// A whole frame occupies the first `consumed` bytes
    Complete { consumed: usize, frame: Frame },
}

/// One wire dialect's recognizer
///
/// Matchers are stateless with respect to the stream. They inspect the
/// accumulator and report what they found; draining consumed bytes is the
/// parser's job.
pub trait FrameMatcher: Send + Sync {
    /// Dialect this matcher recognizes
    fn dialect(&self) -> Dialect;

    /// Inspect the accumulator from its first byte
    fn try_match(&self, buffer: &[u8]) -> MatchResult;
}

/// Counters for the parser's recovered errors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParserStats {
    /// Frames dispatched to the handler, including invalid frames
    pub frames: u64,
    /// Frames dispatched as [`Frame::Invalid`]
    pub invalid_frames: u64,
    /// Bytes discarded one at a time during resynchronization
    pub bytes_dropped: u64,
    /// Times the accumulator exceeded [`ACCUMULATOR_CAPACITY`] and was cleared
    pub overflows: u64,
}

/// Incremental decoder for one radar link
pub struct FrameParser {
    buffer: Vec<u8>,
    matchers: Vec<Box<dyn FrameMatcher>>,
    stats: ParserStats,
}

impl FrameParser {
    /// Create a parser running the matcher list for `variant`
    pub fn new(variant: Variant) -> Self {
        Self::with_matchers(variant.matchers())
    }

    /// Create a parser with an explicit matcher list, tried in order
    pub fn with_matchers(matchers: Vec<Box<dyn FrameMatcher>>) -> Self {
        Self {
            buffer: Vec::with_capacity(ACCUMULATOR_CAPACITY),
            matchers,
            stats: ParserStats::default(),
        }
    }

    /// Append one byte and decode whatever it completes
    pub fn push<H: FrameHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) {
        self.buffer.push(byte);
        self.process(handler);

        if self.buffer.len() > ACCUMULATOR_CAPACITY {
            tracing::warn!(
                "Accumulator exceeded {} bytes without a frame, clearing",
                ACCUMULATOR_CAPACITY
            );
            self.buffer.clear();
            self.stats.overflows += 1;
        }
    }

    /// Append a chunk of bytes, equivalent to pushing them one at a time
    pub fn push_bytes<H: FrameHandler + ?Sized>(&mut self, data: &[u8], handler: &mut H) {
        for &byte in data {
            self.push(byte, handler);
        }
    }

    /// Discard all pending bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of pending bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no bytes are pending
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Pending bytes, oldest first
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    fn process<H: FrameHandler + ?Sized>(&mut self, handler: &mut H) {
        while !self.buffer.is_empty() {
            let mut partial = false;
            let mut completed = None;
            let mut rejection = None;

            for matcher in &self.matchers {
                match matcher.try_match(&self.buffer) {
                    MatchResult::Complete { consumed, frame } => {
                        completed = Some((matcher.dialect(), consumed, frame));
                        break;
                    }
                    MatchResult::Partial => partial = true,
                    MatchResult::Invalid(ParseError::HeaderMismatch) => {}
                    MatchResult::Invalid(err) => {
                        if rejection.is_none() {
                            rejection = Some((matcher.dialect(), err));
                        }
                    }
                }
            }

            if let Some((dialect, consumed, frame)) = completed {
                let consumed = consumed.clamp(1, self.buffer.len());
                self.buffer.drain(..consumed);
                self.stats.frames += 1;
                if matches!(frame, Frame::Invalid(_)) {
                    self.stats.invalid_frames += 1;
                }
                tracing::debug!("Decoded {} frame ({:?}, {} bytes)", frame.kind(), dialect, consumed);
                frame.dispatch(handler);
                continue;
            }

            if partial {
                break;
            }

            let dropped = self.buffer.remove(0);
            self.stats.bytes_dropped += 1;
            match rejection {
                Some((dialect, err @ ParseError::ChecksumMismatch { .. })) => {
                    tracing::warn!("Rejected {:?} frame: {}", dialect, err);
                }
                Some((dialect, err)) => {
                    tracing::trace!("Dropping 0x{:02X}, {:?} rejected: {}", dropped, dialect, err);
                }
                None => tracing::trace!("Dropping 0x{:02X}", dropped),
            }
        }
    }
}

impl std::fmt::Debug for FrameParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameParser")
            .field("pending", &self.buffer.len())
            .field(
                "dialects",
                &self.matchers.iter().map(|m| m.dialect()).collect::<Vec<_>>(),
            )
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{SimpleRadarReport, StatusReport};

    const STATUS_FRAME: [u8; 14] = [
        0x4D, 0x11, 0x08, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00, 0x01, 0x00, 0x00, 113, 0x4A,
    ];

    const PEOPLE_FRAME: [u8; 10] = [0x55, 0xAA, 0x0A, 0x04, 0x00, 0x00, 0x00, 0x00, 0x02, 0x0C];

    fn decode(variant: Variant, bytes: &[u8]) -> (Vec<Frame>, FrameParser) {
        let mut parser = FrameParser::new(variant);
        let mut frames = Vec::new();
        parser.push_bytes(bytes, &mut frames);
        (frames, parser)
    }

    #[test]
    fn test_status_frame_example() {
        let (frames, parser) = decode(Variant::Ld6001, &STATUS_FRAME);

        assert_eq!(
            frames,
            vec![Frame::Status(StatusReport {
                sw_minor: 1,
                sw_major: 2,
                hw_minor: 3,
                hw_major: 4,
                initialized: false,
            })]
        );
        assert!(parser.is_empty());
        assert_eq!(parser.stats().frames, 1);
    }

    #[test]
    fn test_leading_noise_is_dropped_one_byte_at_a_time() {
        let mut bytes = vec![0x00, 0x13, 0x37];
        bytes.extend_from_slice(&STATUS_FRAME);
        let (frames, parser) = decode(Variant::Ld6001, &bytes);

        assert_eq!(frames.len(), 1);
        assert_eq!(parser.stats().bytes_dropped, 3);
    }

    #[test]
    fn test_partial_frame_is_retained() {
        let (frames, parser) = decode(Variant::Ld6001, &STATUS_FRAME[..9]);

        assert!(frames.is_empty());
        assert_eq!(parser.len(), 9);
        assert_eq!(parser.stats().bytes_dropped, 0);
    }

    #[test]
    fn test_two_frames_in_one_push() {
        let mut bytes = PEOPLE_FRAME.to_vec();
        bytes.extend_from_slice(b"AT+OK\r\n");
        let (frames, parser) = decode(Variant::Ld6001a, &bytes);

        assert_eq!(
            frames,
            vec![
                Frame::SimpleRadar(SimpleRadarReport::PeopleCount(2)),
                Frame::Ack("OK".into()),
            ]
        );
        assert!(parser.is_empty());
    }

    #[test]
    fn test_corrupt_checksum_then_good_frame() {
        let mut corrupt = STATUS_FRAME;
        corrupt[12] ^= 0xFF;
        let mut bytes = corrupt.to_vec();
        bytes.extend_from_slice(&STATUS_FRAME);
        let (frames, parser) = decode(Variant::Ld6001, &bytes);

        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], Frame::Status(_)));
        assert!(parser.is_empty());
    }

    #[test]
    fn test_stray_brace_does_not_hold_frames() {
        let mut bytes = vec![b'{'];
        for _ in 0..20 {
            bytes.extend_from_slice(b"AT+OK\r\n");
            bytes.extend_from_slice(&PEOPLE_FRAME);
        }
        let (frames, parser) = decode(Variant::Ld6001a, &bytes);

        assert_eq!(frames.len(), 40);
        assert_eq!(frames[0], Frame::Ack("OK".into()));
        assert_eq!(frames[1], Frame::SimpleRadar(SimpleRadarReport::PeopleCount(2)));
        assert!(parser.is_empty());
        assert_eq!(parser.stats().bytes_dropped, 1);
        assert_eq!(parser.stats().overflows, 0);
    }

    #[test]
    fn test_unterminated_block_is_abandoned() {
        let mut bytes = vec![b'{'];
        bytes.extend(std::iter::repeat(b'x').take(crate::param_block::MAX_BLOCK_LEN));
        let (frames, parser) = decode(Variant::Ld6001b, &bytes);

        assert!(frames.is_empty());
        assert!(parser.is_empty());
        assert_eq!(parser.stats().overflows, 0);
        assert_eq!(parser.stats().bytes_dropped, bytes.len() as u64);
    }

    struct NeverComplete;

    impl FrameMatcher for NeverComplete {
        fn dialect(&self) -> Dialect {
            Dialect::ParamBlock
        }

        fn try_match(&self, _buffer: &[u8]) -> MatchResult {
            MatchResult::Partial
        }
    }

    #[test]
    fn test_overflow_clears_accumulator() {
        let mut parser = FrameParser::with_matchers(vec![Box::new(NeverComplete)]);
        let mut frames: Vec<Frame> = Vec::new();
        parser.push_bytes(&[0x42; ACCUMULATOR_CAPACITY], &mut frames);
        assert_eq!(parser.len(), ACCUMULATOR_CAPACITY);

        parser.push(0x42, &mut frames);
        assert!(frames.is_empty());
        assert!(parser.is_empty());
        assert_eq!(parser.stats().overflows, 1);
    }

    #[test]
    fn test_clear() {
        let (_, mut parser) = decode(Variant::Ld6001, &STATUS_FRAME[..5]);
        assert_eq!(parser.pending(), &STATUS_FRAME[..5]);
        parser.clear();
        assert!(parser.is_empty());
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    const STATUS_FRAME: [u8; 14] = [
        0x4D, 0x11, 0x08, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00, 0x01, 0x00, 0x00, 113, 0x4A,
    ];

    fn variant() -> impl Strategy<Value = Variant> {
        prop_oneof![
            Just(Variant::Ld6001),
            Just(Variant::Ld6001a),
            Just(Variant::Ld6001b),
        ]
    }

    proptest! {
        #[test]
        fn accumulator_stays_bounded(
            variant in variant(),
            bytes in proptest::collection::vec(any::<u8>(), 0..4096),
        ) {
            let mut parser = FrameParser::new(variant);
            let mut frames: Vec<Frame> = Vec::new();
            for byte in bytes {
                parser.push(byte, &mut frames);
                prop_assert!(parser.len() <= ACCUMULATOR_CAPACITY);
            }
            prop_assert_eq!(parser.stats().frames, frames.len() as u64);
        }

        #[test]
        fn status_frame_survives_unrelated_noise(
            noise in proptest::collection::vec(
                any::<u8>().prop_filter("not a header", |b| *b != 0x4D),
                0..64,
            ),
        ) {
            let mut bytes = noise.clone();
            bytes.extend_from_slice(&STATUS_FRAME);

            let mut parser = FrameParser::new(Variant::Ld6001);
            let mut frames: Vec<Frame> = Vec::new();
            parser.push_bytes(&bytes, &mut frames);

            prop_assert_eq!(frames.len(), 1);
            prop_assert!(matches!(frames[0], Frame::Status(_)));
            prop_assert_eq!(parser.stats().bytes_dropped, noise.len() as u64);
        }
    }
}
