//! LD6001 Protocol Library
//!
//! This crate decodes the serial output of HLK-LD6001 family millimeter-wave
//! radar modules and encodes the commands they accept. Three hardware
//! revisions speak overlapping but incompatible dialects:
//!
//! - **Fixed binary** (LD6001): `4D` header, length byte, sum checksum, `4A` terminator
//! - **Simple binary** (LD6001A/B): `55 AA` header, total length byte, XOR checksum
//! - **Tagged binary** (LD6001A/B): 8-byte magic, 32-bit length, dual-range XOR checksum
//! - **Text ack** (LD6001A/B): `AT+...\r\n` lines echoed after each command
//! - **Parameter block** (LD6001A/B): JSON-like text returned by `AT+READ`
//!
//! # Architecture
//!
//! Each dialect is a [`FrameMatcher`] strategy. A [`FrameParser`] runs the
//! matcher list for a [`Variant`] against its accumulator after every byte and
//! calls into a [`FrameHandler`] for each decoded [`Frame`].
//!
//! # Example
//!
//! ```rust
//! use ld_protocol::{Frame, FrameParser, StatusReport, Variant};
//!
//! let mut parser = FrameParser::new(Variant::Ld6001);
//! let mut frames: Vec<Frame> = Vec::new();
//! parser.push_bytes(
//!     &[0x4D, 0x11, 0x08, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00, 112, 0x4A],
//!     &mut frames,
//! );
//!
//! assert!(matches!(
//!     frames[0],
//!     Frame::Status(StatusReport { sw_major: 2, sw_minor: 1, initialized: true, .. })
//! ));
//! ```

pub mod checksum;
pub mod command;
pub mod error;
pub mod fixed_binary;
pub mod frame;
pub mod param_block;
pub mod parser;
pub mod simple_binary;
pub mod tagged_binary;
pub mod text;

use std::str::FromStr;

pub use command::{AtCommand, BinaryRequest, ProtocolMode, RadarPrecision};
pub use error::{ParseError, ProtocolError};
pub use frame::{
    AngularTarget, DetailedTarget, DoorWindow, Frame, FrameHandler, Heartbeat, InvalidFrame,
    InvalidReason, ParamSnapshot, PresenceTarget, SimpleRadarReport, StatusReport, DOOR_WINDOWS,
    MAX_TARGETS,
};
pub use parser::{FrameMatcher, FrameParser, MatchResult, ParserStats, ACCUMULATOR_CAPACITY};

/// Identifies one wire dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dialect {
    /// `4D ... cs 4A` frames from the original LD6001
    FixedBinary,
    /// `55 AA` frames with an XOR checksum
    SimpleBinary,
    /// Frames behind the `01 02 03 04 05 06 07 08` magic
    TaggedBinary,
    /// `AT+...\r\n` acknowledgement lines
    TextAck,
    /// `Save Para Fail\r\n`
    SaveFailed,
    /// JSON-like `{...}` configuration dump
    ParamBlock,
}

/// Hardware revision of the radar module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Variant {
    /// Binary request/response protocol, polled by the host
    #[default]
    Ld6001,
    /// AT command set, reports a head count in simple mode
    Ld6001a,
    /// AT command set, reports a target list with vital signs
    Ld6001b,
}

impl Variant {
    /// Returns a human-readable name for the variant
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Ld6001 => "HLK-LD6001",
            Variant::Ld6001a => "HLK-LD6001A",
            Variant::Ld6001b => "HLK-LD6001B",
        }
    }

    /// Whether the module is configured with `AT+` text commands
    pub fn uses_at_commands(&self) -> bool {
        !matches!(self, Variant::Ld6001)
    }

    /// Matchers this variant's output can contain, in priority order
    pub fn matchers(&self) -> Vec<Box<dyn FrameMatcher>> {
        use param_block::{ParamBlockMatcher, ParamDialect};
        use simple_binary::{SimpleBinaryMatcher, SimpleLayout};

        fn boxed<M: FrameMatcher + 'static>(matcher: M) -> Box<dyn FrameMatcher> {
            Box::new(matcher)
        }

        match self {
            Variant::Ld6001 => vec![boxed(fixed_binary::FixedBinaryMatcher)],
            Variant::Ld6001a => vec![
                boxed(text::TextAckMatcher),
                boxed(text::SaveFailedMatcher),
                boxed(SimpleBinaryMatcher::new(SimpleLayout::PeopleCount)),
                boxed(tagged_binary::TaggedBinaryMatcher),
                boxed(ParamBlockMatcher::new(ParamDialect::Ld6001a)),
            ],
            Variant::Ld6001b => vec![
                boxed(text::TextAckMatcher),
                boxed(text::SaveFailedMatcher),
                boxed(SimpleBinaryMatcher::new(SimpleLayout::TargetList)),
                boxed(tagged_binary::TaggedBinaryMatcher),
                boxed(ParamBlockMatcher::new(ParamDialect::Ld6001b)),
            ],
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.trim_start_matches("hlk-") {
            "ld6001" => Ok(Variant::Ld6001),
            "ld6001a" => Ok(Variant::Ld6001a),
            "ld6001b" => Ok(Variant::Ld6001b),
            _ => Err(ProtocolError::UnknownVariant(s.to_string())),
        }
    }
}

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}

/// Read a little-endian u16 at `offset`
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Read a little-endian u32 at `offset`
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Read a little-endian IEEE-754 f32 at `offset`
pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(bytes, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_from_str() {
        assert_eq!("ld6001".parse::<Variant>().unwrap(), Variant::Ld6001);
        assert_eq!("HLK-LD6001A".parse::<Variant>().unwrap(), Variant::Ld6001a);
        assert_eq!(" ld6001b ".parse::<Variant>().unwrap(), Variant::Ld6001b);
        assert!(matches!(
            "ld2410".parse::<Variant>(),
            Err(ProtocolError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_matcher_lists() {
        let dialects: Vec<Dialect> = Variant::Ld6001b.matchers().iter().map(|m| m.dialect()).collect();
        assert_eq!(
            dialects,
            vec![
                Dialect::TextAck,
                Dialect::SaveFailed,
                Dialect::SimpleBinary,
                Dialect::TaggedBinary,
                Dialect::ParamBlock,
            ]
        );
        assert_eq!(Variant::Ld6001.matchers().len(), 1);
    }

    #[test]
    fn test_le_readers() {
        let bytes = [0x34, 0x12, 0x00, 0x00, 0x80, 0x3F];
        assert_eq!(read_u16(&bytes, 0), 0x1234);
        assert_eq!(read_u32(&bytes, 0), 0x1234);
        assert_eq!(read_f32(&bytes, 2), 1.0);
    }
}
