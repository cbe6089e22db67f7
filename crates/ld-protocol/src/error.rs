//! Error types for radar frame decoding

use thiserror::Error;

/// Reasons a frame matcher rejects the bytes at the head of the accumulator
///
/// None of these are fatal. The parser logs the rejection and resynchronizes
/// by dropping a single byte.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Header bytes do not belong to this dialect
    #[error("header mismatch")]
    HeaderMismatch,

    /// Declared frame length is impossible for this dialect
    #[error("invalid frame length: {0}")]
    InvalidLength(usize),

    /// Checksum mismatch
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Terminator byte is not where the length field said it would be
    #[error("bad terminator: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadTerminator { expected: u8, actual: u8 },

    /// Line did not end in CR LF
    #[error("line not terminated by CR LF")]
    BadLineEnding,

    /// Parameter block could not be repaired into a JSON object
    #[error("malformed text block: {0}")]
    MalformedText(String),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Variant name not recognised
    #[error("unknown variant: {0}")]
    UnknownVariant(String),
}
