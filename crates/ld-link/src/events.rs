//! Unified event stream for a radar session
//!
//! Decoded frames, target lifecycle transitions and command outcomes are all
//! reported through [`RadarEvent`] so observers see them in the order the
//! session produced them.

use ld_protocol::Frame;
use serde::Serialize;

/// Everything a [`crate::RadarSession`] reports
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RadarEvent {
    /// A frame was decoded from the byte stream
    Frame { frame: Frame },

    /// A target id appeared
    TargetEntered { id: u32 },

    /// A target id is no longer reported
    TargetLeft {
        id: u32,
        /// Time since the target entered (ms)
        dwell_ms: u64,
    },

    /// The in-flight command was acknowledged
    CommandAcked {
        /// Command text, without the trailing newline
        command: String,
        /// Ack payload
        reply: String,
    },

    /// The in-flight command was abandoned after the ack timeout
    CommandTimedOut { command: String },

    /// The transport closed or failed
    Disconnected { reason: String },
}

impl RadarEvent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            RadarEvent::Frame { .. } => "frame",
            RadarEvent::TargetEntered { .. } => "target_entered",
            RadarEvent::TargetLeft { .. } => "target_left",
            RadarEvent::CommandAcked { .. } => "command_acked",
            RadarEvent::CommandTimedOut { .. } => "command_timed_out",
            RadarEvent::Disconnected { .. } => "disconnected",
        }
    }
}
