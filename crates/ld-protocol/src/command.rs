//! Outbound commands
//!
//! LD6001A and LD6001B are configured with newline-terminated `AT+` text
//! commands. The original LD6001 is polled with binary requests in the fixed
//! binary framing.
//!
//! Numeric arguments have documented ranges per command. Passing a value
//! outside that range is a caller bug and trips a `debug_assert!`; release
//! builds send the value unchanged.

use crate::fixed_binary::{encode_frame, REQUEST_HEADER, REQUEST_TERMINATOR, TYPE_RADAR, TYPE_STATUS};
use crate::{EncodeCommand, Variant};

/// Output mode selected with `AT+DEBUG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtocolMode {
    /// `55 AA` simple binary reports
    #[default]
    Simple,
    /// Human-readable text output
    OutputString,
    /// Vendor debug output
    Debug,
    /// Tagged binary point-cloud reports
    Detailed,
}

impl ProtocolMode {
    /// Value sent with `AT+DEBUG=`
    pub fn code(&self) -> u8 {
        match self {
            ProtocolMode::Simple => 0,
            ProtocolMode::OutputString => 1,
            ProtocolMode::Debug => 2,
            ProtocolMode::Detailed => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ProtocolMode::Simple),
            1 => Some(ProtocolMode::OutputString),
            2 => Some(ProtocolMode::Debug),
            3 => Some(ProtocolMode::Detailed),
            _ => None,
        }
    }
}

/// A text command for LD6001A/LD6001B modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AtCommand {
    /// Dump the configuration as a parameter block
    Read,
    Start,
    Stop,
    Reset,
    /// Restore factory defaults
    Restore,
    /// Detection radius in cm, 100..=500
    Range(u16),
    /// Time before a target at the boundary is dropped, ms, 200..=100000
    ExitBoundaryTime(u32),
    /// Heartbeat report interval in seconds, 10..=999
    HeartbeatInterval(u16),
    /// Mounting height in cm, 50..=500
    InstallationHeight { cm: u16, variant: Variant },
    /// Long-distance sensitivity, 1..=9
    RangeSensitivity(u8),
    /// LD6001B sensitivity, 1..=19
    Sensitivity(u8),
    /// LD6001B scan interval in ms, 100..=10000
    ScanInterval(u16),
    /// LD6001B monitor interval in seconds, 1..=99
    MonitorInterval(u8),
    /// Left detection boundary in cm, -500..=-20
    XMin(i16),
    /// Right detection boundary in cm, 20..=500
    XMax(i16),
    /// Near detection boundary in cm, -500..=-20
    YMin(i16),
    /// Far detection boundary in cm, 20..=500
    YMax(i16),
    ProtocolMode(ProtocolMode),
    /// ms, 500..=100000
    MovingTargetDisappearance(u32),
    /// ms, 500..=100000
    StaticTargetDisappearance(u32),
}

impl AtCommand {
    /// Text of the command line, including `AT+` and the trailing newline
    pub fn to_line(&self) -> String {
        self.check_range();

        let body = match self {
            AtCommand::Read => "READ".to_string(),
            AtCommand::Start => "START".to_string(),
            AtCommand::Stop => "STOP".to_string(),
            AtCommand::Reset => "RESET".to_string(),
            AtCommand::Restore => "RESTORE".to_string(),
            AtCommand::Range(cm) => format!("RANGE={}", cm),
            AtCommand::ExitBoundaryTime(ms) => format!("Exit={}", ms / 100),
            AtCommand::HeartbeatInterval(s) => format!("HEATIME={}", s),
            AtCommand::InstallationHeight {
                cm,
                variant: Variant::Ld6001b,
            } => format!("HEIGHT={}", cm),
            AtCommand::InstallationHeight { cm, .. } => format!("HEIGHTD={}", cm),
            AtCommand::RangeSensitivity(level) => format!("DPKTH={}", level),
            AtCommand::Sensitivity(level) => format!("SENS={}", level),
            AtCommand::ScanInterval(ms) => format!("TIME={}", ms),
            AtCommand::MonitorInterval(s) => format!("MONTIME={}", s),
            AtCommand::XMin(cm) => format!("XNega={}", cm),
            AtCommand::XMax(cm) => format!("XPosi={}", cm),
            AtCommand::YMin(cm) => format!("YNega={}", cm),
            AtCommand::YMax(cm) => format!("YPosi={}", cm),
            AtCommand::ProtocolMode(mode) => format!("DEBUG={}", mode.code()),
            AtCommand::MovingTargetDisappearance(ms) => format!("Moving={}", ms / 100),
            AtCommand::StaticTargetDisappearance(ms) => format!("Static={}", ms / 100),
        };

        format!("AT+{}\n", body)
    }

    fn check_range(&self) {
        match *self {
            AtCommand::Range(cm) => debug_assert!((100..=500).contains(&cm)),
            AtCommand::ExitBoundaryTime(ms) => debug_assert!((200..=100_000).contains(&ms)),
            AtCommand::HeartbeatInterval(s) => debug_assert!((10..=999).contains(&s)),
            AtCommand::InstallationHeight { cm, .. } => debug_assert!((50..=500).contains(&cm)),
            AtCommand::RangeSensitivity(level) => debug_assert!((1..=9).contains(&level)),
            AtCommand::Sensitivity(level) => debug_assert!((1..=19).contains(&level)),
            AtCommand::ScanInterval(ms) => debug_assert!((100..=10_000).contains(&ms)),
            AtCommand::MonitorInterval(s) => debug_assert!((1..=99).contains(&s)),
            AtCommand::XMin(cm) | AtCommand::YMin(cm) => debug_assert!((-500..=-20).contains(&cm)),
            AtCommand::XMax(cm) | AtCommand::YMax(cm) => debug_assert!((20..=500).contains(&cm)),
            AtCommand::MovingTargetDisappearance(ms) | AtCommand::StaticTargetDisappearance(ms) => {
                debug_assert!((500..=100_000).contains(&ms))
            }
            _ => {}
        }
    }

    /// Startup sequence the variant needs before it reports targets
    pub fn startup_sequence(variant: Variant) -> Vec<AtCommand> {
        let mode = match variant {
            Variant::Ld6001b => ProtocolMode::Simple,
            _ => ProtocolMode::Detailed,
        };
        vec![
            AtCommand::Reset,
            AtCommand::ProtocolMode(mode),
            AtCommand::Start,
            AtCommand::Read,
        ]
    }
}

impl std::fmt::Display for AtCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_line().trim_end())
    }
}

impl EncodeCommand for AtCommand {
    fn encode(&self) -> Vec<u8> {
        self.to_line().into_bytes()
    }
}

/// Resolution requested from an LD6001 radar query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadarPrecision {
    #[default]
    Normal,
    Precise,
}

impl RadarPrecision {
    fn code(&self) -> u8 {
        match self {
            RadarPrecision::Normal => 0x10,
            RadarPrecision::Precise => 0x20,
        }
    }
}

/// A binary poll request for the original LD6001
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryRequest {
    /// Answered with a status frame
    Version,
    /// Answered with the current target list
    Radar(RadarPrecision),
}

impl EncodeCommand for BinaryRequest {
    fn encode(&self) -> Vec<u8> {
        match self {
            BinaryRequest::Version => {
                encode_frame(REQUEST_HEADER, TYPE_STATUS, &[], REQUEST_TERMINATOR)
            }
            BinaryRequest::Radar(precision) => {
                let mut body = [0u8; 8];
                body[0] = precision.code();
                encode_frame(REQUEST_HEADER, TYPE_RADAR, &body, REQUEST_TERMINATOR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(AtCommand::Start.to_line(), "AT+START\n");
        assert_eq!(AtCommand::Read.encode(), b"AT+READ\n".to_vec());
        assert_eq!(AtCommand::Restore.to_string(), "AT+RESTORE");
    }

    #[test]
    fn test_numeric_commands() {
        assert_eq!(AtCommand::Range(250).to_line(), "AT+RANGE=250\n");
        assert_eq!(AtCommand::ExitBoundaryTime(3000).to_line(), "AT+Exit=30\n");
        assert_eq!(AtCommand::HeartbeatInterval(60).to_line(), "AT+HEATIME=60\n");
        assert_eq!(AtCommand::XMin(-300).to_line(), "AT+XNega=-300\n");
        assert_eq!(AtCommand::YMax(300).to_line(), "AT+YPosi=300\n");
        assert_eq!(
            AtCommand::MovingTargetDisappearance(5000).to_line(),
            "AT+Moving=50\n"
        );
        assert_eq!(
            AtCommand::ProtocolMode(ProtocolMode::Detailed).to_line(),
            "AT+DEBUG=3\n"
        );
    }

    #[test]
    fn test_height_keyword_depends_on_variant() {
        let a = AtCommand::InstallationHeight {
            cm: 280,
            variant: Variant::Ld6001a,
        };
        let b = AtCommand::InstallationHeight {
            cm: 280,
            variant: Variant::Ld6001b,
        };
        assert_eq!(a.to_line(), "AT+HEIGHTD=280\n");
        assert_eq!(b.to_line(), "AT+HEIGHT=280\n");
    }

    #[test]
    fn test_startup_sequences() {
        assert_eq!(
            AtCommand::startup_sequence(Variant::Ld6001a),
            vec![
                AtCommand::Reset,
                AtCommand::ProtocolMode(ProtocolMode::Detailed),
                AtCommand::Start,
                AtCommand::Read,
            ]
        );
        assert_eq!(
            AtCommand::startup_sequence(Variant::Ld6001b)[1],
            AtCommand::ProtocolMode(ProtocolMode::Simple)
        );
    }

    #[test]
    fn test_binary_requests() {
        assert_eq!(
            BinaryRequest::Version.encode(),
            vec![0x44, 0x11, 0x00, 0x00, 0x55, 0x4B]
        );
        assert_eq!(
            BinaryRequest::Radar(RadarPrecision::Normal).encode(),
            vec![0x44, 0x62, 0x08, 0x00, 0x10, 0, 0, 0, 0, 0, 0, 0, 0xBE, 0x4B]
        );
        let precise = BinaryRequest::Radar(RadarPrecision::Precise).encode();
        assert_eq!(precise[12], 0xCE);
    }

    #[test]
    fn test_protocol_mode_codes() {
        for code in 0..4 {
            assert_eq!(ProtocolMode::from_code(code).map(|m| m.code()), Some(code));
        }
        assert_eq!(ProtocolMode::from_code(9), None);
    }
}
