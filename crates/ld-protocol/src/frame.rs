//! Decoded frame types and the handler surface the parser calls into

use crate::Dialect;

/// Maximum number of targets an LD6001 radar frame can carry
pub const MAX_TARGETS: usize = 10;

/// Number of door/window rectangles in an LD6001B heartbeat
pub const DOOR_WINDOWS: usize = 6;

/// Firmware and hardware version report (LD6001 type `0x11`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusReport {
    pub sw_minor: u8,
    pub sw_major: u8,
    pub hw_minor: u8,
    pub hw_major: u8,
    /// Module reports that initialization has completed
    pub initialized: bool,
}

impl StatusReport {
    /// Format as `HW vX.YY / SW vX.YY`
    pub fn version_string(&self) -> String {
        format!(
            "HW v{}.{:02} / SW v{}.{:02}",
            self.hw_major, self.hw_minor, self.sw_major, self.sw_minor
        )
    }
}

/// One LD6001 target in polar-ish form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngularTarget {
    pub id: u8,
    /// Wire value times ten
    pub distance: u16,
    pub pitch_angle: u8,
    pub horizontal_angle: u8,
    /// Signed wire value times ten
    pub x: i16,
    /// Signed wire value times ten
    pub y: i16,
}

/// One LD6001B target from the `55 AA` target list
///
/// The module does not assign identities in this dialect, so `id` is the
/// record index within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresenceTarget {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub breath: f32,
    pub heartbeat: f32,
}

/// One tracked point from the tagged binary dialect
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetailedTarget {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
}

/// Minimal radar report, shape depends on the dialect
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimpleRadarReport {
    /// LD6001A simple mode only reports a head count
    PeopleCount(u8),
    /// LD6001 radar response
    Angular {
        fault_status: u8,
        targets: Vec<AngularTarget>,
    },
    /// LD6001B target list
    Presence(Vec<PresenceTarget>),
}

impl SimpleRadarReport {
    /// Number of people the module reported
    pub fn people_count(&self) -> usize {
        match self {
            SimpleRadarReport::PeopleCount(n) => *n as usize,
            SimpleRadarReport::Angular { targets, .. } => targets.len(),
            SimpleRadarReport::Presence(targets) => targets.len(),
        }
    }
}

/// Door or window rectangle configured on an LD6001B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorWindow {
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
}

/// Periodic configuration report from an LD6001B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Heartbeat {
    /// Installation method
    pub method: u16,
    pub interferes: u8,
    pub scan_interval: u32,
    pub monitor_interval: u16,
    pub heartbeat_interval: u16,
    pub range: u16,
    pub sensitivity: u8,
    pub door_windows: [DoorWindow; DOOR_WINDOWS],
}

/// Configuration snapshot returned by `AT+READ`
///
/// The two text dialects report different key sets, so every field is
/// optional and stays `None` when the module did not send it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamSnapshot {
    pub software_version: Option<String>,
    pub range_res: Option<f32>,
    pub vel_res: Option<f32>,
    pub time: Option<i64>,
    pub prog: Option<i64>,
    pub range: Option<i64>,
    pub sensitivity: Option<i64>,
    pub heartbeat_interval: Option<i64>,
    pub protocol_mode: Option<i64>,
    pub detection_height: Option<i64>,
    pub x_min: Option<i64>,
    pub x_max: Option<i64>,
    pub y_min: Option<i64>,
    pub y_max: Option<i64>,
    /// Seconds
    pub moving_target_disappearance: Option<f32>,
    /// Seconds
    pub static_target_disappearance: Option<f32>,
    /// Seconds
    pub target_exit: Option<f32>,
    pub monitor_time: Option<f32>,
}

/// Why a well-delimited frame could not be turned into a typed frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvalidReason {
    /// Checksum passed but the message type is not one we decode
    UnknownType(u8),
    /// Checksum passed but the body is shorter than its own header claims
    Truncated,
}

/// Diagnostic frame: consumed from the stream but carries no data
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InvalidFrame {
    pub dialect: Dialect,
    pub reason: InvalidReason,
}

/// A fully decoded protocol message
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Frame {
    Status(StatusReport),
    SimpleRadar(SimpleRadarReport),
    DetailedRadar(Vec<DetailedTarget>),
    Params(ParamSnapshot),
    Heartbeat(Heartbeat),
    /// Text acknowledgement, payload is whatever followed `AT+`
    Ack(String),
    /// `Save Para Fail`
    SaveFailed,
    Invalid(InvalidFrame),
}

impl Frame {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Status(_) => "status",
            Frame::SimpleRadar(_) => "simple-radar",
            Frame::DetailedRadar(_) => "detailed-radar",
            Frame::Params(_) => "params",
            Frame::Heartbeat(_) => "heartbeat",
            Frame::Ack(_) => "ack",
            Frame::SaveFailed => "save-failed",
            Frame::Invalid(_) => "invalid",
        }
    }

    /// Invoke the handler method for this frame kind
    pub fn dispatch<H: FrameHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            Frame::Status(status) => handler.on_status(status),
            Frame::SimpleRadar(report) => handler.on_simple_radar(report),
            Frame::DetailedRadar(targets) => handler.on_detailed_radar(targets),
            Frame::Params(params) => handler.on_params(params),
            Frame::Heartbeat(heartbeat) => handler.on_heartbeat(heartbeat),
            Frame::Ack(payload) => handler.on_ack(payload),
            Frame::SaveFailed => handler.on_save_failed(),
            Frame::Invalid(invalid) => handler.on_invalid(invalid),
        }
    }
}

/// Receives decoded frames from [`crate::FrameParser`]
///
/// Every method has a no-op default so implementors only override the frame
/// kinds they care about. Calls happen synchronously from inside `push`.
pub trait FrameHandler {
    fn on_status(&mut self, _status: &StatusReport) {}
    fn on_simple_radar(&mut self, _report: &SimpleRadarReport) {}
    fn on_detailed_radar(&mut self, _targets: &[DetailedTarget]) {}
    fn on_params(&mut self, _params: &ParamSnapshot) {}
    fn on_heartbeat(&mut self, _heartbeat: &Heartbeat) {}
    fn on_ack(&mut self, _payload: &str) {}
    fn on_save_failed(&mut self) {}
    fn on_invalid(&mut self, _frame: &InvalidFrame) {}
}

/// Collects every frame in arrival order
impl FrameHandler for Vec<Frame> {
    fn on_status(&mut self, status: &StatusReport) {
        self.push(Frame::Status(*status));
    }

    fn on_simple_radar(&mut self, report: &SimpleRadarReport) {
        self.push(Frame::SimpleRadar(report.clone()));
    }

    fn on_detailed_radar(&mut self, targets: &[DetailedTarget]) {
        self.push(Frame::DetailedRadar(targets.to_vec()));
    }

    fn on_params(&mut self, params: &ParamSnapshot) {
        self.push(Frame::Params(params.clone()));
    }

    fn on_heartbeat(&mut self, heartbeat: &Heartbeat) {
        self.push(Frame::Heartbeat(*heartbeat));
    }

    fn on_ack(&mut self, payload: &str) {
        self.push(Frame::Ack(payload.to_string()));
    }

    fn on_save_failed(&mut self) {
        self.push(Frame::SaveFailed);
    }

    fn on_invalid(&mut self, frame: &InvalidFrame) {
        self.push(Frame::Invalid(frame.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        let status = StatusReport {
            sw_minor: 1,
            sw_major: 2,
            hw_minor: 3,
            hw_major: 4,
            initialized: true,
        };
        assert_eq!(status.version_string(), "HW v4.03 / SW v2.01");
    }

    #[test]
    fn test_dispatch_into_vec_preserves_frame() {
        let frames = vec![
            Frame::Ack("OK".into()),
            Frame::SimpleRadar(SimpleRadarReport::PeopleCount(3)),
            Frame::SaveFailed,
        ];

        let mut collected: Vec<Frame> = Vec::new();
        for frame in &frames {
            frame.dispatch(&mut collected);
        }

        assert_eq!(collected, frames);
    }
}
