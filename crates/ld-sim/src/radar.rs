//! Virtual radar simulation
//!
//! Provides a simulated LD6001-family module that answers host commands and
//! produces protocol-accurate reports for whatever targets it is given.

use std::collections::VecDeque;

use ld_protocol::checksum::sum8;
use ld_protocol::fixed_binary::{
    self, FRAME_OVERHEAD, REQUEST_HEADER, REQUEST_TERMINATOR, RESPONSE_HEADER, RESPONSE_TERMINATOR,
    TYPE_RADAR, TYPE_STATUS,
};
use ld_protocol::text::SAVE_FAILED;
use ld_protocol::{simple_binary, tagged_binary, DetailedTarget, ProtocolMode, Variant, MAX_TARGETS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One simulated person, positions in metres and velocities in m/s
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimTarget {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    /// Breaths per minute (LD6001B)
    pub breath: u8,
    /// Beats per minute (LD6001B)
    pub heartbeat: u8,
}

impl SimTarget {
    /// A stationary target at `(x, y)`
    pub fn at(id: u32, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            z: 1.0,
            breath: 16,
            heartbeat: 70,
            ..Default::default()
        }
    }

    fn to_detailed(self) -> DetailedTarget {
        DetailedTarget {
            id: self.id,
            x: self.x,
            y: self.y,
            z: self.z,
            vx: self.vx,
            vy: self.vy,
            vz: self.vz,
        }
    }
}

/// Module settings a host can change with AT commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub range_cm: u16,
    pub sensitivity: u8,
    pub range_sensitivity: u8,
    pub heartbeat_interval_s: u16,
    pub scan_interval_ms: u16,
    pub monitor_interval_s: u8,
    pub installation_height_cm: u16,
    pub x_min_cm: i16,
    pub x_max_cm: i16,
    pub y_min_cm: i16,
    pub y_max_cm: i16,
    pub moving_disappearance_ms: u32,
    pub static_disappearance_ms: u32,
    pub exit_boundary_ms: u32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            range_cm: 300,
            sensitivity: 2,
            range_sensitivity: 5,
            heartbeat_interval_s: 60,
            scan_interval_ms: 100,
            monitor_interval_s: 1,
            installation_height_cm: 280,
            x_min_cm: -300,
            x_max_cm: 300,
            y_min_cm: -300,
            y_max_cm: 300,
            moving_disappearance_ms: 5000,
            static_disappearance_ms: 10000,
            exit_boundary_ms: 3000,
        }
    }
}

/// Configuration for creating a virtual radar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualRadarConfig {
    /// Display name/identifier
    pub id: String,
    /// Hardware revision to imitate
    pub variant: Variant,
    /// Firmware version reported to LD6001 status requests
    pub sw_version: (u8, u8),
    /// Hardware version reported to LD6001 status requests
    pub hw_version: (u8, u8),
    pub settings: SimSettings,
    /// Targets present at start
    pub targets: Vec<SimTarget>,
}

impl Default for VirtualRadarConfig {
    fn default() -> Self {
        Self {
            id: "Virtual Radar".to_string(),
            variant: Variant::Ld6001,
            sw_version: (1, 2),
            hw_version: (1, 0),
            settings: SimSettings::default(),
            targets: Vec::new(),
        }
    }
}

/// A simulated radar module
#[derive(Debug)]
pub struct VirtualRadar {
    id: String,
    variant: Variant,
    sw_version: (u8, u8),
    hw_version: (u8, u8),
    settings: SimSettings,
    mode: ProtocolMode,
    running: bool,
    fail_saves: bool,
    targets: Vec<SimTarget>,
    /// Host bytes not yet forming a complete command
    input: Vec<u8>,
    /// Pending output chunks (protocol-encoded)
    pending_output: VecDeque<Vec<u8>>,
    reports_sent: u64,
}

impl VirtualRadar {
    /// Create a new virtual radar with default settings
    pub fn new(id: impl Into<String>, variant: Variant) -> Self {
        Self::from_config(VirtualRadarConfig {
            id: id.into(),
            variant,
            ..Default::default()
        })
    }

    /// Create a virtual radar from configuration
    pub fn from_config(config: VirtualRadarConfig) -> Self {
        Self {
            id: config.id,
            variant: config.variant,
            sw_version: config.sw_version,
            hw_version: config.hw_version,
            settings: config.settings,
            mode: ProtocolMode::Simple,
            running: false,
            fail_saves: false,
            targets: config.targets,
            input: Vec::new(),
            pending_output: VecDeque::new(),
            reports_sent: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    /// Output mode selected by the host
    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    /// Whether `AT+START` has been received since the last stop or reset
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Answer setting changes with `Save Para Fail` instead of an ack
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    pub fn targets(&self) -> &[SimTarget] {
        &self.targets
    }

    /// Replace the current targets
    pub fn set_targets(&mut self, targets: Vec<SimTarget>) {
        self.targets = targets;
    }

    /// Add a target, replacing any with the same id
    pub fn add_target(&mut self, target: SimTarget) {
        self.targets.retain(|t| t.id != target.id);
        self.targets.push(target);
    }

    pub fn remove_target(&mut self, id: u32) {
        self.targets.retain(|t| t.id != id);
    }

    /// Move every target along its velocity, bouncing off the range limit
    pub fn advance(&mut self, dt_secs: f32) {
        let limit = self.settings.range_cm as f32 / 100.0;
        for target in &mut self.targets {
            target.x += target.vx * dt_secs;
            target.y += target.vy * dt_secs;
            target.z += target.vz * dt_secs;
            if target.x.abs() > limit {
                target.x = target.x.clamp(-limit, limit);
                target.vx = -target.vx;
            }
            if target.y.abs() > limit {
                target.y = target.y.clamp(-limit, limit);
                target.vy = -target.vy;
            }
        }
    }

    /// Process bytes written by the host
    pub fn receive(&mut self, data: &[u8]) {
        self.input.extend_from_slice(data);
        if self.variant.uses_at_commands() {
            self.process_lines();
        } else {
            self.process_requests();
        }
    }

    /// Queue one unsolicited report in the current output mode
    ///
    /// LD6001 modules only answer polls, and AT modules stay quiet until
    /// started, so this does nothing in those cases.
    pub fn emit_report(&mut self) {
        if !self.variant.uses_at_commands() || !self.running {
            return;
        }

        let frame = match (self.variant, self.mode) {
            (_, ProtocolMode::Detailed) => {
                let detailed: Vec<DetailedTarget> = self
                    .targets
                    .iter()
                    .take(MAX_TARGETS)
                    .map(|t| t.to_detailed())
                    .collect();
                let mut frame_info = [0u8; 16];
                frame_info[..8].copy_from_slice(&self.reports_sent.to_le_bytes());
                tagged_binary::encode_frame(frame_info, &detailed)
            }
            (Variant::Ld6001b, _) => self.presence_frame(),
            _ => simple_binary::encode_frame(0x04, &[0, 0, 0, 0, self.targets.len() as u8]),
        };

        self.reports_sent += 1;
        self.pending_output.push_back(frame);
    }

    /// Queue an LD6001B heartbeat frame
    pub fn emit_heartbeat(&mut self) {
        if self.variant != Variant::Ld6001b {
            return;
        }

        let s = &self.settings;
        let mut payload = Vec::with_capacity(37);
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&(s.scan_interval_ms as u32).to_le_bytes());
        payload.extend_from_slice(&(s.monitor_interval_s as u16).to_le_bytes());
        payload.extend_from_slice(&s.heartbeat_interval_s.to_le_bytes());
        payload.extend_from_slice(&s.range_cm.to_le_bytes());
        payload.push(s.sensitivity);
        payload.extend_from_slice(&[0u8; 24]);
        self.pending_output
            .push_back(simple_binary::encode_frame(0x02, &payload));
    }

    /// Get the next chunk of output bytes
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.pending_output.pop_front()
    }

    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }

    pub fn clear_output(&mut self) {
        self.pending_output.clear();
    }

    pub fn output_count(&self) -> usize {
        self.pending_output.len()
    }

    fn presence_frame(&self) -> Vec<u8> {
        let to_byte = |metres: f32| (metres * 10.0).round().clamp(0.0, 255.0) as u8;
        let count = self.targets.len().min(MAX_TARGETS);
        let mut payload = vec![count as u8, 0];
        for target in self.targets.iter().take(count) {
            payload.extend_from_slice(&[
                to_byte(target.x),
                to_byte(target.y),
                to_byte(target.z),
                target.breath,
                target.heartbeat,
            ]);
        }
        simple_binary::encode_frame(simple_binary::TYPE_TARGET_LIST, &payload)
    }

    fn process_requests(&mut self) {
        loop {
            let Some(start) = self.input.iter().position(|&b| b == REQUEST_HEADER) else {
                self.input.clear();
                return;
            };
            self.input.drain(..start);
            if self.input.len() < 3 {
                return;
            }

            let total = FRAME_OVERHEAD + self.input[2] as usize;
            if self.input.len() < total {
                return;
            }

            let request: Vec<u8> = self.input.drain(..total).collect();
            if request[total - 1] != REQUEST_TERMINATOR || sum8(&request[..total - 2]) != request[total - 2] {
                warn!("{}: dropping malformed request {:02X?}", self.id, request);
                continue;
            }

            match request[1] {
                TYPE_STATUS => self.queue_status(),
                TYPE_RADAR => self.queue_angular_report(),
                other => debug!("{}: ignoring request type 0x{:02X}", self.id, other),
            }
        }
    }

    fn queue_status(&mut self) {
        let (sw_major, sw_minor) = self.sw_version;
        let (hw_major, hw_minor) = self.hw_version;
        let body = [sw_minor, sw_major, hw_minor, hw_major, 0, 0, 0, 0];
        self.pending_output.push_back(fixed_binary::encode_frame(
            RESPONSE_HEADER,
            TYPE_STATUS,
            &body,
            RESPONSE_TERMINATOR,
        ));
    }

    fn queue_angular_report(&mut self) {
        let count = self.targets.len().min(MAX_TARGETS);
        let mut body = vec![0x00, count as u8, 0, 0, 0, 0, 0, 0];
        for target in self.targets.iter().take(count) {
            let decimetres = |metres: f32| (metres * 10.0).round().clamp(-128.0, 127.0) as i8 as u8;
            let distance = (target.x.hypot(target.y) * 10.0).round().clamp(0.0, 255.0) as u8;
            body.extend_from_slice(&[
                target.id as u8,
                distance,
                90,
                90,
                0,
                0,
                decimetres(target.x),
                decimetres(target.y),
            ]);
        }
        self.reports_sent += 1;
        self.pending_output.push_back(fixed_binary::encode_frame(
            RESPONSE_HEADER,
            TYPE_RADAR,
            &body,
            RESPONSE_TERMINATOR,
        ));
    }

    fn process_lines(&mut self) {
        while let Some(end) = self.input.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.input.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if let Some(command) = line.strip_prefix("AT+") {
                self.handle_at(command);
            } else if !line.is_empty() {
                debug!("{}: ignoring line {:?}", self.id, line);
            }
        }
    }

    fn handle_at(&mut self, command: &str) {
        let (key, value) = match command.split_once('=') {
            Some((key, value)) => (key, value.parse::<i64>().ok()),
            None => (command, None),
        };
        debug!("{}: AT+{}", self.id, command);

        let applied = match (key, value) {
            ("READ", None) => {
                let block = self.param_block();
                self.pending_output.push_back(block);
                return;
            }
            ("START", None) => {
                self.running = true;
                true
            }
            ("STOP", None) => {
                self.running = false;
                true
            }
            ("RESET", None) => {
                self.running = false;
                self.mode = ProtocolMode::Simple;
                true
            }
            ("RESTORE", None) => {
                self.settings = SimSettings::default();
                true
            }
            ("DEBUG", Some(v)) => match ProtocolMode::from_code(v as u8) {
                Some(mode) => {
                    self.mode = mode;
                    true
                }
                None => false,
            },
            (key, Some(v)) => self.apply_setting(key, v),
            _ => false,
        };

        let reply: &[u8] = if !applied {
            b"AT+ERR\r\n"
        } else if self.fail_saves && value.is_some() && key != "DEBUG" {
            SAVE_FAILED
        } else {
            b"AT+OK\r\n"
        };
        self.pending_output.push_back(reply.to_vec());
    }

    fn apply_setting(&mut self, key: &str, v: i64) -> bool {
        let s = &mut self.settings;
        match key {
            "RANGE" => s.range_cm = v as u16,
            "Exit" => s.exit_boundary_ms = v as u32 * 100,
            "HEATIME" => s.heartbeat_interval_s = v as u16,
            "HEIGHTD" | "HEIGHT" => s.installation_height_cm = v as u16,
            "DPKTH" => s.range_sensitivity = v as u8,
            "SENS" => s.sensitivity = v as u8,
            "TIME" => s.scan_interval_ms = v as u16,
            "MONTIME" => s.monitor_interval_s = v as u8,
            "XNega" => s.x_min_cm = v as i16,
            "XPosi" => s.x_max_cm = v as i16,
            "YNega" => s.y_min_cm = v as i16,
            "YPosi" => s.y_max_cm = v as i16,
            "Moving" => s.moving_disappearance_ms = v as u32 * 100,
            "Static" => s.static_disappearance_ms = v as u32 * 100,
            _ => return false,
        }
        true
    }

    /// The `AT+READ` dump in the variant's not-quite-JSON format
    fn param_block(&self) -> Vec<u8> {
        const LINE_END: &[u8] = b"\x09\x0a";
        const COLON: &[u8] = b"\xa3\xba";
        let s = &self.settings;
        let seconds = |ms: u32| ms as f32 / 1000.0;

        let fields: Vec<String> = match self.variant {
            Variant::Ld6001b => vec![
                "\"SoftVerison\":\"1.2D\"".to_string(),
                "\"RangeRes\":0.055664".to_string(),
                "\"VelRes\":0.096055".to_string(),
                format!("\"TIME\":{}", s.scan_interval_ms),
                "\"PROG\":2".to_string(),
                format!("\"Range\":{}", s.range_cm),
                "\"BautRate\":115200".to_string(),
                format!("\"Sen\":{}", s.sensitivity),
                format!("\"Heart_Time\":{}", s.heartbeat_interval_s),
                format!("\"Monitor_Time\":{}", s.monitor_interval_s),
            ],
            _ => vec![
                "\"SoftwareVersion\":NOP_1.07-01".to_string(),
                "\"RangeRes\":0.084".to_string(),
                "\"VelRes\":0.105".to_string(),
                "\"Time\":100".to_string(),
                "\"Prog\":2".to_string(),
                format!("\"Range\":{}", s.range_cm),
                format!("\"Sen\":{}", s.range_sensitivity),
                format!("\"Heart_Time\":{}", s.heartbeat_interval_s),
                format!("\"Debug\":{}", self.mode.code()),
                format!("\"detectionHeight\":{}", s.installation_height_cm),
                format!("\"XboundaryN\":{}", s.x_min_cm),
                format!("\"XboundaryP\":{}", s.x_max_cm),
                format!("\"YboundaryN\":{}", s.y_min_cm),
                format!("\"YboundaryP\":{}", s.y_max_cm),
            ],
        };

        let mut block = b"{".to_vec();
        block.extend_from_slice(LINE_END);
        let last = fields.len() - 1;
        for (i, field) in fields.iter().enumerate() {
            block.extend_from_slice(field.as_bytes());
            // LD6001B closes its last field without a comma
            if i != last || self.variant != Variant::Ld6001b {
                block.push(b',');
            }
            block.extend_from_slice(LINE_END);
        }

        if self.variant != Variant::Ld6001b {
            for (label, ms) in [
                ("Moving target", s.moving_disappearance_ms),
                ("Static target", s.static_disappearance_ms),
                ("Target exit", s.exit_boundary_ms),
            ] {
                block.extend_from_slice(label.as_bytes());
                block.extend_from_slice(COLON);
                block.extend_from_slice(format!("{}s,", seconds(ms)).as_bytes());
                block.extend_from_slice(LINE_END);
            }
        }

        block.push(b'}');
        block
    }
}
