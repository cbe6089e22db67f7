//! Polling-loop driver tying the parser, command queue and tracker together
//!
//! A [`RadarSession`] performs no I/O. The caller feeds it received bytes,
//! calls [`RadarSession::poll`] on a fixed interval, writes out whatever
//! [`RadarSession::take_outbound`] returns and drains the buffered
//! [`RadarEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use ld_protocol::{
    AngularTarget, AtCommand, BinaryRequest, DetailedTarget, EncodeCommand, Frame, FrameParser,
    Heartbeat, ParamSnapshot, ParserStats, PresenceTarget, RadarPrecision, SimpleRadarReport,
    StatusReport, Variant,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::events::RadarEvent;
use crate::queue::{Command, CommandQueue, CommandSink, QueueConfig, QueueStats};
use crate::tracker::{Identified, TargetEvent, TargetTracker, TrackerConfig};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hardware revision on the other end of the link
    pub variant: Variant,
    /// Interval between [`RadarSession::poll`] calls (ms)
    pub poll_interval_ms: u64,
    /// LD6001 only: also request the version every this many polls
    pub version_poll_every: u32,
    /// LD6001 only: resolution requested with each radar poll
    pub radar_precision: RadarPrecision,
    pub queue: QueueConfig,
    pub tracker: TrackerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Ld6001,
            poll_interval_ms: 500,
            version_poll_every: 100,
            radar_precision: RadarPrecision::Normal,
            queue: QueueConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Default configuration for `variant`
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// A target from any dialect, keyed by a common id width
#[derive(Debug, Clone, PartialEq)]
pub enum RadarTarget {
    Angular(AngularTarget),
    Presence(PresenceTarget),
    Detailed(DetailedTarget),
}

impl Identified for RadarTarget {
    type Id = u32;

    fn id(&self) -> u32 {
        match self {
            RadarTarget::Angular(t) => t.id as u32,
            RadarTarget::Presence(t) => t.id,
            RadarTarget::Detailed(t) => t.id,
        }
    }
}

/// Bytes produced by the session, waiting to be written to the transport
#[derive(Debug, Default)]
pub struct Outbox {
    bytes: Vec<u8>,
}

impl Outbox {
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl CommandSink for Outbox {
    fn write(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }
}

/// One radar link's protocol state
pub struct RadarSession {
    config: SessionConfig,
    parser: FrameParser,
    queue: CommandQueue<Outbox>,
    tracker: TargetTracker<RadarTarget>,
    poll_count: u64,
    status: Option<StatusReport>,
    params: Option<ParamSnapshot>,
    heartbeat: Option<Heartbeat>,
    people_count: usize,
    event_buffer: Vec<RadarEvent>,
}

impl RadarSession {
    /// Create a session on the system clock
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            parser: FrameParser::new(config.variant),
            queue: CommandQueue::with_clock(Outbox::default(), clock.clone(), config.queue),
            tracker: TargetTracker::with_clock(clock, config.tracker),
            config,
            poll_count: 0,
            status: None,
            params: None,
            heartbeat: None,
            people_count: 0,
            event_buffer: Vec::new(),
        }
    }

    /// Issue the variant's startup sequence
    pub fn start(&mut self) {
        info!("Starting {}", self.config.variant);
        if self.config.variant.uses_at_commands() {
            for command in AtCommand::startup_sequence(self.config.variant) {
                self.queue.enqueue(command.into());
            }
        } else {
            self.write_request(BinaryRequest::Version);
        }
    }

    /// Queue a command behind any pending ones
    pub fn enqueue(&mut self, command: Command) {
        self.queue.enqueue(command);
    }

    /// Write a command immediately without waiting for an ack
    pub fn send(&mut self, command: Command) {
        self.queue.send(command);
    }

    /// Periodic step: expire the in-flight command and poll an LD6001
    pub fn poll(&mut self) {
        if let Some(command) = self.queue.tick() {
            self.event_buffer.push(RadarEvent::CommandTimedOut {
                command: command.trim_end().to_string(),
            });
        }

        if self.config.variant == Variant::Ld6001 {
            self.write_request(BinaryRequest::Radar(self.config.radar_precision));
            let every = self.config.version_poll_every.max(1) as u64;
            if self.poll_count % every == 0 {
                self.write_request(BinaryRequest::Version);
            }
        }
        self.poll_count += 1;
    }

    /// Feed received bytes through the parser
    pub fn feed(&mut self, data: &[u8]) {
        let mut frames: Vec<Frame> = Vec::new();
        self.parser.push_bytes(data, &mut frames);
        for frame in frames {
            self.handle_frame(frame);
        }
    }

    /// Bytes to write to the transport, in order
    pub fn take_outbound(&mut self) -> Vec<u8> {
        self.queue.sink_mut().take()
    }

    /// Take all buffered events
    pub fn drain_events(&mut self) -> Vec<RadarEvent> {
        std::mem::take(&mut self.event_buffer)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    /// Most recent status report (LD6001)
    pub fn status(&self) -> Option<&StatusReport> {
        self.status.as_ref()
    }

    /// Most recent parameter dump (LD6001A/B)
    pub fn params(&self) -> Option<&ParamSnapshot> {
        self.params.as_ref()
    }

    /// Most recent heartbeat (LD6001B)
    pub fn heartbeat(&self) -> Option<&Heartbeat> {
        self.heartbeat.as_ref()
    }

    /// Head count from the last radar report
    pub fn people_count(&self) -> usize {
        self.people_count
    }

    pub fn tracker(&self) -> &TargetTracker<RadarTarget> {
        &self.tracker
    }

    pub fn parser_stats(&self) -> ParserStats {
        self.parser.stats()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Payload of the command awaiting an ack
    pub fn in_flight(&self) -> Option<&str> {
        self.queue.in_flight()
    }

    /// Number of polls performed so far
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    fn write_request(&mut self, request: BinaryRequest) {
        debug!("Requesting {:?}", request);
        self.queue.sink_mut().write(&request.encode());
    }

    fn handle_frame(&mut self, frame: Frame) {
        match &frame {
            Frame::Status(status) => {
                info!("Firmware {}", status.version_string());
                self.status = Some(*status);
            }
            Frame::SimpleRadar(report) => {
                self.people_count = report.people_count();
                match report {
                    SimpleRadarReport::PeopleCount(_) => {}
                    SimpleRadarReport::Angular { targets, .. } => {
                        let snapshot: Vec<RadarTarget> =
                            targets.iter().copied().map(RadarTarget::Angular).collect();
                        self.update_tracker(&snapshot);
                    }
                    SimpleRadarReport::Presence(targets) => {
                        let snapshot: Vec<RadarTarget> =
                            targets.iter().copied().map(RadarTarget::Presence).collect();
                        self.update_tracker(&snapshot);
                    }
                }
            }
            Frame::DetailedRadar(targets) => {
                self.people_count = targets.len();
                let snapshot: Vec<RadarTarget> =
                    targets.iter().copied().map(RadarTarget::Detailed).collect();
                self.update_tracker(&snapshot);
            }
            Frame::Params(params) => {
                self.params = Some(params.clone());
                self.complete_command("");
            }
            Frame::Heartbeat(heartbeat) => self.heartbeat = Some(*heartbeat),
            Frame::Ack(payload) => self.complete_command(payload),
            Frame::SaveFailed => warn!("Module failed to save parameters"),
            Frame::Invalid(invalid) => warn!("Invalid frame: {:?}", invalid),
        }

        self.event_buffer.push(RadarEvent::Frame { frame });
    }

    fn complete_command(&mut self, reply: &str) {
        if let Some(command) = self.queue.handle_ack(reply) {
            self.event_buffer.push(RadarEvent::CommandAcked {
                command: command.trim_end().to_string(),
                reply: reply.to_string(),
            });
        }
    }

    fn update_tracker(&mut self, snapshot: &[RadarTarget]) {
        let mut transitions: Vec<TargetEvent<u32>> = Vec::new();
        self.tracker.update(snapshot, &mut transitions);

        self.event_buffer
            .extend(transitions.into_iter().map(|event| match event {
                TargetEvent::Entered(id) => RadarEvent::TargetEntered { id },
                TargetEvent::Left { id, dwell } => RadarEvent::TargetLeft {
                    id,
                    dwell_ms: dwell.as_millis() as u64,
                },
            }));
    }
}

impl std::fmt::Debug for RadarSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarSession")
            .field("variant", &self.config.variant)
            .field("poll_count", &self.poll_count)
            .field("tracked", &self.tracker.len())
            .field("pending_events", &self.event_buffer.len())
            .finish()
    }
}
