//! Outbound command queue with single in-flight acknowledgement tracking
//!
//! The radar link is half-duplex and acks carry no correlation id, so only
//! one command may be outstanding at a time. The head of the queue stays
//! queued while it is in flight and is popped when it is acked or abandoned
//! after [`ACK_TIMEOUT`].
//!
//! Timeouts are sampled: an expired command is only noticed on the next
//! [`CommandQueue::tick`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ld_protocol::{AtCommand, EncodeCommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};

/// Default time allowed for an ack before the in-flight command is abandoned
pub const ACK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Completion callback, receives the raw ack payload
pub type AckCallback = Box<dyn FnOnce(&str) + Send>;

/// Destination for encoded command bytes
pub trait CommandSink {
    fn write(&mut self, bytes: &[u8]);
}

impl<F: FnMut(&[u8])> CommandSink for F {
    fn write(&mut self, bytes: &[u8]) {
        self(bytes)
    }
}

/// An outbound text command and its optional completion callback
pub struct Command {
    payload: String,
    callback: Option<AckCallback>,
}

impl Command {
    /// Create a command from its full wire text, e.g. `"AT+START\n"`
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            callback: None,
        }
    }

    /// Attach a callback run with the ack payload when this command completes
    pub fn on_ack(mut self, callback: impl FnOnce(&str) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl From<AtCommand> for Command {
    fn from(command: AtCommand) -> Self {
        Command::new(command.to_line())
    }
}

impl EncodeCommand for Command {
    fn encode(&self) -> Vec<u8> {
        self.payload.as_bytes().to_vec()
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("payload", &self.payload)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Queue configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Time allowed for an ack (ms)
    pub ack_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: ACK_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Counters for queue activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Commands written to the sink, immediate sends included
    pub sent: u64,
    pub acked: u64,
    pub timed_out: u64,
}

/// FIFO of pending commands with at most one in flight
pub struct CommandQueue<S> {
    sink: S,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    pending: VecDeque<Command>,
    in_flight_since: Option<Instant>,
    stats: QueueStats,
}

impl<S: CommandSink> CommandQueue<S> {
    /// Create a queue on the system clock with the default timeout
    pub fn new(sink: S) -> Self {
        Self::with_clock(sink, Arc::new(SystemClock), QueueConfig::default())
    }

    pub fn with_clock(sink: S, clock: Arc<dyn Clock>, config: QueueConfig) -> Self {
        Self {
            sink,
            clock,
            timeout: Duration::from_millis(config.ack_timeout_ms),
            pending: VecDeque::new(),
            in_flight_since: None,
            stats: QueueStats::default(),
        }
    }

    /// Append a command, sending it right away if nothing is in flight
    pub fn enqueue(&mut self, command: Command) {
        debug!("Queueing {:?}", command.payload.trim_end());
        self.pending.push_back(command);
        if self.in_flight_since.is_none() {
            self.send_head();
        }
    }

    /// Write a command immediately, bypassing the queue and ack tracking
    pub fn send(&mut self, command: Command) {
        debug!("Sending {:?} outside the queue", command.payload.trim_end());
        self.sink.write(command.payload.as_bytes());
        self.stats.sent += 1;
    }

    /// Complete the in-flight command
    ///
    /// Runs the head's callback with `payload`, pops it and sends the next
    /// head. Returns the completed command's payload, or `None` when nothing
    /// was in flight.
    pub fn handle_ack(&mut self, payload: &str) -> Option<String> {
        if self.in_flight_since.is_none() {
            debug!("Ignoring ack {:?} with nothing in flight", payload);
            return None;
        }
        let Some(command) = self.pending.pop_front() else {
            self.in_flight_since = None;
            return None;
        };

        self.in_flight_since = None;
        self.stats.acked += 1;
        debug!("{:?} acked with {:?}", command.payload.trim_end(), payload);
        if let Some(callback) = command.callback {
            callback(payload);
        }

        self.send_head();
        Some(command.payload)
    }

    /// Abandon the in-flight command if its ack window has passed
    ///
    /// The abandoned command is popped without running its callback and the
    /// next head is sent. Returns the abandoned command's payload.
    pub fn tick(&mut self) -> Option<String> {
        let sent_at = self.in_flight_since?;
        if self.clock.now().duration_since(sent_at) <= self.timeout {
            return None;
        }

        self.in_flight_since = None;
        self.stats.timed_out += 1;
        let abandoned = self.pending.pop_front().map(|command| command.payload);
        warn!(
            "No ack within {}ms for {:?}, abandoning",
            self.timeout.as_millis(),
            abandoned.as_deref().map(str::trim_end)
        );

        self.send_head();
        abandoned
    }

    /// Payload of the command awaiting an ack
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight_since?;
        self.pending.front().map(|command| command.payload.as_str())
    }

    /// Whether nothing is queued or in flight
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight_since.is_none()
    }

    /// Number of queued commands, the in-flight one included
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn send_head(&mut self) {
        let Some(command) = self.pending.front() else {
            return;
        };
        debug!("Sending {:?}", command.payload.trim_end());
        self.sink.write(command.payload.as_bytes());
        self.in_flight_since = Some(self.clock.now());
        self.stats.sent += 1;
    }
}
