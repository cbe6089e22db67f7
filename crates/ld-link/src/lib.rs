//! LD6001 Link Layer
//!
//! This crate turns the decoded frames from `ld-protocol` into a working
//! radar link:
//!
//! - [`CommandQueue`]: FIFO of outbound commands with a single command in
//!   flight, completed by an ack or abandoned after a timeout
//! - [`TargetTracker`]: diffs per-cycle target snapshots into enter and left
//!   events with dwell time
//! - [`RadarSession`]: the polling-loop driver owning a parser, a queue and a
//!   tracker, buffering [`RadarEvent`]s for the caller
//! - [`RadarConnection`]: async task binding a session to a serial port or any
//!   other `AsyncRead + AsyncWrite` transport
//!
//! # Example
//!
//! ```rust
//! use ld_link::{RadarEvent, RadarSession, SessionConfig};
//! use ld_protocol::Variant;
//!
//! let mut session = RadarSession::new(SessionConfig::for_variant(Variant::Ld6001a));
//! session.start();
//! assert_eq!(session.take_outbound(), b"AT+RESET\n".to_vec());
//!
//! session.feed(b"AT+OK\r\n");
//! assert!(session
//!     .drain_events()
//!     .iter()
//!     .any(|e| matches!(e, RadarEvent::CommandAcked { .. })));
//! ```

pub mod clock;
pub mod connection;
pub mod error;
pub mod events;
pub mod queue;
pub mod session;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::{parity_for, ConnectionCommand, RadarConnection, DEFAULT_BAUD_RATE};
pub use error::LinkError;
pub use events::RadarEvent;
pub use queue::{
    AckCallback, Command, CommandQueue, CommandSink, QueueConfig, QueueStats, ACK_TIMEOUT,
};
pub use session::{Outbox, RadarSession, RadarTarget, SessionConfig};
pub use tracker::{
    Identified, TargetEvent, TargetEventHandler, TargetTracker, TrackedTarget, TrackerConfig,
};
