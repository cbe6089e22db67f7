//! Error types for the radar link

use thiserror::Error;

/// Errors that can end a radar connection
///
/// Decode failures and command timeouts never show up here. They are
/// recovered inside the session and only reported through events and stats.
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serial port could not be opened
    #[error("serial port error: {0}")]
    SerialError(#[from] tokio_serial::Error),

    /// The consumer of the event stream went away
    #[error("event channel closed")]
    ChannelClosed,
}
