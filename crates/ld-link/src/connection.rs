//! Async transport for a radar session
//!
//! [`RadarConnection`] owns the transport and a [`RadarSession`] and runs a
//! `select!` loop over incoming bytes, the poll timer and caller commands.
//! Decoded events are forwarded through an mpsc channel.
//!
//! The session itself is synchronous, so all protocol state lives on this one
//! task and needs no locking.
//!
//! ## Virtual Radar Support
//!
//! Any `AsyncRead + AsyncWrite` works as a transport. Tests and the monitor's
//! simulation mode use `DuplexStream` from `tokio::io::duplex()` connected to
//! an `ld_sim` radar task.

use std::io::ErrorKind;
use std::time::Duration;

use ld_protocol::Variant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info, warn};

use crate::error::LinkError;
use crate::events::RadarEvent;
use crate::queue::Command;
use crate::session::{RadarSession, SessionConfig};

/// Default serial speed for every variant
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Commands that can be sent to a running connection
#[derive(Debug)]
pub enum ConnectionCommand {
    /// Queue a command behind any pending ones
    Enqueue(Command),
    /// Write a command immediately, bypassing ack tracking
    Send(Command),
    /// Stop the loop
    Shutdown,
}

/// Parity the variant's UART expects
pub fn parity_for(variant: Variant) -> Parity {
    match variant {
        Variant::Ld6001 => Parity::Even,
        Variant::Ld6001a | Variant::Ld6001b => Parity::None,
    }
}

/// A session bound to a transport
pub struct RadarConnection<T> {
    name: String,
    io: T,
    session: RadarSession,
    event_tx: mpsc::Sender<RadarEvent>,
    buffer: Vec<u8>,
}

impl RadarConnection<SerialStream> {
    /// Open a serial port configured for the session's variant
    pub fn connect(
        port_name: &str,
        baud_rate: u32,
        config: SessionConfig,
        event_tx: mpsc::Sender<RadarEvent>,
    ) -> Result<Self, LinkError> {
        let stream = tokio_serial::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(parity_for(config.variant))
            .stop_bits(StopBits::One)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;

        info!(
            "Opened {} at {} baud for {}",
            port_name, baud_rate, config.variant
        );

        Ok(Self::new(
            port_name.to_string(),
            stream,
            RadarSession::new(config),
            event_tx,
        ))
    }
}

impl<T> RadarConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Bind an existing session to a custom I/O type
    pub fn new(
        name: String,
        io: T,
        session: RadarSession,
        event_tx: mpsc::Sender<RadarEvent>,
    ) -> Self {
        Self {
            name,
            io,
            session,
            event_tx,
            buffer: vec![0u8; 1024],
        }
    }

    pub fn session(&self) -> &RadarSession {
        &self.session
    }

    /// Write whatever the session produced
    async fn flush_outbound(&mut self) -> Result<(), LinkError> {
        let data = self.session.take_outbound();
        if data.is_empty() {
            return Ok(());
        }
        debug!("Write {} bytes to {}: {:02X?}", data.len(), self.name, data);
        self.io.write_all(&data).await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn forward_events(&mut self) -> Result<(), LinkError> {
        for event in self.session.drain_events() {
            self.event_tx
                .send(event)
                .await
                .map_err(|_| LinkError::ChannelClosed)?;
        }
        Ok(())
    }

    /// Main loop - runs until the transport closes, shutdown is requested or
    /// the event receiver is dropped
    ///
    /// Returns the session so callers can inspect its final state.
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<ConnectionCommand>,
    ) -> Result<RadarSession, LinkError> {
        info!("Starting radar loop on {}", self.name);

        let mut poll = tokio::time::interval(self.session.config().poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.session.start();
        self.flush_outbound().await?;

        let disconnect_reason = loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConnectionCommand::Enqueue(command)) => self.session.enqueue(command),
                        Some(ConnectionCommand::Send(command)) => self.session.send(command),
                        Some(ConnectionCommand::Shutdown) | None => {
                            info!("Shutdown requested for {}", self.name);
                            break None;
                        }
                    }
                }

                _ = poll.tick() => self.session.poll(),

                result = self.io.read(&mut self.buffer) => {
                    match result {
                        Ok(0) => break Some("transport closed".to_string()),
                        Ok(n) => {
                            let data = &self.buffer[..n];
                            debug!("Read {} bytes from {}: {:02X?}", n, self.name, data);
                            self.session.feed(data);
                        }
                        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                        Err(e) => {
                            warn!("Read error on {}: {}", self.name, e);
                            break Some(format!("read error: {}", e));
                        }
                    }
                }
            }

            self.flush_outbound().await?;
            self.forward_events().await?;
        };

        if let Some(reason) = disconnect_reason {
            info!("Radar loop ended for {}: {}", self.name, reason);
            let _ = self.event_tx.send(RadarEvent::Disconnected { reason }).await;
        }

        Ok(self.session)
    }
}
