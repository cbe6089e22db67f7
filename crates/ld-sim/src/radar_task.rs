//! Virtual radar actor task
//!
//! Owns a [`VirtualRadar`] and talks to the host over an async stream. The
//! task uses a select! loop to:
//! - Read host commands from the stream and answer them
//! - Emit unsolicited reports on a timer once the host has started the radar
//! - Apply target changes and shutdown requests from a channel
//! - Publish state changes via a broadcast channel

use std::io;
use std::time::Duration;

use ld_protocol::{ProtocolMode, Variant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::radar::{SimTarget, VirtualRadar};

/// Commands that can be sent to a virtual radar actor
#[derive(Debug, Clone)]
pub enum VirtualRadarCommand {
    /// Replace the simulated targets
    SetTargets(Vec<SimTarget>),
    /// Add or replace one target
    AddTarget(SimTarget),
    /// Remove a target by id
    RemoveTarget(u32),
    /// Shutdown the virtual radar actor
    Shutdown,
}

/// Reports between LD6001B heartbeat frames
const REPORTS_PER_HEARTBEAT: u64 = 20;

/// State event emitted when the host changes what the radar is doing
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualRadarStateEvent {
    pub running: bool,
    pub mode: ProtocolMode,
    pub target_count: usize,
}

fn state_of(radar: &VirtualRadar) -> VirtualRadarStateEvent {
    VirtualRadarStateEvent {
        running: radar.is_running(),
        mode: radar.mode(),
        target_count: radar.targets().len(),
    }
}

/// Run the virtual radar actor task
///
/// Targets move along their velocities between reports. The task ends when
/// the stream closes or a shutdown command arrives.
pub async fn run_virtual_radar_task<S>(
    mut stream: S,
    mut radar: VirtualRadar,
    mut cmd_rx: mpsc::Receiver<VirtualRadarCommand>,
    state_tx: broadcast::Sender<VirtualRadarStateEvent>,
    report_interval: Duration,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 1024];
    let mut report_timer = interval(report_interval);
    report_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reports: u64 = 0;
    let mut last_state = state_of(&radar);

    info!(
        "Starting virtual radar task for {} ({})",
        radar.id(),
        radar.variant()
    );
    let _ = state_tx.send(last_state.clone());

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual radar stream closed for {}", radar.id());
                        break;
                    }
                    Ok(n) => {
                        let data = &buf[..n];
                        debug!("Virtual radar {} received {} bytes: {:02X?}", radar.id(), n, data);
                        radar.receive(data);
                    }
                    Err(e) => return Err(e),
                }
            }

            _ = report_timer.tick() => {
                radar.advance(report_interval.as_secs_f32());
                radar.emit_report();
                reports += 1;
                if radar.variant() == Variant::Ld6001b && reports % REPORTS_PER_HEARTBEAT == 0 {
                    radar.emit_heartbeat();
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualRadarCommand::SetTargets(targets)) => radar.set_targets(targets),
                    Some(VirtualRadarCommand::AddTarget(target)) => radar.add_target(target),
                    Some(VirtualRadarCommand::RemoveTarget(id)) => radar.remove_target(id),
                    Some(VirtualRadarCommand::Shutdown) | None => {
                        info!("Virtual radar {} shutting down", radar.id());
                        break;
                    }
                }
            }
        }

        while let Some(chunk) = radar.take_output() {
            stream.write_all(&chunk).await?;
        }
        stream.flush().await?;

        let state = state_of(&radar);
        if state != last_state {
            let _ = state_tx.send(state.clone());
            last_state = state;
        }
    }

    Ok(())
}
