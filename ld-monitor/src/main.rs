//! ldlink - command-line monitor for HLK-LD6001 family radar modules
//!
//! Connects to a radar over a serial port (or to a virtual radar), runs the
//! startup sequence and reports decoded frames, target lifecycle events and
//! command outcomes.

mod args;
mod ports;
mod settings;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ld_link::{Command, ConnectionCommand, RadarConnection, RadarEvent, RadarSession};
use ld_sim::{run_virtual_radar_task, SimTarget, VirtualRadar, VirtualRadarCommand};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Cli, Mode};
use crate::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ldlink=info,ld_protocol=info,ld_link=info,ld_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load();
    cli.apply(&mut settings);

    match cli.mode {
        Mode::Ports => list_ports(),
        Mode::Monitor { .. } => monitor(&settings, &cli.send).await,
        Mode::Simulate { targets } => simulate(&settings, targets, &cli.send).await,
        Mode::SaveConfig => {
            let path = settings.save()?;
            info!("Saved settings to {}", path.display());
            Ok(())
        }
    }
}

fn list_ports() -> Result<()> {
    let ports = ports::list()?;
    if ports.is_empty() {
        info!("No serial ports found");
    }
    for port in ports {
        match port.usb {
            Some(usb) => println!("{}\t{}", port.name, usb),
            None => println!("{}", port.name),
        }
    }
    Ok(())
}

async fn monitor(settings: &Settings, extra: &[String]) -> Result<()> {
    if settings.port.is_empty() {
        bail!("No serial port configured, pass --port or set it in the settings file");
    }

    let (event_tx, event_rx) = mpsc::channel(256);
    let connection = RadarConnection::connect(
        &settings.port,
        settings.baud_rate,
        settings.session.clone(),
        event_tx,
    )
    .with_context(|| format!("Failed to open {}", settings.port))?;

    run_link(connection, event_rx, extra, settings.json_output).await
}

async fn simulate(settings: &Settings, targets: Option<u32>, extra: &[String]) -> Result<()> {
    let mut config = settings.simulation.clone();
    if let Some(count) = targets {
        config.targets = (0..count)
            .map(|id| SimTarget {
                vx: 0.3 + 0.1 * id as f32,
                vy: -0.2,
                ..SimTarget::at(id, -1.0 + 0.5 * id as f32, 1.5)
            })
            .collect();
    }

    let (host, device) = tokio::io::duplex(4096);
    let (sim_tx, sim_rx) = mpsc::channel(8);
    let (state_tx, _) = broadcast::channel(16);
    let radar = VirtualRadar::from_config(config);
    info!("Simulating {} with {} target(s)", radar.variant(), radar.targets().len());

    let sim: JoinHandle<std::io::Result<()>> = tokio::spawn(run_virtual_radar_task(
        device,
        radar,
        sim_rx,
        state_tx,
        Duration::from_millis(settings.report_interval_ms.max(1)),
    ));

    let (event_tx, event_rx) = mpsc::channel(256);
    let connection = RadarConnection::new(
        "virtual".to_string(),
        host,
        RadarSession::new(settings.session.clone()),
        event_tx,
    );
    let result = run_link(connection, event_rx, extra, settings.json_output).await;

    let _ = sim_tx.send(VirtualRadarCommand::Shutdown).await;
    sim.await?.context("Virtual radar failed")?;
    result
}

/// Drive a connection until Ctrl-C or disconnect, reporting every event
async fn run_link<T>(
    connection: RadarConnection<T>,
    mut event_rx: mpsc::Receiver<RadarEvent>,
    extra: &[String],
    json: bool,
) -> Result<()>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let link = tokio::spawn(connection.run(cmd_rx));

    for line in extra {
        let line = if line.ends_with('\n') {
            line.clone()
        } else {
            format!("{}\n", line)
        };
        cmd_tx
            .send(ConnectionCommand::Enqueue(Command::new(line)))
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("Link stopped before commands could be queued")?;
    }

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                report(&event, json)?;
                if matches!(event, RadarEvent::Disconnected { .. }) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                let _ = cmd_tx.send(ConnectionCommand::Shutdown).await;
                break;
            }
        }
    }

    // Keep reporting until the link drops its sender
    while let Some(event) = event_rx.recv().await {
        report(&event, json)?;
    }

    let session = link.await??;
    let parser = session.parser_stats();
    let queue = session.queue_stats();
    info!(
        "{} frames ({} invalid, {} bytes dropped), {} commands sent, {} acked, {} timed out",
        parser.frames,
        parser.invalid_frames,
        parser.bytes_dropped,
        queue.sent,
        queue.acked,
        queue.timed_out
    );
    Ok(())
}

fn report(event: &RadarEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        RadarEvent::Frame { frame } => tracing::debug!("Frame: {:?}", frame),
        RadarEvent::TargetEntered { id } => info!("Target {} entered", id),
        RadarEvent::TargetLeft { id, dwell_ms } => {
            info!("Target {} left after {:.1}s", id, *dwell_ms as f64 / 1000.0)
        }
        RadarEvent::CommandAcked { command, reply } => info!("{} -> {:?}", command, reply),
        RadarEvent::CommandTimedOut { command } => warn!("{} timed out", command),
        RadarEvent::Disconnected { reason } => warn!("Disconnected: {}", reason),
    }
    Ok(())
}
