//! LD6001 Radar Simulation Library
//!
//! This crate provides a simulation layer for exercising the radar link
//! without a physical module. It includes:
//!
//! - **VirtualRadar**: answers LD6001 polls and LD6001A/B AT commands with
//!   protocol-accurate frames for a set of simulated targets
//! - **run_virtual_radar_task**: async actor driving a `VirtualRadar` over any
//!   `AsyncRead + AsyncWrite` stream
//!
//! # Example
//!
//! ```rust
//! use ld_protocol::Variant;
//! use ld_sim::{SimTarget, VirtualRadar};
//!
//! let mut radar = VirtualRadar::new("bench", Variant::Ld6001a);
//! radar.add_target(SimTarget::at(0, 0.5, 1.5));
//! radar.receive(b"AT+START\n");
//! radar.emit_report();
//!
//! while let Some(bytes) = radar.take_output() {
//!     println!("Radar output: {:02X?}", bytes);
//! }
//! ```

pub mod radar;
pub mod radar_task;

pub use radar::{SimSettings, SimTarget, VirtualRadar, VirtualRadarConfig};
pub use radar_task::{run_virtual_radar_task, VirtualRadarCommand, VirtualRadarStateEvent};
