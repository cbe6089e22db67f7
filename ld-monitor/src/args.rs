//! Command-line arguments

use clap::{Parser, Subcommand};
use ld_protocol::Variant;

use crate::settings::Settings;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Monitor for HLK-LD6001 family radar modules")]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,

    /// Baud rate
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// ld6001, ld6001a or ld6001b
    #[arg(short, long, global = true)]
    pub variant: Option<Variant>,

    /// Queue an extra AT command after startup, repeatable
    #[arg(short, long, global = true)]
    pub send: Vec<String>,

    /// Print events as JSON lines
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Mode {
    /// List serial ports
    Ports,
    /// Connect to a radar on a serial port
    Monitor {
        /// Serial port, overrides the settings file
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Run against a virtual radar
    Simulate {
        /// Number of simulated people
        #[arg(short, long)]
        targets: Option<u32>,
    },
    /// Write the effective settings to the settings file
    SaveConfig,
}

impl Cli {
    /// Override loaded settings with anything given on the command line
    pub fn apply(&self, settings: &mut Settings) {
        if let Mode::Monitor {
            port: Some(port), ..
        } = &self.mode
        {
            settings.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(variant) = self.variant {
            settings.session.variant = variant;
        }
        if self.json {
            settings.json_output = true;
        }
        settings.simulation.variant = settings.session.variant;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("ldlink").chain(args.iter().copied()))
    }

    #[test]
    fn test_monitor_args() {
        let cli = parse(&[
            "monitor",
            "--port",
            "/dev/ttyUSB0",
            "--variant",
            "HLK-LD6001B",
            "--send",
            "AT+RANGE=300",
            "--json",
        ])
        .unwrap();

        assert_eq!(
            cli.mode,
            Mode::Monitor {
                port: Some("/dev/ttyUSB0".into())
            }
        );
        assert_eq!(cli.variant, Some(Variant::Ld6001b));
        assert_eq!(cli.send, vec!["AT+RANGE=300"]);
        assert!(cli.json);
    }

    #[test]
    fn test_apply_overrides_settings() {
        let mut settings = Settings::default();
        let cli = parse(&["simulate", "--variant", "ld6001a", "--baud", "9600"]).unwrap();
        cli.apply(&mut settings);

        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.session.variant, Variant::Ld6001a);
        assert_eq!(settings.simulation.variant, Variant::Ld6001a);
        assert!(!settings.json_output);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["monitor", "--port"]).is_err());
        assert!(parse(&["ports", "--variant", "ld7000"]).is_err());
        assert!(parse(&["ports", "--baud", "fast"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
    }
}
