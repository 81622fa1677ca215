//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};

use crate::backend::Backend;

/// SMC fan and sensor CLI
#[derive(Parser, Debug)]
#[command(name = "smcfanctl")]
#[command(version, about = "Read SMC sensors and control fans", long_about = None)]
pub struct Cli {
    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Port access backend (overrides config file)
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// Enable debug logging (overrides config file)
    #[arg(short, long)]
    pub verbose: bool,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    /// Config file path (default: ~/.config/smcfan/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        }
    }
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize and identify the SMC
    Info,

    /// Show fan status
    Status,

    /// Discover temperature sensors and show their readings
    Sensors,

    /// Raw key access (read-only)
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Fan control commands
    Fan {
        #[command(subcommand)]
        command: FanCommands,
    },

    /// Restore every fan to automatic mode
    Restore,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Read a key and decode it when the type is known
    Read {
        /// Four-character key, e.g. TC0P or "REV "
        key: String,
    },

    /// Show size, type and attributes of a key
    Info {
        /// Four-character key
        key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FanCommands {
    /// Run a fan at a fixed speed until Ctrl-C or the hold time ends
    Manual {
        /// Fan index (0-5)
        fan_id: u8,

        /// Target RPM, clamped to the fan's range
        rpm: u16,

        /// Seconds to hold before restoring automatic mode
        #[arg(long)]
        hold_secs: Option<u64>,
    },

    /// Drive a fan from a temperature sensor until Ctrl-C
    Follow {
        /// Fan index (0-5)
        fan_id: u8,

        /// Sensor key, e.g. TC0P
        #[arg(short, long)]
        sensor: String,

        /// Temperature (°C) at which the fan runs at its minimum
        #[arg(long, allow_negative_numbers = true)]
        min_temp: f32,

        /// Temperature (°C) at which the fan runs at its maximum
        #[arg(long, allow_negative_numbers = true)]
        max_temp: f32,

        /// Update period in milliseconds (default: control.interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many updates
        #[arg(long)]
        iterations: Option<u64>,
    },

    /// Return one fan to automatic mode
    Auto {
        /// Fan index (0-5)
        fan_id: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fan_follow() {
        let cli = Cli::try_parse_from([
            "smcfanctl",
            "--backend",
            "simulated",
            "fan",
            "follow",
            "2",
            "--sensor",
            "TC0P",
            "--min-temp",
            "40",
            "--max-temp",
            "80.5",
            "--iterations",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.backend, Some(Backend::Simulated));
        match cli.command {
            Commands::Fan {
                command:
                    FanCommands::Follow {
                        fan_id,
                        sensor,
                        min_temp,
                        max_temp,
                        interval_ms,
                        iterations,
                    },
            } => {
                assert_eq!(fan_id, 2);
                assert_eq!(sensor, "TC0P");
                assert_eq!(min_temp, 40.0);
                assert_eq!(max_temp, 80.5);
                assert_eq!(interval_ms, None);
                assert_eq!(iterations, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_backend_names() {
        let cli = Cli::try_parse_from(["smcfanctl", "-b", "dev-port", "status"]).unwrap();
        assert_eq!(cli.backend, Some(Backend::DevPort));
        assert!(Cli::try_parse_from(["smcfanctl", "-b", "serial", "status"]).is_err());
    }
}
