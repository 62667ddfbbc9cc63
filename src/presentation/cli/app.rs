use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::infrastructure::persistence::export::ExportFormat;

/// thermolog: thermistor acquisition daemon
///
/// Samples thermistor dividers on a fixed period, converts them through a
/// calibration curve, raises over-temperature alarms and logs every sample.
#[derive(Parser, Debug)]
#[command(name = "thermolog")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Session export format written on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportArg {
    Csv,
    Json,
}

impl From<ExportArg> for ExportFormat {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Csv => Self::Csv,
            ExportArg::Json => Self::Json,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Acquire until Ctrl+C
    #[command(alias = "r")]
    Run {
        /// Export the session on stop in this format
        #[arg(short, long, value_enum)]
        export: Option<ExportArg>,
    },

    /// Validate the calibration dataset
    #[command(alias = "cal")]
    Calibration {
        /// Look up the temperature for this resistance
        #[arg(short, long)]
        resistance: Option<f64>,
    },

    /// Convert one raw reading
    Convert {
        /// Device id from the configuration
        #[arg(short, long)]
        device: String,

        /// Channel address on that device
        #[arg(long)]
        channel: String,

        /// Raw divider reading in millivolts
        #[arg(short, long, allow_negative_numbers = true)]
        millivolts: f64,
    },

    /// Validate the configuration and list devices
    #[command(alias = "c")]
    Check,
}
