use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tsc_pad::calibration::CalibrationPattern;

#[derive(Parser)]
#[command(name = "tsc-pad")]
#[command(about = "Sample and calibrate a resistive touch panel")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Raw sample stream (file or FIFO). Reads stdin when omitted or "-"
    #[arg(long, env = "TSC_PAD_INPUT")]
    pub input: Option<PathBuf>,

    /// Touch controller profile
    #[arg(long, env = "TSC_PAD_DEVICE")]
    pub device: Option<String>,

    /// Where the calibration record is loaded from and saved to
    #[arg(long)]
    pub calibration_file: Option<PathBuf>,

    /// Raw pressure reading that counts as full pressure
    #[arg(long)]
    pub max_pressure: Option<i32>,

    /// Normalised pressure that starts a touch
    #[arg(long)]
    pub press_threshold: Option<f64>,

    /// How far below the press threshold pressure must drop to end a touch
    #[arg(long)]
    pub release_distance: Option<f64>,

    /// Sampling loop period in milliseconds
    #[arg(long)]
    pub sample_interval_ms: Option<u64>,

    /// Sampling period while capturing calibration points, in milliseconds
    #[arg(long)]
    pub capture_interval_ms: Option<u64>,

    /// Screen width in pixels
    #[arg(long)]
    pub screen_width: Option<f64>,

    /// Screen height in pixels
    #[arg(long)]
    pub screen_height: Option<f64>,

    /// Distance of the calibration targets from the screen edges, in pixels
    #[arg(long)]
    pub margin: Option<f64>,

    /// Path to config file
    #[arg(long, env = "TSC_PAD_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sample the panel and print pointer events (default)
    Run,

    /// Collect calibration points interactively and save the result
    Calibrate {
        /// Target pattern (four-corners, corners-and-center, seven-point)
        #[arg(long, value_parser = clap::value_parser!(CalibrationPattern))]
        pattern: Option<CalibrationPattern>,
    },

    /// Solve a calibration from recorded point pairs in a TOML file
    Solve {
        /// File with [[pair]] tables holding `reference` and `measured` points
        pairs: PathBuf,

        /// Save the result as the active calibration
        #[arg(long)]
        save: bool,
    },

    /// Print accepted raw samples for debugging
    Dump,
}
