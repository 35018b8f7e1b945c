use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::orientation::Orientation;
use crate::palette::PixelFormat;

#[derive(Parser)]
#[command(name = "rm-ink")]
#[command(about = "Turn reMarkable digitizer input into strokes and e-ink refreshes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// reMarkable host (IP or hostname) to stream input from
    #[arg(long, env = "RMINK_HOST")]
    pub host: Option<String>,

    /// SSH key path for authentication
    #[arg(long)]
    pub key_path: Option<String>,

    /// SSH password (if set, key_path is ignored)
    #[arg(long, env = "RMINK_PASSWORD")]
    pub password: Option<String>,

    /// Read input devices directly instead of over SSH
    #[arg(long)]
    pub local: bool,

    /// Device model (rm1, rm2, rmpp); detected when omitted
    #[arg(long)]
    pub model: Option<String>,

    /// Pen input device path on reMarkable
    #[arg(long)]
    pub pen_device: Option<String>,

    /// Touch input device path on reMarkable
    #[arg(long)]
    pub touch_device: Option<String>,

    /// Run touch input only (no pen)
    #[arg(long)]
    pub touch_only: bool,

    /// Run pen input only (no touch)
    #[arg(long)]
    pub pen_only: bool,

    /// Disable palm rejection
    #[arg(long)]
    pub no_palm_rejection: bool,

    /// Palm rejection grace period in milliseconds
    #[arg(long)]
    pub palm_grace_ms: Option<u64>,

    /// Screen orientation (portrait, landscape-right, landscape-left, inverted)
    #[arg(long, value_parser = clap::value_parser!(Orientation))]
    pub orientation: Option<Orientation>,

    /// Framebuffer pixel format (gray8, rgb565, xrgb8888); detected when omitted
    #[arg(long, value_parser = clap::value_parser!(PixelFormat))]
    pub pixel_format: Option<PixelFormat>,

    /// Path to config file
    #[arg(long, env = "RMINK_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process input into strokes and refreshes (default)
    Run,
    /// Print decoded samples and their display positions for debugging
    Dump {
        /// Sensor to dump
        #[arg(value_enum)]
        sensor: DumpTarget,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpTarget {
    Touch,
    Pen,
}
