//! Command-line interface for nvgrid.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use nvgrid_config::LogLevel;

/// nvgrid - GPU terminal-grid renderer for Neovim's UI protocol
#[derive(Parser, Debug)]
#[command(name = "nvgrid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.config/nvgrid/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level for the debug log (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed recorded redraw batches through the renderer without a window
    Replay {
        /// JSON file holding an array of redraw batches
        file: PathBuf,

        /// Surface width in pixels (default: fits the configured grid)
        #[arg(long)]
        width: Option<u32>,

        /// Surface height in pixels (default: fits the configured grid)
        #[arg(long)]
        height: Option<u32>,

        /// Log and skip protocol violations instead of aborting
        #[arg(long)]
        lenient: bool,
    },
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::from_name(value).ok_or_else(|| format!("unknown log level '{value}'"))
}
