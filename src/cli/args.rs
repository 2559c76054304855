//! Command-line argument parsing for the gaze recorder
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, TransportMode};

/// gaze-recorder - Record eye-gaze samples from an external gaze source
#[derive(Parser, Debug)]
#[command(name = "gaze-recorder")]
#[command(version)]
#[command(about = "Record eye-gaze samples and export sessions as JSON", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only accept messages from this sender (HOST:PORT or HOST)
    #[arg(long, value_name = "ADDR")]
    pub trusted_origin: Option<String>,

    /// Local address to receive gaze messages on
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// How data is pulled from the gaze source
    #[arg(long, value_enum)]
    pub mode: Option<TransportMode>,

    /// Directory exports are written to
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Use the built-in simulated tracker when tracking starts
    #[arg(long)]
    pub fallback: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive recording session (default)
    Start,

    /// Display the effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Start)
    }

    /// Apply flag values on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(origin) = &self.trusted_origin {
            config.source.trusted_origin = origin.clone();
        }
        if let Some(bind) = &self.bind {
            config.source.bind_addr = bind.clone();
        }
        if let Some(mode) = self.mode {
            config.transport.mode = mode;
        }
        if let Some(dir) = &self.export_dir {
            config.export.output_dir = Some(dir.to_string_lossy().into_owned());
        }
        if self.fallback {
            config.fallback.enabled = true;
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default tracing filter for this level; `RUST_LOG` takes precedence
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show the banner and command hints
    pub fn show_banner(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
