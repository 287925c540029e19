//! Command-line interface for clockin.
//!
//! This module provides the CLI structure for the `clockin` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, GalleryArgs, GalleryCommand, PunchCommand};

use crate::logging::Verbosity;

/// clockin - Clock in and out with a timestamped photo
///
/// Each punch stamps the photo with IN or Out and the time, keeps it in a
/// passcode-protected gallery and optionally exports a copy.
#[derive(Debug, Parser)]
#[command(name = "clockin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clock in
    In(PunchCommand),

    /// Clock out
    Out(PunchCommand),

    /// Browse and manage stored photos
    Gallery(GalleryArgs),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
