//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Arguments shared by `in` and `out`.
#[derive(Debug, Args)]
pub struct PunchCommand {
    /// Photo to stamp, standing in for the camera
    #[arg(short, long, value_name = "FILE")]
    pub photo: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Gallery arguments.
#[derive(Debug, Args)]
pub struct GalleryArgs {
    /// Gallery passcode
    #[arg(short, long, value_name = "CODE")]
    pub passcode: String,

    /// The gallery operation
    #[command(subcommand)]
    pub command: GalleryCommand,
}

/// Gallery operations.
#[derive(Debug, Subcommand)]
pub enum GalleryCommand {
    /// List stored photos, newest first
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete one photo by listing position or identifier
    Delete {
        /// Position in the listing (0 is the newest)
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        index: Option<usize>,

        /// Identifier (file name) of the photo
        #[arg(long)]
        id: Option<String>,
    },

    /// Delete every stored photo
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show gallery statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Copy one photo out of the gallery
    Export {
        /// Position in the listing (0 is the newest)
        index: usize,

        /// Destination file; the extension picks the format
        file: PathBuf,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
