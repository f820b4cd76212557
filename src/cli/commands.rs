//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: start the discovery daemon in the foreground
//! - status: print cursor, frontier, and rate state
//! - set-cursor: force the persisted cursor to a given post id

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// postwatch - adaptive forum post discovery daemon
#[derive(Parser, Debug)]
#[command(name = "postwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the discovery daemon in the foreground
    Run,

    /// Print the persisted cursor and configured discovery parameters
    Status,

    /// Force-set the persisted cursor to a post id
    ///
    /// Moving the cursor backward is allowed but logged as an anomaly.
    SetCursor {
        /// Post id to store as the latest confirmed post
        id: i64,
    },
}
