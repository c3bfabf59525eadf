//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: run the two gated counter workers (default)
//! - config: print the effective configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gatecount - count up on one thread, then down on another once the gate opens
#[derive(Parser, Debug)]
#[command(name = "gatecount")]
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
    pub command: Option<Commands>,
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
    /// Run the count-up and count-down workers
    Run(RunArgs),

    /// Print the effective configuration as YAML
    Config,
}

/// Overrides for a single run; unset values come from the config file
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Inclusive upper bound of the count
    #[arg(short = 'n', long)]
    pub max_count: Option<u32>,

    /// Delay after each emitted value, in milliseconds
    #[arg(short, long)]
    pub pacing_ms: Option<u64>,

    /// Give up waiting on the gate after this many milliseconds
    #[arg(short, long)]
    pub wait_timeout_ms: Option<u64>,

    /// Keep the gate closed when count-up fails instead of releasing the waiter
    #[arg(long)]
    pub hold_on_failure: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Print the run report as JSON instead of streaming lines
    #[arg(long)]
    pub json: bool,

    /// Exit non-zero unless both workers complete
    #[arg(long)]
    pub strict: bool,
}
