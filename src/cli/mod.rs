//! CLI module for gatecount - command-line interface and subcommands.
//!
//! Provides the main entry point with the `run` and `config` subcommands.

pub mod commands;

pub use commands::Cli;
