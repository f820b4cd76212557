//! CLI module for postwatch - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the daemon,
//! inspecting discovery state, and cursor overrides.

pub mod commands;

pub use commands::Cli;
