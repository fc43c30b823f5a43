//! Command-line interface for hookwarden
//!
//! Argument parsing with clap lives in [`commands`]; [`Output`] provides the
//! styled terminal messages shared by every command.

pub mod commands;
mod output;

pub use commands::Cli;
pub use output::Output;
