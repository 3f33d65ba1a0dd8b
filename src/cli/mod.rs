//! Command-line interface
//!
//! Argument parsing and command handlers for the `cyberlabs` binary.

pub mod args;
pub mod commands;
