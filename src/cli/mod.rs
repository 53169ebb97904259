//! Command line interface module
//!
//! This module provides the entry point for parsing command-line arguments and running the
//! `sync` and `dump` workflows.

pub mod args;
pub mod runner;

pub use args::{Args, Command};
pub use runner::Runner;
