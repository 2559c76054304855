//! CLI module for the gaze recorder
//!
//! Handles command-line argument parsing and config overrides.

pub mod args;

pub use args::{Args, Commands, Verbosity};
