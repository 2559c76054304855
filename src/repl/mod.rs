//! REPL module for the interactive terminal session
//!
//! Command parsing, the terminal presenter and console input. The loop
//! itself is driven by [`crate::app::GazeApp`].

pub mod commands;
pub mod display;
pub mod input;

pub use commands::{is_command, Command, CommandHandler};
pub use display::DisplayManager;
pub use input::{spawn_input_thread, ConsoleInput, ConsoleRead};
