//! Command parsing for REPL built-in commands
//!
//! Each recording command maps to one recorder operation; execution lives
//! in the application driver, which owns the recorder and the transports.

use colored::*;

/// REPL command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Clear,
    Export,
    ExportRaw,
    Stats,
    Open,
    Status,
    Log,
    Help,
    Exit,
    Unknown { input: String },
}

/// Command handler for parsing REPL input
#[derive(Debug, Default)]
pub struct CommandHandler;

impl CommandHandler {
    /// Create new command handler
    pub fn new() -> Self {
        CommandHandler
    }

    /// Parse input string into a command
    pub fn parse(&self, input: &str) -> Command {
        let trimmed = input.trim();

        // Not a command if doesn't start with /
        let Some(body) = trimmed.strip_prefix('/') else {
            return Command::Unknown { input: input.to_string() };
        };

        let name = match body.split_whitespace().next() {
            Some(name) => name.to_lowercase(),
            None => return Command::Unknown { input: input.to_string() },
        };

        match name.as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "clear" | "reset" => Command::Clear,
            "export" => Command::Export,
            "export-raw" | "raw" => Command::ExportRaw,
            "stats" => Command::Stats,
            "open" => Command::Open,
            "status" => Command::Status,
            "log" => Command::Log,
            "help" | "h" => Command::Help,
            "exit" | "quit" | "q" => Command::Exit,
            _ => Command::Unknown { input: input.to_string() },
        }
    }

    /// Display help information
    pub fn show_help(&self) {
        println!("\n{}", "Available Commands:".bold().cyan());
        println!("{}", "=".repeat(60).cyan());

        let commands = vec![
            ("/start", "Start tracking (restarts a running session)"),
            ("/stop", "Stop tracking"),
            ("/clear, /reset", "Drop all recorded data and the log"),
            ("/export", "Export gaze points and raw messages as JSON"),
            ("/export-raw, /raw", "Export raw gaze source messages only"),
            ("/stats", "Summarise raw messages by type"),
            ("/open", "Launch the external gaze source"),
            ("/status", "Show session status"),
            ("/log", "Show the recent log"),
            ("/help, /h", "Show this help message"),
            ("/exit, /quit, /q", "Exit"),
        ];

        for (cmd, desc) in commands {
            println!("  {:<20} {}", cmd.green(), desc);
        }

        println!("\n{}", "Usage:".bold());
        println!("  - Use {} for command history", "UP/DOWN arrows".cyan());
        println!("  - Press {} or {} to exit", "Ctrl-D".cyan(), "/exit".cyan());
        println!();
    }

    /// Hint for input that is not a known command
    pub fn show_unknown(&self, input: &str) {
        println!("{}", format!("Unknown command: {}", input.trim()).red());
        println!("Type {} for available commands", "/help".cyan());
    }
}

/// Check if input is a command
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/')
}
