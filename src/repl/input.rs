//! Console input over rustyline
//!
//! Readline blocks, so it runs on its own std thread. Every non-empty line
//! becomes a [`SessionEvent::Input`] for the event loop.

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{debug, warn};

use crate::link::{EventBus, SessionEvent};
use crate::repl::commands::{Command, CommandHandler};

const PROMPT: &str = "gaze> ";

/// One outcome of a prompt
#[derive(Debug, PartialEq)]
pub enum ConsoleRead {
    Line(String),
    Blank,
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D or a closed stdin
    Closed,
}

/// Readline editor plus an optional history file
pub struct ConsoleInput {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl ConsoleInput {
    /// Console without persistent history
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new().context("console unavailable")?,
            history: None,
        })
    }

    /// Console that restores and keeps history at `path`
    pub fn with_history(path: PathBuf) -> Result<Self> {
        let mut console = Self::new()?;
        if path.is_file() {
            if let Err(e) = console.editor.load_history(&path) {
                debug!(error = %e, path = %path.display(), "history not loaded");
            }
        }
        console.history = Some(path);
        Ok(console)
    }

    pub fn history_file(&self) -> Option<&Path> {
        self.history.as_deref()
    }

    pub fn recalled(&self) -> usize {
        self.editor.history().len()
    }

    /// Prompt once
    pub fn read(&mut self) -> Result<ConsoleRead> {
        match self.editor.readline(PROMPT) {
            Ok(line) => Ok(self.remember(line.trim())),
            Err(ReadlineError::Interrupted) => Ok(ConsoleRead::Interrupted),
            Err(ReadlineError::Eof) => Ok(ConsoleRead::Closed),
            Err(e) => Err(e).context("console read failed"),
        }
    }

    fn remember(&mut self, line: &str) -> ConsoleRead {
        if line.is_empty() {
            return ConsoleRead::Blank;
        }
        if let Err(e) = self.editor.add_history_entry(line) {
            debug!(error = %e, "history entry dropped");
        }
        ConsoleRead::Line(line.to_string())
    }

    /// Write history back, creating the state directory on first use
    pub fn persist(&mut self) -> Result<()> {
        let Some(path) = self.history.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.editor.save_history(path)?;
        Ok(())
    }
}

/// Feed console lines to the event loop until `/exit`, EOF, or shutdown
pub fn spawn_input_thread(mut console: ConsoleInput, bus: EventBus) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let commands = CommandHandler::new();
        loop {
            let line = match console.read() {
                Ok(ConsoleRead::Line(line)) => line,
                Ok(ConsoleRead::Blank) => continue,
                Ok(ConsoleRead::Interrupted) => {
                    println!("Use /exit or Ctrl-D to quit");
                    continue;
                }
                Ok(ConsoleRead::Closed) => {
                    bus.emit(SessionEvent::InputClosed);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "console input failed");
                    bus.emit(SessionEvent::InputClosed);
                    break;
                }
            };

            if let Err(e) = console.persist() {
                debug!(error = %e, "history not saved");
            }
            let exiting = commands.parse(&line) == Command::Exit;
            if !bus.emit(SessionEvent::Input(line)) || exiting {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_console_without_history() {
        let console = ConsoleInput::new().unwrap();
        assert!(console.history_file().is_none());
        assert_eq!(console.recalled(), 0);
    }

    #[test]
    fn test_blank_lines_not_remembered() {
        let mut console = ConsoleInput::new().unwrap();
        assert_eq!(console.remember(""), ConsoleRead::Blank);
        assert_eq!(console.recalled(), 0);

        assert_eq!(
            console.remember("/start"),
            ConsoleRead::Line("/start".to_string())
        );
        assert_eq!(console.recalled(), 1);
    }

    #[test]
    fn test_persist_without_file_is_noop() {
        let mut console = ConsoleInput::new().unwrap();
        console.remember("/stats");
        assert!(console.persist().is_ok());
    }

    #[test]
    fn test_history_survives_restart() {
        let state = TempDir::new().unwrap();
        let path = state.path().join("state").join("history");

        let mut console = ConsoleInput::with_history(path.clone()).unwrap();
        console.remember("/start");
        console.remember("/export");
        console.persist().unwrap();
        assert!(path.is_file());

        let restored = ConsoleInput::with_history(path.clone()).unwrap();
        assert_eq!(restored.history_file(), Some(path.as_path()));
        assert_eq!(restored.recalled(), 2);
    }
}
