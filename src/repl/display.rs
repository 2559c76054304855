//! Display manager for the terminal UI
//!
//! Terminal implementation of [`Presenter`]. Status and log lines are
//! printed above the prompt; live figures go to the terminal title so they
//! never interleave with typed input.

use colored::*;
use crossterm::{execute, terminal};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

use crate::presentation::{Presenter, StatsView, StatusLevel};

/// Display manager for the recorder REPL
pub struct DisplayManager {
    current_bar: Option<ProgressBar>,
    update_interval: Duration,
    stats: StatsView,
    status: Option<(String, StatusLevel)>,
    session_time: String,
    marker: Option<(f64, f64, bool)>,
}

impl DisplayManager {
    /// Create new display manager
    ///
    /// Spinner frequency: 10 FPS (100ms interval)
    pub fn new() -> Self {
        DisplayManager {
            current_bar: None,
            update_interval: Duration::from_millis(100),
            stats: StatsView::default(),
            status: None,
            session_time: "00:00".to_string(),
            marker: None,
        }
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, listen: &str, mode: &str) {
        let width = self.rule_width();
        let top = format!("{}", "=".repeat(width).cyan());
        let title = format!("  gaze-recorder {} - Eye-Gaze Session Recorder", version);
        let info = format!("  Listening: {} | Transport: {}", listen, mode);

        println!("\n{}", top);
        println!("{}", title.bold().cyan());
        println!("{}", info.dimmed());
        println!("{}\n", top);
        println!(
            "Type {} to begin, {} for commands, {} to quit\n",
            "/start".green(),
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown while an operation is pending
    pub fn start_spinner(&mut self, message: &str) -> ProgressBar {
        self.finish_current();

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.update_interval);

        self.current_bar = Some(pb.clone());
        pb
    }

    /// Finish current spinner
    pub fn finish_current(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }

    pub fn status(&self) -> Option<&(String, StatusLevel)> {
        self.status.as_ref()
    }

    /// One-line summary of the live figures
    pub fn dashboard_line(&self) -> String {
        let marker = match self.marker {
            Some((x, y, true)) => format!(" | @({}, {})", x.round() as i64, y.round() as i64),
            _ => String::new(),
        };
        format!(
            "{} | {} | acc {} | {} pts | {} raw | avg {}{}",
            self.session_time,
            self.stats.coords_text(),
            self.stats.accuracy_text(),
            self.stats.total_points,
            self.stats.raw_messages,
            self.stats.average_text(),
            marker
        )
    }

    /// Display error message
    pub fn show_error(&self, error: &str) {
        self.print_line(&format!("{} {}", "Error:".red().bold(), error.red()));
    }

    /// Show section header
    pub fn show_section(&self, title: &str) {
        println!("\n{}", title.bold().cyan());
        println!("{}", "-".repeat(self.rule_width()).cyan());
    }

    /// Show bullet point
    pub fn show_bullet(&self, text: &str) {
        println!("  {} {}", "•".cyan(), text);
    }

    fn print_line(&self, line: &str) {
        match &self.current_bar {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    fn rule_width(&self) -> usize {
        terminal::size()
            .map(|(cols, _)| (cols as usize).clamp(20, 64))
            .unwrap_or(64)
    }

    fn refresh_title(&self) {
        let title = format!("gaze-recorder {}", self.dashboard_line());
        let _ = execute!(io::stdout(), terminal::SetTitle(title));
    }
}

impl Presenter for DisplayManager {
    fn update_stats(&mut self, stats: &StatsView) {
        self.stats = stats.clone();
    }

    fn set_status(&mut self, text: &str, level: StatusLevel) {
        self.status = Some((text.to_string(), level));

        if level == StatusLevel::Pending {
            self.start_spinner(text);
            return;
        }

        self.finish_current();
        match level {
            StatusLevel::Active => println!("{} {}", "●".green(), text.green().bold()),
            StatusLevel::Stopped => println!("{} {}", "■".yellow(), text.yellow()),
            _ => self.show_error(text),
        }
    }

    fn append_log_line(&mut self, text: &str) {
        self.print_line(&format!("{}", text.dimmed()));
    }

    fn clear_log(&mut self) {
        println!("{}", "-".repeat(self.rule_width()).dimmed());
    }

    fn set_marker_position(&mut self, x: f64, y: f64, visible: bool) {
        self.marker = Some((x, y, visible));
    }

    fn set_session_time(&mut self, elapsed: &str) {
        self.session_time = elapsed.to_string();
        self.refresh_title();
    }

    fn alert(&mut self, text: &str) {
        let rule = "=".repeat(self.rule_width());
        println!("\n{}", rule.yellow());
        for line in text.lines() {
            println!("{}", line);
        }
        println!("{}\n", rule.yellow());
    }

    fn show_panel(&mut self, title: &str, lines: &[String]) {
        self.show_section(title);
        for line in lines {
            self.show_bullet(line);
        }
        println!();
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}
