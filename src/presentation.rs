//! Presentation port for recorder output
//!
//! The recorder never renders anything itself. It pushes stats, status,
//! log lines, marker moves and alerts through [`Presenter`], so the same
//! session logic drives the terminal UI and headless test runs.

use std::collections::VecDeque;
use std::fmt;

use chrono::Local;

/// Lines kept by the on-screen log
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Severity of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Pending,
    Active,
    Stopped,
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLevel::Pending => write!(f, "PENDING"),
            StatusLevel::Active => write!(f, "ACTIVE"),
            StatusLevel::Stopped => write!(f, "STOPPED"),
            StatusLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Snapshot of the live statistics
///
/// The default value is the placeholder shown after a clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsView {
    pub coords: Option<(f64, f64)>,
    pub accuracy: Option<f64>,
    pub total_points: usize,
    pub raw_messages: usize,
    pub average_accuracy: f64,
}

impl StatsView {
    pub fn coords_text(&self) -> String {
        match self.coords {
            Some((x, y)) => format!("X: {} Y: {}", x.round() as i64, y.round() as i64),
            None => "X: -- Y: --".to_string(),
        }
    }

    pub fn accuracy_text(&self) -> String {
        match self.accuracy {
            Some(accuracy) => format!("{}%", accuracy.round() as i64),
            None => "--".to_string(),
        }
    }

    pub fn average_text(&self) -> String {
        format!("{:.1}%", self.average_accuracy)
    }
}

/// Output surface driven by the recorder
pub trait Presenter {
    fn update_stats(&mut self, stats: &StatsView);

    fn set_status(&mut self, text: &str, level: StatusLevel);

    /// Show one already-timestamped log line
    fn append_log_line(&mut self, text: &str);

    fn clear_log(&mut self);

    fn set_marker_position(&mut self, x: f64, y: f64, visible: bool);

    /// Elapsed session time as `MM:SS`
    fn set_session_time(&mut self, elapsed: &str);

    /// Blocking notice the user has to acknowledge
    fn alert(&mut self, text: &str);

    /// Titled block of informational lines
    fn show_panel(&mut self, title: &str, lines: &[String]) {
        let mut text = title.to_string();
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        self.alert(&text);
    }
}

/// Bounded on-screen log, oldest line evicted first
#[derive(Debug, Clone)]
pub struct LogPane {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogPane {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message prefixed with the local wall-clock time and return
    /// the stored line
    pub fn push(&mut self, message: &str) -> String {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.clone());
        line
    }

    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for LogPane {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Presenter that records every call, for tests and headless runs
#[derive(Debug, Default)]
pub struct MemoryPresenter {
    pub stats: StatsView,
    pub stats_updates: usize,
    pub status: Option<(String, StatusLevel)>,
    pub status_history: Vec<(String, StatusLevel)>,
    pub log_lines: Vec<String>,
    pub marker: Option<(f64, f64, bool)>,
    pub session_time: Option<String>,
    pub alerts: Vec<String>,
}

impl MemoryPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_level(&self) -> Option<StatusLevel> {
        self.status.as_ref().map(|(_, level)| *level)
    }

    pub fn last_alert(&self) -> Option<&str> {
        self.alerts.last().map(String::as_str)
    }

    /// Whether any shown log line contains `needle`
    pub fn logged(&self, needle: &str) -> bool {
        self.log_lines.iter().any(|line| line.contains(needle))
    }
}

impl Presenter for MemoryPresenter {
    fn update_stats(&mut self, stats: &StatsView) {
        self.stats = stats.clone();
        self.stats_updates += 1;
    }

    fn set_status(&mut self, text: &str, level: StatusLevel) {
        self.status = Some((text.to_string(), level));
        self.status_history.push((text.to_string(), level));
    }

    fn append_log_line(&mut self, text: &str) {
        self.log_lines.push(text.to_string());
    }

    fn clear_log(&mut self) {
        self.log_lines.clear();
    }

    fn set_marker_position(&mut self, x: f64, y: f64, visible: bool) {
        self.marker = Some((x, y, visible));
    }

    fn set_session_time(&mut self, elapsed: &str) {
        self.session_time = Some(elapsed.to_string());
    }

    fn alert(&mut self, text: &str) {
        self.alerts.push(text.to_string());
    }
}
