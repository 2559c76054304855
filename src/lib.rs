//! gaze-recorder - Eye-Gaze Session Recorder
//!
//! Collects gaze coordinates from an external gaze source (JSON over UDP)
//! or an in-process fallback tracker, shows live statistics, keeps a
//! bounded on-screen log and exports sessions as JSON documents.
//!
//! # Architecture
//!
//! - **session**: the recorder, running statistics and export
//! - **link**: datagram listener, poller, dedicated channels, external window
//! - **presentation**: the output port the recorder drives
//! - **app**: the single event loop tying them together

pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{RecorderError, Result};

pub mod cli;
pub mod config;
pub mod link;
pub mod presentation;
pub mod repl;
pub mod session;
pub mod tracker;

// Event loop driver
pub mod app;

pub use app::GazeApp;
pub use presentation::{MemoryPresenter, Presenter, StatsView, StatusLevel};
pub use session::SessionRecorder;
