//! Session recording: tracking state, sample logs and their side effects

pub mod recorder;

pub use recorder::{format_elapsed, RecorderSettings, SessionRecorder, TrackingState};
