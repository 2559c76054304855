// Gaze session recording, statistics and export
//
// Components:
// - Session Recorder: tracking state, sample and raw-message logs
// - Statistics: running accuracy and per-kind message summaries
// - Export: JSON documents written through an export sink

pub mod export;
pub mod recording;
pub mod statistics;

// Re-export key types
pub use export::{DirectorySink, ExportDocument, ExportSink, SessionInfo};
pub use recording::{RecorderSettings, SessionRecorder, TrackingState};
pub use statistics::{MessageKindStats, SampleStatistics};
