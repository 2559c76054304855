//! Type definitions module
//!
//! Gaze samples and the messages exchanged with the external gaze source.

pub mod messages;
pub mod sample;

// Re-export commonly used types
pub use messages::{InboundEnvelope, InboundMessage, OutboundMessage, RawMessage};
pub use sample::GazeSample;
