//! Running sample statistics and per-kind message summaries

pub mod tracker;

pub use tracker::{KindSummary, MessageKindStats, SampleStatistics};
