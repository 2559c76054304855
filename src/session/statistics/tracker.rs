// Running accuracy figures and per-kind message grouping
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::messages::{kind_of, RawMessage, UNTYPED_KIND};

/// Running accuracy statistics over accepted samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStatistics {
    count: usize,
    accuracy_sum: f64,
    last_accuracy: Option<f64>,
}

impl SampleStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accepted sample
    pub fn record(&mut self, accuracy: f64) {
        self.count += 1;
        self.accuracy_sum += accuracy;
        self.last_accuracy = Some(accuracy);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn last_accuracy(&self) -> Option<f64> {
        self.last_accuracy
    }

    /// Mean accuracy, 0 when nothing was recorded
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.accuracy_sum / self.count as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Count and first example of one message kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSummary {
    pub kind: String,
    pub count: usize,
    pub example: Value,
}

/// Raw messages grouped by kind in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageKindStats {
    kinds: Vec<KindSummary>,
    total: usize,
}

impl MessageKindStats {
    pub fn from_messages(messages: &[RawMessage]) -> Self {
        let mut kinds: Vec<KindSummary> = Vec::new();

        for message in messages {
            let kind = kind_of(message).unwrap_or(UNTYPED_KIND);
            match kinds.iter_mut().find(|k| k.kind == kind) {
                Some(summary) => summary.count += 1,
                None => kinds.push(KindSummary {
                    kind: kind.to_string(),
                    count: 1,
                    example: message.clone(),
                }),
            }
        }

        Self {
            kinds,
            total: messages.len(),
        }
    }

    pub fn kinds(&self) -> &[KindSummary] {
        &self.kinds
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count_of(&self, kind: &str) -> usize {
        self.kinds
            .iter()
            .find(|k| k.kind == kind)
            .map(|k| k.count)
            .unwrap_or(0)
    }

    /// Human-readable summary with one pretty-printed example per kind
    pub fn report(&self) -> String {
        let mut report = String::from("Gaze source statistics:\n\n");

        for summary in &self.kinds {
            report.push_str(&format!("{}: {} messages\n", summary.kind, summary.count));
        }
        report.push_str(&format!("\nTotal: {} messages\n\nExamples:\n", self.total));

        for summary in &self.kinds {
            let example = serde_json::to_string_pretty(&summary.example)
                .unwrap_or_else(|_| summary.example.to_string());
            report.push_str(&format!("\n{}:\n{}\n", summary.kind, example));
        }

        report
    }
}
