//! Message types for gaze source communication
//!
//! Inbound payloads are kept verbatim as [`RawMessage`] and interpreted
//! through [`InboundMessage`], a closed set of kinds keyed by the `type`
//! field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;

use crate::link::MessagePort;

/// Inbound payload exactly as received
pub type RawMessage = Value;

/// Kind label used when a payload carries no string `type` field
pub const UNTYPED_KIND: &str = "(untyped)";

/// Interpreted inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A gaze estimate (`capture` or `GAZE_DATA`)
    Capture {
        x: f64,
        y: f64,
        confidence: Option<f64>,
    },

    /// Source attached to a camera
    Connect { device_label: Option<String> },

    /// Source released its camera
    Dispose,

    /// Calibration progress, payload is opaque
    Calibration { payload: Value },

    /// Source-side failure
    Error { message: Option<String>, payload: Value },

    /// Hand-over of a dedicated push channel
    Channel { port: Option<u16> },

    /// Anything else, including malformed captures
    Unknown { kind: Option<String>, payload: Value },
}

/// Wire shape of the known kinds
#[derive(Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    #[serde(rename = "capture", alias = "GAZE_DATA")]
    Capture {
        x: f64,
        y: f64,
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        accuracy: Option<f64>,
    },

    #[serde(rename = "connect")]
    Connect {
        #[serde(default, rename = "deviceLabel")]
        device_label: Option<String>,
    },

    #[serde(rename = "dispose")]
    Dispose {},

    #[serde(rename = "calibration")]
    Calibration {},

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<Value>,
    },

    #[serde(rename = "channel")]
    Channel {
        #[serde(default)]
        port: Option<u16>,
    },
}

impl InboundMessage {
    /// Interpret a raw payload. Never fails.
    pub fn parse(raw: &RawMessage) -> Self {
        let wire = match serde_json::from_value::<WireMessage>(raw.clone()) {
            Ok(wire) => wire,
            Err(_) => {
                return InboundMessage::Unknown {
                    kind: kind_of(raw).map(str::to_string),
                    payload: raw.clone(),
                }
            }
        };

        match wire {
            WireMessage::Capture {
                x,
                y,
                confidence,
                accuracy,
            } => InboundMessage::Capture {
                x,
                y,
                confidence: confidence.or(accuracy),
            },
            WireMessage::Connect { device_label } => InboundMessage::Connect { device_label },
            WireMessage::Dispose {} => InboundMessage::Dispose,
            WireMessage::Calibration {} => InboundMessage::Calibration {
                payload: raw.clone(),
            },
            WireMessage::Error { message } => InboundMessage::Error {
                message: message.map(|m| match m {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
                payload: raw.clone(),
            },
            WireMessage::Channel { port } => InboundMessage::Channel { port },
        }
    }

    /// Short kind label for logging
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::Capture { .. } => "capture",
            InboundMessage::Connect { .. } => "connect",
            InboundMessage::Dispose => "dispose",
            InboundMessage::Calibration { .. } => "calibration",
            InboundMessage::Error { .. } => "error",
            InboundMessage::Channel { .. } => "channel",
            InboundMessage::Unknown { kind, .. } => kind.as_deref().unwrap_or(UNTYPED_KIND),
        }
    }
}

/// The `type` field of a raw payload, if it is a string
pub fn kind_of(raw: &RawMessage) -> Option<&str> {
    raw.get("type").and_then(Value::as_str)
}

/// Messages sent to the gaze source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Ask the source to push its latest estimate
    #[serde(rename = "REQUEST_GAZE_DATA")]
    RequestGazeData,
}

impl OutboundMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// A delivered inbound message with its sender
#[derive(Debug)]
pub struct InboundEnvelope {
    /// Sender address, checked against the trusted origin
    pub origin: SocketAddr,
    pub data: RawMessage,
    /// Transferred channel, if the sender handed one over
    pub port: Option<MessagePort>,
}

impl InboundEnvelope {
    pub fn new(origin: SocketAddr, data: RawMessage) -> Self {
        Self {
            origin,
            data,
            port: None,
        }
    }

    pub fn with_port(mut self, port: MessagePort) -> Self {
        self.port = Some(port);
        self
    }
}
