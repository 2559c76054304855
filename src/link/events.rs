//! Event bus feeding the session event loop
//!
//! Multi-producer, single consumer. Producers are the UDP listener, channel
//! forwarders, the session clock, the fallback tracker, the window watcher
//! and the input thread.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::types::InboundEnvelope;

/// Everything the event loop reacts to
#[derive(Debug)]
pub enum SessionEvent {
    /// Datagram received on the shared socket
    Inbound(InboundEnvelope),

    /// Message received on a dedicated channel
    ChannelMessage { binding: u64, data: Value },

    /// Estimate from the in-process fallback tracker
    FallbackSample { x: f64, y: f64 },

    /// Session clock tick
    ClockTick,

    /// The external gaze source process exited
    WindowClosed { window: u64 },

    /// A console line
    Input(String),

    /// Console reached EOF
    InputClosed,
}

/// Sending half of the session event loop
///
/// Unbounded so that producers never block; the loop drains faster than
/// any source pushes.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl EventBus {
    /// Create new event bus and its receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (EventBus { sender }, receiver)
    }

    /// Emit an event. Returns false once the loop has shut down.
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission() {
        let (bus, mut receiver) = EventBus::new();

        assert!(bus.emit(SessionEvent::ClockTick));
        assert!(bus.emit(SessionEvent::FallbackSample { x: 1.0, y: 2.0 }));

        assert!(matches!(receiver.recv().await, Some(SessionEvent::ClockTick)));
        assert!(matches!(
            receiver.recv().await,
            Some(SessionEvent::FallbackSample { x, y }) if x == 1.0 && y == 2.0
        ));
    }

    #[test]
    fn test_multiple_producers() {
        let (bus, mut receiver) = EventBus::new();
        let other = bus.clone();

        bus.emit(SessionEvent::Input("/start".into()));
        other.emit(SessionEvent::InputClosed);

        tokio_test::block_on(async {
            assert!(matches!(receiver.recv().await, Some(SessionEvent::Input(_))));
            assert!(matches!(receiver.recv().await, Some(SessionEvent::InputClosed)));
        });
    }

    #[test]
    fn test_emit_after_shutdown() {
        let (bus, receiver) = EventBus::new();
        drop(receiver);

        assert!(bus.is_closed());
        assert!(!bus.emit(SessionEvent::ClockTick));
    }
}
