//! UDP datagram transport
//!
//! One JSON message per datagram. The listener forwards every datagram with
//! its sender address; the poller fires requests at a fixed interval and
//! ignores send failures.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::errors::{RecorderError, Result};
use crate::link::events::{EventBus, SessionEvent};
use crate::types::{InboundEnvelope, OutboundMessage, RawMessage};

/// Largest payload a UDP datagram can carry over IPv4
pub const MAX_DATAGRAM: usize = 65_507;

/// Bind the shared socket used for both requests and replies
pub async fn bind_socket(addr: SocketAddr) -> Result<Arc<UdpSocket>> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|e| RecorderError::Transport(format!("bind {}: {}", addr, e)))?;
    info!(addr = %socket.local_addr().unwrap_or(addr), "gaze socket bound");
    Ok(Arc::new(socket))
}

/// Decode a datagram body. Non-JSON bodies are kept as a JSON string.
pub fn decode_datagram(bytes: &[u8]) -> RawMessage {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(bytes).trim().to_string()),
    }
}

/// Forward every datagram on `socket` to the event loop
pub fn spawn_listener(socket: Arc<UdpSocket>, bus: EventBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, origin) = match socket.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(e) => {
                    // ICMP unreachable from a previous send surfaces here on some platforms
                    warn!(error = %e, "gaze datagram receive failed");
                    continue;
                }
            };

            let data = decode_datagram(&buf[..len]);
            trace!(%origin, len, "gaze datagram");
            if !bus.emit(SessionEvent::Inbound(InboundEnvelope::new(origin, data))) {
                debug!("event loop closed, stopping listener");
                break;
            }
        }
    })
}

/// Send `REQUEST_GAZE_DATA` to `peer` every `interval`
pub fn spawn_poller(socket: Arc<UdpSocket>, peer: SocketAddr, interval: Duration) -> JoinHandle<()> {
    let request = OutboundMessage::RequestGazeData.to_bytes();
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = socket.send_to(&request, peer).await {
                trace!(%peer, error = %e, "gaze data request not delivered");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json_datagram() {
        let value = decode_datagram(br#"{"type":"capture","x":1,"y":2}"#);
        assert_eq!(value, json!({"type": "capture", "x": 1, "y": 2}));
    }

    #[test]
    fn test_decode_text_datagram() {
        let value = decode_datagram(b"x=0.1 y=0.2\n");
        assert_eq!(value, Value::String("x=0.1 y=0.2".to_string()));
    }

    #[tokio::test]
    async fn test_listener_forwards_with_origin() {
        let socket = bind_socket("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let target = socket.local_addr().unwrap();
        let (bus, mut events) = EventBus::new();
        let listener = spawn_listener(socket, bus);

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(br#"{"type":"dispose"}"#, target)
            .await
            .unwrap();

        match events.recv().await {
            Some(SessionEvent::Inbound(envelope)) => {
                assert_eq!(envelope.origin, sender.local_addr().unwrap());
                assert_eq!(envelope.data, json!({"type": "dispose"}));
                assert!(envelope.port.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        listener.abort();
    }

    #[tokio::test]
    async fn test_poller_sends_requests() {
        let socket = bind_socket("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let poller = spawn_poller(
            socket,
            source.local_addr().unwrap(),
            Duration::from_millis(10),
        );

        let mut buf = [0u8; 256];
        let (len, _) = source.recv_from(&mut buf).await.unwrap();
        let value: Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(value, json!({"type": "REQUEST_GAZE_DATA"}));
        poller.abort();
    }
}
