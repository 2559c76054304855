//! Dedicated message channels
//!
//! A [`MessagePort`] is the receiving end of a channel the gaze source hands
//! over. It is either an in-process pair or a UDP socket connected to the
//! endpoint advertised by the source. Closing a port stops delivery
//! immediately: anything still queued or sent later is discarded.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::errors::{RecorderError, Result};
use crate::link::udp::{decode_datagram, MAX_DATAGRAM};
use crate::types::OutboundMessage;

/// Sending end of an in-process channel
#[derive(Debug, Clone)]
pub struct PortSender {
    sender: mpsc::UnboundedSender<Value>,
}

impl PortSender {
    /// Post a message. Returns false once the port is closed.
    pub fn post(&self, data: Value) -> bool {
        self.sender.send(data).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving end of a dedicated channel
#[derive(Debug)]
pub struct MessagePort {
    receiver: mpsc::UnboundedReceiver<Value>,
    reader: Option<JoinHandle<()>>,
    peer: Option<SocketAddr>,
}

impl MessagePort {
    /// In-process channel, used for tests and embedding
    pub fn pair() -> (PortSender, MessagePort) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            PortSender { sender },
            MessagePort {
                receiver,
                reader: None,
                peer: None,
            },
        )
    }

    /// Open a UDP channel to the endpoint the source advertised
    ///
    /// The socket is connected, so only datagrams from `peer` are read. One
    /// `REQUEST_GAZE_DATA` is sent on open so the source learns where to
    /// push.
    pub fn connect_udp(peer: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let std_socket = std::net::UdpSocket::bind(local)
            .and_then(|s| s.connect(peer).map(|_| s))
            .and_then(|s| s.set_nonblocking(true).map(|_| s))
            .map_err(|e| RecorderError::Transport(format!("channel to {}: {}", peer, e)))?;
        let socket = UdpSocket::from_std(std_socket)
            .map_err(|e| RecorderError::Transport(format!("channel to {}: {}", peer, e)))?;

        if let Err(e) = socket.try_send(&OutboundMessage::RequestGazeData.to_bytes()) {
            trace!(%peer, error = %e, "channel registration not delivered");
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv(&mut buf).await {
                    Ok(len) => {
                        if sender.send(decode_datagram(&buf[..len])).is_err() {
                            break;
                        }
                    }
                    Err(e) => trace!(%peer, error = %e, "channel receive failed"),
                }
            }
        });
        debug!(%peer, "gaze channel socket connected");

        Ok(MessagePort {
            receiver,
            reader: Some(reader),
            peer: Some(peer),
        })
    }

    /// Next message, or None once closed
    pub async fn recv(&mut self) -> Option<Value> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.receiver.try_recv().ok()
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Stop delivery and release the socket
    pub fn close(&mut self) {
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for MessagePort {
    fn drop(&mut self) {
        self.close();
    }
}
