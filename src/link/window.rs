//! External gaze source launched as a child process
//!
//! While the process lives it is polled for data. When it exits the watcher
//! reports [`SessionEvent::WindowClosed`] so the loop can tear down the
//! poller and the listener.

use std::net::SocketAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::{RecorderError, Result};
use crate::link::events::{EventBus, SessionEvent};
use crate::link::udp::{spawn_listener, spawn_poller};

/// A running external gaze source and the tasks serving it
#[derive(Debug)]
pub struct ExternalWindow {
    id: u64,
    pid: Option<u32>,
    poller: JoinHandle<()>,
    listener: Option<JoinHandle<()>>,
    watcher: JoinHandle<()>,
}

impl ExternalWindow {
    /// Spawn `command` and start polling `peer`
    ///
    /// When `listen` is set the window also owns a datagram listener on
    /// `socket`; otherwise replies reach an existing listener.
    pub fn open(
        id: u64,
        command: &[String],
        socket: Arc<UdpSocket>,
        peer: SocketAddr,
        poll_interval: Duration,
        listen: bool,
        bus: EventBus,
    ) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| RecorderError::WindowOpen("no window command configured".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecorderError::WindowOpen(format!("{}: {}", program, e)))?;
        let pid = child.id();
        info!(program = %program, ?pid, "gaze source window opened");

        let listener = listen.then(|| spawn_listener(socket.clone(), bus.clone()));
        let poller = spawn_poller(socket, peer, poll_interval);
        let watcher = tokio::spawn(async move {
            let status = child.wait().await;
            debug!(?status, "gaze source window exited");
            bus.emit(SessionEvent::WindowClosed { window: id });
        });

        Ok(Self {
            id,
            pid,
            poller,
            listener,
            watcher,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Stop polling and listening after the process exited on its own
    pub fn detach(self) {
        self.poller.abort();
        if let Some(listener) = self.listener {
            listener.abort();
        }
    }

    /// Kill the process and stop every task serving it
    pub fn close(self) {
        // Aborting the watcher drops the child, which kills it.
        self.watcher.abort();
        self.detach();
    }
}
