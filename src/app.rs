//! Application driver
//!
//! Owns the recorder, the shared socket and every transport handle, and
//! drains the single [`SessionEvent`] queue. All recorder mutation happens
//! on the task running [`GazeApp::run`].

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{Config, TransportMode};
use crate::errors::{RecorderError, Result};
use crate::link::{bind_socket, spawn_listener, spawn_poller, EventBus, ExternalWindow, SessionEvent};
use crate::presentation::Presenter;
use crate::repl::{Command, CommandHandler};
use crate::session::recording::format_elapsed;
use crate::session::{DirectorySink, RecorderSettings, SessionRecorder};
use crate::tracker::{SimulatedConfig, SimulatedTracker};

/// Interactive recorder application
pub struct GazeApp<P: Presenter> {
    config: Config,
    recorder: SessionRecorder<P>,
    bus: EventBus,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    socket: Arc<UdpSocket>,
    listener: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
    window: Option<ExternalWindow>,
    next_window: u64,
    sink: DirectorySink,
    commands: CommandHandler,
}

impl<P: Presenter> GazeApp<P> {
    /// Bind the socket and wire the recorder for the configured transport
    pub async fn new(config: Config, presenter: P) -> Result<Self> {
        config.validate()?;
        let settings = RecorderSettings::from_config(&config)?;
        let (bus, events) = EventBus::new();
        let socket = bind_socket(config.bind_addr()?).await?;

        let mut recorder = SessionRecorder::new(settings, presenter, bus.clone());
        if config.fallback.enabled {
            recorder.set_fallback(Some(Box::new(SimulatedTracker::new(SimulatedConfig::from(
                &config.fallback,
            )))));
        }

        // Window mode listens only while the source process runs
        let listener = match config.transport.mode {
            TransportMode::Window => None,
            TransportMode::Poll | TransportMode::Channel => {
                Some(spawn_listener(socket.clone(), bus.clone()))
            }
        };

        let sink = DirectorySink::new(config.export.resolve_dir());
        info!(
            mode = %config.transport.mode,
            trusted_origin = %config.source.trusted_origin,
            export_dir = %sink.dir().display(),
            "gaze recorder ready"
        );

        Ok(Self {
            config,
            recorder,
            bus,
            events,
            socket,
            listener,
            poller: None,
            window: None,
            next_window: 0,
            sink,
            commands: CommandHandler::new(),
        })
    }

    /// Handle for producers outside the app (console thread, tests)
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn recorder(&self) -> &SessionRecorder<P> {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut SessionRecorder<P> {
        &mut self.recorder
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn sink(&self) -> &DirectorySink {
        &self.sink
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    /// Drain events until `/exit` or the console closes
    pub async fn run(&mut self) -> Result<()> {
        while let Some(event) = self.events.recv().await {
            if !self.handle_event(event).await? {
                break;
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Wait for the next queued event
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Handle one event. Returns false when the session should end.
    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<bool> {
        match event {
            SessionEvent::Inbound(envelope) => {
                self.recorder.handle_external_message(envelope);
            }
            SessionEvent::ChannelMessage { binding, data } => {
                self.recorder.handle_channel_message(binding, data);
            }
            SessionEvent::FallbackSample { x, y } => {
                self.recorder.accept_sample(x, y, None);
            }
            SessionEvent::ClockTick => self.recorder.tick_clock(),
            SessionEvent::WindowClosed { window } => self.on_window_closed(window),
            SessionEvent::Input(line) => return self.handle_input(&line).await,
            SessionEvent::InputClosed => return Ok(false),
        }
        Ok(true)
    }

    /// Parse and execute one console line
    pub async fn handle_input(&mut self, line: &str) -> Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }
        let command = self.commands.parse(line);
        self.execute(command).await
    }

    /// Execute a command. Returns false on `/exit`.
    pub async fn execute(&mut self, command: Command) -> Result<bool> {
        debug!(?command, "executing command");
        match command {
            Command::Start => match self.recorder.start_tracking().await {
                Ok(()) => self.start_polling(),
                Err(e) => {
                    warn!(error = %e, "tracking did not start");
                    self.stop_polling();
                }
            },
            Command::Stop => {
                self.recorder.stop_tracking();
                self.stop_polling();
            }
            Command::Clear => self.recorder.clear_data(),
            Command::Export => {
                let result = self.recorder.export_data(&mut self.sink);
                self.report_export(result);
            }
            Command::ExportRaw => {
                let result = self.recorder.export_raw_data(&mut self.sink);
                self.report_export(result);
            }
            Command::Stats => {
                self.recorder.show_stats();
            }
            Command::Open => self.open_window(),
            Command::Status => self.show_status(),
            Command::Log => self.show_log(),
            Command::Help => self.commands.show_help(),
            Command::Exit => return Ok(false),
            Command::Unknown { input } => self.commands.show_unknown(&input),
        }
        Ok(true)
    }

    fn report_export(&mut self, result: Result<std::path::PathBuf>) {
        match result {
            Ok(path) => self
                .recorder
                .log_message(&format!("Saved {}", path.display())),
            // Already alerted by the recorder
            Err(RecorderError::NothingToExport) => {}
            Err(e) => {
                error!(error = %e, "export failed");
                self.recorder
                    .presenter_mut()
                    .alert(&format!("Export failed: {}", e));
            }
        }
    }

    /// Poll mode requests data only while tracking
    fn start_polling(&mut self) {
        if self.config.transport.mode != TransportMode::Poll {
            return;
        }
        let Some(peer) = self.recorder.settings().trusted_origin.peer() else {
            return;
        };

        self.stop_polling();
        self.poller = Some(spawn_poller(self.socket.clone(), peer, self.config.poll_interval()));
        debug!(%peer, "polling gaze source");
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    fn open_window(&mut self) {
        let Some(peer) = self.recorder.settings().trusted_origin.peer() else {
            self.recorder.presenter_mut().alert(
                "Could not open the gaze source. The trusted origin must be HOST:PORT.",
            );
            return;
        };

        if let Some(previous) = self.window.take() {
            previous.close();
        }

        self.next_window += 1;
        let listen = self.listener.is_none();
        match ExternalWindow::open(
            self.next_window,
            &self.config.source.window_command,
            self.socket.clone(),
            peer,
            self.config.poll_interval(),
            listen,
            self.bus.clone(),
        ) {
            Ok(window) => {
                self.window = Some(window);
                self.recorder.log_message("Gaze source opened in a new window");
            }
            Err(e) => {
                warn!(error = %e, "gaze source window not opened");
                self.recorder
                    .presenter_mut()
                    .alert(&format!("Could not open the gaze source. {}", e));
            }
        }
    }

    fn on_window_closed(&mut self, id: u64) {
        match self.window.take() {
            Some(window) if window.id() == id => {
                window.detach();
                self.recorder.log_message("Gaze source window closed");
            }
            other => {
                debug!(window = id, "stale window exit ignored");
                self.window = other;
            }
        }
    }

    fn show_status(&mut self) {
        let view = self.recorder.stats_view();
        let state = if self.recorder.is_tracking() { "Tracking" } else { "Stopped" };
        let elapsed = self
            .recorder
            .elapsed()
            .map(|d| format_elapsed(d.as_secs()))
            .unwrap_or_else(|| "--:--".to_string());
        let listening = self
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let lines = vec![
            format!("State: {}", state),
            format!("Session time: {}", elapsed),
            format!("Session ID: {}", self.recorder.session_id()),
            format!("Gaze points: {}", view.total_points),
            format!("Raw messages: {}", view.raw_messages),
            format!("Current gaze: {}", view.coords_text()),
            format!("Latest accuracy: {}", view.accuracy_text()),
            format!("Average accuracy: {}", view.average_text()),
            format!("Transport: {}", self.config.transport.mode),
            format!("Trusted origin: {}", self.recorder.settings().trusted_origin),
            format!("Listening on: {}", listening),
            format!("Channel: {}", if self.recorder.has_channel() { "open" } else { "none" }),
            format!("Window: {}", if self.window.is_some() { "open" } else { "closed" }),
            format!("Fallback: {}", self.recorder.fallback_name().unwrap_or("none")),
            format!("Export directory: {}", self.sink.dir().display()),
        ];
        self.recorder.presenter_mut().show_panel("Session Status", &lines);
    }

    fn show_log(&mut self) {
        let mut lines: Vec<String> = self.recorder.log_pane().lines().cloned().collect();
        if lines.is_empty() {
            lines.push("(empty)".to_string());
        }
        self.recorder.presenter_mut().show_panel("Log", &lines);
    }

    /// Stop every background task
    pub fn shutdown(&mut self) {
        if self.recorder.is_tracking() {
            self.recorder.stop_tracking();
        }
        self.stop_polling();
        if let Some(window) = self.window.take() {
            window.close();
        }
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.recorder.close_channel();
        info!("gaze recorder shut down");
    }
}
