// Session recorder: the single owner of tracking state and both data logs
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{RecorderError, Result};
use crate::link::{EventBus, MessagePort, SessionEvent, TrustedOrigin};
use crate::presentation::{LogPane, Presenter, StatsView, StatusLevel, DEFAULT_LOG_CAPACITY};
use crate::session::export::{
    export_filename, raw_export_filename, ExportDocument, ExportSink, SessionInfo,
};
use crate::session::statistics::{MessageKindStats, SampleStatistics};
use crate::tracker::FallbackTracker;
use crate::types::messages::{kind_of, UNTYPED_KIND};
use crate::types::{GazeSample, InboundEnvelope, InboundMessage, RawMessage};

/// Tracking state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Stopped,
    Tracking { started_at: Instant },
}

/// Recorder tunables
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub trusted_origin: TrustedOrigin,
    pub default_accuracy: f64,
    pub log_capacity: usize,
    pub progress_every: usize,
    pub clock_interval: Duration,
}

impl RecorderSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            trusted_origin: config.trusted_origin()?,
            default_accuracy: config.recorder.default_accuracy,
            log_capacity: config.recorder.log_capacity,
            progress_every: config.recorder.progress_every,
            clock_interval: config.clock_interval(),
        })
    }
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            trusted_origin: TrustedOrigin::Exact(SocketAddr::from(([127, 0, 0, 1], 7070))),
            default_accuracy: 85.0,
            log_capacity: DEFAULT_LOG_CAPACITY,
            progress_every: 10,
            clock_interval: Duration::from_secs(1),
        }
    }
}

/// Dedicated channel currently bound to the dispatch path
struct ChannelBinding {
    id: u64,
    forwarder: JoinHandle<()>,
}

/// Records one gaze session at a time
///
/// Owned by the event loop; every method runs on that task. Background work
/// (session clock, channel forwarder, fallback tracker) reports back through
/// the [`EventBus`] and never touches this struct directly.
pub struct SessionRecorder<P: Presenter> {
    settings: RecorderSettings,
    presenter: P,
    bus: EventBus,
    state: TrackingState,
    session_id: Uuid,
    start_time: Option<DateTime<Utc>>,
    session_log: Vec<GazeSample>,
    raw_log: Vec<RawMessage>,
    stats: SampleStatistics,
    log: LogPane,
    marker: Option<(f64, f64)>,
    fallback: Option<Box<dyn FallbackTracker>>,
    clock: Option<JoinHandle<()>>,
    channel: Option<ChannelBinding>,
    next_binding: u64,
}

impl<P: Presenter> SessionRecorder<P> {
    pub fn new(settings: RecorderSettings, presenter: P, bus: EventBus) -> Self {
        let log = LogPane::new(settings.log_capacity);
        Self {
            settings,
            presenter,
            bus,
            state: TrackingState::Stopped,
            session_id: Uuid::new_v4(),
            start_time: None,
            session_log: Vec::new(),
            raw_log: Vec::new(),
            stats: SampleStatistics::new(),
            log,
            marker: None,
            fallback: None,
            clock: None,
            channel: None,
            next_binding: 0,
        }
    }

    /// Install an in-process tracker used by `start_tracking`
    pub fn with_fallback(mut self, tracker: Box<dyn FallbackTracker>) -> Self {
        self.fallback = Some(tracker);
        self
    }

    pub fn set_fallback(&mut self, tracker: Option<Box<dyn FallbackTracker>>) {
        if let Some(mut previous) = self.fallback.take() {
            previous.pause();
        }
        self.fallback = tracker;
    }

    pub fn fallback_name(&self) -> Option<&str> {
        self.fallback.as_ref().map(|t| t.name())
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackingState::Tracking { .. })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Time since tracking started, None while stopped
    pub fn elapsed(&self) -> Option<Duration> {
        match self.state {
            TrackingState::Tracking { started_at } => Some(started_at.elapsed()),
            TrackingState::Stopped => None,
        }
    }

    pub fn session_log(&self) -> &[GazeSample] {
        &self.session_log
    }

    pub fn raw_log(&self) -> &[RawMessage] {
        &self.raw_log
    }

    pub fn statistics(&self) -> &SampleStatistics {
        &self.stats
    }

    /// Live figures as last published to the presenter
    pub fn stats_view(&self) -> StatsView {
        StatsView {
            coords: self.session_log.last().map(GazeSample::coords),
            accuracy: self.stats.last_accuracy(),
            total_points: self.session_log.len(),
            raw_messages: self.raw_log.len(),
            average_accuracy: self.stats.average(),
        }
    }

    pub fn log_pane(&self) -> &LogPane {
        &self.log
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Begin a new session
    ///
    /// Starting while already tracking restarts the session.
    pub async fn start_tracking(&mut self) -> Result<()> {
        self.presenter
            .set_status("Initializing gaze tracking...", StatusLevel::Pending);

        if let Some(tracker) = self.fallback.as_mut() {
            let bus = self.bus.clone();
            tracker.configure_callback(Arc::new(move |x, y| {
                bus.emit(SessionEvent::FallbackSample { x, y });
            }));

            if let Err(e) = tracker.begin().await {
                error!(tracker = tracker.name(), error = %e, "fallback tracker failed to start");
                self.state = TrackingState::Stopped;
                self.cancel_clock();
                self.hide_marker();
                self.presenter.set_status(
                    "Initialization failed. Check camera permissions.",
                    StatusLevel::Error,
                );
                return Err(match e {
                    RecorderError::FallbackInit(_) => e,
                    other => RecorderError::FallbackInit(other.to_string()),
                });
            }
        }

        self.state = TrackingState::Tracking {
            started_at: Instant::now(),
        };
        self.start_time = Some(Utc::now());
        self.session_id = Uuid::new_v4();
        self.session_log.clear();
        self.stats.reset();

        self.presenter
            .set_status("Tracking active. Look at the screen.", StatusLevel::Active);
        self.publish_stats();
        self.spawn_clock();
        self.presenter.set_session_time(&format_elapsed(0));
        self.marker = Some((0.0, 0.0));
        self.presenter.set_marker_position(0.0, 0.0, false);

        self.log_message("Gaze tracking started");
        info!(session_id = %self.session_id, "gaze tracking started");
        Ok(())
    }

    /// End the current session
    pub fn stop_tracking(&mut self) {
        self.state = TrackingState::Stopped;
        if let Some(tracker) = self.fallback.as_mut() {
            tracker.pause();
        }

        self.presenter.set_status("Tracking stopped", StatusLevel::Stopped);
        self.cancel_clock();
        self.hide_marker();

        let collected = self.session_log.len();
        self.log_message(&format!("Tracking stopped. Collected {} points", collected));
        info!(session_id = %self.session_id, points = collected, "gaze tracking stopped");
    }

    fn hide_marker(&mut self) {
        if let Some((x, y)) = self.marker.take() {
            self.presenter.set_marker_position(x, y, false);
        }
    }

    /// Record one gaze estimate. Returns false, with no side effects, while
    /// stopped.
    pub fn accept_sample(&mut self, x: f64, y: f64, accuracy: Option<f64>) -> bool {
        if !self.is_tracking() {
            return false;
        }

        let accuracy = accuracy.unwrap_or(self.settings.default_accuracy);
        self.session_log.push(GazeSample::new(x, y, accuracy));
        self.stats.record(accuracy);
        self.publish_stats();

        if self.marker.is_some() {
            self.marker = Some((x, y));
            self.presenter.set_marker_position(x, y, true);
        }

        let count = self.session_log.len();
        if count % self.settings.progress_every.max(1) == 0 {
            self.log_message(&format!(
                "Point {}: ({}, {}) - {}%",
                count,
                x.round() as i64,
                y.round() as i64,
                accuracy.round() as i64
            ));
        }
        true
    }

    /// Handle a message from the shared socket
    ///
    /// Messages from any sender other than the trusted origin are dropped
    /// before they reach either log. Returns whether the message was
    /// accepted.
    pub fn handle_external_message(&mut self, envelope: InboundEnvelope) -> bool {
        let InboundEnvelope { origin, data, port } = envelope;
        if !self.settings.trusted_origin.matches(&origin) {
            return false;
        }

        self.dispatch(data, port, Some(origin));
        true
    }

    /// Handle a message that arrived on a dedicated channel
    ///
    /// Messages from a channel that has since been replaced are discarded.
    pub fn handle_channel_message(&mut self, binding: u64, data: RawMessage) -> bool {
        match &self.channel {
            Some(current) if current.id == binding => {}
            _ => {
                debug!(binding, "message from stale channel dropped");
                return false;
            }
        }

        self.dispatch(data, None, None);
        true
    }

    fn dispatch(&mut self, data: RawMessage, port: Option<MessagePort>, origin: Option<SocketAddr>) {
        let message = InboundMessage::parse(&data);
        debug!(kind = message.kind(), "gaze source message");
        self.raw_log.push(data);

        match message {
            InboundMessage::Capture { x, y, confidence } => {
                if self.is_tracking() {
                    self.accept_sample(x, y, confidence);
                }
            }
            InboundMessage::Connect { device_label } => {
                let label = device_label.as_deref().unwrap_or("unknown device");
                self.log_message(&format!("Gaze source connected: {}", label));
            }
            InboundMessage::Dispose => {
                self.log_message("Gaze source disconnected from camera");
            }
            InboundMessage::Calibration { payload } => {
                self.log_message(&format!("Calibration: {}", payload));
            }
            InboundMessage::Error { message, payload } => {
                let text = message.unwrap_or_else(|| payload.to_string());
                warn!(error = %text, "gaze source reported an error");
                self.log_message(&format!("Error: {}", text));
            }
            InboundMessage::Channel { port: advertised } => {
                self.open_channel(port, advertised, origin);
            }
            InboundMessage::Unknown { kind, payload } => {
                let kind = kind.as_deref().unwrap_or(UNTYPED_KIND);
                self.log_message(&format!("Unknown message type {}: {}", kind, payload));
            }
        }
    }

    fn open_channel(
        &mut self,
        transferred: Option<MessagePort>,
        advertised: Option<u16>,
        origin: Option<SocketAddr>,
    ) {
        let port = match (transferred, advertised, origin) {
            (Some(port), _, _) => port,
            (None, Some(number), Some(origin)) => {
                match MessagePort::connect_udp(SocketAddr::new(origin.ip(), number)) {
                    Ok(port) => port,
                    Err(e) => {
                        warn!(error = %e, "could not open gaze channel");
                        self.log_message(&format!("Could not open gaze channel: {}", e));
                        return;
                    }
                }
            }
            _ => {
                warn!("channel message without a usable port");
                return;
            }
        };

        self.bind_channel(port);
    }

    /// Route messages from `port` through the dispatch path, replacing any
    /// channel already bound
    pub fn bind_channel(&mut self, mut port: MessagePort) {
        self.close_channel();

        self.next_binding += 1;
        let id = self.next_binding;
        let bus = self.bus.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(data) = port.recv().await {
                if !bus.emit(SessionEvent::ChannelMessage { binding: id, data }) {
                    break;
                }
            }
        });
        self.channel = Some(ChannelBinding { id, forwarder });

        self.log_message("Gaze channel established");
        info!(binding = id, "gaze channel established");
    }

    /// Close the bound channel, if any. Its port is dropped with the
    /// forwarder.
    pub fn close_channel(&mut self) {
        if let Some(previous) = self.channel.take() {
            previous.forwarder.abort();
            debug!(binding = previous.id, "gaze channel closed");
        }
    }

    /// Drop both logs and reset the statistics
    pub fn clear_data(&mut self) {
        self.session_log.clear();
        self.raw_log.clear();
        self.stats.reset();

        self.presenter.update_stats(&StatsView::default());
        self.log.clear();
        self.presenter.clear_log();
        self.log_message("All data cleared");
        info!("session data cleared");
    }

    /// Export both logs as one document
    pub fn export_data(&mut self, sink: &mut dyn ExportSink) -> Result<PathBuf> {
        if self.raw_log.is_empty() && self.session_log.is_empty() {
            self.presenter.alert("No data to export");
            return Err(RecorderError::NothingToExport);
        }

        let now = Utc::now();
        let document = ExportDocument {
            session_info: SessionInfo {
                session_id: self.session_id,
                start_time: self.start_time,
                end_time: now,
                total_raw_messages: self.raw_log.len(),
                total_points: self.session_log.len(),
                average_accuracy: self.stats.average(),
            },
            raw_messages: self.raw_log.clone(),
            gaze_points: self.session_log.clone(),
        };

        let contents = serde_json::to_string_pretty(&document)?;
        let path = sink.deliver(&export_filename(now), &contents)?;

        self.log_message(&format!(
            "Exported {} raw messages and {} gaze points",
            self.raw_log.len(),
            self.session_log.len()
        ));
        info!(path = %path.display(), "session exported");
        Ok(path)
    }

    /// Export the raw-message log alone
    pub fn export_raw_data(&mut self, sink: &mut dyn ExportSink) -> Result<PathBuf> {
        if self.raw_log.is_empty() {
            self.presenter.alert("No raw gaze source data to export");
            return Err(RecorderError::NothingToExport);
        }

        let now = Utc::now();
        let contents = serde_json::to_string_pretty(&self.raw_log)?;
        let path = sink.deliver(&raw_export_filename(now), &contents)?;

        self.log_message(&format!("Exported {} gaze source messages", self.raw_log.len()));
        info!(path = %path.display(), "raw messages exported");
        Ok(path)
    }

    /// Summarise the raw log by message kind and present it
    pub fn show_stats(&mut self) -> Option<MessageKindStats> {
        if self.raw_log.is_empty() {
            self.presenter.alert("No data to show stats for");
            return None;
        }

        let stats = MessageKindStats::from_messages(&self.raw_log);
        self.presenter.alert(&stats.report());
        self.log_message(&format!("Stats: {} message types", stats.kinds().len()));
        Some(stats)
    }

    /// Raw messages whose `type` is `kind`
    pub fn messages_of_kind(&self, kind: &str) -> Vec<&RawMessage> {
        self.raw_log
            .iter()
            .filter(|m| kind_of(m).unwrap_or(UNTYPED_KIND) == kind)
            .collect()
    }

    /// Per-kind counts in first-seen order
    pub fn kind_counts(&self) -> Vec<(String, usize)> {
        MessageKindStats::from_messages(&self.raw_log)
            .kinds()
            .iter()
            .map(|k| (k.kind.clone(), k.count))
            .collect()
    }

    /// Publish the elapsed session time
    pub fn tick_clock(&mut self) {
        if let Some(elapsed) = self.elapsed() {
            self.presenter.set_session_time(&format_elapsed(elapsed.as_secs()));
        }
    }

    /// Append a line to the on-screen log
    pub fn log_message(&mut self, message: &str) {
        let line = self.log.push(message);
        self.presenter.append_log_line(&line);
    }

    fn publish_stats(&mut self) {
        let view = self.stats_view();
        self.presenter.update_stats(&view);
    }

    fn spawn_clock(&mut self) {
        self.cancel_clock();

        let bus = self.bus.clone();
        let period = self.settings.clock_interval.max(Duration::from_millis(1));
        self.clock = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !bus.emit(SessionEvent::ClockTick) {
                    break;
                }
            }
        }));
    }

    fn cancel_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
    }
}

impl<P: Presenter> Drop for SessionRecorder<P> {
    fn drop(&mut self) {
        self.cancel_clock();
        self.close_channel();
        if let Some(tracker) = self.fallback.as_mut() {
            tracker.pause();
        }
    }
}

/// Whole seconds as `MM:SS`; minutes keep growing past 59
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
