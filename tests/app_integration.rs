//! End-to-end: console commands and UDP datagrams driven through the app's
//! event loop.

use async_trait::async_trait;
use gaze_recorder::app::GazeApp;
use gaze_recorder::config::{Config, TransportMode};
use gaze_recorder::errors::{RecorderError, Result};
use gaze_recorder::link::SessionEvent;
use gaze_recorder::presentation::{MemoryPresenter, StatusLevel};
use gaze_recorder::session::ExportDocument;
use gaze_recorder::tracker::{FallbackTracker, GazeCallback};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::UdpSocket;

fn test_config(trusted: &str, mode: TransportMode, export_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.source.trusted_origin = trusted.to_string();
    config.source.bind_addr = "127.0.0.1:0".to_string();
    config.transport.mode = mode;
    config.transport.poll_interval_ms = 20;
    config.export.output_dir = Some(export_dir.path().to_string_lossy().into_owned());
    config
}

/// Process events until one of the inbound kind arrives and is handled
async fn pump_inbound(app: &mut GazeApp<MemoryPresenter>) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), app.next_event())
            .await
            .expect("timed out waiting for datagram")
            .expect("event bus closed");
        let inbound = matches!(
            event,
            SessionEvent::Inbound(_) | SessionEvent::ChannelMessage { .. }
        );
        assert!(app.handle_event(event).await.unwrap());
        if inbound {
            return;
        }
    }
}

#[tokio::test]
async fn console_commands_drive_recorder() {
    let export_dir = TempDir::new().unwrap();
    let config = test_config("127.0.0.1:7070", TransportMode::Channel, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();

    assert!(app.handle_input("/start").await.unwrap());
    assert!(app.recorder().is_tracking());
    assert_eq!(app.recorder().presenter().status_level(), Some(StatusLevel::Active));

    let bus = app.bus();
    bus.emit(SessionEvent::FallbackSample { x: 100.0, y: 200.0 });
    let event = app.next_event().await.unwrap();
    assert!(app.handle_event(event).await.unwrap());
    assert_eq!(app.recorder().session_log().len(), 1);

    assert!(app.handle_input("/stop").await.unwrap());
    assert!(!app.recorder().is_tracking());

    assert!(app.handle_input("/export").await.unwrap());
    let exports = app.sink().list_exports().unwrap();
    assert_eq!(exports.len(), 1);
    let document: ExportDocument =
        serde_json::from_str(&std::fs::read_to_string(&exports[0]).unwrap()).unwrap();
    assert_eq!(document.session_info.total_points, 1);

    assert!(app.handle_input("/status").await.unwrap());
    assert!(app
        .recorder()
        .presenter()
        .last_alert()
        .unwrap()
        .starts_with("Session Status\nState: Stopped"));
    let status = app.recorder().presenter().last_alert().unwrap();
    assert!(status.contains("Current gaze: X: 100 Y: 200"));
    assert!(status.contains("Latest accuracy: 85%"));

    assert!(app.handle_input("/clear").await.unwrap());
    assert!(app.recorder().session_log().is_empty());

    assert!(app.handle_input("/bogus").await.unwrap());
    assert!(app.handle_input("").await.unwrap());
    assert!(!app.handle_input("/exit").await.unwrap());
}

#[tokio::test]
async fn input_closed_ends_loop() {
    let export_dir = TempDir::new().unwrap();
    let config = test_config("127.0.0.1:7070", TransportMode::Channel, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();

    let bus = app.bus();
    bus.emit(SessionEvent::Input("/start".to_string()));
    bus.emit(SessionEvent::InputClosed);

    tokio::time::timeout(Duration::from_secs(2), app.run())
        .await
        .unwrap()
        .unwrap();
    assert!(!app.recorder().is_tracking());
}

#[tokio::test]
async fn datagrams_filtered_by_origin() {
    let export_dir = TempDir::new().unwrap();
    let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let stranger = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let trusted = source.local_addr().unwrap().to_string();
    let config = test_config(&trusted, TransportMode::Channel, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();
    let target = app.local_addr().unwrap();

    app.handle_input("/start").await.unwrap();

    stranger
        .send_to(br#"{"type":"capture","x":1,"y":1}"#, target)
        .await
        .unwrap();
    pump_inbound(&mut app).await;
    assert!(app.recorder().raw_log().is_empty());

    source
        .send_to(br#"{"type":"capture","x":5,"y":6,"confidence":75}"#, target)
        .await
        .unwrap();
    pump_inbound(&mut app).await;
    assert_eq!(app.recorder().raw_log().len(), 1);
    assert_eq!(app.recorder().session_log().len(), 1);
    assert_eq!(app.recorder().session_log()[0].accuracy, 75.0);
}

#[tokio::test]
async fn poll_mode_requests_only_while_tracking() {
    let export_dir = TempDir::new().unwrap();
    let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let trusted = source.local_addr().unwrap().to_string();
    let config = test_config(&trusted, TransportMode::Poll, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();

    assert!(!app.is_polling());
    app.handle_input("/start").await.unwrap();
    assert!(app.is_polling());

    let mut buf = [0u8; 256];
    let (len, from) = tokio::time::timeout(Duration::from_secs(2), source.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let request: Value = serde_json::from_slice(&buf[..len]).unwrap();
    assert_eq!(request, json!({"type": "REQUEST_GAZE_DATA"}));

    source
        .send_to(br#"{"type":"GAZE_DATA","x":10,"y":20,"accuracy":88}"#, from)
        .await
        .unwrap();
    pump_inbound(&mut app).await;
    assert_eq!(app.recorder().session_log().len(), 1);

    app.handle_input("/stop").await.unwrap();
    assert!(!app.is_polling());
}

struct RevokedCamera;

#[async_trait]
impl FallbackTracker for RevokedCamera {
    fn name(&self) -> &str {
        "revoked"
    }

    fn configure_callback(&mut self, _callback: GazeCallback) {}

    async fn begin(&mut self) -> Result<()> {
        Err(RecorderError::FallbackInit("camera revoked".to_string()))
    }

    fn pause(&mut self) {}
}

#[tokio::test]
async fn failed_restart_stops_polling() {
    let export_dir = TempDir::new().unwrap();
    let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let trusted = source.local_addr().unwrap().to_string();
    let config = test_config(&trusted, TransportMode::Poll, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();

    app.handle_input("/start").await.unwrap();
    app.recorder_mut().accept_sample(5.0, 6.0, None);
    assert!(app.is_polling());

    app.recorder_mut().set_fallback(Some(Box::new(RevokedCamera)));
    assert!(app.handle_input("/start").await.unwrap());

    assert!(!app.recorder().is_tracking());
    assert!(!app.is_polling());
    assert_eq!(app.recorder().presenter().marker, Some((5.0, 6.0, false)));
}

#[tokio::test]
async fn channel_message_opens_udp_channel() {
    let export_dir = TempDir::new().unwrap();
    let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let push = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let trusted = source.local_addr().unwrap().to_string();
    let config = test_config(&trusted, TransportMode::Channel, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();
    let target = app.local_addr().unwrap();

    app.handle_input("/start").await.unwrap();

    let handover = json!({"type": "channel", "port": push.local_addr().unwrap().port()});
    source
        .send_to(handover.to_string().as_bytes(), target)
        .await
        .unwrap();
    pump_inbound(&mut app).await;
    assert!(app.recorder().has_channel());
    assert!(app.recorder().presenter().logged("Gaze channel established"));

    // The recorder registers its channel endpoint with one request
    let mut buf = [0u8; 256];
    let (_, channel_addr) = tokio::time::timeout(Duration::from_secs(2), push.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();

    push.send_to(br#"{"type":"capture","x":7,"y":8}"#, channel_addr)
        .await
        .unwrap();
    pump_inbound(&mut app).await;

    assert_eq!(app.recorder().raw_log().len(), 2);
    assert_eq!(app.recorder().session_log().len(), 1);
    assert_eq!(app.recorder().session_log()[0].x, 7.0);
}

#[tokio::test]
async fn open_without_window_command_alerts() {
    let export_dir = TempDir::new().unwrap();
    let config = test_config("127.0.0.1:7070", TransportMode::Window, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();

    app.handle_input("/open").await.unwrap();

    assert!(!app.has_window());
    assert!(app
        .recorder()
        .presenter()
        .last_alert()
        .unwrap()
        .starts_with("Could not open the gaze source."));
}

#[cfg(unix)]
#[tokio::test]
async fn window_exit_is_reported() {
    let export_dir = TempDir::new().unwrap();
    let mut config = test_config("127.0.0.1:7070", TransportMode::Window, &export_dir);
    config.source.window_command = vec!["sh".to_string(), "-c".to_string(), "sleep 0.1".to_string()];
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();

    app.handle_input("/open").await.unwrap();
    assert!(app.has_window());
    assert!(app.recorder().presenter().logged("Gaze source opened in a new window"));

    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), app.next_event())
            .await
            .unwrap()
            .unwrap();
        let closed = matches!(event, SessionEvent::WindowClosed { .. });
        app.handle_event(event).await.unwrap();
        if closed {
            break;
        }
    }

    assert!(!app.has_window());
    assert!(app.recorder().presenter().logged("Gaze source window closed"));
}

#[tokio::test]
async fn stats_command_summarises_raw_log() {
    let export_dir = TempDir::new().unwrap();
    let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let trusted = source.local_addr().unwrap().to_string();
    let config = test_config(&trusted, TransportMode::Channel, &export_dir);
    let mut app = GazeApp::new(config, MemoryPresenter::new()).await.unwrap();
    let target = app.local_addr().unwrap();

    app.handle_input("/stats").await.unwrap();
    assert_eq!(
        app.recorder().presenter().last_alert(),
        Some("No data to show stats for")
    );

    for body in [
        r#"{"type":"connect","deviceLabel":"cam"}"#,
        r#"{"type":"capture","x":1,"y":2}"#,
        "not json",
    ] {
        source.send_to(body.as_bytes(), target).await.unwrap();
        pump_inbound(&mut app).await;
    }

    app.handle_input("/stats").await.unwrap();
    let report = app.recorder().presenter().last_alert().unwrap().to_string();
    assert!(report.contains("connect: 1 messages"));
    assert!(report.contains("capture: 1 messages"));
    assert!(report.contains("(untyped): 1 messages"));
    assert!(report.contains("Total: 3 messages"));
}
