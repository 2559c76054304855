//! Synthetic gaze path for demos and headless runs

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{FallbackTracker, GazeCallback};
use crate::config::FallbackConfig;
use crate::errors::{RecorderError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedConfig {
    pub rate_hz: u32,
    pub screen_width: f64,
    pub screen_height: f64,
    /// Maximum random offset per axis, in pixels
    pub jitter_px: f64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            rate_hz: 30,
            screen_width: 1920.0,
            screen_height: 1080.0,
            jitter_px: 4.0,
        }
    }
}

impl From<&FallbackConfig> for SimulatedConfig {
    fn from(config: &FallbackConfig) -> Self {
        Self {
            rate_hz: config.rate_hz,
            screen_width: config.screen_width,
            screen_height: config.screen_height,
            jitter_px: config.jitter_px,
        }
    }
}

/// Lissajous-style path around the screen centre with small jitter
pub struct SimulatedTracker {
    config: SimulatedConfig,
    callback: Option<GazeCallback>,
    emitter: Option<JoinHandle<()>>,
}

impl SimulatedTracker {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            callback: None,
            emitter: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.emitter.as_ref().map(|e| !e.is_finished()).unwrap_or(false)
    }
}

/// Point on the path `t` seconds in, before jitter
pub fn path_point(config: &SimulatedConfig, t: f64) -> (f64, f64) {
    let x = config.screen_width * (0.5 + 0.3 * (0.5 * t).sin());
    let y = config.screen_height * (0.5 + 0.3 * (0.3 * t).cos());
    (x, y)
}

#[async_trait]
impl FallbackTracker for SimulatedTracker {
    fn name(&self) -> &str {
        "simulated"
    }

    fn configure_callback(&mut self, callback: GazeCallback) {
        self.callback = Some(callback);
    }

    async fn begin(&mut self) -> Result<()> {
        let callback = self
            .callback
            .clone()
            .ok_or_else(|| RecorderError::FallbackInit("no gaze callback configured".to_string()))?;
        if self.config.rate_hz == 0 {
            return Err(RecorderError::FallbackInit("rate_hz must be greater than 0".to_string()));
        }
        let screen_ok = |v: f64| v.is_finite() && v > 0.0;
        if !screen_ok(self.config.screen_width)
            || !screen_ok(self.config.screen_height)
            || !self.config.jitter_px.is_finite()
        {
            return Err(RecorderError::FallbackInit(
                "screen size and jitter must be finite, with a positive screen".to_string(),
            ));
        }

        self.pause();

        let config = self.config.clone();
        let period = Duration::from_secs_f64(1.0 / config.rate_hz as f64);
        let jitter = config.jitter_px.abs();
        debug!(rate_hz = config.rate_hz, "simulated tracker running");

        self.emitter = Some(tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut ticker = tokio::time::interval(period);
            let origin = Instant::now();
            loop {
                ticker.tick().await;
                let (x, y) = path_point(&config, origin.elapsed().as_secs_f64());
                let (dx, dy) = if jitter > 0.0 {
                    (rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter))
                } else {
                    (0.0, 0.0)
                };
                callback(
                    (x + dx).clamp(0.0, config.screen_width),
                    (y + dy).clamp(0.0, config.screen_height),
                );
            }
        }));

        Ok(())
    }

    fn pause(&mut self) {
        if let Some(emitter) = self.emitter.take() {
            emitter.abort();
        }
    }
}

impl Drop for SimulatedTracker {
    fn drop(&mut self) {
        self.pause();
    }
}
