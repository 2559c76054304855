//! Configuration management for the gaze recorder
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.gaze-recorder/config.toml

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{RecorderError, Result};
use crate::link::TrustedOrigin;

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub transport: TransportConfig,
    pub recorder: RecorderConfig,
    pub fallback: FallbackConfig,
    pub export: ExportConfig,
}

/// External gaze source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// `HOST:PORT` pins the sender exactly, a bare `HOST` accepts any port
    pub trusted_origin: String,
    /// Local address for the shared socket
    pub bind_addr: String,
    /// Program and arguments launched by `/open`
    pub window_command: Vec<String>,
}

/// How data is pulled from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Request data on a fixed interval while tracking
    Poll,
    /// Wait for the source to hand over a push channel
    #[default]
    Channel,
    /// Launch the source as a child process and poll it while it runs
    Window,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Poll => write!(f, "poll"),
            TransportMode::Channel => write!(f, "channel"),
            TransportMode::Window => write!(f, "window"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub poll_interval_ms: u64,
}

/// Recorder behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Accuracy assigned to samples that report none
    pub default_accuracy: f64,
    pub log_capacity: usize,
    /// Log every Nth accepted sample
    pub progress_every: usize,
    pub clock_interval_ms: u64,
}

/// In-process fallback tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub rate_hz: u32,
    pub screen_width: f64,
    pub screen_height: f64,
    pub jitter_px: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Defaults to the user's download directory
    pub output_dir: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            trusted_origin: "127.0.0.1:7070".to_string(),
            bind_addr: "127.0.0.1:7071".to_string(),
            window_command: Vec::new(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Channel,
            poll_interval_ms: 100,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            default_accuracy: 85.0,
            log_capacity: 50,
            progress_every: 10,
            clock_interval_ms: 1000,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_hz: 30,
            screen_width: 1920.0,
            screen_height: 1080.0,
            jitter_px: 4.0,
        }
    }
}

impl ExportConfig {
    /// Directory exports are written to
    pub fn resolve_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => Config::expand_path(dir),
            None => dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RecorderError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| RecorderError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.gaze-recorder/config.toml or fall back to built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("config.toml"))
    }

    /// Per-user state directory (config, REPL history)
    pub fn state_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".gaze-recorder"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.transport.poll_interval_ms == 0 {
            return Err(RecorderError::ConfigError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.recorder.log_capacity == 0 {
            return Err(RecorderError::ConfigError(
                "log_capacity must be greater than 0".to_string(),
            ));
        }

        if self.recorder.progress_every == 0 {
            return Err(RecorderError::ConfigError(
                "progress_every must be greater than 0".to_string(),
            ));
        }

        if self.recorder.clock_interval_ms == 0 {
            return Err(RecorderError::ConfigError(
                "clock_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.recorder.default_accuracy) {
            return Err(RecorderError::ConfigError(
                "default_accuracy must be between 0 and 100".to_string(),
            ));
        }

        let origin = self.trusted_origin()?;
        self.bind_addr()?;

        if matches!(self.transport.mode, TransportMode::Poll | TransportMode::Window)
            && origin.peer().is_none()
        {
            return Err(RecorderError::ConfigError(format!(
                "{} mode needs trusted_origin as HOST:PORT to send requests to",
                self.transport.mode
            )));
        }

        if self.fallback.enabled {
            let fallback = &self.fallback;
            if fallback.rate_hz == 0 {
                return Err(RecorderError::ConfigError(
                    "fallback rate_hz must be greater than 0".to_string(),
                ));
            }
            if !is_positive(fallback.screen_width) || !is_positive(fallback.screen_height) {
                return Err(RecorderError::ConfigError(
                    "fallback screen size must be positive".to_string(),
                ));
            }
            if !fallback.jitter_px.is_finite() || fallback.jitter_px < 0.0 {
                return Err(RecorderError::ConfigError(
                    "fallback jitter_px must be a non-negative number".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RecorderError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RecorderError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RecorderError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    pub fn trusted_origin(&self) -> Result<TrustedOrigin> {
        self.source.trusted_origin.parse()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.source.bind_addr.trim().parse().map_err(|_| {
            RecorderError::ConfigError(format!("Invalid bind_addr '{}'", self.source.bind_addr))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.transport.poll_interval_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.recorder.clock_interval_ms)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport.mode, TransportMode::Channel);
        assert_eq!(config.transport.poll_interval_ms, 100);
        assert_eq!(config.recorder.default_accuracy, 85.0);
        assert_eq!(config.recorder.log_capacity, 50);
        assert_eq!(config.recorder.progress_every, 10);
        assert!(!config.fallback.enabled);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_values() {
        let mut config = Config::default();
        config.transport.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.recorder.log_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.recorder.progress_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_geometry_validated() {
        let mut config = Config::default();
        config.fallback.enabled = true;
        assert!(config.validate().is_ok());

        config.fallback.screen_width = -1920.0;
        assert!(config.validate().is_err());

        config.fallback.screen_width = 1920.0;
        config.fallback.screen_height = f64::NAN;
        assert!(config.validate().is_err());

        config.fallback.screen_height = 1080.0;
        config.fallback.jitter_px = f64::INFINITY;
        assert!(config.validate().is_err());

        config.fallback.jitter_px = -3.0;
        assert!(config.validate().is_err());

        // Ignored while the fallback is off
        config.fallback.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_origin() {
        let mut config = Config::default();
        config.source.trusted_origin = "not an address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_mode_needs_exact_origin() {
        let mut config = Config::default();
        config.source.trusted_origin = "127.0.0.1".to_string();
        assert!(config.validate().is_ok());

        config.transport.mode = TransportMode::Poll;
        assert!(config.validate().is_err());

        config.source.trusted_origin = "127.0.0.1:7070".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[transport]\nmode = \"poll\"\n\n[recorder]\ndefault_accuracy = 70.0\n",
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.transport.mode, TransportMode::Poll);
        assert_eq!(config.transport.poll_interval_ms, 100);
        assert_eq!(config.recorder.default_accuracy, 70.0);
        assert_eq!(config.source.trusted_origin, "127.0.0.1:7070");
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[transport]\npoll_interval_ms = 0\n").unwrap();

        assert!(matches!(
            Config::load_from_file(&path),
            Err(RecorderError::ConfigError(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.source.window_command = vec!["gazefilter".to_string(), "--headless".to_string()];
        config.export.output_dir = Some("/tmp/gaze".to_string());

        config.save(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();

        assert_eq!(loaded.source.window_command, config.source.window_command);
        assert_eq!(loaded.export.resolve_dir(), PathBuf::from("/tmp/gaze"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path("~/gaze");
        assert!(!expanded.to_string_lossy().contains('~'));
    }
}
