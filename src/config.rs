//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{HoverLinkError, Result};
use crate::session::SessionTimings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Framing and dispatch configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Inter-byte timeout while a frame is in progress
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Events each service queue can hold
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Pairing session timers
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_pair_timeout_ms")]
    pub pair_timeout_ms: u64,

    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    #[serde(default = "default_team_sample_interval_ms")]
    pub team_sample_interval_ms: u64,
}

/// Host stand-ins for vehicle hardware
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    /// Raw reading the simulated team strap reports
    #[serde(default = "default_team_strap_raw")]
    pub team_strap_raw: u8,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file; stdout when unset
    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 9600 }

fn default_frame_timeout_ms() -> u64 { 200 }
fn default_queue_capacity() -> usize { 16 }

fn default_pair_timeout_ms() -> u64 { 45000 }
fn default_liveness_timeout_ms() -> u64 { 2000 }
fn default_team_sample_interval_ms() -> u64 { 500 }

fn default_team_strap_raw() -> u8 { 85 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frame_timeout_ms: default_frame_timeout_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pair_timeout_ms: default_pair_timeout_ms(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            team_sample_interval_ms: default_team_sample_interval_ms(),
        }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            team_strap_raw: default_team_strap_raw(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Baud rates the XBee module can be configured for
const VALID_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn invalid(msg: impl std::fmt::Display) -> HoverLinkError {
    HoverLinkError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hover_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load a file if it exists, otherwise use built-in defaults
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be parsed or validated.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Pairing session timer periods
    pub fn session_timings(&self) -> SessionTimings {
        SessionTimings {
            pair_timeout_ms: self.session.pair_timeout_ms,
            liveness_timeout_ms: self.session.liveness_timeout_ms,
            team_sample_interval_ms: self.session.team_sample_interval_ms,
            ..SessionTimings::default()
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate serial port configuration
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200"));
        }

        // Validate link configuration
        if self.link.frame_timeout_ms == 0 || self.link.frame_timeout_ms > 10000 {
            return Err(invalid("frame_timeout_ms must be between 1 and 10000"));
        }

        if self.link.queue_capacity < 2 || self.link.queue_capacity > 256 {
            return Err(invalid("queue_capacity must be between 2 and 256"));
        }

        // Validate session timers
        if self.session.pair_timeout_ms == 0 || self.session.pair_timeout_ms > 600000 {
            return Err(invalid("pair_timeout_ms must be between 1 and 600000"));
        }

        if self.session.liveness_timeout_ms == 0 || self.session.liveness_timeout_ms > 60000 {
            return Err(invalid("liveness_timeout_ms must be between 1 and 60000"));
        }

        if self.session.liveness_timeout_ms >= self.session.pair_timeout_ms {
            return Err(invalid("liveness_timeout_ms must be less than pair_timeout_ms"));
        }

        if self.session.team_sample_interval_ms == 0 || self.session.team_sample_interval_ms > 60000 {
            return Err(invalid("team_sample_interval_ms must be between 1 and 60000"));
        }

        // Validate logging
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        if matches!(&self.logging.file, Some(file) if file.is_empty()) {
            return Err(invalid("log file cannot be empty when set"));
        }

        Ok(())
    }
}
