//! # Hover Link
//!
//! Runs the hovercraft link and pairing session against an XBee radio.
//!
//! ```bash
//! hover-link [config.toml]
//! ```
//!
//! Without an argument `config/default.toml` is used, and built-in defaults
//! apply if that file does not exist. `RUST_LOG` overrides the configured
//! log level.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use hover_link::board::SimulatedBoard;
use hover_link::config::{Config, LoggingConfig};
use hover_link::motion::LoggingActuator;
use hover_link::runtime::run_link;
use hover_link::serial::XBeeSerial;
use hover_link::vehicle::Vehicle;

/// Configuration file used when none is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging)?;
    info!("Hover Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let serial = XBeeSerial::open(&config.serial)?;
    info!("XBee serial port opened at: {}", serial.device_path());
    let mut port = serial.into_stream();

    let board = SimulatedBoard::new(config.vehicle.team_strap_raw);
    let mut vehicle = Vehicle::new(&config, LoggingActuator, board);

    info!("Press Ctrl+C to exit");
    run_link(&mut vehicle, &mut port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
        }
    })
    .await?;

    info!("Hover Link stopped");
    Ok(())
}

/// Install the tracing subscriber
///
/// The returned guard must live until exit so buffered file output is
/// written.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.file {
        Some(file) => {
            let (dir, name) = log_file_parts(file)
                .with_context(|| format!("Invalid log file path: {}", file))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

/// Split a log file path into directory and file name
fn log_file_parts(file: &str) -> Option<(&Path, &Path)> {
    let path = Path::new(file);
    let name = Path::new(path.file_name()?);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Some((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_parts() {
        assert_eq!(
            log_file_parts("/var/log/hover-link.log"),
            Some((Path::new("/var/log"), Path::new("hover-link.log")))
        );
        assert_eq!(
            log_file_parts("hover-link.log"),
            Some((Path::new("."), Path::new("hover-link.log")))
        );
        assert_eq!(log_file_parts("/"), None);
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }
}
