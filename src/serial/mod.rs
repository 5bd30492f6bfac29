//! # Serial Communication Module
//!
//! Opens the UART link to the XBee radio module.
//!
//! The radio runs in API mode at 8N1 without flow control. The configured
//! device is tried first, then the usual USB adapter paths.

use crate::config::SerialConfig;
use crate::error::{HoverLinkError, Result};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Fallback XBee device paths (in order of preference)
const FALLBACK_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // FTDI-based XBee adapters
    "/dev/ttyACM0", // USB CDC adapters
];

/// XBee Serial Port Handler
pub struct XBeeSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for XBeeSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XBeeSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

/// Configured port first, then fallbacks not already listed
fn candidate_paths(configured: &str) -> Vec<&str> {
    let mut paths = vec![configured];
    paths.extend(FALLBACK_DEVICE_PATHS.iter().copied().filter(|&p| p != configured));
    paths
}

impl XBeeSerial {
    /// Open the XBee radio described by `config`
    ///
    /// # Errors
    ///
    /// Returns [`HoverLinkError::SerialPortNotFound`] if neither the configured
    /// port nor any fallback path can be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hover_link::config::SerialConfig;
    /// use hover_link::serial::XBeeSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = XBeeSerial::open(&SerialConfig::default())?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        Self::open_with_paths(&candidate_paths(&config.port), config.baud_rate)
    }

    /// Open the first device in `paths` that succeeds
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened XBee radio at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(HoverLinkError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port at 8N1
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| HoverLinkError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Path of the opened device
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Hand the async stream to the link runtime
    pub fn into_stream(self) -> tokio_serial::SerialStream {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_paths_configured_first() {
        assert_eq!(
            candidate_paths("/dev/ttyS1"),
            vec!["/dev/ttyS1", "/dev/ttyUSB0", "/dev/ttyACM0"]
        );
    }

    #[test]
    fn test_candidate_paths_no_duplicates() {
        assert_eq!(candidate_paths("/dev/ttyACM0"), vec!["/dev/ttyACM0", "/dev/ttyUSB0"]);
        assert_eq!(candidate_paths("/dev/ttyUSB0"), vec!["/dev/ttyUSB0", "/dev/ttyACM0"]);
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = XBeeSerial::open_with_paths(invalid_paths, 9600);

        match result.unwrap_err() {
            HoverLinkError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        match XBeeSerial::open_with_paths(empty_paths, 9600).unwrap_err() {
            HoverLinkError::SerialPortNotFound(_) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = XBeeSerial::open_port("/dev/nonexistent_serial_device_12345", 9600);

        match result.unwrap_err() {
            HoverLinkError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    // Requires an XBee radio on one of the default paths
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_open_with_real_hardware() {
        match XBeeSerial::open(&SerialConfig::default()) {
            Ok(serial) => println!("Opened XBee radio at: {}", serial.device_path()),
            Err(e) => println!("No XBee hardware detected ({})", e),
        }
    }
}
