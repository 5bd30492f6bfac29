//! # Error Types
//!
//! Custom error types for Hover Link using `thiserror`, plus the link and
//! session fault classifications the state machines report.

use thiserror::Error;

/// Main error type for Hover Link
#[derive(Debug, Error)]
pub enum HoverLinkError {
    /// XBee protocol errors
    #[error("XBee protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No usable serial device
    #[error("No XBee serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Hover Link
pub type Result<T> = std::result::Result<T, HoverLinkError>;

/// Reasons the framing receiver abandons a frame.
///
/// None of these are fatal; the receiver always returns to waiting for the
/// next start delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Length MSB was not zero
    #[error("invalid length MSB 0x{0:02X}")]
    LengthHigh(u8),

    /// Declared length does not fit the receive buffer
    #[error("declared length {0} exceeds receive buffer")]
    Oversize(u8),

    /// No byte arrived in time while mid-frame
    #[error("inter-byte timeout")]
    Timeout,

    /// `sum + checksum` was not 0xFF
    #[error("checksum mismatch (sum 0x{sum:02X}, checksum 0x{checksum:02X})")]
    ChecksumMismatch { sum: u8, checksum: u8 },
}

/// Why a pairing session ended.
///
/// Every reason goes through the same fail-safe path; only
/// [`UnpairReason::DecryptFailure`] is reported to the controller as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnpairReason {
    /// No qualifying frame within the liveness window
    #[error("liveness timeout")]
    LivenessTimeout,

    /// Session lifetime elapsed
    #[error("pairing timeout")]
    PairingTimeout,

    /// Controller set the unpair bit
    #[error("controller requested unpair")]
    ManualUnpair,

    /// Control frame checksum did not verify
    #[error("decrypt checksum failure (computed 0x{computed:02X}, received 0x{received:02X})")]
    DecryptFailure { computed: u8, received: u8 },

    /// Host is shutting down
    #[error("shutdown")]
    Shutdown,
}
