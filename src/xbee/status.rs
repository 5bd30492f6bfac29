//! # Outbound Status Messages
//!
//! The vehicle answers its controller with one of six fixed status payloads.
//! Byte 2 of every payload echoes the last encrypted checksum received; the
//! debug payloads carry extra diagnostic bytes after it.

use super::encoder::encode_tx_request;
use super::protocol::Address;
use crate::error::Result;

/// Status payload selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusMessage {
    /// Paired, last frame decrypted cleanly
    PairedOk,
    /// Paired, decrypt error (defined, never sent by the session)
    PairedDecryptError,
    /// Not paired
    UnpairedOk,
    /// Not paired after a decrypt error
    UnpairedDecryptError,
    /// Key accepted; carries the last key byte
    Debug1,
    /// Decrypt failure; carries computed and received checksums
    Debug2,
}

/// Echoed-checksum slot
const ECHO_INDEX: usize = 2;

/// First diagnostic slot
const DIAG_INDEX: usize = 3;

impl StatusMessage {
    /// All messages in table order
    pub const ALL: [StatusMessage; 6] = [
        StatusMessage::PairedOk,
        StatusMessage::PairedDecryptError,
        StatusMessage::UnpairedOk,
        StatusMessage::UnpairedDecryptError,
        StatusMessage::Debug1,
        StatusMessage::Debug2,
    ];

    /// Unpatched RF payload
    pub fn template(self) -> &'static [u8] {
        match self {
            StatusMessage::PairedOk => &[0x03, 0x01, 0x00, 0x00, 0x00],
            StatusMessage::PairedDecryptError => &[0x03, 0x03, 0x00],
            StatusMessage::UnpairedOk => &[0x03, 0x00, 0x00, 0x00, 0x00],
            StatusMessage::UnpairedDecryptError => &[0x03, 0x02, 0x00],
            StatusMessage::Debug1 => &[0x03, 0x01, 0x00, 0x00],
            StatusMessage::Debug2 => &[0x03, 0x02, 0x00, 0x00, 0x00],
        }
    }

    /// Number of diagnostic bytes patched after the echo slot
    fn diagnostic_len(self) -> usize {
        match self {
            StatusMessage::Debug1 => 1,
            StatusMessage::Debug2 => 2,
            _ => 0,
        }
    }
}

/// A status message ready to be patched and sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub message: StatusMessage,
    pub destination: Address,
    /// Last encrypted checksum byte received from the controller
    pub echo_checksum: u8,
    /// Diagnostic bytes; only the ones the message carries are used
    pub diagnostics: [u8; 2],
}

impl StatusReport {
    /// Report with no diagnostics
    pub fn new(message: StatusMessage, destination: Address, echo_checksum: u8) -> Self {
        Self {
            message,
            destination,
            echo_checksum,
            diagnostics: [0; 2],
        }
    }

    /// Attach diagnostic bytes
    pub fn with_diagnostics(mut self, diagnostics: [u8; 2]) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Patched RF payload
    pub fn rf_data(&self) -> Vec<u8> {
        let mut data = self.message.template().to_vec();
        data[ECHO_INDEX] = self.echo_checksum;

        let diag_len = self.message.diagnostic_len();
        data[DIAG_INDEX..DIAG_INDEX + diag_len].copy_from_slice(&self.diagnostics[..diag_len]);

        data
    }

    /// Complete TX request frame
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_tx_request(self.destination, &self.rf_data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbee::decoder::decode_frame;
    use crate::xbee::protocol::HEADER_LEN;

    const PEER: Address = Address::new(0x21, 0x82);

    #[test]
    fn test_template_lengths() {
        let lengths: Vec<usize> = StatusMessage::ALL.iter().map(|m| m.template().len()).collect();
        assert_eq!(lengths, vec![5, 3, 5, 3, 4, 5]);
    }

    #[test]
    fn test_echo_checksum_is_patched() {
        let report = StatusReport::new(StatusMessage::PairedOk, PEER, 0xA5);
        assert_eq!(report.rf_data(), vec![0x03, 0x01, 0xA5, 0x00, 0x00]);

        let report = StatusReport::new(StatusMessage::UnpairedDecryptError, PEER, 0x11);
        assert_eq!(report.rf_data(), vec![0x03, 0x02, 0x11]);
    }

    #[test]
    fn test_debug_diagnostics_are_patched() {
        let debug1 = StatusReport::new(StatusMessage::Debug1, PEER, 0x00).with_diagnostics([0x5A, 0xFF]);
        assert_eq!(debug1.rf_data(), vec![0x03, 0x01, 0x00, 0x5A]);

        let debug2 = StatusReport::new(StatusMessage::Debug2, PEER, 0x42).with_diagnostics([0x10, 0x20]);
        assert_eq!(debug2.rf_data(), vec![0x03, 0x02, 0x42, 0x10, 0x20]);
    }

    #[test]
    fn test_diagnostics_ignored_for_plain_status() {
        let report = StatusReport::new(StatusMessage::UnpairedOk, PEER, 0x01).with_diagnostics([0xAA, 0xBB]);
        assert_eq!(report.rf_data(), vec![0x03, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_every_template_round_trips() {
        for message in StatusMessage::ALL {
            let report = StatusReport::new(message, PEER, 0x77).with_diagnostics([0x01, 0x02]);
            let frame = report.encode().unwrap();
            assert_eq!(frame.len(), message.template().len() + 9);

            let decoded = decode_frame(&frame).unwrap();
            assert_eq!(&decoded.data()[2..4], &[PEER.msb, PEER.lsb], "{:?}", message);
            assert_eq!(&decoded.data()[HEADER_LEN..], report.rf_data().as_slice());
        }
    }
}
