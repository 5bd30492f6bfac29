//! # XBee Protocol Constants and Types
//!
//! Core definitions for XBee API frames.
//!
//! ```text
//! 0x7E | lenMSB | lenLSB | apiId | ...frame data... | checksum
//! ```
//!
//! The checksum covers the frame data only (apiId through the last data byte).

use crate::error::{HoverLinkError, Result};

/// Start delimiter (always 0x7E)
pub const START_DELIMITER: u8 = 0x7E;

/// Length MSB; frames on this link never exceed 255 bytes
pub const LENGTH_MSB: u8 = 0x00;

/// API identifier for a 16-bit address TX request
pub const API_TX_REQUEST_16: u8 = 0x01;

/// API identifier for a 16-bit address RX packet
pub const API_RX_PACKET_16: u8 = 0x81;

/// Frame ID used on transmit (no TX status requested)
pub const FRAME_ID_NO_ACK: u8 = 0x00;

/// TX options byte
pub const TX_OPTIONS: u8 = 0x00;

/// Frame data bytes ahead of the RF data in 16-bit TX and RX frames
pub const HEADER_LEN: usize = 5;

/// Receive buffer size; longer declared lengths are rejected
pub const MAX_FRAME_DATA: usize = 50;

/// 16-bit radio address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address {
    pub msb: u8,
    pub lsb: u8,
}

impl Address {
    /// Build an address from its two bytes
    pub const fn new(msb: u8, lsb: u8) -> Self {
        Self { msb, lsb }
    }

    /// Address as a single big-endian value
    pub fn as_u16(&self) -> u16 {
        u16::from_be_bytes([self.msb, self.lsb])
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        let [msb, lsb] = value.to_be_bytes();
        Self { msb, lsb }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}", self.as_u16())
    }
}

/// A checksum-validated API frame
///
/// `data` is everything between the length bytes and the checksum, with the
/// API identifier at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFrame {
    data: Vec<u8>,
}

impl ApiFrame {
    /// Wrap frame data
    ///
    /// # Errors
    ///
    /// Returns error if `data` exceeds the receive buffer
    pub fn new(data: Vec<u8>) -> Result<Self> {
        if data.len() > MAX_FRAME_DATA {
            return Err(HoverLinkError::Protocol(format!(
                "Frame data size {} exceeds maximum {}",
                data.len(),
                MAX_FRAME_DATA
            )));
        }

        Ok(Self { data })
    }

    /// Frame data, API identifier first
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// API identifier, if the frame carries any data at all
    pub fn api_id(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Declared length (frame data bytes)
    ///
    /// Never wraps: [`ApiFrame::new`] caps the data at [`MAX_FRAME_DATA`].
    pub fn length(&self) -> u8 {
        u8::try_from(self.data.len()).unwrap_or(u8::MAX)
    }
}

/// Inbound 16-bit RX packet, the only frame type forwarded to the session
///
/// ```text
/// [0] 0x81  [1] src MSB  [2] src LSB  [3] RSSI  [4] options  [5..] RF data
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxPacket {
    pub source: Address,
    pub rssi: u8,
    pub options: u8,
    pub rf_data: Vec<u8>,
}

impl RxPacket {
    /// Interpret an API frame as an RX packet
    ///
    /// Returns `None` for any other API identifier or a truncated header.
    pub fn from_frame(frame: &ApiFrame) -> Option<Self> {
        match frame.data.as_slice() {
            [API_RX_PACKET_16, msb, lsb, rssi, options, rf_data @ ..] => Some(Self {
                source: Address::new(*msb, *lsb),
                rssi: *rssi,
                options: *options,
                rf_data: rf_data.to_vec(),
            }),
            _ => None,
        }
    }

    /// Message tag (RF data byte 0), encrypted for control frames
    pub fn tag(&self) -> Option<u8> {
        self.rf_data.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(START_DELIMITER, 0x7E);
        assert_eq!(API_TX_REQUEST_16, 0x01);
        assert_eq!(API_RX_PACKET_16, 0x81);
        assert_eq!(MAX_FRAME_DATA, 50);
    }

    #[test]
    fn test_address_conversion() {
        let addr = Address::from(0x2182);
        assert_eq!(addr, Address::new(0x21, 0x82));
        assert_eq!(addr.as_u16(), 0x2182);
        assert_eq!(addr.to_string(), "0x2182");
    }

    #[test]
    fn test_api_frame_too_large() {
        assert!(ApiFrame::new(vec![0u8; 51]).is_err());
        let frame = ApiFrame::new(vec![0u8; 50]).unwrap();
        assert_eq!(frame.length(), 50);
        assert_eq!(frame.data().len(), 50);
    }

    #[test]
    fn test_api_frame_length_matches_data() {
        let frame = ApiFrame::new(vec![0x81, 0x21, 0x82]).unwrap();
        assert_eq!(frame.length(), 3);
        assert_eq!(frame.data(), &[0x81, 0x21, 0x82]);

        // Oversized data never becomes a frame, so the length cannot wrap
        let err = ApiFrame::new(vec![0u8; 256]).unwrap_err();
        assert!(err.to_string().contains("256"));
    }

    #[test]
    fn test_rx_packet_from_frame() {
        let frame = ApiFrame::new(vec![0x81, 0x21, 0x82, 0x28, 0x00, 0x00, 0x02]).unwrap();
        let packet = RxPacket::from_frame(&frame).unwrap();
        assert_eq!(packet.source, Address::new(0x21, 0x82));
        assert_eq!(packet.rssi, 0x28);
        assert_eq!(packet.rf_data, vec![0x00, 0x02]);
        assert_eq!(packet.tag(), Some(0x00));
    }

    #[test]
    fn test_rx_packet_rejects_other_api_ids() {
        let frame = ApiFrame::new(vec![0x89, 0x01, 0x00]).unwrap();
        assert!(RxPacket::from_frame(&frame).is_none());

        let short = ApiFrame::new(vec![0x81, 0x21]).unwrap();
        assert!(RxPacket::from_frame(&short).is_none());
    }
}
