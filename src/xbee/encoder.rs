//! # XBee Frame Encoder
//!
//! Builds XBee API frames and writes them out one byte at a time.

use std::io::Write;

use super::checksum::checksum;
use super::protocol::*;
use crate::error::{HoverLinkError, Result};

/// Wrap frame data in delimiter, length and checksum
///
/// # Arguments
///
/// * `data` - Frame data starting with the API identifier
///
/// # Errors
///
/// Returns error if `data` is longer than 255 bytes
///
/// # Examples
///
/// ```
/// use hover_link::xbee::encoder::encode_api_frame;
///
/// let frame = encode_api_frame(&[0x10, 0x20]).unwrap();
/// assert_eq!(frame, vec![0x7E, 0x00, 0x02, 0x10, 0x20, 0xCF]);
/// ```
pub fn encode_api_frame(data: &[u8]) -> Result<Vec<u8>> {
    let length = u8::try_from(data.len()).map_err(|_| {
        HoverLinkError::Protocol(format!("Frame data size {} exceeds 255", data.len()))
    })?;

    let mut frame = Vec::with_capacity(data.len() + 4);
    frame.push(START_DELIMITER);
    frame.push(LENGTH_MSB);
    frame.push(length);
    frame.extend_from_slice(data);
    frame.push(checksum(data));

    Ok(frame)
}

/// Encode a 16-bit TX request carrying `rf_data` to `destination`
///
/// ```text
/// 7E 00 len+5 | 01 00 dstMSB dstLSB 00 | rf_data... | checksum
/// ```
///
/// # Errors
///
/// Returns error if the RF data does not fit a single frame
pub fn encode_tx_request(destination: Address, rf_data: &[u8]) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(HEADER_LEN + rf_data.len());
    data.push(API_TX_REQUEST_16);
    data.push(FRAME_ID_NO_ACK);
    data.push(destination.msb);
    data.push(destination.lsb);
    data.push(TX_OPTIONS);
    data.extend_from_slice(rf_data);

    encode_api_frame(&data)
}

/// Write a frame through a blocking byte sink, one byte per write
///
/// The sink is expected to block until the hardware can take the next byte.
///
/// # Errors
///
/// Returns the first write error from the sink
pub fn write_frame<W: Write>(sink: &mut W, frame: &[u8]) -> Result<()> {
    for &byte in frame {
        sink.write_all(&[byte])?;
    }
    sink.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbee::decoder::decode_frame;

    #[test]
    fn test_tx_request_layout() {
        let frame = encode_tx_request(Address::new(0x21, 0x82), &[0x03, 0x01, 0x00]).unwrap();

        assert_eq!(frame.len(), 3 + 9);
        assert_eq!(&frame[..8], &[0x7E, 0x00, 0x08, 0x01, 0x00, 0x21, 0x82, 0x00]);
        assert_eq!(&frame[8..11], &[0x03, 0x01, 0x00]);

        // 0x01 + 0x21 + 0x82 + 0x03 + 0x01 = 0xA8
        assert_eq!(frame[11], 0xFF - 0xA8);
    }

    #[test]
    fn test_tx_request_round_trip() {
        let rf_data = [0x03, 0x02, 0x7F, 0x11, 0xEE];
        let frame = encode_tx_request(Address::new(0x20, 0x82), &rf_data).unwrap();

        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.api_id(), Some(API_TX_REQUEST_16));
        assert_eq!(&decoded.data()[HEADER_LEN..], &rf_data);
    }

    #[test]
    fn test_encode_api_frame_too_large() {
        assert!(encode_api_frame(&[0u8; 256]).is_err());
        assert!(encode_api_frame(&[0u8; 255]).is_ok());
    }

    #[test]
    fn test_write_frame_writes_every_byte() {
        let frame = encode_api_frame(&[0x01, 0x02, 0x03]).unwrap();
        let mut sink = Vec::new();
        write_frame(&mut sink, &frame).unwrap();
        assert_eq!(sink, frame);
    }

    #[test]
    fn test_write_frame_propagates_errors() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "down"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let result = write_frame(&mut Broken, &[0x7E]);
        assert!(matches!(result, Err(HoverLinkError::Io(_))));
    }
}
