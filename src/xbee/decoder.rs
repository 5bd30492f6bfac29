//! # XBee Frame Decoder
//!
//! Byte-at-a-time receiver for XBee API frames.
//!
//! The receiver walks `WaitStart → WaitLengthHigh → WaitLengthLow → Collecting`
//! and back. It owns no timer itself: the caller re-arms its inter-byte timer
//! whenever [`FrameReceiver::push`] returns [`Progress::Accepted`] and calls
//! [`FrameReceiver::timeout`] when that timer expires.

use super::checksum;
use super::protocol::*;
use crate::error::{FrameError, HoverLinkError, Result};

/// Receiver position within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Hunting for the 0x7E start delimiter
    WaitStart,
    /// Start seen, expecting length MSB (always 0x00)
    WaitLengthHigh,
    /// Expecting length LSB
    WaitLengthLow,
    /// Storing frame data, then the checksum byte
    Collecting,
}

/// Outcome of feeding one byte to the receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Byte was not part of a frame
    Ignored,
    /// Byte consumed, frame still in progress
    Accepted,
    /// Checksum byte consumed and the frame is valid
    Complete(ApiFrame),
    /// Frame abandoned
    Rejected(FrameError),
}

/// Incremental XBee API frame receiver
#[derive(Debug)]
pub struct FrameReceiver {
    state: ReceiverState,
    buffer: Vec<u8>,
    declared_len: usize,
    running_sum: u8,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    /// Create a receiver waiting for a start delimiter
    pub fn new() -> Self {
        Self {
            state: ReceiverState::WaitStart,
            buffer: Vec::with_capacity(MAX_FRAME_DATA),
            declared_len: 0,
            running_sum: 0,
        }
    }

    /// Current receiver state
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Feed one received byte
    pub fn push(&mut self, byte: u8) -> Progress {
        match self.state {
            ReceiverState::WaitStart => {
                if byte == START_DELIMITER {
                    self.state = ReceiverState::WaitLengthHigh;
                    Progress::Accepted
                } else {
                    Progress::Ignored
                }
            }
            ReceiverState::WaitLengthHigh => {
                if byte == LENGTH_MSB {
                    self.state = ReceiverState::WaitLengthLow;
                    Progress::Accepted
                } else {
                    self.reset();
                    Progress::Rejected(FrameError::LengthHigh(byte))
                }
            }
            ReceiverState::WaitLengthLow => {
                if byte as usize > MAX_FRAME_DATA {
                    self.reset();
                    return Progress::Rejected(FrameError::Oversize(byte));
                }

                self.declared_len = byte as usize;
                self.running_sum = 0;
                self.buffer.clear();
                self.state = ReceiverState::Collecting;
                Progress::Accepted
            }
            ReceiverState::Collecting => {
                if self.buffer.len() < self.declared_len {
                    self.buffer.push(byte);
                    self.running_sum = self.running_sum.wrapping_add(byte);
                    return Progress::Accepted;
                }

                // Counter exhausted: this byte is the checksum
                self.state = ReceiverState::WaitStart;
                let data = std::mem::take(&mut self.buffer);

                if checksum::is_valid(self.running_sum, byte) {
                    let len = data.len();
                    match ApiFrame::new(data) {
                        Ok(frame) => Progress::Complete(frame),
                        Err(_) => Progress::Rejected(FrameError::Oversize(u8::try_from(len).unwrap_or(u8::MAX))),
                    }
                } else {
                    Progress::Rejected(FrameError::ChecksumMismatch {
                        sum: self.running_sum,
                        checksum: byte,
                    })
                }
            }
        }
    }

    /// Inter-byte timer expired
    ///
    /// Abandons a partial frame. Returns `None` when no frame was in progress.
    pub fn timeout(&mut self) -> Option<FrameError> {
        if self.state == ReceiverState::WaitStart {
            return None;
        }

        self.reset();
        Some(FrameError::Timeout)
    }

    fn reset(&mut self) {
        self.state = ReceiverState::WaitStart;
        self.buffer.clear();
        self.declared_len = 0;
        self.running_sum = 0;
    }
}

/// Decode the first complete frame in a byte buffer
///
/// Bytes ahead of the start delimiter are skipped.
///
/// # Errors
///
/// Returns error if the frame is malformed, fails its checksum, or the buffer
/// ends before the frame does.
pub fn decode_frame(bytes: &[u8]) -> Result<ApiFrame> {
    let mut receiver = FrameReceiver::new();

    for &byte in bytes {
        match receiver.push(byte) {
            Progress::Complete(frame) => return Ok(frame),
            Progress::Rejected(err) => return Err(HoverLinkError::Protocol(err.to_string())),
            Progress::Ignored | Progress::Accepted => {}
        }
    }

    Err(HoverLinkError::Protocol(format!(
        "Incomplete frame ({} bytes)",
        bytes.len()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbee::encoder::encode_api_frame;

    fn feed(receiver: &mut FrameReceiver, bytes: &[u8]) -> Vec<Progress> {
        bytes.iter().map(|&b| receiver.push(b)).collect()
    }

    fn rx_frame() -> Vec<u8> {
        encode_api_frame(&[0x81, 0x21, 0x82, 0x28, 0x00, 0x00, 0x05]).unwrap()
    }

    #[test]
    fn test_non_delimiter_bytes_are_ignored() {
        let mut receiver = FrameReceiver::new();
        for byte in (0u8..=255).filter(|&b| b != START_DELIMITER) {
            assert_eq!(receiver.push(byte), Progress::Ignored);
            assert_eq!(receiver.state(), ReceiverState::WaitStart);
        }
    }

    #[test]
    fn test_valid_frame_completes() {
        let mut receiver = FrameReceiver::new();
        let results = feed(&mut receiver, &rx_frame());

        let (last, rest) = results.split_last().unwrap();
        assert!(rest.iter().all(|p| *p == Progress::Accepted));
        assert_eq!(
            *last,
            Progress::Complete(ApiFrame::new(vec![0x81, 0x21, 0x82, 0x28, 0x00, 0x00, 0x05]).unwrap())
        );
        assert_eq!(receiver.state(), ReceiverState::WaitStart);
    }

    #[test]
    fn test_checksum_relation_example() {
        // sum = 0x10 + 0x20 = 0x30, checksum 0xCF -> 0xFF
        let mut receiver = FrameReceiver::new();
        let results = feed(&mut receiver, &[0x7E, 0x00, 0x02, 0x10, 0x20, 0xCF]);
        assert_eq!(
            results.last().unwrap(),
            &Progress::Complete(ApiFrame::new(vec![0x10, 0x20]).unwrap())
        );
    }

    #[test]
    fn test_corrupted_byte_prevents_completion() {
        let frame = rx_frame();
        for index in 3..frame.len() {
            let mut corrupted = frame.clone();
            corrupted[index] ^= 0x01;

            let mut receiver = FrameReceiver::new();
            let results = feed(&mut receiver, &corrupted);
            assert!(
                matches!(results.last(), Some(Progress::Rejected(FrameError::ChecksumMismatch { .. }))),
                "corruption at {} was not detected",
                index
            );
        }
    }

    #[test]
    fn test_nonzero_length_msb_aborts() {
        let mut receiver = FrameReceiver::new();
        assert_eq!(receiver.push(0x7E), Progress::Accepted);
        assert_eq!(receiver.push(0x01), Progress::Rejected(FrameError::LengthHigh(0x01)));
        assert_eq!(receiver.state(), ReceiverState::WaitStart);
    }

    #[test]
    fn test_oversize_length_aborts() {
        let mut receiver = FrameReceiver::new();
        feed(&mut receiver, &[0x7E, 0x00]);
        assert_eq!(receiver.push(51), Progress::Rejected(FrameError::Oversize(51)));
        assert_eq!(receiver.state(), ReceiverState::WaitStart);
    }

    #[test]
    fn test_timeout_abandons_partial_frame() {
        let frame = rx_frame();
        let mut receiver = FrameReceiver::new();
        feed(&mut receiver, &frame[..6]);
        assert_eq!(receiver.state(), ReceiverState::Collecting);

        assert_eq!(receiver.timeout(), Some(FrameError::Timeout));
        assert_eq!(receiver.state(), ReceiverState::WaitStart);

        // Remainder of the old frame is noise; the next full frame still decodes
        let results = feed(&mut receiver, &frame[6..]);
        assert!(results.iter().all(|p| !matches!(p, Progress::Complete(_))));
        let results = feed(&mut receiver, &frame);
        assert!(matches!(results.last(), Some(Progress::Complete(_))));
    }

    #[test]
    fn test_timeout_while_idle_is_noop() {
        let mut receiver = FrameReceiver::new();
        assert_eq!(receiver.timeout(), None);
    }

    #[test]
    fn test_zero_length_frame() {
        let mut receiver = FrameReceiver::new();
        let results = feed(&mut receiver, &[0x7E, 0x00, 0x00, 0xFF]);
        assert_eq!(results.last().unwrap(), &Progress::Complete(ApiFrame::new(vec![]).unwrap()));
    }

    #[test]
    fn test_decode_frame_skips_leading_noise() {
        let mut bytes = vec![0x00, 0x13, 0x37];
        bytes.extend(rx_frame());
        let frame = decode_frame(&bytes).unwrap();
        assert_eq!(frame.api_id(), Some(0x81));
        assert_eq!(frame.length(), 7);
    }

    #[test]
    fn test_decode_frame_incomplete() {
        let frame = rx_frame();
        assert!(decode_frame(&frame[..frame.len() - 1]).is_err());
        assert!(decode_frame(&[]).is_err());
    }

    #[test]
    fn test_decode_frame_checksum_error() {
        let mut frame = rx_frame();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert!(decode_frame(&frame).is_err());
    }
}
