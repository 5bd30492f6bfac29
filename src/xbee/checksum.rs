//! # XBee Checksum
//!
//! The XBee API checksum is `0xFF` minus the 8-bit sum of the frame data.
//! A received frame is valid when the sum of its frame data plus the
//! checksum byte is `0xFF`.

/// Value `sum + checksum` must reach for a valid frame
pub const CHECKSUM_TARGET: u8 = 0xFF;

/// 8-bit wrapping sum of `data`
pub fn sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

/// Calculate the checksum byte for frame data
///
/// # Examples
///
/// ```
/// use hover_link::xbee::checksum::checksum;
///
/// assert_eq!(checksum(&[0x01, 0x00, 0x21, 0x82, 0x00]), 0x5B);
/// ```
pub fn checksum(data: &[u8]) -> u8 {
    CHECKSUM_TARGET.wrapping_sub(sum(data))
}

/// Check a running sum against a received checksum byte
pub fn is_valid(running_sum: u8, checksum: u8) -> bool {
    running_sum.wrapping_add(checksum) == CHECKSUM_TARGET
}
