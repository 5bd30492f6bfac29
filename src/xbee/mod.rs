//! # XBee API Frame Module
//!
//! Implementation of the XBee API wire format used between the vehicle and
//! its radio controller.
//!
//! This module handles:
//! - Byte-at-a-time frame reception with inter-byte timeouts
//! - `0xFF - sum` checksum calculation and validation
//! - 16-bit TX request encoding for outbound status frames
//! - The fixed table of outbound status templates

pub mod protocol;
pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod status;
