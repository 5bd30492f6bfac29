//! # Hover Link Library
//!
//! Link and pairing session layer for a remote-controlled hovercraft.
//!
//! The vehicle talks to one radio controller at a time over an XBee link.
//! This library decodes the XBee API byte stream, runs the pairing session
//! (team matching, key distribution, rolling-keystream control frames), and
//! turns verified commands into thruster and lift fan outputs. Any loss of
//! contact or integrity failure unpairs the session and stops the vehicle.

pub mod board;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod motion;
pub mod runtime;
pub mod serial;
pub mod session;
pub mod vehicle;
pub mod xbee;
