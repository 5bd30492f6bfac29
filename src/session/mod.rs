//! # Pairing Session
//!
//! Team selection, the rolling keystream, drive derivation, and the pairing
//! state machine that ties them together.

pub mod cipher;
pub mod drive;
pub mod manager;
pub mod team;

pub use manager::{PairingManager, SessionState, SessionTimings};
