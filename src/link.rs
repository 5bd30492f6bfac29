//! # Link Protocol Engine
//!
//! Service that turns UART bytes into validated RX packets for the pairing
//! session, and status reports from the session into TX request frames.

use std::io::Write;

use tracing::{debug, trace, warn};

use crate::dispatch::{Event, ServiceId, Substrate, TimerId};
use crate::error::{FrameError, Result};
use crate::xbee::decoder::{FrameReceiver, Progress, ReceiverState};
use crate::xbee::encoder::write_frame;
use crate::xbee::protocol::RxPacket;

/// Default inter-byte timeout
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 200;

/// Framing receiver plus status transmitter
#[derive(Debug)]
pub struct LinkEngine {
    receiver: FrameReceiver,
    frame_timeout_ms: u64,
    integrity_fault: bool,
    frames_forwarded: u64,
}

impl LinkEngine {
    pub fn new(frame_timeout_ms: u64) -> Self {
        Self {
            receiver: FrameReceiver::new(),
            frame_timeout_ms,
            integrity_fault: false,
            frames_forwarded: 0,
        }
    }

    /// Receiver position within the current frame
    pub fn receiver_state(&self) -> ReceiverState {
        self.receiver.state()
    }

    /// Set by a framing checksum failure, cleared by the next valid frame
    pub fn integrity_fault(&self) -> bool {
        self.integrity_fault
    }

    /// RX packets handed to the pairing session so far
    pub fn frames_forwarded(&self) -> u64 {
        self.frames_forwarded
    }

    /// Process one event
    ///
    /// Status frames are written to `tx` byte by byte.
    ///
    /// # Errors
    ///
    /// Returns error if a status frame cannot be encoded or written.
    pub fn run<S: Substrate, W: Write>(&mut self, event: Event, bus: &mut S, tx: &mut W) -> Result<()> {
        match event {
            Event::ByteReceived(byte) => self.on_byte(byte, bus),
            Event::Timeout(TimerId::Framing) => {
                if let Some(err) = self.receiver.timeout() {
                    debug!("Frame abandoned: {}", err);
                }
            }
            Event::Transmit(report) => {
                let frame = report.encode()?;
                trace!("TX {:?} to {}: {:02X?}", report.message, report.destination, frame);
                write_frame(tx, &frame)?;
            }
            Event::Init => {}
            other => debug!("Link: ignoring {:?}", other),
        }
        Ok(())
    }

    fn on_byte<S: Substrate>(&mut self, byte: u8, bus: &mut S) {
        match self.receiver.push(byte) {
            Progress::Ignored => {}
            Progress::Accepted => bus.arm_timer(TimerId::Framing, self.frame_timeout_ms),
            Progress::Complete(frame) => {
                bus.stop_timer(TimerId::Framing);
                self.integrity_fault = false;

                let Some(packet) = RxPacket::from_frame(&frame) else {
                    debug!("Dropping frame with API id {:02X?}", frame.api_id());
                    return;
                };

                trace!("RX from {} rssi -{} dBm: {:02X?}", packet.source, packet.rssi, packet.rf_data);
                if bus.post(ServiceId::Pairing, Event::Packet(packet)) {
                    self.frames_forwarded += 1;
                } else {
                    warn!("Pairing queue full, RX packet dropped");
                }
            }
            Progress::Rejected(err) => {
                bus.stop_timer(TimerId::Framing);
                if let FrameError::ChecksumMismatch { .. } = err {
                    self.integrity_fault = true;
                    warn!("Frame integrity fault: {}", err);
                } else {
                    debug!("Frame rejected: {}", err);
                }
            }
        }
    }
}

impl Default for LinkEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_TIMEOUT_MS)
    }
}
