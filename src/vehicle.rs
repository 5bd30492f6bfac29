//! # Vehicle
//!
//! Wires the dispatcher, the three services and the board together.
//!
//! The host feeds it UART bytes and clock readings; it runs every queued
//! event to completion, highest-priority service first, and writes any
//! status frames to the supplied sink.

use std::io::Write;

use tracing::warn;

use crate::board::VehicleIo;
use crate::config::Config;
use crate::dispatch::{Dispatcher, Event, ServiceId, Substrate};
use crate::error::Result;
use crate::link::LinkEngine;
use crate::motion::{MotionActuator, MotionService};
use crate::session::manager::{PairingManager, PairingSession, SessionTimings};

/// Complete vehicle link stack
#[derive(Debug)]
pub struct Vehicle<A, B> {
    bus: Dispatcher,
    link: LinkEngine,
    pairing: PairingManager,
    motion: MotionService<A>,
    board: B,
}

impl<A: MotionActuator, B: VehicleIo> Vehicle<A, B> {
    /// Build from configuration and queue start-up events
    pub fn new(config: &Config, actuator: A, board: B) -> Self {
        Self::with_parts(
            config.link.frame_timeout_ms,
            config.link.queue_capacity,
            config.session_timings(),
            actuator,
            board,
        )
    }

    pub fn with_parts(
        frame_timeout_ms: u64,
        queue_capacity: usize,
        timings: SessionTimings,
        actuator: A,
        board: B,
    ) -> Self {
        let mut bus = Dispatcher::new(queue_capacity);
        for service in ServiceId::ALL {
            bus.post(service, Event::Init);
        }

        Self {
            bus,
            link: LinkEngine::new(frame_timeout_ms),
            pairing: PairingManager::new(timings),
            motion: MotionService::new(actuator),
            board,
        }
    }

    /// Queue one received UART byte; `false` if the link queue is full
    pub fn on_byte(&mut self, byte: u8) -> bool {
        self.bus.post(ServiceId::Link, Event::ByteReceived(byte))
    }

    /// Queue a finished team strap conversion
    pub fn on_adc(&mut self, raw: u8) -> bool {
        self.bus.post(ServiceId::Pairing, Event::AdcReading(raw))
    }

    /// Feed a chunk of UART bytes, dispatching after each one
    ///
    /// # Errors
    ///
    /// Returns error if a status frame cannot be written to `tx`.
    pub fn receive<W: Write>(&mut self, bytes: &[u8], tx: &mut W) -> Result<()> {
        for &byte in bytes {
            if !self.on_byte(byte) {
                warn!("Link queue full, byte 0x{:02X} dropped", byte);
            }
            self.run_pending(tx)?;
        }
        Ok(())
    }

    /// Move the clock to `now_ms`, queueing any timer expiries
    pub fn advance(&mut self, now_ms: u64) -> usize {
        self.bus.advance_to(now_ms)
    }

    /// Earliest timer deadline
    pub fn next_deadline(&self) -> Option<u64> {
        self.bus.next_deadline()
    }

    pub fn now_ms(&self) -> u64 {
        self.bus.now_ms()
    }

    /// Dispatch until every queue is empty
    ///
    /// Returns the number of events processed.
    ///
    /// # Errors
    ///
    /// Returns error if a status frame cannot be written to `tx`.
    pub fn run_pending<W: Write>(&mut self, tx: &mut W) -> Result<usize> {
        let mut processed = 0;
        while let Some((service, event)) = self.bus.next_event() {
            match service {
                ServiceId::Link => self.link.run(event, &mut self.bus, tx)?,
                ServiceId::Pairing => self.pairing.run(event, &mut self.bus, &mut self.board),
                ServiceId::Motion => self.motion.run(event),
            }
            processed += 1;
        }
        Ok(processed)
    }

    /// End any session fail-safe and stop all timers
    ///
    /// # Errors
    ///
    /// Returns error if the final status frame cannot be written to `tx`.
    pub fn shutdown<W: Write>(&mut self, tx: &mut W) -> Result<()> {
        if !self.bus.post(ServiceId::Pairing, Event::Shutdown) {
            warn!("Pairing queue full at shutdown, draining first");
            self.run_pending(tx)?;
            self.bus.post(ServiceId::Pairing, Event::Shutdown);
        }
        self.run_pending(tx)?;
        Ok(())
    }

    pub fn session(&self) -> &PairingSession {
        self.pairing.session()
    }

    pub fn link(&self) -> &LinkEngine {
        &self.link
    }

    pub fn motion(&self) -> &MotionService<A> {
        &self.motion
    }

    pub fn board(&self) -> &B {
        &self.board
    }
}
