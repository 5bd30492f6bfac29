//! # Pairing Session Manager
//!
//! Owns the trust state of the radio link: which controller the vehicle is
//! paired with, the shared keystream, and the timers that end a session.
//!
//! ```text
//!            pair request            key frame
//! Unpaired ──────────────► KeyPending ─────────► Active
//!    ▲                         │                   │
//!    └──── liveness timeout ───┘                   │
//!    └── liveness / pairing timeout, unpair bit, ──┘
//!        decrypt failure
//! ```
//!
//! Every return to `Unpaired` goes through [`PairingManager::fail_safe`],
//! which stops the thrusters and the lift fan before anything else.

use tracing::{debug, info, warn};

use super::cipher::{ControlCommand, Keystream, SEALED_CONTROL_LEN};
use super::drive::DriveCommand;
use super::team::TeamAffiliation;
use crate::board::{PairIndicator, VehicleIo};
use crate::dispatch::{Event, ServiceId, Substrate, TimerId};
use crate::error::UnpairReason;
use crate::xbee::protocol::{Address, RxPacket};
use crate::xbee::status::{StatusMessage, StatusReport};

/// RF tag of a pairing request
pub const TAG_PAIR_REQUEST: u8 = 0x00;

/// RF tag of a key distribution frame
pub const TAG_KEY: u8 = 0x01;

/// Pairing request team field: team number bits
const TEAM_NUMBER_MASK: u8 = 0x7F;

/// Pairing request team field: controller colour bit
const COLOR_BLUE_BIT: u8 = 0x80;

/// Timer periods used by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Session lifetime
    pub pair_timeout_ms: u64,
    /// Maximum gap between accepted frames
    pub liveness_timeout_ms: u64,
    /// Team strap sampling period while unpaired
    pub team_sample_interval_ms: u64,
    /// Delay before the first strap sample after start-up
    pub first_sample_ms: u64,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            pair_timeout_ms: 45_000,
            liveness_timeout_ms: 2_000,
            team_sample_interval_ms: 500,
            first_sample_ms: 1,
        }
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a pairing request
    Unpaired,
    /// Paired, waiting for the shared key
    KeyPending,
    /// Accepting encrypted control frames
    Active,
}

/// Colour of the paired controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerColor {
    #[default]
    Red,
    Blue,
}

impl ControllerColor {
    fn from_team_field(field: u8) -> Self {
        if field & COLOR_BLUE_BIT != 0 {
            ControllerColor::Blue
        } else {
            ControllerColor::Red
        }
    }

    /// Indicator shown while paired with this colour
    pub fn indicator(self) -> PairIndicator {
        match self {
            ControllerColor::Red => PairIndicator::Red,
            ControllerColor::Blue => PairIndicator::Blue,
        }
    }
}

/// Long-lived pairing state
///
/// The keystream exists only while the session is `Active`.
#[derive(Debug, Clone)]
pub struct PairingSession {
    state: SessionState,
    paired_address: Address,
    last_paired: Address,
    keystream: Option<Keystream>,
    team: TeamAffiliation,
    color: ControllerColor,
    lift_active: bool,
    echo_checksum: u8,
}

impl Default for PairingSession {
    fn default() -> Self {
        Self {
            state: SessionState::Unpaired,
            paired_address: Address::default(),
            last_paired: Address::default(),
            keystream: None,
            team: TeamAffiliation::Unassigned,
            color: ControllerColor::default(),
            lift_active: false,
            echo_checksum: 0,
        }
    }
}

impl PairingSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Controller the session is (or was last) paired with
    pub fn paired_address(&self) -> Address {
        self.paired_address
    }

    pub fn team(&self) -> TeamAffiliation {
        self.team
    }

    pub fn color(&self) -> ControllerColor {
        self.color
    }

    pub fn lift_active(&self) -> bool {
        self.lift_active
    }

    /// Keystream cursor, `None` unless `Active`
    pub fn keystream_cursor(&self) -> Option<usize> {
        self.keystream.as_ref().map(Keystream::cursor)
    }

    /// Last encrypted checksum byte received
    pub fn echo_checksum(&self) -> u8 {
        self.echo_checksum
    }

    /// Whether a pairing request from `source` clears the repeat filter
    ///
    /// Both address bytes must differ from the previous partner's.
    fn accepts_new_partner(&self, source: Address) -> bool {
        source.msb != self.last_paired.msb && source.lsb != self.last_paired.lsb
    }
}

/// Pairing session state machine
#[derive(Debug)]
pub struct PairingManager {
    session: PairingSession,
    timings: SessionTimings,
}

impl PairingManager {
    /// Create an unpaired manager
    pub fn new(timings: SessionTimings) -> Self {
        Self {
            session: PairingSession::default(),
            timings,
        }
    }

    /// Read-only view of the session
    pub fn session(&self) -> &PairingSession {
        &self.session
    }

    /// Process one event
    pub fn run<S: Substrate, B: VehicleIo>(&mut self, event: Event, bus: &mut S, board: &mut B) {
        if event == Event::Shutdown {
            self.shutdown(bus, board);
            return;
        }

        match self.session.state {
            SessionState::Unpaired => self.run_unpaired(event, bus, board),
            SessionState::KeyPending => self.run_key_pending(event, bus, board),
            SessionState::Active => self.run_active(event, bus, board),
        }
    }

    fn run_unpaired<S: Substrate, B: VehicleIo>(&mut self, event: Event, bus: &mut S, board: &mut B) {
        match event {
            Event::Init => {
                board.show_indicator(PairIndicator::Unpaired);
                post(bus, ServiceId::Motion, Event::Drive(DriveCommand::STOP));
                bus.arm_timer(TimerId::TeamSample, self.timings.first_sample_ms);
            }
            Event::Timeout(TimerId::TeamSample) => {
                if let Some(raw) = board.start_team_sample() {
                    post(bus, ServiceId::Pairing, Event::AdcReading(raw));
                }
                bus.arm_timer(TimerId::TeamSample, self.timings.team_sample_interval_ms);
            }
            Event::AdcReading(raw) => {
                let team = TeamAffiliation::classify(raw);
                if team != self.session.team {
                    info!("Team strap reads {} -> {:?}", raw, team);
                }
                self.session.team = team;
            }
            Event::Packet(packet) if packet.tag() == Some(TAG_PAIR_REQUEST) => {
                self.on_pair_request(&packet, bus, board);
            }
            other => debug!("Unpaired: ignoring {:?}", other),
        }
    }

    fn on_pair_request<S: Substrate, B: VehicleIo>(&mut self, packet: &RxPacket, bus: &mut S, board: &mut B) {
        let Some(&team_field) = packet.rf_data.get(1) else {
            debug!("Pairing request from {} without team field", packet.source);
            return;
        };

        if !self.session.accepts_new_partner(packet.source) {
            debug!(
                "Pairing request from {} suppressed (last partner {})",
                packet.source, self.session.last_paired
            );
            return;
        }

        if team_field & TEAM_NUMBER_MASK != self.session.team.number() {
            debug!(
                "Pairing request from {} for team {}, we are {:?}",
                packet.source,
                team_field & TEAM_NUMBER_MASK,
                self.session.team
            );
            return;
        }

        let color = ControllerColor::from_team_field(team_field);
        self.session.state = SessionState::KeyPending;
        self.session.paired_address = packet.source;
        self.session.last_paired = packet.source;
        self.session.color = color;
        self.session.echo_checksum = 0;
        info!("Paired with {} ({:?} controller)", packet.source, color);

        board.show_indicator(color.indicator());
        bus.stop_timer(TimerId::TeamSample);
        bus.arm_timer(TimerId::PairSession, self.timings.pair_timeout_ms);
        bus.arm_timer(TimerId::Liveness, self.timings.liveness_timeout_ms);

        post(bus, ServiceId::Motion, Event::Lift(true));
        self.session.lift_active = true;

        self.transmit(bus, StatusMessage::PairedOk, [0; 2]);
    }

    fn run_key_pending<S: Substrate, B: VehicleIo>(&mut self, event: Event, bus: &mut S, board: &mut B) {
        match event {
            Event::Timeout(TimerId::Liveness) => {
                self.fail_safe(UnpairReason::LivenessTimeout, bus, board);
            }
            Event::Timeout(TimerId::PairSession) => {
                self.fail_safe(UnpairReason::PairingTimeout, bus, board);
            }
            Event::Packet(packet)
                if packet.tag() == Some(TAG_KEY) && packet.source == self.session.paired_address =>
            {
                let Some(keystream) = Keystream::from_slice(&packet.rf_data[1..]) else {
                    warn!("Short key frame from {} ({} bytes)", packet.source, packet.rf_data.len());
                    return;
                };

                let last_key_byte = keystream.last_key_byte();
                self.session.keystream = Some(keystream);
                self.session.state = SessionState::Active;
                info!("Key received from {}, session active", packet.source);

                bus.arm_timer(TimerId::Liveness, self.timings.liveness_timeout_ms);
                self.transmit(bus, StatusMessage::Debug1, [last_key_byte, 0]);
            }
            other => debug!("KeyPending: ignoring {:?}", other),
        }
    }

    fn run_active<S: Substrate, B: VehicleIo>(&mut self, event: Event, bus: &mut S, board: &mut B) {
        match event {
            Event::Packet(packet) if packet.source == self.session.paired_address => {
                self.on_control_frame(&packet, bus, board);
            }
            Event::Timeout(TimerId::Liveness) => {
                self.fail_safe(UnpairReason::LivenessTimeout, bus, board);
            }
            Event::Timeout(TimerId::PairSession) => {
                self.fail_safe(UnpairReason::PairingTimeout, bus, board);
            }
            other => debug!("Active: ignoring {:?}", other),
        }
    }

    fn on_control_frame<S: Substrate, B: VehicleIo>(&mut self, packet: &RxPacket, bus: &mut S, board: &mut B) {
        let Some(keystream) = self.session.keystream.as_mut() else {
            return;
        };

        let Some(sealed) = packet
            .rf_data
            .get(..SEALED_CONTROL_LEN)
            .and_then(|bytes| <[u8; SEALED_CONTROL_LEN]>::try_from(bytes).ok())
        else {
            debug!("Short control frame ({} bytes)", packet.rf_data.len());
            return;
        };

        if !keystream.is_control_tag(sealed[0]) {
            debug!("Frame tag 0x{:02X} is not a control frame at cursor {}", sealed[0], keystream.cursor());
            return;
        }

        let opened = keystream.open(&sealed);
        self.session.echo_checksum = sealed[SEALED_CONTROL_LEN - 1];
        bus.arm_timer(TimerId::Liveness, self.timings.liveness_timeout_ms);

        match opened {
            Ok(command) => {
                self.transmit(bus, StatusMessage::PairedOk, [0; 2]);
                self.execute(command, bus, board);
            }
            Err(fault) => {
                warn!(
                    "Control checksum failed: computed 0x{:02X}, received 0x{:02X}",
                    fault.computed, fault.received
                );
                self.fail_safe(
                    UnpairReason::DecryptFailure {
                        computed: fault.computed,
                        received: fault.received,
                    },
                    bus,
                    board,
                );
            }
        }
    }

    fn execute<S: Substrate, B: VehicleIo>(&mut self, command: ControlCommand, bus: &mut S, board: &mut B) {
        let drive = DriveCommand::derive(command.drive, command.turn);
        debug!(
            "Control: drive {} turn {} special 0x{:02X} -> left {} right {}",
            command.drive, command.turn, command.special, drive.left, drive.right
        );
        post(bus, ServiceId::Motion, Event::Drive(drive));

        if command.brake() {
            post(bus, ServiceId::Motion, Event::Lift(false));
            self.session.lift_active = false;
            board.show_indicator(PairIndicator::EBrake);
        } else if !self.session.lift_active {
            post(bus, ServiceId::Motion, Event::Lift(true));
            self.session.lift_active = true;
            board.show_indicator(self.session.color.indicator());
        }

        if command.unpair() {
            self.fail_safe(UnpairReason::ManualUnpair, bus, board);
        }
    }

    /// End the session: actuators off, timers stopped, status reported
    fn fail_safe<S: Substrate, B: VehicleIo>(&mut self, reason: UnpairReason, bus: &mut S, board: &mut B) {
        info!("Unpairing from {}: {}", self.session.paired_address, reason);

        post(bus, ServiceId::Motion, Event::Lift(false));
        post(bus, ServiceId::Motion, Event::Drive(DriveCommand::STOP));
        self.session.lift_active = false;

        self.session.state = SessionState::Unpaired;
        self.session.keystream = None;
        board.show_indicator(PairIndicator::Unpaired);

        bus.stop_timer(TimerId::PairSession);
        bus.stop_timer(TimerId::Liveness);

        match reason {
            UnpairReason::DecryptFailure { computed, received } => {
                self.transmit(bus, StatusMessage::Debug2, [computed, received]);
            }
            _ => self.transmit(bus, StatusMessage::UnpairedOk, [0; 2]),
        }

        if reason == UnpairReason::Shutdown {
            bus.stop_timer(TimerId::TeamSample);
        } else {
            bus.arm_timer(TimerId::TeamSample, self.timings.team_sample_interval_ms);
        }
    }

    fn shutdown<S: Substrate, B: VehicleIo>(&mut self, bus: &mut S, board: &mut B) {
        if self.session.state == SessionState::Unpaired {
            post(bus, ServiceId::Motion, Event::Lift(false));
            post(bus, ServiceId::Motion, Event::Drive(DriveCommand::STOP));
            self.session.lift_active = false;
            bus.stop_timer(TimerId::TeamSample);
            return;
        }

        self.fail_safe(UnpairReason::Shutdown, bus, board);
    }

    fn transmit<S: Substrate>(&self, bus: &mut S, message: StatusMessage, diagnostics: [u8; 2]) {
        let report = StatusReport::new(message, self.session.paired_address, self.session.echo_checksum)
            .with_diagnostics(diagnostics);
        post(bus, ServiceId::Link, Event::Transmit(report));
    }
}

fn post<S: Substrate>(bus: &mut S, service: ServiceId, event: Event) {
    if !bus.post(service, event) {
        warn!("{:?} queue full, event dropped", service);
    }
}
