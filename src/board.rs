//! # Board Peripherals
//!
//! Non-radio I/O the pairing session touches: the team-select strap (an
//! analog input) and the two-pin pairing status indicator.

use tracing::info;

/// Pairing status shown on the indicator pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairIndicator {
    /// Both pins low
    Unpaired,
    /// Paired with a red controller
    Red,
    /// Paired with a blue controller
    Blue,
    /// Emergency brake engaged
    EBrake,
}

impl PairIndicator {
    /// Pin levels `(a, b)` driven for this status
    pub fn pins(self) -> (bool, bool) {
        match self {
            PairIndicator::Unpaired => (false, false),
            PairIndicator::Red => (true, false),
            PairIndicator::Blue => (false, true),
            PairIndicator::EBrake => (true, true),
        }
    }
}

/// Board I/O used by the pairing session
#[cfg_attr(test, mockall::automock)]
pub trait VehicleIo {
    /// Start a team strap conversion
    ///
    /// Interrupt-driven converters return `None` and deliver the reading later
    /// as an `AdcReading` event; converters that finish immediately return it.
    fn start_team_sample(&mut self) -> Option<u8>;

    /// Drive the pairing status indicator
    fn show_indicator(&mut self, indicator: PairIndicator);
}

/// Host stand-in for the vehicle board
///
/// Answers every strap conversion with a fixed reading and logs indicator
/// changes.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    strap_raw: u8,
    indicator: PairIndicator,
}

impl SimulatedBoard {
    /// Board whose strap always reads `strap_raw`
    pub fn new(strap_raw: u8) -> Self {
        Self {
            strap_raw,
            indicator: PairIndicator::Unpaired,
        }
    }

    /// Last indicator state shown
    pub fn indicator(&self) -> PairIndicator {
        self.indicator
    }
}

impl VehicleIo for SimulatedBoard {
    fn start_team_sample(&mut self) -> Option<u8> {
        Some(self.strap_raw)
    }

    fn show_indicator(&mut self, indicator: PairIndicator) {
        if indicator != self.indicator {
            info!("Indicator: {:?} -> {:?}", self.indicator, indicator);
        }
        self.indicator = indicator;
    }
}
