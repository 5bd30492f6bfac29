//! # Motion Service
//!
//! Applies drive and lift commands from the pairing session to the thrusters
//! and lift fan. PWM scaling lives behind [`MotionActuator`].

use tracing::{debug, info};

use crate::dispatch::Event;
use crate::session::drive::DriveCommand;

/// Thruster and lift fan outputs
pub trait MotionActuator {
    /// Set both thrusters
    fn drive(&mut self, command: DriveCommand);

    /// Switch the lift fan
    fn set_lift(&mut self, on: bool);
}

/// Service consuming `Drive` and `Lift` events
#[derive(Debug)]
pub struct MotionService<A> {
    actuator: A,
    last_drive: DriveCommand,
    lift: bool,
}

impl<A: MotionActuator> MotionService<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            actuator,
            last_drive: DriveCommand::STOP,
            lift: false,
        }
    }

    /// Last drive command applied
    pub fn last_drive(&self) -> DriveCommand {
        self.last_drive
    }

    /// Whether the lift fan is on
    pub fn lift(&self) -> bool {
        self.lift
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Process one event
    pub fn run(&mut self, event: Event) {
        match event {
            Event::Drive(command) => {
                self.last_drive = command;
                self.actuator.drive(command);
            }
            Event::Lift(on) => {
                self.lift = on;
                self.actuator.set_lift(on);
            }
            other => debug!("Motion: ignoring {:?}", other),
        }
    }
}

/// Host actuator that only logs what it is told
#[derive(Debug, Default)]
pub struct LoggingActuator;

impl MotionActuator for LoggingActuator {
    fn drive(&mut self, command: DriveCommand) {
        debug!("Thrusters: left {:4} right {:4}", command.left, command.right);
    }

    fn set_lift(&mut self, on: bool) {
        info!("Lift fan {}", if on { "ON" } else { "OFF" });
    }
}
