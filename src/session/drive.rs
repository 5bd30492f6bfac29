//! Differential drive derivation.
//!
//! Converts a decrypted drive/turn pair into left and right thruster
//! commands. Moving forward, the turn adds to one side only and never
//! drives it negative. In reverse, the turned side is clamped at zero
//! before both sides are negated.

/// Signed left/right thruster command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveCommand {
    pub left: i8,
    pub right: i8,
}

impl DriveCommand {
    /// Both thrusters off
    pub const STOP: DriveCommand = DriveCommand { left: 0, right: 0 };

    /// Derive thruster commands from drive and turn bytes
    ///
    /// Intermediate values are widened and the result saturates to `i8`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hover_link::session::drive::DriveCommand;
    ///
    /// let cmd = DriveCommand::derive(60, -20);
    /// assert_eq!((cmd.left, cmd.right), (60, 80));
    /// ```
    pub fn derive(drive: i8, turn: i8) -> Self {
        let drive = i16::from(drive);
        let turn = i16::from(turn);

        let mut left = drive;
        let mut right = drive;

        if drive > 0 {
            if turn < 0 {
                right = (right - turn).max(0);
            } else {
                left = (left + turn).max(0);
            }
        } else if turn > 0 {
            left = -(left + turn).min(0);
            right = -right;
        } else {
            right = -(right - turn).min(0);
            left = -left;
        }

        Self {
            left: saturate(left),
            right: saturate(right),
        }
    }

    /// Whether any thruster is commanded
    pub fn is_moving(&self) -> bool {
        *self != Self::STOP
    }
}

fn saturate(value: i16) -> i8 {
    value.clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8
}
