//! Team classification from the analog team-select strap.
//!
//! The strap is a resistor divider read as an 8-bit sample. Each team sits in
//! an open interval around its nominal reading; boundary values and anything
//! outside the table are unassigned.

/// Wire value used for an unassigned vehicle
pub const UNASSIGNED_TEAM_NUMBER: u8 = 6;

/// Open `(low, high)` sample intervals, indexed by team number
const TEAM_RANGES: [(u8, u8); 4] = [(70, 100), (101, 139), (140, 162), (163, 190)];

/// Team this vehicle answers pairing requests for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeamAffiliation {
    /// Team 0 through 3
    Team(u8),
    /// No strap reading matched
    #[default]
    Unassigned,
}

impl TeamAffiliation {
    /// Classify a raw analog sample
    pub fn classify(raw: u8) -> Self {
        TEAM_RANGES
            .iter()
            .position(|&(low, high)| raw > low && raw < high)
            .map_or(TeamAffiliation::Unassigned, |team| TeamAffiliation::Team(team as u8))
    }

    /// Team number as carried in a pairing request
    pub fn number(self) -> u8 {
        match self {
            TeamAffiliation::Team(n) => n,
            TeamAffiliation::Unassigned => UNASSIGNED_TEAM_NUMBER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_readings() {
        assert_eq!(TeamAffiliation::classify(85), TeamAffiliation::Team(0));
        assert_eq!(TeamAffiliation::classify(125), TeamAffiliation::Team(1));
        assert_eq!(TeamAffiliation::classify(154), TeamAffiliation::Team(2));
        assert_eq!(TeamAffiliation::classify(170), TeamAffiliation::Team(3));
        assert_eq!(TeamAffiliation::classify(40), TeamAffiliation::Unassigned);
    }

    #[test]
    fn test_boundaries_are_unassigned() {
        for raw in [70, 100, 101, 139, 140, 162, 163, 190] {
            assert_eq!(
                TeamAffiliation::classify(raw),
                TeamAffiliation::Unassigned,
                "boundary {} should not classify",
                raw
            );
        }
    }

    #[test]
    fn test_interior_edges_classify() {
        assert_eq!(TeamAffiliation::classify(71), TeamAffiliation::Team(0));
        assert_eq!(TeamAffiliation::classify(99), TeamAffiliation::Team(0));
        assert_eq!(TeamAffiliation::classify(189), TeamAffiliation::Team(3));
        assert_eq!(TeamAffiliation::classify(255), TeamAffiliation::Unassigned);
    }

    #[test]
    fn test_team_numbers() {
        assert_eq!(TeamAffiliation::Team(2).number(), 2);
        assert_eq!(TeamAffiliation::Unassigned.number(), 6);
        assert_eq!(TeamAffiliation::default(), TeamAffiliation::Unassigned);
    }
}
