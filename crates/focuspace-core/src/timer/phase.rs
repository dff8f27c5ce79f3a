use serde::{Deserialize, Serialize};

/// One half of a Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Focus,
    Rest,
}

impl Phase {
    /// The phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            Phase::Focus => Phase::Rest,
            Phase::Rest => Phase::Focus,
        }
    }

    /// Progressive label shown next to the clock while a session runs.
    pub fn activity_label(self) -> &'static str {
        match self {
            Phase::Focus => "Focusing...",
            Phase::Rest => "Resting...",
        }
    }
}

/// Format seconds as `MM:SS`.
///
/// Minutes are not rolled over into hours, so 6720 seconds is `112:00`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_alternate() {
        assert_eq!(Phase::Focus.next(), Phase::Rest);
        assert_eq!(Phase::Rest.next(), Phase::Focus);
    }

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(300), "05:00");
        assert_eq!(format_clock(1499), "24:59");
    }

    #[test]
    fn clock_minutes_exceed_an_hour() {
        assert_eq!(format_clock(6720), "112:00");
        assert_eq!(format_clock(3601), "60:01");
    }
}
