use std::fmt;

/// Length of one countdown cycle in seconds (15:00)
pub const CYCLE_SECS: u32 = 15 * 60;

/// Numeric countdown to the next cycle boundary.
///
/// Always holds a value in `[0, CYCLE_SECS]`. Display reads from this
/// value; the rendered `MM:SS` string is never parsed back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    pub fn new() -> Self {
        Countdown {
            remaining: CYCLE_SECS,
        }
    }

    /// Advances one second. Returns true when a full cycle completed, in
    /// which case the countdown has already wrapped back to 15:00.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = CYCLE_SECS;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.remaining = CYCLE_SECS;
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    pub fn minutes(&self) -> u32 {
        self.remaining / 60
    }

    pub fn seconds(&self) -> u32 {
        self.remaining % 60
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes(), self.seconds())
    }
}
