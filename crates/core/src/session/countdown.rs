/// Result of advancing a [`Countdown`] by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Untimed, stopped or already expired; nothing changed.
    Inactive,
    /// Still running with this many seconds left.
    Running { remaining_secs: u64 },
    /// Reached zero on this tick. Reported exactly once.
    Expired,
}

/// Whole-second countdown.
///
/// Ticks are supplied by the owner; the countdown never reads a clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u64,
    active: bool,
}

impl Countdown {
    /// A countdown of `duration_secs`; zero yields an inactive countdown.
    #[must_use]
    pub fn new(duration_secs: u64) -> Self {
        Self {
            remaining_secs: duration_secs,
            active: duration_secs > 0,
        }
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tick(&mut self) -> CountdownTick {
        if !self.active {
            return CountdownTick::Inactive;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.active = false;
            CountdownTick::Expired
        } else {
            CountdownTick::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Freezes the countdown at its current value.
    pub fn stop(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_never_counts_down() {
        let mut countdown = Countdown::new(0);
        assert!(!countdown.is_active());
        for _ in 0..10 {
            assert_eq!(countdown.tick(), CountdownTick::Inactive);
        }
        assert_eq!(countdown.remaining_secs(), 0);
    }

    #[test]
    fn expires_exactly_once() {
        let mut countdown = Countdown::new(3);
        assert_eq!(countdown.tick(), CountdownTick::Running { remaining_secs: 2 });
        assert_eq!(countdown.tick(), CountdownTick::Running { remaining_secs: 1 });
        assert_eq!(countdown.tick(), CountdownTick::Expired);
        assert_eq!(countdown.tick(), CountdownTick::Inactive);
        assert_eq!(countdown.remaining_secs(), 0);
    }

    #[test]
    fn stop_freezes_remaining_time() {
        let mut countdown = Countdown::new(60);
        countdown.tick();
        countdown.stop();
        assert_eq!(countdown.tick(), CountdownTick::Inactive);
        assert_eq!(countdown.remaining_secs(), 59);
    }
}
