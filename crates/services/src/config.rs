use std::time::Duration;

/// XP granted for passing an exam.
pub const DEFAULT_PASS_REWARD_XP: u32 = 50;
pub const DEFAULT_PASS_REWARD_REASON: &str = "Passed Exam";
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Tunables for running exam sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub pass_reward_xp: u32,
    pub pass_reward_reason: String,
    /// Wall-clock length of one countdown second.
    pub tick_interval: Duration,
    pub history_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pass_reward_xp: DEFAULT_PASS_REWARD_XP,
            pass_reward_reason: DEFAULT_PASS_REWARD_REASON.to_owned(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_pass_reward(mut self, xp: u32, reason: impl Into<String>) -> Self {
        self.pass_reward_xp = xp;
        self.pass_reward_reason = reason.into();
        self
    }

    /// A zero interval is replaced by one millisecond so the timer never spins.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_rewards() {
        let config = SessionConfig::default();
        assert_eq!(config.pass_reward_xp, 50);
        assert_eq!(config.pass_reward_reason, "Passed Exam");
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn builders_override_and_clamp() {
        let config = SessionConfig::default()
            .with_pass_reward(10, "Quiz")
            .with_tick_interval(Duration::ZERO)
            .with_history_limit(0);
        assert_eq!(config.pass_reward_xp, 10);
        assert_eq!(config.pass_reward_reason, "Quiz");
        assert_eq!(config.tick_interval, Duration::from_millis(1));
        assert_eq!(config.history_limit, 1);
    }
}
