use crate::domain::{ContentFilter, Preferences, DEFAULT_DENY_LIST};
use instant::Duration;

/// Per-participant session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Matchable attributes of the local participant
    pub preferences: Preferences,

    /// How often a presence beacon is published while searching
    pub beacon_interval: Duration,

    /// How long a remote beacon stays in the presence directory
    pub beacon_ttl: Duration,

    /// How long a Matched pairing waits for MatchAccept or Offer
    pub match_timeout: Duration,

    /// How long Connecting may last before the pairing is dropped
    pub connect_timeout: Duration,

    /// Minimum delay between a skip and the next restart
    pub skip_cooldown: Duration,

    /// Hide video until both sides opted in
    pub safe_mode: bool,

    /// Re-enter searching automatically after a pairing ends
    pub auto_requeue: bool,

    /// Chat deny-list terms
    pub deny_list: Vec<String>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_beacon_interval(mut self, interval: Duration) -> Self {
        self.beacon_interval = interval;
        self
    }

    pub fn with_beacon_ttl(mut self, ttl: Duration) -> Self {
        self.beacon_ttl = ttl;
        self
    }

    pub fn with_match_timeout(mut self, timeout: Duration) -> Self {
        self.match_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_skip_cooldown(mut self, cooldown: Duration) -> Self {
        self.skip_cooldown = cooldown;
        self
    }

    pub fn with_safe_mode(mut self, enabled: bool) -> Self {
        self.safe_mode = enabled;
        self
    }

    pub fn with_auto_requeue(mut self, enabled: bool) -> Self {
        self.auto_requeue = enabled;
        self
    }

    pub fn with_deny_list<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_list = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn content_filter(&self) -> ContentFilter {
        ContentFilter::new(&self.deny_list)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preferences: Preferences::default(),
            beacon_interval: Duration::from_secs(2),
            beacon_ttl: Duration::from_secs(6),
            match_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(15),
            skip_cooldown: Duration::from_secs(3),
            safe_mode: true,
            auto_requeue: false,
            deny_list: DEFAULT_DENY_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.beacon_interval, Duration::from_secs(2));
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.skip_cooldown, Duration::from_secs(3));
        assert!(config.safe_mode);
        assert!(!config.auto_requeue);
        assert!(!config.content_filter().allows("find me on OnlyFans"));
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new()
            .with_safe_mode(false)
            .with_auto_requeue(true)
            .with_deny_list(["spoiler"])
            .with_skip_cooldown(Duration::from_millis(10));

        assert!(!config.safe_mode);
        assert!(config.auto_requeue);
        assert_eq!(config.skip_cooldown, Duration::from_millis(10));
        assert!(config.content_filter().allows("find me on OnlyFans"));
        assert!(!config.content_filter().allows("SPOILER ahead"));
    }
}
