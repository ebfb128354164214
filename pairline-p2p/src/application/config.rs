use crate::domain::IceServer;
use instant::Duration;

/// Transport settings for a participant loop
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Matchbox signalling server URL
    pub signalling_server: String,

    /// Room joined on the signalling server; everyone in it can match
    pub room: String,

    pub ice_servers: Vec<IceServer>,

    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            signalling_server: "ws://localhost:3536".to_string(),
            room: "pairline".to_string(),
            ice_servers: IceServer::default_stun_servers(),
            poll_interval_ms: 50,
        }
    }
}

impl RuntimeConfig {
    pub fn new(signalling_server: impl Into<String>) -> Self {
        Self {
            signalling_server: signalling_server.into(),
            ..Default::default()
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.room, "pairline");
        assert!(!config.ice_servers.is_empty());
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new("wss://signal.example.com")
            .with_room("en-music")
            .with_ice_servers(vec![IceServer::stun("stun:stun.example.com")])
            .with_poll_interval(0);

        assert_eq!(config.signalling_server, "wss://signal.example.com");
        assert_eq!(config.room, "en-music");
        assert_eq!(config.ice_servers.len(), 1);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
