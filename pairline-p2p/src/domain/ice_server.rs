use serde::{Deserialize, Serialize};

/// ICE server configuration for the peer connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URLs (can have multiple for failover)
    pub urls: Vec<String>,
    /// Username for authentication (optional, required for TURN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Credential for authentication (optional, required for TURN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self::stun(url).with_auth(username, credential)
    }

    pub fn with_auth(mut self, username: impl Into<String>, credential: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.credential = Some(credential.into());
        self
    }

    pub fn is_turn(&self) -> bool {
        self.urls.iter().any(|u| u.starts_with("turn:") || u.starts_with("turns:"))
    }

    /// Public STUN servers used when nothing is configured
    pub fn default_stun_servers() -> Vec<Self> {
        vec![
            Self::stun("stun:stun.l.google.com:19302"),
            Self::stun("stun:stun1.l.google.com:19302"),
        ]
    }

    /// Parse `url` or `url|username|credential`
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split('|');
        let url = parts.next().map(str::trim).filter(|u| !u.is_empty())?;
        match (parts.next(), parts.next()) {
            (Some(user), Some(pass)) => Some(Self::turn(url, user, pass)),
            (None, None) => Some(Self::stun(url)),
            _ => None,
        }
    }
}
