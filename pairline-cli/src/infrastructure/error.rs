use pairline_core::BlockListError;
use pairline_p2p::P2PError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("P2P error: {0}")]
    P2P(#[from] P2PError),

    #[error("Block list error: {0}")]
    BlockList(#[from] BlockListError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Demo stalled: {0}")]
    DemoStalled(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
