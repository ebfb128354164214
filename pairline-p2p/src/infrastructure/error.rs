/// Infrastructure layer errors
#[derive(Debug, thiserror::Error)]
pub enum P2PError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Command rejected: {0}")]
    Rejected(#[from] pairline_core::SessionError),

    #[error("Command queue error: {0}")]
    Queue(#[from] pairline_core::application::runtime::QueueError),

    #[error("Block list error: {0}")]
    BlockList(#[from] pairline_core::BlockListError),
}

pub type Result<T> = std::result::Result<T, P2PError>;
