// Domain layer (transport configuration)
pub mod domain;

// Application layer (participant control loop)
pub mod application;

// Infrastructure layer (presence channels, media, moderation)
pub mod infrastructure;

pub use application::{ParticipantLoop, ParticipantLoopBuilder, RuntimeConfig};
pub use domain::IceServer;
pub use infrastructure::error::{P2PError, Result};
pub use infrastructure::{
    ChannelSink, LocalChannel, LocalHub, LoopbackMediaBackend, MatchboxChannel, MediaBackend,
    MediaDriver, ModerationSink, PeerConnection, PresenceChannel, TracingSink,
};
