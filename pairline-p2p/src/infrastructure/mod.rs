pub mod channel;
pub mod codec;
pub mod error;
pub mod local;
pub mod loopback;
pub mod matchbox;
pub mod media;
pub mod media_driver;
pub mod moderation;

pub use channel::PresenceChannel;
pub use error::{P2PError, Result};
pub use local::{LocalChannel, LocalHub};
pub use loopback::LoopbackMediaBackend;
pub use matchbox::MatchboxChannel;
pub use media::{
    ConnectionNotice, LocalTrack, LocalTracks, MediaBackend, MediaError, PeerConnection,
    TrackSource,
};
pub use media_driver::MediaDriver;
pub use moderation::{ChannelSink, ModerationSink, TracingSink};
