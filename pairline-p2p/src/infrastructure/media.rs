use async_trait::async_trait;
use pairline_core::domain::{IceCandidate, SessionDescription, TrackKind};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Errors raised by a media backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Device busy: {0}")]
    DeviceBusy(String),

    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("Connection closed")]
    Closed,
}

/// Where a local track comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    Display,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: Uuid,
    pub kind: TrackKind,
    pub source: TrackSource,
}

impl LocalTrack {
    pub fn new(source: TrackSource) -> Self {
        let kind = match source {
            TrackSource::Microphone => TrackKind::Audio,
            TrackSource::Camera | TrackSource::Display => TrackKind::Video,
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            source,
        }
    }
}

/// Camera and microphone captured for one pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTracks {
    pub audio: LocalTrack,
    pub video: LocalTrack,
}

/// Asynchronous notices raised by an open peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionNotice {
    LocalCandidate(IceCandidate),
    Connected,
    Disconnected,
}

/// Access to capture devices and the peer-connection factory
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Capture camera and microphone
    async fn acquire_user_media(&self) -> Result<LocalTracks, MediaError>;

    /// Capture the screen or a window
    async fn acquire_display(&self) -> Result<LocalTrack, MediaError>;

    /// Stop a captured track and free its device
    async fn stop_track(&self, track: &LocalTrack);

    /// Open a fresh peer connection plus its notice stream
    async fn open_connection(
        &self,
    ) -> Result<(Box<dyn PeerConnection>, mpsc::UnboundedReceiver<ConnectionNotice>), MediaError>;
}

/// One peer connection, used for exactly one pairing
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_tracks(&mut self, tracks: &LocalTracks) -> Result<(), MediaError>;

    /// Create an offer and install it as the local description
    async fn create_offer(&mut self) -> Result<SessionDescription, MediaError>;

    /// Create an answer and install it as the local description
    async fn create_answer(&mut self) -> Result<SessionDescription, MediaError>;

    async fn set_remote_description(&mut self, sdp: SessionDescription) -> Result<(), MediaError>;

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), MediaError>;

    /// Swap the outgoing video without renegotiating
    async fn replace_video_track(&mut self, track: &LocalTrack) -> Result<(), MediaError>;

    async fn set_track_enabled(&mut self, kind: TrackKind, enabled: bool) -> Result<(), MediaError>;

    async fn close(&mut self);
}
