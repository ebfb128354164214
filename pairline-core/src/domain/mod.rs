pub mod block_list;
pub mod chat;
pub mod media;
pub mod participant;
pub mod presence;
pub mod report;
pub mod session;
pub mod signaling;

pub use block_list::{BlockList, BlockListError, BlockStore, JsonFileBlockStore, MemoryBlockStore};
pub use chat::{ChatDirection, ChatMessage, ContentFilter, DEFAULT_DENY_LIST};
pub use media::{MediaCommand, MediaControls, MediaEvent, TrackKind};
pub use participant::{ParticipantId, PeerMeta, Preferences, Timestamp};
pub use presence::{is_compatible, PresenceBeacon, PresenceDirectory};
pub use report::{Report, ReportReason, UnknownReason};
pub use session::{
    EndReason, Generation, Pairing, PairingRole, ReadinessFlags, SessionError, SessionPhase,
    SessionState,
};
pub use signaling::{IceCandidate, SessionDescription, SignalKind, SignalingMessage};
