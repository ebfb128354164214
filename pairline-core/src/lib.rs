// Domain layer (data model, no behaviour beyond invariants)
pub mod domain;

// Application layer (matchmaking, lifecycle, negotiation, safety, chat)
pub mod application;

pub use application::{
    Effect, Participant, SessionConfig, SessionEvent, SessionMachine, UserCommand,
};
pub use domain::{
    BlockList, BlockListError, BlockStore, EndReason, Generation, JsonFileBlockStore,
    MediaCommand, MediaEvent, MemoryBlockStore, ParticipantId, Preferences, Report, ReportReason,
    SessionError, SessionPhase, SessionState, SignalKind, SignalingMessage, Timestamp,
};
