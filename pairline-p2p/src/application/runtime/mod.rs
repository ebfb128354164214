mod builder;
mod participant_loop;

pub use builder::ParticipantLoopBuilder;
pub use participant_loop::ParticipantLoop;
