pub mod config;
pub mod runtime;

pub use config::RuntimeConfig;
pub use runtime::{ParticipantLoop, ParticipantLoopBuilder};
