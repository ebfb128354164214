mod commands;
mod config;
mod events;
mod matchmaker;
mod messaging;
mod negotiation;
mod participant;
pub mod runtime;
mod safety;
mod session_machine;

pub use commands::UserCommand;
pub use config::SessionConfig;
pub use events::{Effect, SessionEvent};
pub use matchmaker::{MatchOutcome, Matchmaker};
pub use messaging::Messenger;
pub use negotiation::{LocalMedia, MediaOutcome, NegotiationCoordinator, NegotiationHandle};
pub use participant::Participant;
pub use safety::{report_target, SafetyGate};
pub use session_machine::{SessionMachine, Transition};
