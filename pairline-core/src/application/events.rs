use crate::domain::{
    ChatMessage, EndReason, Generation, MediaCommand, MediaControls, PairingRole, ParticipantId,
    PeerMeta, Report, ReportReason, SessionPhase, SignalingMessage,
};

/// Observable happenings of one participant, for the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },

    /// A pairing was proposed or accepted
    Matched {
        peer: PeerMeta,
        generation: Generation,
        role: PairingRole,
    },

    /// Peer connection is up
    Connected { peer_id: ParticipantId },

    Ended {
        reason: EndReason,
        peer_id: Option<ParticipantId>,
    },

    /// Video visibility changed under safe mode
    RevealChanged { revealed: bool },

    ChatSent(ChatMessage),
    ChatReceived(ChatMessage),

    MediaControlsChanged(MediaControls),

    /// Media acquisition or a media step failed; the pairing continues
    MediaError { reason: String },

    ReportSubmitted {
        reason: ReportReason,
        peer_id: ParticipantId,
    },

    PeerBlocked { peer_id: ParticipantId },

    /// Something degraded without failing the action (e.g. persistence)
    Warning { message: String },
}

/// Side effect requested by the pure core; executed by the runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message over the presence channel
    Publish(SignalingMessage),

    /// Hand a command to the media driver
    Media(MediaCommand),

    /// Forward a report to the moderation sink
    Report(Report),

    /// Surface an event to the UI
    Notify(SessionEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_equality() {
        let a = Effect::Notify(SessionEvent::RevealChanged { revealed: true });
        let b = Effect::Notify(SessionEvent::RevealChanged { revealed: true });
        assert_eq!(a, b);
        assert_ne!(a, Effect::Media(MediaCommand::Release));
    }
}
