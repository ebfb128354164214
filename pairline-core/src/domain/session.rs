use crate::domain::{ChatMessage, ParticipantId, PeerMeta};
use instant::Instant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical marker of one pairing
///
/// Bumped on every entry into `Matched`. Async results carry the generation
/// that was current when they started and are discarded on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn initial() -> Self {
        Generation(0)
    }

    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Readiness of both sides for the current pairing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessFlags {
    pub local_ready: bool,
    pub remote_ready_observed: bool,
}

impl ReadinessFlags {
    pub fn both(&self) -> bool {
        self.local_ready && self.remote_ready_observed
    }
}

/// Which side proposed the pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingRole {
    /// Sent the MatchRequest; creates the offer once accepted
    Initiator,
    /// Replied MatchAccept; answers the offer
    Responder,
}

/// All session-scoped data of one pairing
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
    pub peer: PeerMeta,
    pub generation: Generation,
    pub role: PairingRole,
    /// When the current phase was entered (drives timeouts)
    pub entered_at: Instant,
    pub readiness: ReadinessFlags,
    pub chat: Vec<ChatMessage>,
}

impl Pairing {
    pub fn new(peer: PeerMeta, generation: Generation, role: PairingRole, now: Instant) -> Self {
        Self {
            peer,
            generation,
            role,
            entered_at: now,
            readiness: ReadinessFlags::default(),
            chat: Vec::new(),
        }
    }

    pub fn peer_id(&self) -> ParticipantId {
        self.peer.peer_id
    }
}

/// Why a pairing (or a search) ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    UserEnded,
    UserSkipped,
    PeerLeft,
    Blocked,
    /// No MatchAccept or Offer arrived in time
    ProposalExpired,
    ConnectionTimedOut,
    ConnectionLost,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::UserEnded => "ended",
            EndReason::UserSkipped => "skipped",
            EndReason::PeerLeft => "peer left",
            EndReason::Blocked => "blocked",
            EndReason::ProposalExpired => "match proposal expired",
            EndReason::ConnectionTimedOut => "connection timed out",
            EndReason::ConnectionLost => "connection lost",
        };
        f.write_str(text)
    }
}

/// Lifecycle of the local participant through one pairing
///
/// Peer data lives inside [`Pairing`], so it exists exactly in the three
/// paired phases.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Searching,
    Matched(Pairing),
    Connecting(Pairing),
    Connected(Pairing),
    Ended {
        reason: EndReason,
        /// Kept so a report can still target the peer after the fact
        last_peer: Option<ParticipantId>,
    },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Searching => SessionPhase::Searching,
            SessionState::Matched(_) => SessionPhase::Matched,
            SessionState::Connecting(_) => SessionPhase::Connecting,
            SessionState::Connected(_) => SessionPhase::Connected,
            SessionState::Ended { .. } => SessionPhase::Ended,
        }
    }

    pub fn pairing(&self) -> Option<&Pairing> {
        match self {
            SessionState::Matched(p) | SessionState::Connecting(p) | SessionState::Connected(p) => {
                Some(p)
            }
            _ => None,
        }
    }

    pub fn pairing_mut(&mut self) -> Option<&mut Pairing> {
        match self {
            SessionState::Matched(p) | SessionState::Connecting(p) | SessionState::Connected(p) => {
                Some(p)
            }
            _ => None,
        }
    }

    pub fn peer(&self) -> Option<&PeerMeta> {
        self.pairing().map(|p| &p.peer)
    }

    pub fn peer_id(&self) -> Option<ParticipantId> {
        self.pairing().map(Pairing::peer_id)
    }

    pub fn generation(&self) -> Option<Generation> {
        self.pairing().map(|p| p.generation)
    }

    /// True when `id` is the peer of the current pairing
    pub fn is_current_peer(&self, id: &ParticipantId) -> bool {
        self.peer_id().as_ref() == Some(id)
    }
}

/// Field-less view of [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Searching,
    Matched,
    Connecting,
    Connected,
    Ended,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Searching => "Searching",
            SessionPhase::Matched => "Matched",
            SessionPhase::Connecting => "Connecting",
            SessionPhase::Connected => "Connected",
            SessionPhase::Ended => "Ended",
        };
        f.write_str(text)
    }
}

/// Errors returned for rejected local actions
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: SessionPhase,
        action: &'static str,
    },

    #[error("Restart is rate-limited for another {remaining_ms}ms")]
    CooldownActive { remaining_ms: u64 },

    #[error("No active peer")]
    NoActivePeer,

    #[error("Nobody to report")]
    NoReportTarget,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairing() -> Pairing {
        Pairing::new(
            PeerMeta::new(ParticipantId::new(), Some("en".to_string()), vec![]),
            Generation::initial().next(),
            PairingRole::Initiator,
            Instant::now(),
        )
    }

    #[test]
    fn test_generation_is_monotonic() {
        let g0 = Generation::initial();
        let g1 = g0.next();
        assert!(g1 > g0);
        assert_eq!(g1.value(), 1);
        assert_eq!(g1.to_string(), "gen#1");
    }

    #[test]
    fn test_peer_only_in_paired_phases() {
        let p = pairing();
        let peer = p.peer_id();

        assert!(SessionState::Idle.peer().is_none());
        assert!(SessionState::Searching.peer().is_none());
        assert!(SessionState::Ended {
            reason: EndReason::PeerLeft,
            last_peer: Some(peer),
        }
        .peer()
        .is_none());

        assert_eq!(SessionState::Matched(p.clone()).peer_id(), Some(peer));
        assert_eq!(SessionState::Connecting(p.clone()).peer_id(), Some(peer));
        assert_eq!(SessionState::Connected(p).peer_id(), Some(peer));
    }

    #[test]
    fn test_is_current_peer() {
        let p = pairing();
        let peer = p.peer_id();
        let state = SessionState::Connected(p);

        assert!(state.is_current_peer(&peer));
        assert!(!state.is_current_peer(&ParticipantId::new()));
    }

    #[test]
    fn test_readiness_requires_both() {
        let mut flags = ReadinessFlags::default();
        assert!(!flags.both());
        flags.local_ready = true;
        assert!(!flags.both());
        flags.remote_ready_observed = true;
        assert!(flags.both());
    }

    #[test]
    fn test_error_messages() {
        let err = SessionError::InvalidTransition {
            from: SessionPhase::Idle,
            action: "skip",
        };
        assert_eq!(err.to_string(), "Cannot skip while Idle");
        assert_eq!(
            EndReason::ConnectionTimedOut.to_string(),
            "connection timed out"
        );
    }
}
