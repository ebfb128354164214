use crate::domain::{
    EndReason, Generation, Pairing, PairingRole, ParticipantId, PeerMeta, ReadinessFlags,
    SessionError, SessionPhase, SessionState,
};
use instant::{Duration, Instant};

/// A completed phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

/// Lifecycle of the local participant
///
/// The state value is replaced wholesale on every transition; nothing
/// outside this type mutates the phase.
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    generation: Generation,
    skip_cooldown: Duration,
    cooldown_until: Option<Instant>,
}

impl SessionMachine {
    pub fn new(skip_cooldown: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            generation: Generation::initial(),
            skip_cooldown,
            cooldown_until: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Generation of the most recent pairing (current or last)
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn pairing_mut(&mut self) -> Option<&mut Pairing> {
        self.state.pairing_mut()
    }

    /// Time left before a restart is allowed
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    /// Idle or Ended → Searching
    ///
    /// Leaving Ended is rate-limited by the skip cooldown.
    pub fn start_search(&mut self, now: Instant) -> Result<Transition, SessionError> {
        match self.phase() {
            SessionPhase::Idle => Ok(self.replace(SessionState::Searching)),
            SessionPhase::Ended => self.restart(now),
            from => Err(SessionError::InvalidTransition {
                from,
                action: "start search",
            }),
        }
    }

    /// Ended → Searching, subject to the skip cooldown
    pub fn restart(&mut self, now: Instant) -> Result<Transition, SessionError> {
        let from = self.phase();
        if from != SessionPhase::Ended {
            return Err(SessionError::InvalidTransition {
                from,
                action: "restart",
            });
        }

        if let Some(left) = self.cooldown_remaining(now) {
            return Err(SessionError::CooldownActive {
                remaining_ms: left.as_millis() as u64,
            });
        }

        self.cooldown_until = None;
        Ok(self.replace(SessionState::Searching))
    }

    /// Ended → Searching without the cooldown check (system-initiated)
    pub fn requeue(&mut self) -> Result<Transition, SessionError> {
        let from = self.phase();
        if from != SessionPhase::Ended {
            return Err(SessionError::InvalidTransition {
                from,
                action: "requeue",
            });
        }
        Ok(self.replace(SessionState::Searching))
    }

    /// Searching → Idle
    pub fn cancel_search(&mut self) -> Result<Transition, SessionError> {
        let from = self.phase();
        if from != SessionPhase::Searching {
            return Err(SessionError::InvalidTransition {
                from,
                action: "cancel search",
            });
        }
        Ok(self.replace(SessionState::Idle))
    }

    /// Searching → Matched, opening a new generation
    pub fn match_found(
        &mut self,
        peer: PeerMeta,
        role: PairingRole,
        now: Instant,
    ) -> Result<Generation, SessionError> {
        let from = self.phase();
        if from != SessionPhase::Searching {
            return Err(SessionError::InvalidTransition {
                from,
                action: "match",
            });
        }

        self.generation = self.generation.next();
        let pairing = Pairing::new(peer, self.generation, role, now);
        self.replace(SessionState::Matched(pairing));
        Ok(self.generation)
    }

    /// Matched → Connecting; readiness starts over
    pub fn negotiation_started(&mut self, now: Instant) -> Result<Transition, SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Matched(mut pairing) => {
                pairing.entered_at = now;
                pairing.readiness = ReadinessFlags::default();
                self.state = SessionState::Connecting(pairing);
                Ok(Transition {
                    from: SessionPhase::Matched,
                    to: SessionPhase::Connecting,
                })
            }
            other => {
                let from = other.phase();
                self.state = other;
                Err(SessionError::InvalidTransition {
                    from,
                    action: "start negotiation",
                })
            }
        }
    }

    /// Connecting → Connected
    ///
    /// Any remote Ready seen before this point is forgotten; only a Ready
    /// observed while Connected counts.
    pub fn media_connected(&mut self, now: Instant) -> Result<Transition, SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Connecting(mut pairing) => {
                pairing.entered_at = now;
                pairing.readiness.remote_ready_observed = false;
                self.state = SessionState::Connected(pairing);
                Ok(Transition {
                    from: SessionPhase::Connecting,
                    to: SessionPhase::Connected,
                })
            }
            other => {
                let from = other.phase();
                self.state = other;
                Err(SessionError::InvalidTransition {
                    from,
                    action: "connect",
                })
            }
        }
    }

    /// Any non-Idle phase → Ended
    ///
    /// Returns the peer of the pairing that ended, if there was one. A skip
    /// arms the restart cooldown.
    pub fn end(
        &mut self,
        reason: EndReason,
        now: Instant,
    ) -> Result<(Transition, Option<ParticipantId>), SessionError> {
        let from = self.phase();
        if matches!(from, SessionPhase::Idle | SessionPhase::Ended) {
            return Err(SessionError::InvalidTransition {
                from,
                action: "end",
            });
        }

        let peer = self.state.peer_id();
        if reason == EndReason::UserSkipped {
            self.cooldown_until = Some(now + self.skip_cooldown);
        }

        let transition = self.replace(SessionState::Ended {
            reason,
            last_peer: peer,
        });
        Ok((transition, peer))
    }

    /// Reason and peer of the last ended pairing
    pub fn ended(&self) -> Option<(EndReason, Option<ParticipantId>)> {
        match &self.state {
            SessionState::Ended { reason, last_peer } => Some((*reason, *last_peer)),
            _ => None,
        }
    }

    fn replace(&mut self, next: SessionState) -> Transition {
        let from = self.phase();
        self.state = next;
        let to = self.phase();
        tracing::debug!("🔀 {} → {}", from, to);
        Transition { from, to }
    }
}
