use crate::application::{
    report_target, Effect, MatchOutcome, Matchmaker, MediaOutcome, Messenger,
    NegotiationCoordinator, SafetyGate, SessionConfig, SessionEvent, SessionMachine, Transition,
    UserCommand,
};
use crate::domain::{
    BlockList, EndReason, MediaControls, MediaEvent, ParticipantId, PeerMeta, PresenceBeacon,
    SessionError, SessionPhase, SessionState, SignalKind, SignalingMessage,
};
use instant::Instant;

/// One local participant: matchmaking, lifecycle, negotiation, safety and chat
///
/// Every input (user command, inbound signal, media completion, timer tick)
/// is applied synchronously; the resulting side effects are queued and must
/// be drained by the runtime with [`Participant::drain_effects`].
#[derive(Debug)]
pub struct Participant {
    id: ParticipantId,
    config: SessionConfig,
    machine: SessionMachine,
    matchmaker: Matchmaker,
    negotiation: NegotiationCoordinator,
    safety: SafetyGate,
    messenger: Messenger,
    effects: Vec<Effect>,
    revealed: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, config: SessionConfig, blocks: BlockList) -> Self {
        let matchmaker = Matchmaker::new(
            id,
            config.preferences.clone(),
            config.beacon_interval,
            config.beacon_ttl,
            config.match_timeout,
        )
        .with_offer_timeout(config.connect_timeout);
        let safety = SafetyGate::new(id, config.safe_mode, blocks);
        let messenger = Messenger::new(id, config.content_filter());

        Self {
            id,
            machine: SessionMachine::new(config.skip_cooldown),
            matchmaker,
            negotiation: NegotiationCoordinator::new(),
            safety,
            messenger,
            config,
            effects: Vec::new(),
            revealed: false,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    pub fn is_revealed(&self) -> bool {
        self.safety.is_revealed(self.machine.state())
    }

    pub fn is_blocked(&self, id: &ParticipantId) -> bool {
        self.safety.is_blocked(id)
    }

    pub fn blocks(&self) -> &BlockList {
        self.safety.blocks()
    }

    pub fn media_controls(&self) -> Option<MediaControls> {
        self.negotiation.controls()
    }

    /// Take all effects queued since the last drain
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Apply a user action
    pub fn handle_command(&mut self, command: UserCommand, now: Instant) -> Result<(), SessionError> {
        tracing::debug!("📥 Command: {}", command.action());

        let result = match command {
            UserCommand::StartSearch => self
                .machine
                .start_search(now)
                .map(|t| self.entered_searching(t, now)),
            UserCommand::Restart => self
                .machine
                .restart(now)
                .map(|t| self.entered_searching(t, now)),
            UserCommand::CancelSearch => self.machine.cancel_search().map(|t| self.transitioned(t)),
            UserCommand::End => self.end(EndReason::UserEnded, now),
            UserCommand::Skip => self.end(EndReason::UserSkipped, now),
            UserCommand::MarkReady => self.safety.mark_ready(&mut self.machine, &mut self.effects),
            UserCommand::ToggleMic => self.negotiation.toggle_mic(&mut self.effects).map(|_| ()),
            UserCommand::ToggleCam => self.negotiation.toggle_cam(&mut self.effects).map(|_| ()),
            UserCommand::ToggleScreenShare => self
                .negotiation
                .toggle_screen_share(&mut self.effects)
                .map(|_| ()),
            UserCommand::RetryMedia => self.negotiation.retry_media(&mut self.effects),
            UserCommand::SendChat { text } => {
                self.messenger
                    .send(&text, &mut self.machine, &mut self.effects);
                Ok(())
            }
            UserCommand::Report { reason, text } => {
                let (peer_id, severe) =
                    self.safety
                        .report(reason, text, &self.machine, &mut self.effects)?;
                if severe {
                    self.block_peer(peer_id, now);
                }
                Ok(())
            }
            UserCommand::Block => {
                let peer_id = report_target(&self.machine).ok_or(SessionError::NoActivePeer)?;
                self.block_peer(peer_id, now);
                Ok(())
            }
        };

        self.update_reveal();
        result
    }

    /// Apply an inbound signaling message
    ///
    /// Messages addressed to someone else, from ourselves, or that make no
    /// sense in the current phase are dropped.
    pub fn handle_signal(&mut self, message: SignalingMessage, now: Instant) {
        if message.from == self.id || !message.is_addressed_to(&self.id) {
            return;
        }

        let from = message.from;
        tracing::debug!("📥 {} from {}", message.kind.name(), from.short());

        match message.kind {
            SignalKind::Presence {
                language,
                interests,
                timestamp,
            } => {
                let beacon = PresenceBeacon {
                    participant_id: from,
                    language,
                    interests,
                    timestamp,
                };
                let outcome = self.matchmaker.on_presence(
                    beacon,
                    &mut self.machine,
                    self.safety.blocks(),
                    now,
                    &mut self.effects,
                );
                self.after_match(outcome, now);
            }
            SignalKind::MatchRequest {
                language,
                interests,
            } => {
                let outcome = self.matchmaker.on_match_request(
                    PeerMeta::new(from, language, interests),
                    &mut self.machine,
                    self.safety.blocks(),
                    now,
                    &mut self.effects,
                );
                self.after_match(outcome, now);
            }
            SignalKind::MatchAccept { .. } => {
                let outcome = self.matchmaker.on_match_accept(from, &self.machine);
                self.after_match(outcome, now);
            }
            SignalKind::Offer { sdp } => {
                if !self.machine.state().is_current_peer(&from) {
                    tracing::debug!("Offer from non-peer {}, dropped", from.short());
                } else {
                    // The responder commits on the first offer
                    if self.machine.phase() == SessionPhase::Matched {
                        self.start_negotiation(now);
                    }
                    if self.machine.phase() == SessionPhase::Connecting {
                        self.negotiation.on_offer(sdp, &mut self.effects);
                    }
                }
            }
            SignalKind::Answer { sdp } => {
                if self.is_negotiating_with(&from) {
                    self.negotiation.on_answer(sdp, &mut self.effects);
                }
            }
            SignalKind::IceCandidate { candidate } => {
                if self.is_negotiating_with(&from) {
                    self.negotiation
                        .on_ice_candidate(candidate, &mut self.effects);
                }
            }
            SignalKind::Ready { reply } => {
                self.safety
                    .on_ready(from, reply, &mut self.machine, &mut self.effects);
            }
            SignalKind::Chat { text } => {
                self.messenger
                    .receive(from, text, &mut self.machine, &mut self.effects);
            }
            SignalKind::Leave => {
                if self.machine.state().is_current_peer(&from) {
                    tracing::info!("👋 Peer {} left", from.short());
                    let _ = self.end(EndReason::PeerLeft, now);
                }
            }
        }

        self.update_reveal();
    }

    /// Apply a media completion from the driver
    pub fn handle_media_event(&mut self, event: MediaEvent, now: Instant) {
        match self.negotiation.on_media_event(event, &mut self.effects) {
            MediaOutcome::Connected => {
                if let Ok(t) = self.machine.media_connected(now) {
                    self.transitioned(t);
                    if let Some(peer_id) = self.machine.state().peer_id() {
                        self.effects
                            .push(Effect::Notify(SessionEvent::Connected { peer_id }));
                    }
                    self.safety.connected(&self.machine, &mut self.effects);
                }
            }
            MediaOutcome::Disconnected => {
                if self.machine.phase() == SessionPhase::Connected {
                    tracing::warn!("📉 Peer connection lost");
                    let _ = self.end(EndReason::ConnectionLost, now);
                }
            }
            MediaOutcome::None | MediaOutcome::Stale => {}
        }

        self.update_reveal();
    }

    /// Timers: beacons, proposal expiry, connect timeout, auto-requeue
    pub fn tick(&mut self, now: Instant) {
        match self.machine.state() {
            SessionState::Matched(_) if self.matchmaker.proposal_expired(&self.machine, now) => {
                tracing::info!("⌛ Match proposal expired");
                let _ = self.end(EndReason::ProposalExpired, now);
            }
            SessionState::Connecting(pairing)
                if now.saturating_duration_since(pairing.entered_at)
                    >= self.config.connect_timeout =>
            {
                tracing::info!("⌛ Connection timed out");
                let _ = self.end(EndReason::ConnectionTimedOut, now);
            }
            SessionState::Ended { reason, .. }
                if self.config.auto_requeue && *reason != EndReason::UserEnded =>
            {
                if self.machine.cooldown_remaining(now).is_none() {
                    if let Ok(t) = self.machine.requeue() {
                        self.entered_searching(t, now);
                    }
                }
            }
            _ => {}
        }

        let outcome = self.matchmaker.tick(
            &mut self.machine,
            self.safety.blocks(),
            now,
            &mut self.effects,
        );
        self.after_match(outcome, now);
        self.update_reveal();
    }

    fn is_negotiating_with(&self, from: &ParticipantId) -> bool {
        matches!(
            self.machine.phase(),
            SessionPhase::Connecting | SessionPhase::Connected
        ) && self.machine.state().is_current_peer(from)
    }

    fn after_match(&mut self, outcome: MatchOutcome, now: Instant) {
        match outcome {
            MatchOutcome::Proposed(generation) | MatchOutcome::Accepted(generation) => {
                self.transitioned(Transition {
                    from: SessionPhase::Searching,
                    to: SessionPhase::Matched,
                });
                if let Some(pairing) = self.machine.state().pairing() {
                    self.effects.push(Effect::Notify(SessionEvent::Matched {
                        peer: pairing.peer.clone(),
                        generation,
                        role: pairing.role,
                    }));
                }
            }
            MatchOutcome::Committed(_) => self.start_negotiation(now),
            MatchOutcome::BecameResponder(_) | MatchOutcome::Ignored => {}
        }
    }

    fn start_negotiation(&mut self, now: Instant) {
        let t = match self.machine.negotiation_started(now) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!("Negotiation not started: {}", e);
                return;
            }
        };
        self.transitioned(t);

        if let Some(pairing) = self.machine.state().pairing() {
            self.negotiation.start(
                self.id,
                pairing.peer_id(),
                pairing.generation,
                pairing.role,
                &mut self.effects,
            );
        }
    }

    fn block_peer(&mut self, peer_id: ParticipantId, now: Instant) {
        self.safety.block(peer_id, &mut self.effects);
        self.matchmaker.forget(&peer_id);

        if self.machine.state().is_current_peer(&peer_id) {
            let _ = self.end(EndReason::Blocked, now);
        }
    }

    /// Tear the pairing down and move to Ended
    fn end(&mut self, reason: EndReason, now: Instant) -> Result<(), SessionError> {
        let (t, peer) = self.machine.end(reason, now)?;
        self.negotiation.stop(&mut self.effects);

        if let Some(peer_id) = peer {
            if reason != EndReason::PeerLeft {
                self.effects.push(Effect::Publish(SignalingMessage::direct(
                    self.id,
                    peer_id,
                    SignalKind::Leave,
                )));
            }
        }

        tracing::info!("🔴 Session ended: {}", reason);
        self.transitioned(t);
        self.effects.push(Effect::Notify(SessionEvent::Ended {
            reason,
            peer_id: peer,
        }));

        if reason == EndReason::ProposalExpired {
            if let Some(peer_id) = peer {
                self.matchmaker.forget(&peer_id);
            }
            if let Ok(t) = self.machine.requeue() {
                self.entered_searching(t, now);
            }
        }

        Ok(())
    }

    fn entered_searching(&mut self, t: Transition, now: Instant) {
        self.transitioned(t);
        self.matchmaker.search_started(now, &mut self.effects);
    }

    fn transitioned(&mut self, t: Transition) {
        tracing::info!("🟢 [{}] {} → {}", self.id.short(), t.from, t.to);
        self.effects.push(Effect::Notify(SessionEvent::PhaseChanged {
            from: t.from,
            to: t.to,
        }));
    }

    fn update_reveal(&mut self) {
        let revealed = self.is_revealed();
        if revealed != self.revealed {
            self.revealed = revealed;
            self.effects
                .push(Effect::Notify(SessionEvent::RevealChanged { revealed }));
        }
    }
}
