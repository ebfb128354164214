use crate::application::{Effect, SessionMachine};
use crate::domain::{
    is_compatible, BlockList, Generation, PairingRole, ParticipantId, PeerMeta, Preferences,
    PresenceBeacon, PresenceDirectory, SessionPhase, SessionState, SignalKind, SignalingMessage,
};
use instant::{Duration, Instant};

/// What a matchmaking input did to the local session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Ignored,
    /// We proposed to the peer and entered Matched as initiator
    Proposed(Generation),
    /// We accepted the peer's proposal and entered Matched as responder
    Accepted(Generation),
    /// Crossed proposal resolved in the peer's favour; we now answer
    BecameResponder(Generation),
    /// Our proposal was accepted; negotiation should start
    Committed(Generation),
}

/// Turns presence beacons and match proposals into pairings
#[derive(Debug)]
pub struct Matchmaker {
    local_id: ParticipantId,
    preferences: Preferences,
    directory: PresenceDirectory,
    beacon_interval: Duration,
    beacon_ttl: Duration,
    match_timeout: Duration,
    offer_timeout: Duration,
    last_beacon: Option<Instant>,
}

impl Matchmaker {
    pub fn new(
        local_id: ParticipantId,
        preferences: Preferences,
        beacon_interval: Duration,
        beacon_ttl: Duration,
        match_timeout: Duration,
    ) -> Self {
        Self {
            local_id,
            preferences,
            directory: PresenceDirectory::new(),
            beacon_interval,
            beacon_ttl,
            match_timeout,
            offer_timeout: match_timeout,
            last_beacon: None,
        }
    }

    /// How long a responder waits for the offer after accepting
    ///
    /// The initiator may still be acquiring or retrying media at that point,
    /// so this is usually the connect timeout rather than the proposal one.
    pub fn with_offer_timeout(mut self, timeout: Duration) -> Self {
        self.offer_timeout = timeout;
        self
    }

    pub fn directory(&self) -> &PresenceDirectory {
        &self.directory
    }

    /// Announce ourselves right away after entering Searching
    pub fn search_started(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        self.last_beacon = None;
        self.publish_beacon(now, effects);
    }

    /// Periodic work while Searching: expire stale beacons, republish ours,
    /// and propose to a remembered searcher if one is still around
    pub fn tick(
        &mut self,
        machine: &mut SessionMachine,
        blocks: &BlockList,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) -> MatchOutcome {
        let expired = self.directory.expire(now, self.beacon_ttl);
        if expired > 0 {
            tracing::debug!("🧹 Expired {} stale beacon(s)", expired);
        }

        if machine.phase() != SessionPhase::Searching {
            return MatchOutcome::Ignored;
        }

        let due = self
            .last_beacon
            .map_or(true, |last| now.saturating_duration_since(last) >= self.beacon_interval);
        if due {
            self.publish_beacon(now, effects);
        }

        let candidate = self
            .directory
            .entries()
            .filter(|(b, _)| self.is_candidate(b.participant_id, blocks))
            .filter(|(b, _)| is_compatible(&self.preferences, b.language.as_deref(), &b.interests))
            .max_by_key(|(_, seen)| *seen)
            .map(|(b, _)| b.clone());

        match candidate {
            Some(beacon) => self.propose(beacon, machine, now, effects),
            None => MatchOutcome::Ignored,
        }
    }

    /// Steps 1-3: remember the beacon and propose when compatible
    pub fn on_presence(
        &mut self,
        beacon: PresenceBeacon,
        machine: &mut SessionMachine,
        blocks: &BlockList,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) -> MatchOutcome {
        if !self.is_candidate(beacon.participant_id, blocks) {
            tracing::debug!("🚫 Ignoring beacon from {}", beacon.participant_id.short());
            return MatchOutcome::Ignored;
        }

        self.directory.observe(beacon.clone(), now);

        if machine.phase() != SessionPhase::Searching {
            return MatchOutcome::Ignored;
        }

        if !is_compatible(&self.preferences, beacon.language.as_deref(), &beacon.interests) {
            return MatchOutcome::Ignored;
        }

        self.propose(beacon, machine, now, effects)
    }

    /// Step 4: accept an unblocked proposal while Searching
    pub fn on_match_request(
        &mut self,
        peer: PeerMeta,
        machine: &mut SessionMachine,
        blocks: &BlockList,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) -> MatchOutcome {
        let from = peer.peer_id;
        if !self.is_candidate(from, blocks) {
            tracing::debug!("🚫 Ignoring match request from {}", from.short());
            return MatchOutcome::Ignored;
        }

        match machine.phase() {
            SessionPhase::Searching => {
                match machine.match_found(peer, PairingRole::Responder, now) {
                    Ok(generation) => {
                        tracing::info!("🤝 Accepting match request from {}", from.short());
                        self.directory.forget(&from);
                        self.send_accept(from, effects);
                        MatchOutcome::Accepted(generation)
                    }
                    Err(e) => {
                        tracing::debug!("Match request dropped: {}", e);
                        MatchOutcome::Ignored
                    }
                }
            }
            SessionPhase::Matched if machine.state().is_current_peer(&from) => {
                self.resolve_crossed(from, machine, effects)
            }
            phase => {
                tracing::debug!(
                    "Ignoring match request from {} while {}",
                    from.short(),
                    phase
                );
                MatchOutcome::Ignored
            }
        }
    }

    /// Step 5: the first accept from the proposed peer commits the pairing
    pub fn on_match_accept(
        &mut self,
        from: ParticipantId,
        machine: &SessionMachine,
    ) -> MatchOutcome {
        let state = machine.state();
        match state.pairing() {
            Some(pairing)
                if state.phase() == SessionPhase::Matched
                    && pairing.peer_id() == from
                    && pairing.role == PairingRole::Initiator =>
            {
                tracing::info!("✅ {} accepted our proposal", from.short());
                MatchOutcome::Committed(pairing.generation)
            }
            _ => {
                tracing::debug!("Ignoring match accept from {}", from.short());
                MatchOutcome::Ignored
            }
        }
    }

    /// True when a Matched pairing waited too long
    ///
    /// An initiator gives up after the proposal timeout; a responder has
    /// already accepted and waits up to the offer timeout.
    pub fn proposal_expired(&self, machine: &SessionMachine, now: Instant) -> bool {
        match machine.state() {
            SessionState::Matched(pairing) => {
                let limit = match pairing.role {
                    PairingRole::Initiator => self.match_timeout,
                    PairingRole::Responder => self.offer_timeout,
                };
                now.saturating_duration_since(pairing.entered_at) >= limit
            }
            _ => false,
        }
    }

    /// Drop what we know about `id` (after block or expiry)
    pub fn forget(&mut self, id: &ParticipantId) {
        self.directory.forget(id);
    }

    fn is_candidate(&self, id: ParticipantId, blocks: &BlockList) -> bool {
        id != self.local_id && !blocks.contains(&id)
    }

    fn propose(
        &mut self,
        beacon: PresenceBeacon,
        machine: &mut SessionMachine,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) -> MatchOutcome {
        let peer_id = beacon.participant_id;
        let peer = PeerMeta::new(peer_id, beacon.language, beacon.interests);

        match machine.match_found(peer, PairingRole::Initiator, now) {
            Ok(generation) => {
                tracing::info!("💡 Proposing match to {} ({})", peer_id.short(), generation);
                self.directory.forget(&peer_id);
                self.send_request(peer_id, effects);
                MatchOutcome::Proposed(generation)
            }
            Err(e) => {
                tracing::debug!("Proposal dropped: {}", e);
                MatchOutcome::Ignored
            }
        }
    }

    /// Both sides proposed to each other; the smaller id keeps the initiator role
    fn resolve_crossed(
        &mut self,
        from: ParticipantId,
        machine: &mut SessionMachine,
        effects: &mut Vec<Effect>,
    ) -> MatchOutcome {
        let local_id = self.local_id;
        let Some(pairing) = machine.pairing_mut() else {
            return MatchOutcome::Ignored;
        };

        match pairing.role {
            PairingRole::Initiator if local_id < from => {
                // The peer may have missed our request while not yet searching
                tracing::debug!("Crossed proposal with {}; keeping initiator role", from.short());
                self.send_request(from, effects);
                MatchOutcome::Ignored
            }
            PairingRole::Initiator => {
                tracing::info!("🔁 Crossed proposal with {}; answering instead", from.short());
                pairing.role = PairingRole::Responder;
                let generation = pairing.generation;
                self.send_accept(from, effects);
                MatchOutcome::BecameResponder(generation)
            }
            PairingRole::Responder => {
                // Our accept was probably lost; repeat it
                self.send_accept(from, effects);
                MatchOutcome::Ignored
            }
        }
    }

    fn send_request(&self, to: ParticipantId, effects: &mut Vec<Effect>) {
        effects.push(Effect::Publish(SignalingMessage::direct(
            self.local_id,
            to,
            SignalKind::MatchRequest {
                language: self.preferences.language.clone(),
                interests: self.preferences.interests.clone(),
            },
        )));
    }

    fn send_accept(&self, to: ParticipantId, effects: &mut Vec<Effect>) {
        effects.push(Effect::Publish(SignalingMessage::direct(
            self.local_id,
            to,
            SignalKind::MatchAccept {
                language: self.preferences.language.clone(),
                interests: self.preferences.interests.clone(),
            },
        )));
    }

    fn publish_beacon(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let beacon = PresenceBeacon::new(self.local_id, &self.preferences);
        effects.push(Effect::Publish(SignalingMessage::presence(&beacon)));
        self.last_beacon = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        id: ParticipantId,
        matchmaker: Matchmaker,
        machine: SessionMachine,
        blocks: BlockList,
        effects: Vec<Effect>,
        now: Instant,
    }

    impl Fixture {
        fn new(preferences: Preferences) -> Self {
            Self::with_id(ParticipantId::new(), preferences)
        }

        fn with_id(id: ParticipantId, preferences: Preferences) -> Self {
            let now = Instant::now();
            let mut machine = SessionMachine::new(Duration::from_secs(3));
            machine.start_search(now).unwrap();
            Self {
                id,
                matchmaker: Matchmaker::new(
                    id,
                    preferences,
                    Duration::from_secs(2),
                    Duration::from_secs(6),
                    Duration::from_secs(10),
                )
                .with_offer_timeout(Duration::from_secs(15)),
                machine,
                blocks: BlockList::in_memory(),
                effects: Vec::new(),
                now,
            }
        }

        fn presence(&mut self, beacon: PresenceBeacon) -> MatchOutcome {
            self.matchmaker.on_presence(
                beacon,
                &mut self.machine,
                &self.blocks,
                self.now,
                &mut self.effects,
            )
        }

        fn request(&mut self, from: ParticipantId) -> MatchOutcome {
            self.matchmaker.on_match_request(
                PeerMeta::new(from, None, vec![]),
                &mut self.machine,
                &self.blocks,
                self.now,
                &mut self.effects,
            )
        }

        fn published(&self) -> Vec<&SignalingMessage> {
            self.effects
                .iter()
                .filter_map(|e| match e {
                    Effect::Publish(msg) => Some(msg),
                    _ => None,
                })
                .collect()
        }
    }

    fn beacon(prefs: &Preferences) -> PresenceBeacon {
        PresenceBeacon::new(ParticipantId::new(), prefs)
    }

    #[test]
    fn test_compatible_beacon_proposes() {
        let mut f = Fixture::new(Preferences::new().with_language("en"));
        let b = beacon(&Preferences::new().with_language("EN"));
        let peer = b.participant_id;

        let outcome = f.presence(b);
        assert!(matches!(outcome, MatchOutcome::Proposed(_)));
        assert_eq!(f.machine.phase(), SessionPhase::Matched);

        let published = f.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].to, Some(peer));
        assert!(matches!(published[0].kind, SignalKind::MatchRequest { .. }));
    }

    #[test]
    fn test_incompatible_beacon_is_remembered_but_ignored() {
        let mut f = Fixture::new(Preferences::new().with_language("en"));
        let b = beacon(&Preferences::new().with_language("de"));
        let id = b.participant_id;

        assert_eq!(f.presence(b), MatchOutcome::Ignored);
        assert_eq!(f.machine.phase(), SessionPhase::Searching);
        assert!(f.matchmaker.directory().contains(&id));
    }

    #[test]
    fn test_own_and_blocked_beacons_ignored() {
        let mut f = Fixture::new(Preferences::new());
        let own = PresenceBeacon::new(f.id, &Preferences::new());
        assert_eq!(f.presence(own), MatchOutcome::Ignored);

        let blocked = beacon(&Preferences::new());
        f.blocks.insert(blocked.participant_id).unwrap();
        assert_eq!(f.presence(blocked), MatchOutcome::Ignored);

        assert_eq!(f.machine.phase(), SessionPhase::Searching);
        assert!(f.matchmaker.directory().is_empty());
    }

    #[test]
    fn test_match_request_while_searching_accepts() {
        let mut f = Fixture::new(Preferences::new().with_language("en"));
        let from = ParticipantId::new();

        // Requests are not filtered by compatibility, only by the block list
        let outcome = f.request(from);
        assert!(matches!(outcome, MatchOutcome::Accepted(_)));
        assert_eq!(
            f.machine.state().pairing().unwrap().role,
            PairingRole::Responder
        );
        assert!(matches!(
            f.published()[0].kind,
            SignalKind::MatchAccept { .. }
        ));
    }

    #[test]
    fn test_blocked_match_request_never_matches() {
        let mut f = Fixture::new(Preferences::new());
        let from = ParticipantId::new();
        f.blocks.insert(from).unwrap();

        assert_eq!(f.request(from), MatchOutcome::Ignored);
        assert_eq!(f.machine.phase(), SessionPhase::Searching);
        assert!(f.effects.is_empty());
    }

    #[test]
    fn test_request_from_other_id_while_matched_is_ignored() {
        let mut f = Fixture::new(Preferences::new());
        f.request(ParticipantId::new());
        f.effects.clear();

        assert_eq!(f.request(ParticipantId::new()), MatchOutcome::Ignored);
        assert!(f.effects.is_empty());
    }

    #[test]
    fn test_accept_commits_only_from_current_peer() {
        let mut f = Fixture::new(Preferences::new());
        let b = beacon(&Preferences::new());
        let peer = b.participant_id;
        f.presence(b);

        assert_eq!(
            f.matchmaker.on_match_accept(ParticipantId::new(), &f.machine),
            MatchOutcome::Ignored
        );
        assert!(matches!(
            f.matchmaker.on_match_accept(peer, &f.machine),
            MatchOutcome::Committed(_)
        ));
    }

    #[test]
    fn test_crossed_proposals_resolve_to_one_initiator() {
        let low = ParticipantId::from_uuid(uuid::Uuid::from_u128(1));
        let high = ParticipantId::from_uuid(uuid::Uuid::from_u128(2));

        let mut a = Fixture::with_id(low, Preferences::new());
        let mut b = Fixture::with_id(high, Preferences::new());

        a.presence(PresenceBeacon::new(high, &Preferences::new()));
        b.presence(PresenceBeacon::new(low, &Preferences::new()));

        // Each receives the other's request while Matched
        a.effects.clear();
        assert_eq!(a.request(high), MatchOutcome::Ignored);
        assert!(matches!(b.request(low), MatchOutcome::BecameResponder(_)));

        // a repeats its request in case b dropped the first one
        let repeated = a.published();
        assert_eq!(repeated.len(), 1);
        assert_eq!(repeated[0].to, Some(high));
        assert!(matches!(repeated[0].kind, SignalKind::MatchRequest { .. }));

        assert_eq!(
            a.machine.state().pairing().unwrap().role,
            PairingRole::Initiator
        );
        assert_eq!(
            b.machine.state().pairing().unwrap().role,
            PairingRole::Responder
        );

        // b's accept commits a
        assert!(matches!(
            a.matchmaker.on_match_accept(high, &a.machine),
            MatchOutcome::Committed(_)
        ));
    }

    #[test]
    fn test_tick_republishes_beacon_on_interval() {
        let mut f = Fixture::new(Preferences::new());
        f.matchmaker.search_started(f.now, &mut f.effects);
        assert_eq!(f.published().len(), 1);

        let now = f.now + Duration::from_secs(1);
        f.matchmaker
            .tick(&mut f.machine, &f.blocks, now, &mut f.effects);
        assert_eq!(f.published().len(), 1);

        let now = f.now + Duration::from_secs(2);
        f.matchmaker
            .tick(&mut f.machine, &f.blocks, now, &mut f.effects);
        assert_eq!(f.published().len(), 2);
        assert!(matches!(
            f.published()[1].kind,
            SignalKind::Presence { .. }
        ));
    }

    #[test]
    fn test_tick_proposes_to_remembered_searcher() {
        let mut f = Fixture::new(Preferences::new());
        let other = beacon(&Preferences::new());
        let other_id = other.participant_id;

        // Seen while busy with someone else
        f.request(ParticipantId::new());
        f.presence(other);
        f.machine.end(crate::domain::EndReason::ProposalExpired, f.now).unwrap();
        f.machine.requeue().unwrap();
        f.effects.clear();

        let outcome = f
            .matchmaker
            .tick(&mut f.machine, &f.blocks, f.now, &mut f.effects);
        assert!(matches!(outcome, MatchOutcome::Proposed(_)));
        assert_eq!(f.machine.state().peer_id(), Some(other_id));
    }

    #[test]
    fn test_proposal_expiry() {
        let mut f = Fixture::new(Preferences::new());
        f.presence(beacon(&Preferences::new()));

        assert!(!f
            .matchmaker
            .proposal_expired(&f.machine, f.now + Duration::from_secs(9)));
        assert!(f
            .matchmaker
            .proposal_expired(&f.machine, f.now + Duration::from_secs(10)));
    }

    #[test]
    fn test_responder_waits_for_offer_past_proposal_timeout() {
        let mut f = Fixture::new(Preferences::new());
        assert!(matches!(
            f.request(ParticipantId::new()),
            MatchOutcome::Accepted(_)
        ));

        assert!(!f
            .matchmaker
            .proposal_expired(&f.machine, f.now + Duration::from_secs(10)));
        assert!(!f
            .matchmaker
            .proposal_expired(&f.machine, f.now + Duration::from_secs(14)));
        assert!(f
            .matchmaker
            .proposal_expired(&f.machine, f.now + Duration::from_secs(15)));
    }
}
