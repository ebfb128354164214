use crate::application::{Effect, SessionEvent, SessionMachine};
use crate::domain::{
    BlockList, ParticipantId, Report, ReportReason, SessionError, SessionPhase,
    SessionState, SignalKind, SignalingMessage, Timestamp,
};

/// Readiness gate, reporting and blocking
#[derive(Debug)]
pub struct SafetyGate {
    local_id: ParticipantId,
    safe_mode: bool,
    blocks: BlockList,
}

impl SafetyGate {
    pub fn new(local_id: ParticipantId, safe_mode: bool, blocks: BlockList) -> Self {
        Self {
            local_id,
            safe_mode,
            blocks,
        }
    }

    pub fn blocks(&self) -> &BlockList {
        &self.blocks
    }

    pub fn is_blocked(&self, id: &ParticipantId) -> bool {
        self.blocks.contains(id)
    }

    /// Opt in to revealing video and tell the peer
    pub fn mark_ready(
        &mut self,
        machine: &mut SessionMachine,
        effects: &mut Vec<Effect>,
    ) -> Result<(), SessionError> {
        let phase = machine.phase();
        if !matches!(phase, SessionPhase::Connecting | SessionPhase::Connected) {
            return Err(SessionError::InvalidTransition {
                from: phase,
                action: "mark ready",
            });
        }

        let pairing = machine.pairing_mut().ok_or(SessionError::NoActivePeer)?;
        pairing.readiness.local_ready = true;
        tracing::info!("👀 Ready to reveal ({})", pairing.generation);
        effects.push(Effect::Publish(SignalingMessage::direct(
            self.local_id,
            pairing.peer_id(),
            SignalKind::Ready { reply: false },
        )));
        Ok(())
    }

    /// Announce readiness again once the connection is up
    ///
    /// A Ready sent while the peer was still Connecting was dropped there.
    pub fn connected(&self, machine: &SessionMachine, effects: &mut Vec<Effect>) {
        let Some(pairing) = machine.state().pairing() else {
            return;
        };
        if machine.phase() == SessionPhase::Connected && pairing.readiness.local_ready {
            effects.push(Effect::Publish(SignalingMessage::direct(
                self.local_id,
                pairing.peer_id(),
                SignalKind::Ready { reply: false },
            )));
        }
    }

    /// Record the peer's Ready
    ///
    /// Only counts while Connected and only from the current peer. If we are
    /// ready too, a non-reply Ready is answered so the peer observes ours
    /// after its own entry into Connected.
    pub fn on_ready(
        &mut self,
        from: ParticipantId,
        reply: bool,
        machine: &mut SessionMachine,
        effects: &mut Vec<Effect>,
    ) {
        if machine.phase() != SessionPhase::Connected || !machine.state().is_current_peer(&from) {
            tracing::debug!("Ready from {} dropped while {}", from.short(), machine.phase());
            return;
        }

        let Some(pairing) = machine.pairing_mut() else {
            return;
        };

        pairing.readiness.remote_ready_observed = true;

        if !reply && pairing.readiness.local_ready {
            effects.push(Effect::Publish(SignalingMessage::direct(
                self.local_id,
                from,
                SignalKind::Ready { reply: true },
            )));
        }
    }

    /// Whether video may be shown for the current pairing
    pub fn is_revealed(&self, state: &SessionState) -> bool {
        match state {
            SessionState::Connected(pairing) => !self.safe_mode || pairing.readiness.both(),
            _ => false,
        }
    }

    /// File a report against the current peer, or the last one after End
    ///
    /// Returns the reported peer and whether the reason requires a block.
    pub fn report(
        &mut self,
        reason: ReportReason,
        text: Option<String>,
        machine: &SessionMachine,
        effects: &mut Vec<Effect>,
    ) -> Result<(ParticipantId, bool), SessionError> {
        let peer_id = report_target(machine).ok_or(SessionError::NoReportTarget)?;

        tracing::info!("🚩 Reporting {} for {}", peer_id.short(), reason);
        effects.push(Effect::Report(Report {
            reason,
            peer_id,
            reporter_id: self.local_id,
            text,
            at: Timestamp::now(),
        }));
        effects.push(Effect::Notify(SessionEvent::ReportSubmitted { reason, peer_id }));

        Ok((peer_id, reason.is_severe()))
    }

    /// Add `peer_id` to the block list
    ///
    /// The block always applies in memory; a persistence failure only
    /// produces a warning.
    pub fn block(&mut self, peer_id: ParticipantId, effects: &mut Vec<Effect>) {
        match self.blocks.insert(peer_id) {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("⚠️ Block of {} not persisted: {}", peer_id.short(), e);
                effects.push(Effect::Notify(SessionEvent::Warning {
                    message: format!("Block may not survive a restart: {}", e),
                }));
            }
        }

        tracing::info!("⛔ Blocked {}", peer_id.short());
        effects.push(Effect::Notify(SessionEvent::PeerBlocked { peer_id }));
    }
}

/// Current peer, or the last one once the pairing ended
pub fn report_target(machine: &SessionMachine) -> Option<ParticipantId> {
    machine
        .state()
        .peer_id()
        .or_else(|| machine.ended().and_then(|(_, last)| last))
}
