use crate::application::{Effect, SessionEvent};
use crate::domain::{
    Generation, IceCandidate, MediaCommand, MediaControls, MediaEvent, PairingRole, ParticipantId,
    SessionDescription, SessionError, SignalKind, SignalingMessage, TrackKind,
};

/// State of local camera/microphone for the current pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMedia {
    Pending,
    Ready,
    Failed,
}

/// What a media event means for the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    /// Nothing for the session machine to do
    None,
    /// Stale generation; the event was dropped
    Stale,
    Connected,
    Disconnected,
}

/// Per-pairing negotiation state
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationHandle {
    pub generation: Generation,
    pub role: PairingRole,
    pub local_id: ParticipantId,
    pub peer_id: ParticipantId,
    pub local_media: LocalMedia,
    pub controls: MediaControls,
    /// Offer received before local media was ready
    pending_offer: Option<SessionDescription>,
    offer_sent: bool,
    /// ApplyRemoteOffer/ApplyRemoteAnswer already issued
    remote_requested: bool,
    remote_applied: bool,
    buffered_candidates: Vec<IceCandidate>,
}

impl NegotiationHandle {
    pub fn buffered_candidates(&self) -> usize {
        self.buffered_candidates.len()
    }

    fn signal(&self, kind: SignalKind) -> Effect {
        Effect::Publish(SignalingMessage::direct(self.local_id, self.peer_id, kind))
    }
}

/// Drives the media transport for one pairing at a time
///
/// Purely reactive: every operation pushes [`MediaCommand`]s and signaling
/// messages onto the effect buffer, and every [`MediaEvent`] is checked
/// against the current generation before it is applied.
#[derive(Debug, Default)]
pub struct NegotiationCoordinator {
    handle: Option<NegotiationHandle>,
}

impl NegotiationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<&NegotiationHandle> {
        self.handle.as_ref()
    }

    pub fn controls(&self) -> Option<MediaControls> {
        self.handle.as_ref().map(|h| h.controls)
    }

    /// Begin negotiation for a new pairing by acquiring local media
    ///
    /// The initiator creates the offer once media is ready; the responder
    /// waits for the remote offer.
    pub fn start(
        &mut self,
        local_id: ParticipantId,
        peer_id: ParticipantId,
        generation: Generation,
        role: PairingRole,
        effects: &mut Vec<Effect>,
    ) {
        if self.handle.is_some() {
            self.stop(effects);
        }

        tracing::debug!("🎬 Negotiation {} as {:?} with {}", generation, role, peer_id.short());
        self.handle = Some(NegotiationHandle {
            generation,
            role,
            local_id,
            peer_id,
            local_media: LocalMedia::Pending,
            controls: MediaControls::default(),
            pending_offer: None,
            offer_sent: false,
            remote_requested: false,
            remote_applied: false,
            buffered_candidates: Vec::new(),
        });
        effects.push(Effect::Media(MediaCommand::AcquireLocal { generation }));
    }

    pub fn on_offer(&mut self, sdp: SessionDescription, effects: &mut Vec<Effect>) {
        let Some(handle) = self.handle.as_mut() else {
            tracing::debug!("Offer without negotiation, dropped");
            return;
        };

        if handle.role != PairingRole::Responder || handle.remote_requested {
            tracing::debug!("Unexpected offer for {}, dropped", handle.generation);
            return;
        }

        match handle.local_media {
            LocalMedia::Ready => {
                handle.remote_requested = true;
                effects.push(Effect::Media(MediaCommand::ApplyRemoteOffer {
                    generation: handle.generation,
                    sdp,
                }));
            }
            LocalMedia::Pending | LocalMedia::Failed => handle.pending_offer = Some(sdp),
        }
    }

    pub fn on_answer(&mut self, sdp: SessionDescription, effects: &mut Vec<Effect>) {
        let Some(handle) = self.handle.as_mut() else {
            tracing::debug!("Answer without negotiation, dropped");
            return;
        };

        if handle.role != PairingRole::Initiator || !handle.offer_sent || handle.remote_requested {
            tracing::debug!("Unexpected answer for {}, dropped", handle.generation);
            return;
        }

        handle.remote_requested = true;
        effects.push(Effect::Media(MediaCommand::ApplyRemoteAnswer {
            generation: handle.generation,
            sdp,
        }));
    }

    /// Forward a remote candidate, buffering until the remote description is set
    pub fn on_ice_candidate(&mut self, candidate: IceCandidate, effects: &mut Vec<Effect>) {
        let Some(handle) = self.handle.as_mut() else {
            tracing::debug!("Candidate without negotiation, dropped");
            return;
        };

        if handle.remote_applied {
            effects.push(Effect::Media(MediaCommand::AddIceCandidate {
                generation: handle.generation,
                candidate,
            }));
        } else {
            handle.buffered_candidates.push(candidate);
        }
    }

    /// Apply a media completion; events for other generations are discarded
    pub fn on_media_event(&mut self, event: MediaEvent, effects: &mut Vec<Effect>) -> MediaOutcome {
        let Some(handle) = self.handle.as_mut() else {
            tracing::debug!("Media event {:?} with no negotiation, dropped", event);
            return MediaOutcome::Stale;
        };

        if event.generation() != handle.generation {
            tracing::debug!(
                "Stale media event for {} (current {}), dropped",
                event.generation(),
                handle.generation
            );
            return MediaOutcome::Stale;
        }

        let generation = handle.generation;
        match event {
            MediaEvent::LocalMediaReady { .. } => {
                handle.local_media = LocalMedia::Ready;
                match handle.role {
                    PairingRole::Initiator if !handle.offer_sent => {
                        effects.push(Effect::Media(MediaCommand::CreateOffer { generation }));
                    }
                    PairingRole::Responder => {
                        if let Some(sdp) = handle.pending_offer.take() {
                            handle.remote_requested = true;
                            effects.push(Effect::Media(MediaCommand::ApplyRemoteOffer {
                                generation,
                                sdp,
                            }));
                        }
                    }
                    _ => {}
                }
                MediaOutcome::None
            }
            MediaEvent::LocalMediaFailed { reason, .. } => {
                tracing::warn!("🎥 Local media unavailable: {}", reason);
                handle.local_media = LocalMedia::Failed;
                effects.push(Effect::Notify(SessionEvent::MediaError { reason }));
                MediaOutcome::None
            }
            MediaEvent::OfferCreated { sdp, .. } => {
                handle.offer_sent = true;
                effects.push(handle.signal(SignalKind::Offer { sdp }));
                MediaOutcome::None
            }
            MediaEvent::AnswerCreated { sdp, .. } => {
                effects.push(handle.signal(SignalKind::Answer { sdp }));
                MediaOutcome::None
            }
            MediaEvent::RemoteDescriptionApplied { .. } => {
                handle.remote_applied = true;
                for candidate in handle.buffered_candidates.drain(..) {
                    effects.push(Effect::Media(MediaCommand::AddIceCandidate {
                        generation,
                        candidate,
                    }));
                }
                MediaOutcome::None
            }
            MediaEvent::LocalCandidate { candidate, .. } => {
                effects.push(handle.signal(SignalKind::IceCandidate { candidate }));
                MediaOutcome::None
            }
            MediaEvent::Connected { .. } => MediaOutcome::Connected,
            MediaEvent::Disconnected { .. } => MediaOutcome::Disconnected,
            MediaEvent::ScreenShareStarted { .. } => {
                handle.controls.screen_sharing = true;
                effects.push(Effect::Notify(SessionEvent::MediaControlsChanged(
                    handle.controls,
                )));
                MediaOutcome::None
            }
            MediaEvent::ScreenShareStopped { .. } => {
                handle.controls.screen_sharing = false;
                effects.push(Effect::Notify(SessionEvent::MediaControlsChanged(
                    handle.controls,
                )));
                MediaOutcome::None
            }
            MediaEvent::ScreenShareFailed { reason, .. } => {
                tracing::warn!("🖥️ Screen share failed: {}", reason);
                effects.push(Effect::Notify(SessionEvent::MediaError { reason }));
                MediaOutcome::None
            }
            MediaEvent::OperationFailed {
                operation, reason, ..
            } => {
                tracing::warn!("Media step {} failed: {}", operation, reason);
                MediaOutcome::None
            }
        }
    }

    pub fn toggle_mic(&mut self, effects: &mut Vec<Effect>) -> Result<bool, SessionError> {
        self.toggle_track(TrackKind::Audio, effects)
    }

    pub fn toggle_cam(&mut self, effects: &mut Vec<Effect>) -> Result<bool, SessionError> {
        self.toggle_track(TrackKind::Video, effects)
    }

    /// Swap the outgoing video between camera and display capture
    ///
    /// Returns the requested state; the change is confirmed by a media event.
    pub fn toggle_screen_share(&mut self, effects: &mut Vec<Effect>) -> Result<bool, SessionError> {
        let handle = self.handle.as_ref().ok_or(SessionError::NoActivePeer)?;
        let generation = handle.generation;

        if handle.controls.screen_sharing {
            effects.push(Effect::Media(MediaCommand::StopScreenShare { generation }));
            Ok(false)
        } else {
            effects.push(Effect::Media(MediaCommand::StartScreenShare { generation }));
            Ok(true)
        }
    }

    /// Try acquiring local media again after a failure
    pub fn retry_media(&mut self, effects: &mut Vec<Effect>) -> Result<(), SessionError> {
        let handle = self.handle.as_mut().ok_or(SessionError::NoActivePeer)?;
        if handle.local_media != LocalMedia::Failed {
            tracing::debug!("Local media is {:?}, retry skipped", handle.local_media);
            return Ok(());
        }

        handle.local_media = LocalMedia::Pending;
        effects.push(Effect::Media(MediaCommand::AcquireLocal {
            generation: handle.generation,
        }));
        Ok(())
    }

    /// Release tracks and close the connection; a second call does nothing
    pub fn stop(&mut self, effects: &mut Vec<Effect>) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("⏹️ Stopping negotiation {}", handle.generation);
            effects.push(Effect::Media(MediaCommand::Release));
        }
    }

    fn toggle_track(
        &mut self,
        kind: TrackKind,
        effects: &mut Vec<Effect>,
    ) -> Result<bool, SessionError> {
        let handle = self.handle.as_mut().ok_or(SessionError::NoActivePeer)?;
        let enabled = match kind {
            TrackKind::Audio => {
                handle.controls.mic_enabled = !handle.controls.mic_enabled;
                handle.controls.mic_enabled
            }
            TrackKind::Video => {
                handle.controls.cam_enabled = !handle.controls.cam_enabled;
                handle.controls.cam_enabled
            }
        };

        effects.push(Effect::Media(MediaCommand::SetTrackEnabled {
            generation: handle.generation,
            kind,
            enabled,
        }));
        effects.push(Effect::Notify(SessionEvent::MediaControlsChanged(
            handle.controls,
        )));
        Ok(enabled)
    }
}
