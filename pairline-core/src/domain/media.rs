use crate::domain::{Generation, IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outgoing track kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Work for the media transport, executed in order by the media driver
///
/// Every command except `Release` carries the generation it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCommand {
    /// Acquire camera and microphone and open a peer connection
    AcquireLocal { generation: Generation },

    CreateOffer { generation: Generation },

    /// Apply the remote offer, then create an answer
    ApplyRemoteOffer {
        generation: Generation,
        sdp: SessionDescription,
    },

    ApplyRemoteAnswer {
        generation: Generation,
        sdp: SessionDescription,
    },

    AddIceCandidate {
        generation: Generation,
        candidate: IceCandidate,
    },

    SetTrackEnabled {
        generation: Generation,
        kind: TrackKind,
        enabled: bool,
    },

    /// Swap the outgoing video track for a display capture
    StartScreenShare { generation: Generation },

    /// Swap the camera track back in
    StopScreenShare { generation: Generation },

    /// Stop all local tracks and close the peer connection
    Release,
}

impl MediaCommand {
    pub fn generation(&self) -> Option<Generation> {
        match self {
            MediaCommand::AcquireLocal { generation }
            | MediaCommand::CreateOffer { generation }
            | MediaCommand::ApplyRemoteOffer { generation, .. }
            | MediaCommand::ApplyRemoteAnswer { generation, .. }
            | MediaCommand::AddIceCandidate { generation, .. }
            | MediaCommand::SetTrackEnabled { generation, .. }
            | MediaCommand::StartScreenShare { generation }
            | MediaCommand::StopScreenShare { generation } => Some(*generation),
            MediaCommand::Release => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaCommand::AcquireLocal { .. } => "acquire_local",
            MediaCommand::CreateOffer { .. } => "create_offer",
            MediaCommand::ApplyRemoteOffer { .. } => "apply_remote_offer",
            MediaCommand::ApplyRemoteAnswer { .. } => "apply_remote_answer",
            MediaCommand::AddIceCandidate { .. } => "add_ice_candidate",
            MediaCommand::SetTrackEnabled { .. } => "set_track_enabled",
            MediaCommand::StartScreenShare { .. } => "start_screen_share",
            MediaCommand::StopScreenShare { .. } => "stop_screen_share",
            MediaCommand::Release => "release",
        }
    }
}

/// Completion of a media command, or a notice from the peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    LocalMediaReady {
        generation: Generation,
    },
    LocalMediaFailed {
        generation: Generation,
        reason: String,
    },
    OfferCreated {
        generation: Generation,
        sdp: SessionDescription,
    },
    AnswerCreated {
        generation: Generation,
        sdp: SessionDescription,
    },
    RemoteDescriptionApplied {
        generation: Generation,
    },
    LocalCandidate {
        generation: Generation,
        candidate: IceCandidate,
    },
    Connected {
        generation: Generation,
    },
    Disconnected {
        generation: Generation,
    },
    ScreenShareStarted {
        generation: Generation,
    },
    ScreenShareFailed {
        generation: Generation,
        reason: String,
    },
    ScreenShareStopped {
        generation: Generation,
    },
    /// A non-fatal step failed (e.g. adding a candidate)
    OperationFailed {
        generation: Generation,
        operation: &'static str,
        reason: String,
    },
}

impl MediaEvent {
    pub fn generation(&self) -> Generation {
        match self {
            MediaEvent::LocalMediaReady { generation }
            | MediaEvent::LocalMediaFailed { generation, .. }
            | MediaEvent::OfferCreated { generation, .. }
            | MediaEvent::AnswerCreated { generation, .. }
            | MediaEvent::RemoteDescriptionApplied { generation }
            | MediaEvent::LocalCandidate { generation, .. }
            | MediaEvent::Connected { generation }
            | MediaEvent::Disconnected { generation }
            | MediaEvent::ScreenShareStarted { generation }
            | MediaEvent::ScreenShareFailed { generation, .. }
            | MediaEvent::ScreenShareStopped { generation }
            | MediaEvent::OperationFailed { generation, .. } => *generation,
        }
    }
}

/// Local view of the outgoing tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaControls {
    pub mic_enabled: bool,
    pub cam_enabled: bool,
    pub screen_sharing: bool,
}

impl Default for MediaControls {
    fn default() -> Self {
        Self {
            mic_enabled: true,
            cam_enabled: true,
            screen_sharing: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_has_no_generation() {
        assert_eq!(MediaCommand::Release.generation(), None);

        let gen = Generation::initial().next();
        assert_eq!(
            MediaCommand::CreateOffer { generation: gen }.generation(),
            Some(gen)
        );
    }

    #[test]
    fn test_event_generation() {
        let gen = Generation::initial().next().next();
        let event = MediaEvent::LocalMediaFailed {
            generation: gen,
            reason: "denied".to_string(),
        };
        assert_eq!(event.generation(), gen);
    }

    #[test]
    fn test_controls_default_to_live_camera() {
        let controls = MediaControls::default();
        assert!(controls.mic_enabled);
        assert!(controls.cam_enabled);
        assert!(!controls.screen_sharing);
    }
}
