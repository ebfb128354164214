use crate::infrastructure::media::{
    ConnectionNotice, LocalTrack, LocalTracks, MediaBackend, MediaError, PeerConnection,
    TrackSource,
};
use async_trait::async_trait;
use pairline_core::domain::{IceCandidate, SessionDescription, TrackKind};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

/// In-process media backend with no real devices
///
/// The camera is exclusive: acquiring it while a previous capture is still
/// live fails with [`MediaError::DeviceBusy`]. Connections report a local
/// candidate once they have a local description and come up once both
/// descriptions are set.
#[derive(Debug, Clone, Default)]
pub struct LoopbackMediaBackend {
    state: Arc<Mutex<LoopbackState>>,
}

#[derive(Debug, Default)]
struct LoopbackState {
    camera: Option<Uuid>,
    display: Option<Uuid>,
    deny_permission: bool,
    acquisitions: usize,
    opened: usize,
    connections: Vec<mpsc::UnboundedSender<ConnectionNotice>>,
}

impl LoopbackMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        // A panic while holding the lock leaves plain data behind
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every following acquisition fail as if the user refused access
    pub fn deny_permission(&self, deny: bool) {
        self.state().deny_permission = deny;
    }

    pub fn camera_in_use(&self) -> bool {
        self.state().camera.is_some()
    }

    /// Successful camera acquisitions so far
    pub fn acquisitions(&self) -> usize {
        self.state().acquisitions
    }

    /// Peer connections opened so far
    pub fn connections_opened(&self) -> usize {
        self.state().opened
    }

    /// Drop the transport under every open connection
    pub fn sever(&self) {
        let connections = std::mem::take(&mut self.state().connections);
        for tx in connections {
            let _ = tx.send(ConnectionNotice::Disconnected);
        }
    }
}

#[async_trait]
impl MediaBackend for LoopbackMediaBackend {
    async fn acquire_user_media(&self) -> Result<LocalTracks, MediaError> {
        let mut state = self.state();
        if state.deny_permission {
            return Err(MediaError::PermissionDenied);
        }
        if let Some(track) = state.camera {
            return Err(MediaError::DeviceBusy(format!("camera held by track {}", track)));
        }

        let tracks = LocalTracks {
            audio: LocalTrack::new(TrackSource::Microphone),
            video: LocalTrack::new(TrackSource::Camera),
        };
        state.camera = Some(tracks.video.id);
        state.acquisitions += 1;
        Ok(tracks)
    }

    async fn acquire_display(&self) -> Result<LocalTrack, MediaError> {
        let mut state = self.state();
        if state.deny_permission {
            return Err(MediaError::PermissionDenied);
        }
        if state.display.is_some() {
            return Err(MediaError::DeviceBusy("display already captured".to_string()));
        }

        let track = LocalTrack::new(TrackSource::Display);
        state.display = Some(track.id);
        Ok(track)
    }

    async fn stop_track(&self, track: &LocalTrack) {
        let mut state = self.state();
        match track.source {
            TrackSource::Camera if state.camera == Some(track.id) => state.camera = None,
            TrackSource::Display if state.display == Some(track.id) => state.display = None,
            _ => {}
        }
    }

    async fn open_connection(
        &self,
    ) -> Result<(Box<dyn PeerConnection>, mpsc::UnboundedReceiver<ConnectionNotice>), MediaError>
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        state.opened += 1;
        state.connections.push(tx.clone());

        let connection = LoopbackConnection {
            id: Uuid::new_v4(),
            notices: tx,
            local: None,
            remote: None,
            has_tracks: false,
            connected: false,
            closed: false,
        };
        Ok((Box::new(connection), rx))
    }
}

#[derive(Debug)]
struct LoopbackConnection {
    id: Uuid,
    notices: mpsc::UnboundedSender<ConnectionNotice>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    has_tracks: bool,
    connected: bool,
    closed: bool,
}

impl LoopbackConnection {
    fn ensure_open(&self) -> Result<(), MediaError> {
        if self.closed {
            Err(MediaError::Closed)
        } else {
            Ok(())
        }
    }

    fn set_local(&mut self, kind: &str) -> SessionDescription {
        let sdp = SessionDescription::new(format!(
            "v=0\r\no=- {} 0 IN IP4 127.0.0.1\r\ns={}\r\n",
            self.id.as_u128() as u64,
            kind
        ));
        self.local = Some(sdp.clone());

        let port = 40000 + (self.id.as_u128() % 20000) as u16;
        let _ = self.notices.send(ConnectionNotice::LocalCandidate(IceCandidate {
            candidate: format!("candidate:1 1 udp 2122260223 127.0.0.1 {} typ host", port),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
        }));
        self.maybe_connected();
        sdp
    }

    fn maybe_connected(&mut self) {
        if !self.connected && self.local.is_some() && self.remote.is_some() {
            self.connected = true;
            let _ = self.notices.send(ConnectionNotice::Connected);
        }
    }
}

#[async_trait]
impl PeerConnection for LoopbackConnection {
    async fn add_tracks(&mut self, _tracks: &LocalTracks) -> Result<(), MediaError> {
        self.ensure_open()?;
        self.has_tracks = true;
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, MediaError> {
        self.ensure_open()?;
        if !self.has_tracks {
            return Err(MediaError::Negotiation("no tracks to offer".to_string()));
        }
        Ok(self.set_local("offer"))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, MediaError> {
        self.ensure_open()?;
        if self.remote.is_none() {
            return Err(MediaError::Negotiation("answer without remote offer".to_string()));
        }
        Ok(self.set_local("answer"))
    }

    async fn set_remote_description(&mut self, sdp: SessionDescription) -> Result<(), MediaError> {
        self.ensure_open()?;
        if !sdp.as_str().starts_with("v=0") {
            return Err(MediaError::Negotiation("malformed description".to_string()));
        }
        self.remote = Some(sdp);
        self.maybe_connected();
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), MediaError> {
        self.ensure_open()?;
        if self.remote.is_none() {
            return Err(MediaError::Negotiation(
                "candidate before remote description".to_string(),
            ));
        }
        if candidate.candidate.is_empty() {
            return Err(MediaError::Negotiation("empty candidate".to_string()));
        }
        Ok(())
    }

    async fn replace_video_track(&mut self, track: &LocalTrack) -> Result<(), MediaError> {
        self.ensure_open()?;
        if track.kind != TrackKind::Video {
            return Err(MediaError::Negotiation("not a video track".to_string()));
        }
        Ok(())
    }

    async fn set_track_enabled(&mut self, _kind: TrackKind, _enabled: bool) -> Result<(), MediaError> {
        self.ensure_open()
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_camera_is_exclusive() {
        let backend = LoopbackMediaBackend::new();
        let tracks = backend.acquire_user_media().await.unwrap();

        assert!(matches!(
            backend.acquire_user_media().await,
            Err(MediaError::DeviceBusy(_))
        ));

        backend.stop_track(&tracks.video).await;
        assert!(!backend.camera_in_use());
        assert!(backend.acquire_user_media().await.is_ok());
        assert_eq!(backend.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let backend = LoopbackMediaBackend::new();
        backend.deny_permission(true);
        assert_eq!(
            backend.acquire_user_media().await,
            Err(MediaError::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn test_connects_after_both_descriptions() {
        let backend = LoopbackMediaBackend::new();
        let tracks = backend.acquire_user_media().await.unwrap();
        let (mut offerer, mut offerer_notices) = backend.open_connection().await.unwrap();
        let (mut answerer, mut answerer_notices) = backend.open_connection().await.unwrap();

        offerer.add_tracks(&tracks).await.unwrap();
        answerer.add_tracks(&tracks).await.unwrap();

        let offer = offerer.create_offer().await.unwrap();
        answerer.set_remote_description(offer).await.unwrap();
        let answer = answerer.create_answer().await.unwrap();
        offerer.set_remote_description(answer).await.unwrap();

        for notices in [&mut offerer_notices, &mut answerer_notices] {
            assert!(matches!(
                notices.recv().await,
                Some(ConnectionNotice::LocalCandidate(_))
            ));
            assert_eq!(notices.recv().await, Some(ConnectionNotice::Connected));
        }
    }

    #[tokio::test]
    async fn test_sever_disconnects() {
        let backend = LoopbackMediaBackend::new();
        let (_conn, mut notices) = backend.open_connection().await.unwrap();

        backend.sever();
        assert_eq!(notices.recv().await, Some(ConnectionNotice::Disconnected));
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_work() {
        let backend = LoopbackMediaBackend::new();
        let (mut conn, _notices) = backend.open_connection().await.unwrap();

        conn.close().await;
        assert_eq!(conn.create_offer().await, Err(MediaError::Closed));
    }
}
