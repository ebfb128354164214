use crate::infrastructure::error::{P2PError, Result};
use crate::infrastructure::media::{
    ConnectionNotice, LocalTrack, LocalTracks, MediaBackend, MediaError, PeerConnection,
};
use pairline_core::{Generation, MediaCommand, MediaEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Executes [`MediaCommand`]s against a [`MediaBackend`] on a tokio task
///
/// Commands run strictly in submission order, so a `Release` finishes
/// before the next pairing tries to acquire the camera. Every result comes
/// back as a [`MediaEvent`] stamped with the generation it was issued for.
#[derive(Debug)]
pub struct MediaDriver {
    commands: mpsc::UnboundedSender<MediaCommand>,
    task: JoinHandle<()>,
}

impl MediaDriver {
    /// Start the worker; must be called inside a tokio runtime
    pub fn spawn(backend: Arc<dyn MediaBackend>) -> (Self, mpsc::UnboundedReceiver<MediaEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            backend,
            events: event_tx,
            active: None,
        };
        let task = tokio::spawn(worker.run(command_rx));

        (
            Self {
                commands: command_tx,
                task,
            },
            event_rx,
        )
    }

    pub fn submit(&self, command: MediaCommand) -> Result<()> {
        tracing::trace!("🎥 Submitting {}", command.name());
        self.commands
            .send(command)
            .map_err(|_| P2PError::ChannelClosed)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Media held for the current pairing
struct ActiveMedia {
    generation: Generation,
    tracks: LocalTracks,
    display: Option<LocalTrack>,
    connection: Box<dyn PeerConnection>,
    forwarder: JoinHandle<()>,
}

struct Worker {
    backend: Arc<dyn MediaBackend>,
    events: mpsc::UnboundedSender<MediaEvent>,
    active: Option<ActiveMedia>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<MediaCommand>) {
        while let Some(command) = commands.recv().await {
            tracing::debug!("🎥 {}", command.name());
            match command {
                MediaCommand::Release => self.release().await,
                MediaCommand::AcquireLocal { generation } => self.acquire(generation).await,
                other => self.step(other).await,
            }
        }

        // Driver dropped; leave no device behind
        self.release().await;
        tracing::debug!("🎥 Media driver stopped");
    }

    fn emit(&self, event: MediaEvent) {
        emit(&self.events, event);
    }

    async fn acquire(&mut self, generation: Generation) {
        match self.active.as_ref().map(|a| a.generation) {
            Some(current) if current == generation => {
                self.emit(MediaEvent::LocalMediaReady { generation });
                return;
            }
            Some(current) => {
                tracing::debug!("Releasing media of stale {}", current);
                self.release().await;
            }
            None => {}
        }

        let tracks = match self.backend.acquire_user_media().await {
            Ok(tracks) => tracks,
            Err(e) => {
                self.emit(MediaEvent::LocalMediaFailed {
                    generation,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let (mut connection, notices) = match self.backend.open_connection().await {
            Ok(opened) => opened,
            Err(e) => {
                stop_tracks(self.backend.as_ref(), &tracks, None).await;
                self.emit(MediaEvent::LocalMediaFailed {
                    generation,
                    reason: e.to_string(),
                });
                return;
            }
        };

        if let Err(e) = connection.add_tracks(&tracks).await {
            connection.close().await;
            stop_tracks(self.backend.as_ref(), &tracks, None).await;
            self.emit(MediaEvent::LocalMediaFailed {
                generation,
                reason: e.to_string(),
            });
            return;
        }

        let forwarder = tokio::spawn(forward_notices(generation, notices, self.events.clone()));
        self.active = Some(ActiveMedia {
            generation,
            tracks,
            display: None,
            connection,
            forwarder,
        });
        tracing::info!("🎥 Local media ready for {}", generation);
        self.emit(MediaEvent::LocalMediaReady { generation });
    }

    async fn step(&mut self, command: MediaCommand) {
        let Some(generation) = command.generation() else {
            return;
        };
        let Some(active) = self.active.as_mut().filter(|a| a.generation == generation) else {
            tracing::debug!("{} for stale {}, skipped", command.name(), generation);
            return;
        };

        let operation = command.name();
        let events = &self.events;
        let result = match command {
            MediaCommand::CreateOffer { .. } => active
                .connection
                .create_offer()
                .await
                .map(|sdp| emit(events, MediaEvent::OfferCreated { generation, sdp })),
            MediaCommand::ApplyRemoteOffer { sdp, .. } => {
                match active.connection.set_remote_description(sdp).await {
                    Ok(()) => {
                        emit(events, MediaEvent::RemoteDescriptionApplied { generation });
                        active
                            .connection
                            .create_answer()
                            .await
                            .map(|sdp| emit(events, MediaEvent::AnswerCreated { generation, sdp }))
                    }
                    Err(e) => Err(e),
                }
            }
            MediaCommand::ApplyRemoteAnswer { sdp, .. } => active
                .connection
                .set_remote_description(sdp)
                .await
                .map(|()| emit(events, MediaEvent::RemoteDescriptionApplied { generation })),
            MediaCommand::AddIceCandidate { candidate, .. } => {
                active.connection.add_ice_candidate(candidate).await
            }
            MediaCommand::SetTrackEnabled { kind, enabled, .. } => {
                active.connection.set_track_enabled(kind, enabled).await
            }
            MediaCommand::StartScreenShare { .. } => {
                if let Err(e) = start_screen_share(self.backend.as_ref(), active).await {
                    emit(
                        events,
                        MediaEvent::ScreenShareFailed {
                            generation,
                            reason: e.to_string(),
                        },
                    );
                    return;
                }
                emit(events, MediaEvent::ScreenShareStarted { generation });
                Ok(())
            }
            MediaCommand::StopScreenShare { .. } => {
                stop_screen_share(self.backend.as_ref(), active)
                    .await
                    .map(|()| emit(events, MediaEvent::ScreenShareStopped { generation }))
            }
            MediaCommand::AcquireLocal { .. } | MediaCommand::Release => Ok(()),
        };

        if let Err(e) = result {
            emit(
                events,
                MediaEvent::OperationFailed {
                    generation,
                    operation,
                    reason: e.to_string(),
                },
            );
        }
    }

    async fn release(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        active.forwarder.abort();
        active.connection.close().await;
        stop_tracks(self.backend.as_ref(), &active.tracks, active.display.as_ref()).await;
        tracing::info!("🎥 Released media of {}", active.generation);
    }
}

async fn stop_tracks(
    backend: &dyn MediaBackend,
    tracks: &LocalTracks,
    display: Option<&LocalTrack>,
) {
    backend.stop_track(&tracks.audio).await;
    backend.stop_track(&tracks.video).await;
    if let Some(display) = display {
        backend.stop_track(display).await;
    }
}

async fn start_screen_share(
    backend: &dyn MediaBackend,
    active: &mut ActiveMedia,
) -> std::result::Result<(), MediaError> {
    if active.display.is_some() {
        return Ok(());
    }

    let display = backend.acquire_display().await?;
    if let Err(e) = active.connection.replace_video_track(&display).await {
        backend.stop_track(&display).await;
        return Err(e);
    }
    active.display = Some(display);
    Ok(())
}

async fn stop_screen_share(
    backend: &dyn MediaBackend,
    active: &mut ActiveMedia,
) -> std::result::Result<(), MediaError> {
    let Some(display) = active.display.take() else {
        return Ok(());
    };

    let swapped = active
        .connection
        .replace_video_track(&active.tracks.video)
        .await;
    backend.stop_track(&display).await;
    swapped
}

async fn forward_notices(
    generation: Generation,
    mut notices: mpsc::UnboundedReceiver<ConnectionNotice>,
    events: mpsc::UnboundedSender<MediaEvent>,
) {
    while let Some(notice) = notices.recv().await {
        let event = match notice {
            ConnectionNotice::LocalCandidate(candidate) => MediaEvent::LocalCandidate {
                generation,
                candidate,
            },
            ConnectionNotice::Connected => MediaEvent::Connected { generation },
            ConnectionNotice::Disconnected => MediaEvent::Disconnected { generation },
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<MediaEvent>, event: MediaEvent) {
    if events.send(event).is_err() {
        tracing::debug!("Media event receiver gone");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::loopback::LoopbackMediaBackend;
    use pairline_core::domain::{SessionDescription, TrackKind};
    use std::time::Duration;

    async fn next(events: &mut mpsc::UnboundedReceiver<MediaEvent>) -> MediaEvent {
        tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("Expected a media event")
            .expect("Expected an open channel")
    }

    fn gen(n: u64) -> Generation {
        (0..n).fold(Generation::initial(), |g, _| g.next())
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_worker_can_run_on_any_thread() {
        let (event_tx, _events) = mpsc::unbounded_channel();
        let (_commands_tx, commands) = mpsc::unbounded_channel();
        let worker = Worker {
            backend: Arc::new(LoopbackMediaBackend::new()),
            events: event_tx,
            active: None,
        };

        let task = worker.run(commands);
        assert_send(&task);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_driver_on_multi_thread_runtime() {
        let backend = LoopbackMediaBackend::new();
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend.clone()));

        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        assert_eq!(
            next(&mut events).await,
            MediaEvent::LocalMediaReady { generation: gen(1) }
        );

        driver.submit(MediaCommand::Release).unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while backend.camera_in_use() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("Expected the camera to be released");
    }

    #[tokio::test]
    async fn test_acquire_then_offer() {
        let backend = LoopbackMediaBackend::new();
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend.clone()));

        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        driver
            .submit(MediaCommand::CreateOffer { generation: gen(1) })
            .unwrap();

        assert_eq!(
            next(&mut events).await,
            MediaEvent::LocalMediaReady { generation: gen(1) }
        );
        match next(&mut events).await {
            MediaEvent::OfferCreated { generation, .. } | MediaEvent::LocalCandidate { generation, .. } => {
                assert_eq!(generation, gen(1))
            }
            other => panic!("Expected OfferCreated, got {:?}", other),
        }
        assert!(backend.camera_in_use());
    }

    #[tokio::test]
    async fn test_release_before_reacquire() {
        let backend = LoopbackMediaBackend::new();
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend.clone()));

        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        driver.submit(MediaCommand::Release).unwrap();
        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(2) })
            .unwrap();

        assert_eq!(
            next(&mut events).await,
            MediaEvent::LocalMediaReady { generation: gen(1) }
        );
        assert_eq!(
            next(&mut events).await,
            MediaEvent::LocalMediaReady { generation: gen(2) }
        );
        assert_eq!(backend.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_new_generation_replaces_stale_media() {
        let backend = LoopbackMediaBackend::new();
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend.clone()));

        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(2) })
            .unwrap();

        next(&mut events).await;
        assert_eq!(
            next(&mut events).await,
            MediaEvent::LocalMediaReady { generation: gen(2) }
        );
    }

    #[tokio::test]
    async fn test_stale_commands_are_skipped() {
        let backend = LoopbackMediaBackend::new();
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend));

        driver
            .submit(MediaCommand::CreateOffer { generation: gen(3) })
            .unwrap();
        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(4) })
            .unwrap();

        assert_eq!(
            next(&mut events).await,
            MediaEvent::LocalMediaReady { generation: gen(4) }
        );
    }

    #[tokio::test]
    async fn test_permission_denied_is_reported() {
        let backend = LoopbackMediaBackend::new();
        backend.deny_permission(true);
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend.clone()));

        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        assert!(matches!(
            next(&mut events).await,
            MediaEvent::LocalMediaFailed { .. }
        ));

        backend.deny_permission(false);
        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        assert_eq!(
            next(&mut events).await,
            MediaEvent::LocalMediaReady { generation: gen(1) }
        );
    }

    #[tokio::test]
    async fn test_bad_answer_is_non_fatal() {
        let backend = LoopbackMediaBackend::new();
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend));

        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        driver
            .submit(MediaCommand::ApplyRemoteAnswer {
                generation: gen(1),
                sdp: SessionDescription::new("garbage"),
            })
            .unwrap();
        driver
            .submit(MediaCommand::SetTrackEnabled {
                generation: gen(1),
                kind: TrackKind::Audio,
                enabled: false,
            })
            .unwrap();

        next(&mut events).await;
        match next(&mut events).await {
            MediaEvent::OperationFailed { operation, .. } => {
                assert_eq!(operation, "apply_remote_answer")
            }
            other => panic!("Expected OperationFailed, got {:?}", other),
        }
        assert!(driver.is_running());
    }

    #[tokio::test]
    async fn test_screen_share_round_trip() {
        let backend = LoopbackMediaBackend::new();
        let (driver, mut events) = MediaDriver::spawn(Arc::new(backend));

        driver
            .submit(MediaCommand::AcquireLocal { generation: gen(1) })
            .unwrap();
        driver
            .submit(MediaCommand::StartScreenShare { generation: gen(1) })
            .unwrap();
        driver
            .submit(MediaCommand::StopScreenShare { generation: gen(1) })
            .unwrap();

        next(&mut events).await;
        assert_eq!(
            next(&mut events).await,
            MediaEvent::ScreenShareStarted { generation: gen(1) }
        );
        assert_eq!(
            next(&mut events).await,
            MediaEvent::ScreenShareStopped { generation: gen(1) }
        );
    }
}
