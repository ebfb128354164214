use crate::infrastructure::channel::PresenceChannel;
use crate::infrastructure::error::Result;
use crate::infrastructure::media_driver::MediaDriver;
use crate::infrastructure::moderation::ModerationSink;
use instant::{Duration, Instant};
use pairline_core::application::runtime::CommandQueue;
use pairline_core::{
    Effect, MediaEvent, Participant, ParticipantId, SessionEvent, SessionPhase, UserCommand,
};
use tokio::sync::mpsc;
use tracing::Instrument;

/// Control loop of one participant
///
/// Serializes inbound signaling, user commands, media completions and
/// timers onto the [`Participant`], then carries out the effects it asks
/// for. Generic over the presence channel so tests can run on a local hub.
pub struct ParticipantLoop<C: PresenceChannel> {
    participant: Participant,
    channel: C,
    commands: CommandQueue,
    media: MediaDriver,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    sink: Box<dyn ModerationSink>,
    events: Vec<SessionEvent>,
    poll_interval: Duration,
}

impl<C: PresenceChannel> ParticipantLoop<C> {
    pub fn new(
        participant: Participant,
        channel: C,
        commands: CommandQueue,
        media: (MediaDriver, mpsc::UnboundedReceiver<MediaEvent>),
        sink: Box<dyn ModerationSink>,
        poll_interval: Duration,
    ) -> Self {
        let (media, media_events) = media;
        Self {
            participant,
            channel,
            commands,
            media,
            media_events,
            sink,
            events: Vec::new(),
            poll_interval,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.participant.id()
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn phase(&self) -> SessionPhase {
        self.participant.phase()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Queue a command for the next poll
    pub fn submit(&mut self, command: UserCommand) -> Result<()> {
        self.commands.push(command)?;
        Ok(())
    }

    /// Apply a command right away and carry out its effects
    pub fn execute(&mut self, command: UserCommand) -> Result<()> {
        let result = self.participant.handle_command(command, Instant::now());
        self.flush();
        Ok(result?)
    }

    pub fn poll(&mut self) -> usize {
        self.poll_at(Instant::now())
    }

    /// One pass of the loop at `now`
    ///
    /// Returns how many inputs were processed, timers excluded.
    pub fn poll_at(&mut self, now: Instant) -> usize {
        let participant = &mut self.participant;
        let mut processed = self
            .channel
            .subscribe(|message| participant.handle_signal(message, now));

        while let Some(command) = self.commands.pop() {
            let action = command.action();
            if let Err(e) = self.participant.handle_command(command, now) {
                tracing::warn!("❌ Command {} rejected: {}", action, e);
            }
            processed += 1;
        }

        while let Ok(event) = self.media_events.try_recv() {
            self.participant.handle_media_event(event, now);
            processed += 1;
        }

        self.participant.tick(now);
        self.flush();

        if processed > 0 {
            tracing::trace!("🔧 Processed {} inputs", processed);
        }
        processed
    }

    /// Take the session events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drive the loop until the command sender is dropped
    ///
    /// Session events are forwarded to `events` after every pass. On
    /// shutdown an active pairing is ended so the peer is told and the
    /// devices are released.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<UserCommand>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) {
        let span = tracing::info_span!("participant", id = %self.id().short());

        async move {
            tracing::info!("🟢 Participant loop started");
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                let mut shutdown = false;
                tokio::select! {
                    _ = ticker.tick() => {}
                    command = commands.recv() => match command {
                        Some(command) => {
                            if let Err(e) = self.submit(command) {
                                tracing::warn!("❌ {}", e);
                            }
                        }
                        None => shutdown = true,
                    },
                }

                self.poll();
                self.forward(&events);

                if shutdown {
                    break;
                }
            }

            if !matches!(self.phase(), SessionPhase::Idle | SessionPhase::Ended) {
                let _ = self.execute(UserCommand::End);
            }
            self.forward(&events);
            tracing::info!("🔴 Participant loop stopped");
        }
        .instrument(span)
        .await
    }

    fn forward(&mut self, events: &mpsc::UnboundedSender<SessionEvent>) {
        for event in self.drain_events() {
            if events.send(event).is_err() {
                tracing::debug!("Session event receiver gone");
            }
        }
    }

    fn flush(&mut self) {
        for effect in self.participant.drain_effects() {
            match effect {
                Effect::Publish(message) => {
                    let kind = message.kind.name();
                    match self.channel.publish(&message) {
                        Ok(()) => tracing::debug!("📤 {}", kind),
                        Err(e) => tracing::warn!("⚠️ Publish of {} failed: {}", kind, e),
                    }
                }
                Effect::Media(command) => {
                    if let Err(e) = self.media.submit(command) {
                        tracing::warn!("⚠️ Media driver unavailable: {}", e);
                    }
                }
                Effect::Report(report) => self.sink.submit(report),
                Effect::Notify(event) => self.events.push(event),
            }
        }
    }
}
