#![allow(dead_code)]

use instant::{Duration, Instant};
use pairline_core::{
    EndReason, Report, SessionConfig, SessionEvent, SessionPhase, SignalingMessage, UserCommand,
};
use pairline_p2p::{
    ChannelSink, LocalChannel, LocalHub, LoopbackMediaBackend, ParticipantLoop,
    ParticipantLoopBuilder, PresenceChannel,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Two participants on a local hub with loopback media and a virtual clock
pub struct PairFixture {
    pub hub: LocalHub,
    pub alice: ParticipantLoop<LocalChannel>,
    pub bob: ParticipantLoop<LocalChannel>,
    pub alice_media: LoopbackMediaBackend,
    pub bob_media: LoopbackMediaBackend,
    /// Reports filed by alice
    pub reports: mpsc::UnboundedReceiver<Report>,
    pub alice_events: Vec<SessionEvent>,
    pub bob_events: Vec<SessionEvent>,
    /// Every frame seen on the hub, in arrival order
    pub wire: Vec<SignalingMessage>,
    pub now: Instant,
    spy: LocalChannel,
}

impl PairFixture {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Build both loops; must run inside a tokio runtime
    pub fn with_config(config: SessionConfig) -> Self {
        init_test_tracing();

        let hub = LocalHub::new();
        let spy = hub.join();

        let alice_media = LoopbackMediaBackend::new();
        let bob_media = LoopbackMediaBackend::new();
        let (sink, reports) = ChannelSink::new();

        let alice = ParticipantLoopBuilder::new()
            .session_config(config.clone())
            .media_backend(Arc::new(alice_media.clone()))
            .moderation_sink(sink)
            .build_local(&hub);
        let bob = ParticipantLoopBuilder::new()
            .session_config(config)
            .media_backend(Arc::new(bob_media.clone()))
            .build_local(&hub);

        Self {
            hub,
            alice,
            bob,
            alice_media,
            bob_media,
            reports,
            alice_events: Vec::new(),
            bob_events: Vec::new(),
            wire: Vec::new(),
            now: Instant::now(),
            spy,
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    pub fn both(&mut self, command: UserCommand) {
        self.alice.submit(command.clone()).unwrap();
        self.bob.submit(command).unwrap();
    }

    /// Poll both loops once at the current virtual time, then let the media
    /// drivers run
    pub async fn step(&mut self) {
        self.alice.poll_at(self.now);
        self.bob.poll_at(self.now);

        self.alice_events.extend(self.alice.drain_events());
        self.bob_events.extend(self.bob.drain_events());
        self.wire.extend(self.spy.poll_messages());

        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }

    pub async fn tick(&mut self, count: usize) {
        for _ in 0..count {
            self.step().await;
        }
    }

    /// Step until `done` holds; false if it never did
    pub async fn settle_until(&mut self, done: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..200 {
            if done(self) {
                return true;
            }
            self.step().await;
        }
        done(self)
    }

    /// Search on both sides until both are Connected
    pub async fn connect(&mut self) {
        self.both(UserCommand::StartSearch);
        let connected = self
            .settle_until(|f| {
                f.alice.phase() == SessionPhase::Connected
                    && f.bob.phase() == SessionPhase::Connected
            })
            .await;
        assert!(
            connected,
            "Expected both Connected, got {} / {}",
            self.alice.phase(),
            self.bob.phase()
        );
    }

    /// Frames of one kind seen on the wire
    pub fn sent(&self, kind: &str) -> usize {
        self.wire.iter().filter(|m| m.kind.name() == kind).count()
    }

    pub fn clear(&mut self) {
        self.alice_events.clear();
        self.bob_events.clear();
        self.wire.clear();
    }
}

pub fn ended_with(events: &[SessionEvent], reason: EndReason) -> bool {
    events
        .iter()
        .any(|e| matches!(e, SessionEvent::Ended { reason: r, .. } if *r == reason))
}

pub fn media_errors(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::MediaError { .. }))
        .count()
}

impl PairFixture {
    /// Id of the silent third member of the hub
    pub fn stranger(&self) -> pairline_core::ParticipantId {
        self.spy.local_id()
    }

    /// Publish a frame as the stranger
    pub fn inject(&mut self, message: SignalingMessage) {
        self.spy.publish(&message).unwrap();
    }
}
