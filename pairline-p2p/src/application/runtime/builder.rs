use crate::application::config::RuntimeConfig;
use crate::application::runtime::ParticipantLoop;
use crate::infrastructure::error::Result;
use crate::infrastructure::local::{LocalChannel, LocalHub};
use crate::infrastructure::loopback::LoopbackMediaBackend;
use crate::infrastructure::matchbox::MatchboxChannel;
use crate::infrastructure::media::MediaBackend;
use crate::infrastructure::media_driver::MediaDriver;
use crate::infrastructure::moderation::{ModerationSink, TracingSink};
use crate::infrastructure::PresenceChannel;
use pairline_core::application::runtime::CommandQueue;
use pairline_core::{BlockList, Participant, SessionConfig};
use std::sync::Arc;

/// Assembles a [`ParticipantLoop`] from its parts
///
/// Anything not set falls back to: default session settings, an in-memory
/// block list, the loopback media backend and the tracing moderation sink.
pub struct ParticipantLoopBuilder {
    session: SessionConfig,
    runtime: RuntimeConfig,
    blocks: Option<BlockList>,
    backend: Option<Arc<dyn MediaBackend>>,
    sink: Option<Box<dyn ModerationSink>>,
    command_capacity: usize,
}

impl ParticipantLoopBuilder {
    pub fn new() -> Self {
        Self {
            session: SessionConfig::default(),
            runtime: RuntimeConfig::default(),
            blocks: None,
            backend: None,
            sink: None,
            command_capacity: 64,
        }
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    pub fn runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime = config;
        self
    }

    pub fn block_list(mut self, blocks: BlockList) -> Self {
        self.blocks = Some(blocks);
        self
    }

    pub fn media_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn moderation_sink(mut self, sink: impl ModerationSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    /// Join a process-local hub; needs a running tokio runtime
    pub fn build_local(self, hub: &LocalHub) -> ParticipantLoop<LocalChannel> {
        let channel = hub.join();
        self.build_with_channel(channel)
    }

    /// Join the configured matchbox room
    pub async fn build_matchbox(self) -> Result<ParticipantLoop<MatchboxChannel>> {
        let channel = MatchboxChannel::connect(
            &self.runtime.signalling_server,
            &self.runtime.room,
            &self.runtime.ice_servers,
        )
        .await?;
        Ok(self.build_with_channel(channel))
    }

    /// Wrap an already connected channel
    pub fn build_with_channel<C: PresenceChannel>(self, channel: C) -> ParticipantLoop<C> {
        let id = channel.local_id();
        let blocks = self.blocks.unwrap_or_else(BlockList::in_memory);
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(LoopbackMediaBackend::new()));
        let sink = self.sink.unwrap_or_else(|| Box::new(TracingSink));

        tracing::info!(
            "🔧 Building participant {} (safe mode: {}, {} blocked)",
            id.short(),
            self.session.safe_mode,
            blocks.len()
        );

        ParticipantLoop::new(
            Participant::new(id, self.session, blocks),
            channel,
            CommandQueue::new(self.command_capacity),
            MediaDriver::spawn(backend),
            sink,
            self.runtime.poll_interval(),
        )
    }
}

impl Default for ParticipantLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
