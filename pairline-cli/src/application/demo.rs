use crate::infrastructure::{CliError, Result};
use pairline_core::{EndReason, SessionConfig, SessionEvent, UserCommand};
use pairline_p2p::{LocalHub, ParticipantLoopBuilder, RuntimeConfig};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Settings for the in-process two-participant demo
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub session: SessionConfig,
    pub poll_interval_ms: u64,
    /// How long each step may take before the demo gives up
    pub step_timeout: Duration,
    pub greeting: String,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            session: SessionConfig::default().with_beacon_interval(Duration::from_millis(200)),
            poll_interval_ms: 20,
            step_timeout: Duration::from_secs(10),
            greeting: "hi stranger 👋".to_string(),
        }
    }
}

/// What each side saw during the demo, in order
#[derive(Debug, Default)]
pub struct DemoOutcome {
    pub alice: Vec<SessionEvent>,
    pub bob: Vec<SessionEvent>,
}

impl DemoOutcome {
    pub fn revealed(&self) -> bool {
        let revealed = |events: &[SessionEvent]| {
            events
                .iter()
                .any(|e| matches!(e, SessionEvent::RevealChanged { revealed: true }))
        };
        revealed(&self.alice) && revealed(&self.bob)
    }

    pub fn bob_received_chat(&self) -> bool {
        self.bob
            .iter()
            .any(|e| matches!(e, SessionEvent::ChatReceived(_)))
    }
}

struct Side {
    name: &'static str,
    commands: mpsc::UnboundedSender<UserCommand>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    seen: Vec<SessionEvent>,
    task: JoinHandle<()>,
}

impl Side {
    fn spawn(name: &'static str, builder: ParticipantLoopBuilder, hub: &LocalHub) -> Self {
        let participant = builder.build_local(hub);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let task = tokio::spawn(participant.run(command_rx, event_tx));

        Self {
            name,
            commands,
            events,
            seen: Vec::new(),
            task,
        }
    }

    fn send(&self, command: UserCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CliError::DemoStalled(format!("{} stopped early", self.name)))
    }

    async fn wait_for(
        &mut self,
        step: &str,
        timeout: Duration,
        wanted: impl Fn(&SessionEvent) -> bool,
    ) -> Result<()> {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(CliError::DemoStalled(format!("{} never reached: {}", self.name, step)));
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        return Err(CliError::DemoStalled(format!("{} stopped early", self.name)));
                    };
                    tracing::info!("[{}] {}", self.name, super::console::describe(&event));
                    let done = wanted(&event);
                    self.seen.push(event);
                    if done {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn stop(self) -> Vec<SessionEvent> {
        let Side {
            name,
            commands,
            mut events,
            mut seen,
            task,
        } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::warn!("[{}] participant task failed: {}", name, e);
        }
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

fn is_connected(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Connected { .. })
}

fn is_revealed(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::RevealChanged { revealed: true })
}

/// Pair two in-process participants over a local hub and walk one session
///
/// Both search, connect, opt in to reveal, exchange a chat line and end.
pub async fn run_demo(options: DemoOptions) -> Result<DemoOutcome> {
    let hub = LocalHub::new();
    let runtime = RuntimeConfig::default().with_poll_interval(options.poll_interval_ms);
    let builder = || {
        ParticipantLoopBuilder::new()
            .session_config(options.session.clone())
            .runtime_config(runtime.clone())
    };

    let mut alice = Side::spawn("alice", builder(), &hub);
    let mut bob = Side::spawn("bob", builder(), &hub);
    let timeout = options.step_timeout;

    tracing::info!("🔍 Both sides start searching");
    alice.send(UserCommand::StartSearch)?;
    bob.send(UserCommand::StartSearch)?;

    alice.wait_for("connected", timeout, is_connected).await?;
    bob.wait_for("connected", timeout, is_connected).await?;

    if options.session.safe_mode {
        alice.send(UserCommand::MarkReady)?;
        bob.send(UserCommand::MarkReady)?;
    }
    alice.wait_for("reveal", timeout, is_revealed).await?;
    bob.wait_for("reveal", timeout, is_revealed).await?;

    alice.send(UserCommand::SendChat {
        text: options.greeting.clone(),
    })?;
    bob.wait_for("chat", timeout, |e| matches!(e, SessionEvent::ChatReceived(_)))
        .await?;

    alice.send(UserCommand::End)?;
    bob.wait_for("peer left", timeout, |e| {
        matches!(
            e,
            SessionEvent::Ended {
                reason: EndReason::PeerLeft,
                ..
            }
        )
    })
    .await?;

    Ok(DemoOutcome {
        alice: alice.stop().await,
        bob: bob.stop().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_demo_walks_a_full_session() {
        let outcome = run_demo(DemoOptions::default()).await.unwrap();

        assert!(outcome.revealed());
        assert!(outcome.bob_received_chat());
        assert!(outcome.alice.iter().any(|e| matches!(
            e,
            SessionEvent::Ended {
                reason: EndReason::UserEnded,
                ..
            }
        )));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_demo_without_safe_mode() {
        let options = DemoOptions {
            session: DemoOptions::default().session.with_safe_mode(false),
            ..DemoOptions::default()
        };

        let outcome = run_demo(options).await.unwrap();
        assert!(outcome.revealed());
    }
}
