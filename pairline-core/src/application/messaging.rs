use crate::application::{Effect, SessionEvent, SessionMachine};
use crate::domain::{
    ChatMessage, ContentFilter, Pairing, ParticipantId, SessionState, SignalKind, SignalingMessage,
};

/// In-session text chat with the current peer
#[derive(Debug)]
pub struct Messenger {
    local_id: ParticipantId,
    filter: ContentFilter,
}

impl Messenger {
    pub fn new(local_id: ParticipantId, filter: ContentFilter) -> Self {
        Self { local_id, filter }
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    /// Send `text` to the current peer
    ///
    /// Blank or filtered text, or no active peer, makes this a no-op.
    pub fn send(
        &self,
        text: &str,
        machine: &mut SessionMachine,
        effects: &mut Vec<Effect>,
    ) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if !self.filter.allows(text) {
            tracing::debug!("💬 Outbound chat rejected by filter");
            return None;
        }

        let Some(pairing) = active_pairing(machine) else {
            tracing::debug!("💬 No active peer, chat dropped");
            return None;
        };

        let message = ChatMessage::local(text.to_string());
        pairing.chat.push(message.clone());
        effects.push(Effect::Publish(SignalingMessage::direct(
            self.local_id,
            pairing.peer_id(),
            SignalKind::Chat {
                text: message.text.clone(),
            },
        )));
        effects.push(Effect::Notify(SessionEvent::ChatSent(message.clone())));
        Some(message)
    }

    /// Accept chat only from the current peer and only if it passes the filter
    pub fn receive(
        &self,
        from: ParticipantId,
        text: String,
        machine: &mut SessionMachine,
        effects: &mut Vec<Effect>,
    ) -> Option<ChatMessage> {
        let Some(pairing) = active_pairing(machine) else {
            tracing::debug!("💬 Chat from {} outside a pairing, dropped", from.short());
            return None;
        };

        if pairing.peer_id() != from {
            tracing::debug!("💬 Chat from non-peer {}, dropped", from.short());
            return None;
        }

        if text.trim().is_empty() || !self.filter.allows(&text) {
            tracing::debug!("💬 Inbound chat rejected by filter");
            return None;
        }

        let message = ChatMessage::remote(text);
        pairing.chat.push(message.clone());
        effects.push(Effect::Notify(SessionEvent::ChatReceived(message.clone())));
        Some(message)
    }
}

/// Pairing of a Connecting or Connected session
fn active_pairing(machine: &mut SessionMachine) -> Option<&mut Pairing> {
    if !matches!(
        machine.state(),
        SessionState::Connecting(_) | SessionState::Connected(_)
    ) {
        return None;
    }
    machine.pairing_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatDirection, PairingRole, PeerMeta};
    use instant::{Duration, Instant};

    fn setup() -> (Messenger, SessionMachine, ParticipantId) {
        let now = Instant::now();
        let mut machine = SessionMachine::new(Duration::ZERO);
        let peer = ParticipantId::new();
        machine.start_search(now).unwrap();
        machine
            .match_found(PeerMeta::new(peer, None, vec![]), PairingRole::Responder, now)
            .unwrap();
        machine.negotiation_started(now).unwrap();
        machine.media_connected(now).unwrap();

        let messenger = Messenger::new(ParticipantId::new(), ContentFilter::new(["spam"]));
        (messenger, machine, peer)
    }

    #[test]
    fn test_send_appends_and_publishes() {
        let (messenger, mut machine, peer) = setup();
        let mut effects = Vec::new();

        let message = messenger.send("  hello ", &mut machine, &mut effects).unwrap();
        assert_eq!(message.text, "hello");
        assert_eq!(message.direction, ChatDirection::Local);
        assert_eq!(machine.state().pairing().unwrap().chat.len(), 1);

        match &effects[0] {
            Effect::Publish(msg) => {
                assert_eq!(msg.to, Some(peer));
                assert_eq!(
                    msg.kind,
                    SignalKind::Chat {
                        text: "hello".to_string()
                    }
                );
            }
            other => panic!("Expected Publish, got {:?}", other),
        }
    }

    #[test]
    fn test_send_noops() {
        let (messenger, mut machine, _) = setup();
        let mut effects = Vec::new();

        assert!(messenger.send("   ", &mut machine, &mut effects).is_none());
        assert!(messenger.send("buy SPAM now", &mut machine, &mut effects).is_none());
        assert!(effects.is_empty());

        let mut idle = SessionMachine::new(Duration::ZERO);
        assert!(messenger.send("hello", &mut idle, &mut effects).is_none());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_receive_only_from_current_peer() {
        let (messenger, mut machine, peer) = setup();
        let mut effects = Vec::new();

        assert!(messenger
            .receive(ParticipantId::new(), "hi".into(), &mut machine, &mut effects)
            .is_none());
        assert!(messenger
            .receive(peer, "spam spam".into(), &mut machine, &mut effects)
            .is_none());

        let message = messenger
            .receive(peer, "hi".into(), &mut machine, &mut effects)
            .unwrap();
        assert_eq!(message.direction, ChatDirection::Remote);
        assert_eq!(machine.state().pairing().unwrap().chat.len(), 1);
        assert_eq!(effects.len(), 1);
    }
}
