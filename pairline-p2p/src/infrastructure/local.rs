use crate::infrastructure::channel::PresenceChannel;
use crate::infrastructure::codec;
use crate::infrastructure::error::{P2PError, Result};
use pairline_core::{ParticipantId, SignalingMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Process-local relay shared by every [`LocalChannel`] it creates
///
/// Frames go through the JSON codec so the local path exercises the same
/// wire format as the network one.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Debug, Default)]
struct HubState {
    inboxes: HashMap<ParticipantId, VecDeque<Vec<u8>>>,
    /// Participants whose outbound frames are discarded
    muted: Vec<ParticipantId>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the hub with a fresh participant id
    pub fn join(&self) -> LocalChannel {
        self.join_as(ParticipantId::new())
    }

    pub fn join_as(&self, id: ParticipantId) -> LocalChannel {
        if let Ok(mut state) = self.inner.lock() {
            state.inboxes.entry(id).or_default();
        }
        tracing::debug!("🔌 {} joined local hub", id.short());
        LocalChannel {
            id,
            hub: self.clone(),
        }
    }

    /// Ids currently attached
    pub fn members(&self) -> Vec<ParticipantId> {
        self.inner
            .lock()
            .map(|state| state.inboxes.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every frame `id` sends from now on
    pub fn mute(&self, id: ParticipantId) {
        if let Ok(mut state) = self.inner.lock() {
            state.muted.push(id);
        }
    }

    pub fn unmute(&self, id: &ParticipantId) {
        if let Ok(mut state) = self.inner.lock() {
            state.muted.retain(|m| m != id);
        }
    }

    fn leave(&self, id: &ParticipantId) {
        if let Ok(mut state) = self.inner.lock() {
            state.inboxes.remove(id);
        }
    }

    fn deliver(&self, from: ParticipantId, frame: Vec<u8>) -> Result<usize> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| P2PError::SendFailed("local hub poisoned".to_string()))?;

        if state.muted.contains(&from) {
            return Ok(0);
        }

        let mut count = 0;
        for (id, inbox) in state.inboxes.iter_mut() {
            if *id != from {
                inbox.push_back(frame.clone());
                count += 1;
            }
        }
        Ok(count)
    }

    fn take(&self, id: &ParticipantId) -> Vec<Vec<u8>> {
        self.inner
            .lock()
            .ok()
            .and_then(|mut state| state.inboxes.get_mut(id).map(|inbox| inbox.drain(..).collect()))
            .unwrap_or_default()
    }
}

/// One participant's attachment to a [`LocalHub`]
#[derive(Debug)]
pub struct LocalChannel {
    id: ParticipantId,
    hub: LocalHub,
}

impl PresenceChannel for LocalChannel {
    fn local_id(&self) -> ParticipantId {
        self.id
    }

    fn publish(&mut self, message: &SignalingMessage) -> Result<()> {
        let frame = codec::encode(message)?;
        let count = self.hub.deliver(self.id, frame)?;
        tracing::trace!("📤 {} to {} inboxes", message.kind.name(), count);
        Ok(())
    }

    fn poll_messages(&mut self) -> Vec<SignalingMessage> {
        self.hub
            .take(&self.id)
            .iter()
            .filter_map(|frame| codec::decode(frame))
            .collect()
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.hub.leave(&self.id);
    }
}
