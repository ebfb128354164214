use crate::infrastructure::error::Result;
use pairline_core::{ParticipantId, SignalingMessage};

/// Server-mediated broadcast channel carrying signaling envelopes
///
/// Delivery is at-most-once; only messages from one sender keep their order.
/// Implementations never retry a failed publish.
pub trait PresenceChannel {
    /// Identity of this participant on the channel
    fn local_id(&self) -> ParticipantId;

    /// Fire-and-forget send; `to: None` reaches every participant
    fn publish(&mut self, message: &SignalingMessage) -> Result<()>;

    /// Everything delivered since the last poll, unfiltered
    fn poll_messages(&mut self) -> Vec<SignalingMessage>;

    /// Invoke `handler` once per delivered message meant for us
    ///
    /// Messages addressed to someone else and our own echoes are skipped.
    fn subscribe<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(SignalingMessage),
        Self: Sized,
    {
        let local_id = self.local_id();
        let mut delivered = 0;
        for message in self.poll_messages() {
            if message.from == local_id || !message.is_addressed_to(&local_id) {
                continue;
            }
            delivered += 1;
            handler(message);
        }
        delivered
    }
}
