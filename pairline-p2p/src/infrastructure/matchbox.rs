use crate::domain::IceServer;
use crate::infrastructure::channel::PresenceChannel;
use crate::infrastructure::codec;
use crate::infrastructure::error::{P2PError, Result};
use instant::{Duration, Instant};
use matchbox_socket::{PeerId, PeerState, RtcIceServerConfig, WebRtcSocket, WebRtcSocketBuilder};
use pairline_core::{ParticipantId, SignalKind, SignalingMessage};
use std::collections::VecDeque;
use tracing::Instrument;

const ID_TIMEOUT: Duration = Duration::from_secs(5);

/// Presence channel relayed through a matchbox signalling room
///
/// The participant id is the peer id handed out by the signalling server.
/// Broadcasts fan out over the reliable data channel to every connected
/// peer; directed messages go to that peer only.
pub struct MatchboxChannel {
    socket: WebRtcSocket,
    local_id: ParticipantId,
    /// Messages synthesized locally (peers dropping off the room)
    pending: VecDeque<SignalingMessage>,
}

impl MatchboxChannel {
    /// Join `room` on `signalling_server`
    pub async fn connect(
        signalling_server: &str,
        room: &str,
        ice_servers: &[IceServer],
    ) -> Result<Self> {
        let url = room_url(signalling_server, room);
        tracing::info!("Connecting to signalling server: {}", url);
        for (i, server) in ice_servers.iter().enumerate() {
            let auth = if server.username.is_some() { " (with auth)" } else { "" };
            tracing::info!("  ICE Server {}: {}{}", i + 1, server.urls.join(", "), auth);
        }

        let (mut socket, loop_fut) = WebRtcSocketBuilder::new(url)
            .ice_server(build_ice_server_config(ice_servers))
            .add_channel(matchbox_socket::ChannelConfig::reliable())
            .build();

        tokio::spawn(
            async move {
                if let Err(e) = loop_fut.await {
                    tracing::warn!("⚠️ Signalling loop ended: {:?}", e);
                }
            }
            .instrument(tracing::info_span!("matchbox::webrtc_loop")),
        );

        let local_id = wait_for_local_id(&mut socket).await?;
        tracing::info!("✅ Joined room as {}", local_id);

        Ok(Self {
            socket,
            local_id,
            pending: VecDeque::new(),
        })
    }

    pub fn connected_peers(&self) -> Vec<ParticipantId> {
        self.socket
            .connected_peers()
            .map(|peer| ParticipantId::from_uuid(peer.0))
            .collect()
    }

    fn send_frame(&mut self, frame: &[u8], to: ParticipantId) {
        self.socket
            .channel_mut(0)
            .send(frame.to_vec().into_boxed_slice(), PeerId(to.inner()));
    }
}

impl PresenceChannel for MatchboxChannel {
    fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    fn publish(&mut self, message: &SignalingMessage) -> Result<()> {
        let frame = codec::encode(message)?;

        match message.to {
            Some(to) => {
                if !self.connected_peers().contains(&to) {
                    return Err(P2PError::SendFailed(format!("{} is not in the room", to.short())));
                }
                self.send_frame(&frame, to);
            }
            None => {
                let peers = self.connected_peers();
                for peer in &peers {
                    self.send_frame(&frame, *peer);
                }
                tracing::trace!("📤 {} to {} peers", message.kind.name(), peers.len());
            }
        }
        Ok(())
    }

    fn poll_messages(&mut self) -> Vec<SignalingMessage> {
        for (peer, state) in self.socket.update_peers() {
            let id = ParticipantId::from_uuid(peer.0);
            match state {
                PeerState::Connected => tracing::info!("Peer connected: {}", id.short()),
                PeerState::Disconnected => {
                    tracing::info!("Peer disconnected: {}", id.short());
                    // A peer that drops off the room has left whatever pairing it was in
                    self.pending.push_back(SignalingMessage::direct(
                        id,
                        self.local_id,
                        SignalKind::Leave,
                    ));
                }
            }
        }

        let mut messages: Vec<_> = self.pending.drain(..).collect();
        for (peer, packet) in self.socket.channel_mut(0).receive() {
            let Some(message) = codec::decode(&packet) else {
                continue;
            };
            if message.from.inner() != peer.0 {
                tracing::debug!("Dropping frame with spoofed sender from {}", peer.0);
                continue;
            }
            messages.push(message);
        }
        messages
    }
}

fn room_url(signalling_server: &str, room: &str) -> String {
    let room = room.trim_matches('/');
    if room.is_empty() {
        signalling_server.to_string()
    } else {
        format!("{}/{}", signalling_server.trim_end_matches('/'), room)
    }
}

/// Matchbox accepts one ICE server entry; the first configured one wins
fn build_ice_server_config(ice_servers: &[IceServer]) -> RtcIceServerConfig {
    match ice_servers.first() {
        Some(server) => RtcIceServerConfig {
            urls: server.urls.clone(),
            username: server.username.clone(),
            credential: server.credential.clone(),
        },
        None => RtcIceServerConfig::default(),
    }
}

async fn wait_for_local_id(socket: &mut WebRtcSocket) -> Result<ParticipantId> {
    let start = Instant::now();

    loop {
        socket.update_peers();

        if let Some(id) = socket.id() {
            return Ok(ParticipantId::from_uuid(id.0));
        }

        if start.elapsed() > ID_TIMEOUT {
            return Err(P2PError::ConnectionFailed(
                "Timeout waiting for peer ID".to_string(),
            ));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_url() {
        assert_eq!(room_url("ws://localhost:3536", "lobby"), "ws://localhost:3536/lobby");
        assert_eq!(room_url("ws://localhost:3536/", "/lobby"), "ws://localhost:3536/lobby");
        assert_eq!(room_url("ws://localhost:3536", ""), "ws://localhost:3536");
    }

    #[test]
    fn test_ice_config_uses_first_server() {
        let servers = vec![
            IceServer::turn("turn:turn.example.com:3478", "user", "pass"),
            IceServer::stun("stun:stun.example.com:3478"),
        ];

        let config = build_ice_server_config(&servers);
        assert_eq!(config.urls, vec!["turn:turn.example.com:3478"]);
        assert_eq!(config.username.as_deref(), Some("user"));
        assert_eq!(config.credential.as_deref(), Some("pass"));
    }

    #[test]
    fn test_ice_config_empty_falls_back_to_default() {
        let config = build_ice_server_config(&[]);
        assert_eq!(config.urls, RtcIceServerConfig::default().urls);
    }
}
