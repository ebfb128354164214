use crate::infrastructure::error::Result;
use pairline_core::SignalingMessage;

/// Encode an envelope as a JSON frame
pub fn encode(message: &SignalingMessage) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode a frame, dropping anything that is not a valid envelope
pub fn decode(bytes: &[u8]) -> Option<SignalingMessage> {
    match serde_json::from_slice(bytes) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!("Dropping undecodable frame ({} bytes): {}", bytes.len(), e);
            None
        }
    }
}
