use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::session::SessionConfig;

/// Configuration handshake, sent exactly once as the first message of a
/// session, before any audio payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    pub language: String,
    /// Comma-joined hotword list; empty string when there are none.
    pub hotwords: String,
    pub manual_punctuation: bool,
    pub end_user_id: String,
    pub domain: String,
}

impl Handshake {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            language: config.language.clone(),
            hotwords: config.hotwords.join(","),
            manual_punctuation: config.manual_punctuation,
            end_user_id: config.end_user_id.clone(),
            domain: config.domain.clone(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| StreamError::InvalidArgument(format!("handshake encoding: {}", e)))
    }
}

/// One framed audio window, base64-encoded for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPayload {
    /// WAV-framed chunk bytes, base64 (standard alphabet, no wrapping).
    pub audio: String,
    /// Session identifier, identical for every chunk of a session.
    pub uid: String,
}

impl AudioPayload {
    pub fn new(framed: &[u8], uid: &str) -> Self {
        Self {
            audio: base64::engine::general_purpose::STANDARD.encode(framed),
            uid: uid.to_string(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| StreamError::InvalidArgument(format!("payload encoding: {}", e)))
    }
}

/// An inbound message from the endpoint.
///
/// The client does not interpret result contents; the text is surfaced
/// verbatim to the caller's handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
}

/// Check an inbound text payload for well-formedness and wrap it.
///
/// Only "is this well-formed JSON" is verified; anything deeper is the
/// caller's concern. A malformed payload fails with `MalformedMessage` and
/// is routed to the session's failure path, never silently dropped.
pub fn decode_inbound(text: &str) -> Result<InboundMessage> {
    serde_json::from_str::<serde_json::Value>(text)
        .map_err(|e| StreamError::MalformedMessage(e.to_string()))?;

    Ok(InboundMessage {
        text: text.to_string(),
    })
}
