use serde::{Deserialize, Serialize};

/// Configuration for a streaming session.
///
/// Supplied once at construction; nothing here mutates after the session
/// starts. The handshake message is derived from these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket URL of the speech-processing endpoint
    pub url: String,

    /// Language tag (e.g. "en", "fr")
    pub language: String,

    /// Hotword strings; joined with commas on the wire
    pub hotwords: Vec<String>,

    /// Whether the endpoint should leave punctuation to the speaker
    pub manual_punctuation: bool,

    /// Domain tag forwarded to the endpoint (e.g. "general")
    pub domain: String,

    /// End-user identifier forwarded to the endpoint
    pub end_user_id: String,

    /// Session identifier attached to every audio payload.
    /// Defaults to a generated UUID.
    pub uid: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/transcribe".to_string(),
            language: "en".to_string(),
            hotwords: Vec::new(),
            manual_punctuation: false,
            domain: "general".to_string(),
            end_user_id: String::new(),
            uid: uuid::Uuid::new_v4().to_string(),
        }
    }
}
