use thiserror::Error;

/// Errors surfaced by the streaming client.
///
/// Transport and device failures are reported through the session's failure
/// path rather than thrown across task boundaries; there are no internal
/// retries anywhere — reconnect policy belongs to the caller.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("audio device initialization failed: {0}")]
    DeviceInit(String),

    #[error("malformed inbound message: {0}")]
    MalformedMessage(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, StreamError>;
