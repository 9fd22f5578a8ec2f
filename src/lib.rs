pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod ws;

pub use audio::{
    CaptureDevice, CaptureFormat, CaptureLoop, MicrophoneDevice, WavFileDevice,
};
pub use config::Config;
pub use error::StreamError;
pub use session::{SessionConfig, SessionHandler, SessionState, SessionStats, StreamSession};
pub use ws::{Connection, Transport, TransportEvent, WsTransport};
