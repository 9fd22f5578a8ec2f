//! Streaming session management
//!
//! This module provides the `StreamSession` abstraction that manages:
//! - The transport lifecycle (open, handshake, close)
//! - The background capture loop producing audio payloads
//! - Relaying inbound endpoint messages to the caller's handler
//! - Session statistics and state

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::{SessionHandler, SessionState, StreamSession};
pub use stats::SessionStats;
