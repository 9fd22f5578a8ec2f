pub mod client;
pub mod messages;

pub use client::{Connection, Transport, TransportEvent, WsTransport};
pub use messages::{decode_inbound, AudioPayload, Handshake, InboundMessage};
