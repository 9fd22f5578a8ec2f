use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{CaptureDevice, CaptureFormat, CaptureLoop};
use crate::error::{Result, StreamError};
use crate::ws::{decode_inbound, Connection, Handshake, Transport, TransportEvent};

/// Bound on queued-but-unsent audio payloads, for backpressure.
const OUTBOUND_QUEUE: usize = 32;

/// Session lifecycle state.
///
/// Advances strictly `Idle → Connecting → Streaming → Closing → Closed`
/// (with `Connecting → Closed` on a failed open). `Closed` is terminal; a
/// new session must be constructed to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Connecting = 1,
    Streaming = 2,
    Closing = 3,
    Closed = 4,
}

impl From<u8> for SessionState {
    fn from(value: u8) -> Self {
        match value {
            0 => SessionState::Idle,
            1 => SessionState::Connecting,
            2 => SessionState::Streaming,
            3 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }
}

/// Caller-registered handler for session events.
pub trait SessionHandler: Send + Sync + 'static {
    /// Called once per inbound message, in arrival order. The text is the
    /// endpoint's payload, uninterpreted.
    fn on_message(&self, text: &str);

    /// Called on connection, send, or inbound-decode failures.
    fn on_failure(&self, error: &StreamError) {
        error!("Session failure (no handler override): {}", error);
    }
}

/// A streaming session: owns the connection lifecycle, the capture loop, and
/// the relay of inbound messages to the caller's handler.
pub struct StreamSession {
    config: SessionConfig,
    format: CaptureFormat,

    /// Lifecycle state word; written only by the session
    state: Arc<AtomicU8>,

    /// Derived "keep capturing" flag read by the capture loop
    capturing: Arc<AtomicBool>,

    chunks_sent: Arc<AtomicUsize>,
    messages_received: Arc<AtomicUsize>,

    /// When the session was created
    started_at: chrono::DateTime<Utc>,

    handler: Arc<dyn SessionHandler>,

    /// Taken at start; a session cannot be restarted
    transport: Option<Box<dyn Transport>>,
    device: Option<Box<dyn CaptureDevice>>,

    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    coordinator: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl StreamSession {
    pub fn new(
        config: SessionConfig,
        format: CaptureFormat,
        transport: Box<dyn Transport>,
        device: Box<dyn CaptureDevice>,
        handler: Arc<dyn SessionHandler>,
    ) -> Self {
        Self {
            config,
            format,
            state: Arc::new(AtomicU8::new(SessionState::Idle as u8)),
            capturing: Arc::new(AtomicBool::new(false)),
            chunks_sent: Arc::new(AtomicUsize::new(0)),
            messages_received: Arc::new(AtomicUsize::new(0)),
            started_at: Utc::now(),
            handler,
            transport: Some(transport),
            device: Some(device),
            shutdown_tx: Arc::new(Mutex::new(None)),
            coordinator: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the transport, send the handshake, and start streaming.
    ///
    /// On a failed open the session reports one failure notification, moves
    /// to `Closed` and returns the error; there is no retry.
    pub async fn start(&mut self) -> Result<()> {
        if self.state() != SessionState::Idle {
            warn!("Session already started");
            return Ok(());
        }

        info!("Starting session {} -> {}", self.config.uid, self.config.url);

        // Encoded up front: a bad config fails fast, before any side effect.
        let handshake = Handshake::from_config(&self.config).encode()?;

        let mut transport = self
            .transport
            .take()
            .ok_or_else(|| StreamError::InvalidArgument("session is not reusable".into()))?;
        let device = self
            .device
            .take()
            .ok_or_else(|| StreamError::InvalidArgument("session is not reusable".into()))?;

        self.set_state(SessionState::Connecting);

        let (conn, events) = match transport.open(&self.config.url).await {
            Ok(opened) => opened,
            Err(e) => {
                error!("Connection failed: {}", e);
                self.set_state(SessionState::Closed);
                self.handler.on_failure(&e);
                return Err(e);
            }
        };

        self.set_state(SessionState::Streaming);
        self.capturing.store(true, Ordering::SeqCst);

        let (out_tx, out_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock().await = Some(shutdown_tx);

        let capture = CaptureLoop::new(
            device,
            self.format,
            self.config.uid.clone(),
            out_tx,
            self.capturing.clone(),
            self.chunks_sent.clone(),
        );

        let task = tokio::spawn(run_session(
            conn,
            events,
            handshake,
            capture,
            out_rx,
            shutdown_rx,
            self.state.clone(),
            self.capturing.clone(),
            self.handler.clone(),
            self.messages_received.clone(),
        ));
        *self.coordinator.lock().await = Some(task);

        Ok(())
    }

    /// Stop streaming and tear the session down.
    ///
    /// Cooperative: signals the capture loop, waits for its exit, then
    /// closes the transport. Calling `stop` again after `Closed` is a no-op
    /// and does not close the transport a second time.
    pub async fn stop(&self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            info!("Stopping session {}", self.config.uid);
            let _ = tx.send(());
        } else {
            warn!("Session not streaming");
        }

        if let Some(handle) = self.coordinator.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Session task panicked: {}", e);
            }
        }

        Ok(())
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Snapshot of the session's counters.
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            state: self.state(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_sent: self.chunks_sent.load(Ordering::SeqCst),
            messages_received: self.messages_received.load(Ordering::SeqCst),
        }
    }
}

/// Session coordinator: single owner of the connection.
///
/// All transport traffic funnels through this task's `select!` loop, so
/// callback-context identity never leaks into session state. Inbound
/// messages keep flowing to the handler from `Streaming` through `Closing`,
/// until transport teardown completes.
#[allow(clippy::too_many_arguments)]
async fn run_session(
    mut conn: Box<dyn Connection>,
    mut events: mpsc::Receiver<TransportEvent>,
    handshake: String,
    capture: CaptureLoop,
    mut out_rx: mpsc::Receiver<String>,
    mut shutdown_rx: oneshot::Receiver<()>,
    state: Arc<AtomicU8>,
    capturing: Arc<AtomicBool>,
    handler: Arc<dyn SessionHandler>,
    messages_received: Arc<AtomicUsize>,
) {
    // The handshake goes out before the capture loop is spawned, so no
    // audio payload can ever precede it on the wire.
    if let Err(e) = conn.send(handshake).await {
        error!("Handshake send failed: {}", e);
        handler.on_failure(&e);
        capturing.store(false, Ordering::SeqCst);
        state.store(SessionState::Closing as u8, Ordering::SeqCst);
        if let Err(e) = conn.close(1000, "handshake failed").await {
            debug!("Transport close failed: {}", e);
        }
        state.store(SessionState::Closed as u8, Ordering::SeqCst);
        return;
    }

    debug!("Handshake sent");

    let capture_handle = tokio::task::spawn_blocking(move || capture.run());

    let mut closing = false;
    let mut outbound_done = false;

    loop {
        tokio::select! {
            maybe_payload = out_rx.recv(), if !outbound_done => {
                match maybe_payload {
                    Some(payload) => {
                        if let Err(e) = conn.send(payload).await {
                            // The failing chunk is lost; same teardown as stop.
                            error!("Audio send failed, closing session: {}", e);
                            handler.on_failure(&e);
                            break;
                        }
                    }
                    None => {
                        // Capture loop exited and the queue is drained.
                        outbound_done = true;
                        if closing {
                            break;
                        }
                    }
                }
            }

            event = events.recv() => {
                match event {
                    Some(TransportEvent::Message(text)) => match decode_inbound(&text) {
                        Ok(msg) => {
                            messages_received.fetch_add(1, Ordering::SeqCst);
                            handler.on_message(&msg.text);
                        }
                        Err(e) => {
                            warn!("Malformed inbound message: {}", e);
                            handler.on_failure(&e);
                        }
                    },
                    Some(TransportEvent::Closed { code, reason }) => {
                        info!("Remote closed the connection ({}): {}", code, reason);
                        break;
                    }
                    Some(TransportEvent::Failure(err)) => {
                        let e = StreamError::Send(err);
                        error!("Transport failure: {}", e);
                        handler.on_failure(&e);
                        break;
                    }
                    None => {
                        info!("Transport stream ended");
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx, if !closing => {
                info!("Stop requested, closing session");
                closing = true;
                state.store(SessionState::Closing as u8, Ordering::SeqCst);
                capturing.store(false, Ordering::SeqCst);
                if outbound_done {
                    break;
                }
            }
        }
    }

    // Cleanup: stop capture, wait for its exit, then close the transport.
    state.store(SessionState::Closing as u8, Ordering::SeqCst);
    capturing.store(false, Ordering::SeqCst);
    out_rx.close();

    if let Err(e) = capture_handle.await {
        error!("Capture task panicked: {}", e);
    }

    if let Err(e) = conn.close(1000, "session closed").await {
        debug!("Transport close failed: {}", e);
    }

    state.store(SessionState::Closed as u8, Ordering::SeqCst);
    info!("Session closed");
}
