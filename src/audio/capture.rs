use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::device::{CaptureDevice, CaptureFormat};
use super::frame::encode_wav;
use crate::ws::AudioPayload;

/// Background capture loop: pulls raw samples from the device, accumulates
/// them into fixed time windows, and emits one encoded audio-payload message
/// per full window.
///
/// Runs on a blocking context (`tokio::task::spawn_blocking`); the device
/// `read` may block for up to one read-chunk, which bounds stop latency.
pub struct CaptureLoop {
    device: Box<dyn CaptureDevice>,
    format: CaptureFormat,
    uid: String,
    out: mpsc::Sender<String>,
    running: Arc<AtomicBool>,
    chunks_sent: Arc<AtomicUsize>,
}

impl CaptureLoop {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        format: CaptureFormat,
        uid: String,
        out: mpsc::Sender<String>,
        running: Arc<AtomicBool>,
        chunks_sent: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            device,
            format,
            uid,
            out,
            running,
            chunks_sent,
        }
    }

    /// Run until the capture flag clears or the session is torn down.
    ///
    /// On device-initialization failure the loop exits without emitting
    /// anything; the session stays open from the transport's perspective.
    pub fn run(mut self) {
        if let Err(e) = self.device.start_capture() {
            warn!("Audio device failed to initialize, not capturing: {}", e);
            return;
        }

        info!(
            "Capture loop started ({}Hz, {}ch, {}s windows)",
            self.format.sample_rate, self.format.channels, self.format.window_secs
        );

        let mut window = vec![0u8; self.format.window_bytes()];
        let mut cursor = 0usize;
        let mut scratch = vec![0u8; self.device.read_chunk_bytes()];

        while self.running.load(Ordering::SeqCst) {
            let bytes_read = match self.device.read(&mut scratch) {
                Ok(n) => n,
                Err(e) => {
                    warn!("Device read failed, stopping capture: {}", e);
                    break;
                }
            };

            if bytes_read == 0 {
                continue;
            }

            // Copy only what fits in the current window; bytes past the
            // boundary within this read are dropped, not carried over.
            let space_left = window.len() - cursor;
            let take = space_left.min(bytes_read);
            window[cursor..cursor + take].copy_from_slice(&scratch[..take]);
            cursor += take;

            if cursor == window.len() {
                if !self.emit_window(&window) {
                    break;
                }
                cursor = 0;
            }
        }

        self.device.stop_capture();

        if cursor > 0 {
            // Partial trailing window is discarded, not flushed.
            debug!("Discarding {} trailing bytes at stop", cursor);
        }

        info!(
            "Capture loop stopped ({} chunks sent)",
            self.chunks_sent.load(Ordering::SeqCst)
        );
    }

    /// Frame, envelope and enqueue one full window. Returns false when the
    /// session has been torn down underneath the loop.
    fn emit_window(&self, window: &[u8]) -> bool {
        let framed = match encode_wav(
            window,
            self.format.sample_rate,
            self.format.channels,
            self.format.bits_per_sample,
        ) {
            Ok(framed) => framed,
            Err(e) => {
                warn!("Failed to frame audio window: {}", e);
                return false;
            }
        };

        let payload = match AudioPayload::new(&framed, &self.uid).encode() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode audio payload: {}", e);
                return false;
            }
        };

        if self.out.blocking_send(payload).is_err() {
            debug!("Outbound channel closed, stopping capture");
            return false;
        }

        self.chunks_sent.fetch_add(1, Ordering::SeqCst);
        true
    }
}
