use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use super::device::{CaptureDevice, CaptureFormat};
use crate::error::{Result, StreamError};

/// Capacity of the callback-to-reader channel, in read-chunks.
const CHANNEL_CAPACITY: usize = 64;

/// How long a `read` waits for data before returning 0 bytes. Bounds stop
/// latency when the device goes quiet.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Microphone capture via cpal.
///
/// The cpal stream is owned by a dedicated thread (streams are not portable
/// across threads on every backend); its callback pushes little-endian PCM
/// byte chunks into a bounded channel that `read` drains. Chunks are dropped
/// on overflow rather than blocking the audio callback.
pub struct MicrophoneDevice {
    format: CaptureFormat,
    running: Arc<AtomicBool>,
    rx: Option<Receiver<Vec<u8>>>,
    thread: Option<JoinHandle<()>>,
    pending: Vec<u8>,
}

impl MicrophoneDevice {
    pub fn new(format: CaptureFormat) -> Self {
        Self {
            format,
            running: Arc::new(AtomicBool::new(false)),
            rx: None,
            thread: None,
            pending: Vec::new(),
        }
    }
}

impl CaptureDevice for MicrophoneDevice {
    fn start_capture(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (tx, rx) = bounded::<Vec<u8>>(CHANNEL_CAPACITY);
        let (init_tx, init_rx) = bounded::<Result<()>>(1);

        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);
        let running_for_loop = self.running.clone();

        let stream_config = StreamConfig {
            channels: self.format.channels,
            sample_rate: SampleRate(self.format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let device = match host.default_input_device() {
                    Some(device) => device,
                    None => {
                        let _ = init_tx
                            .send(Err(StreamError::DeviceInit("no input device".into())));
                        return;
                    }
                };

                if let Ok(name) = device.name() {
                    info!("Using input device: {}", name);
                }

                // Prefer native i16; fall back to f32 for devices that only
                // expose float formats.
                let tx_i16 = tx.clone();
                let stream = device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[i16], _: &cpal::InputCallbackInfo| {
                            let bytes: Vec<u8> =
                                data.iter().flat_map(|s| s.to_le_bytes()).collect();
                            let _ = tx_i16.try_send(bytes);
                        },
                        |err| warn!("Input stream error: {}", err),
                        None,
                    )
                    .or_else(|_| {
                        device.build_input_stream(
                            &stream_config,
                            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                                let bytes: Vec<u8> = data
                                    .iter()
                                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                                    .flat_map(|s| s.to_le_bytes())
                                    .collect();
                                let _ = tx.try_send(bytes);
                            },
                            |err| warn!("Input stream error: {}", err),
                            None,
                        )
                    });

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = init_tx.send(Err(StreamError::DeviceInit(format!(
                            "failed to build input stream: {}",
                            e
                        ))));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = init_tx.send(Err(StreamError::DeviceInit(format!(
                        "failed to start input stream: {}",
                        e
                    ))));
                    return;
                }

                let _ = init_tx.send(Ok(()));

                // Keep the thread (and with it the stream) alive while running.
                while running_for_loop.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }
            })
            .map_err(|e| StreamError::DeviceInit(e.to_string()))?;

        self.thread = Some(handle);

        match init_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                self.rx = Some(rx);
                info!("Microphone capture started");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(StreamError::DeviceInit(
                    "timed out waiting for input stream".into(),
                ))
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pending.is_empty() {
            let rx = match &self.rx {
                Some(rx) => rx,
                None => return Ok(0),
            };
            match rx.recv_timeout(READ_TIMEOUT) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Ok(0);
                }
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn stop_capture(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.rx = None;
        self.pending.clear();
    }

    fn read_chunk_bytes(&self) -> usize {
        // 100ms of audio per read
        (self.format.sample_rate / 10) as usize
            * self.format.channels as usize
            * (self.format.bits_per_sample / 8) as usize
    }
}

impl Drop for MicrophoneDevice {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
