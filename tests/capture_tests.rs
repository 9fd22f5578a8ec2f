// Capture-loop tests against a scripted device.
//
// These pin the window accumulation rules: fixed-size windows emitted in
// read order, no carry-over of bytes past a window boundary, and discard of
// a partial trailing window at stop.

use base64::Engine;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use voxstream::audio::WAV_HEADER_LEN;
use voxstream::{CaptureDevice, CaptureFormat, CaptureLoop, StreamError};

/// Device that yields a fixed script of reads, then reads 0 bytes forever.
struct ScriptedDevice {
    reads: VecDeque<Vec<u8>>,
    chunk: usize,
    fail_init: bool,
}

impl ScriptedDevice {
    fn new(reads: Vec<Vec<u8>>, chunk: usize) -> Self {
        Self {
            reads: reads.into(),
            chunk,
            fail_init: false,
        }
    }

    fn failing(chunk: usize) -> Self {
        Self {
            reads: VecDeque::new(),
            chunk,
            fail_init: true,
        }
    }
}

impl CaptureDevice for ScriptedDevice {
    fn start_capture(&mut self) -> Result<(), StreamError> {
        if self.fail_init {
            Err(StreamError::DeviceInit("scripted failure".into()))
        } else {
            Ok(())
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        match self.reads.pop_front() {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            None => {
                thread::sleep(Duration::from_millis(5));
                Ok(0)
            }
        }
    }

    fn stop_capture(&mut self) {}

    fn read_chunk_bytes(&self) -> usize {
        self.chunk
    }
}

fn spawn_loop(
    device: ScriptedDevice,
    format: CaptureFormat,
) -> (
    mpsc::Receiver<String>,
    Arc<AtomicBool>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, rx) = mpsc::channel(32);
    let running = Arc::new(AtomicBool::new(true));
    let chunks = Arc::new(AtomicUsize::new(0));

    let capture = CaptureLoop::new(
        Box::new(device),
        format,
        "test-uid".to_string(),
        tx,
        running.clone(),
        chunks,
    );
    let handle = tokio::task::spawn_blocking(move || capture.run());

    (rx, running, handle)
}

/// Unwrap one payload message down to the raw window bytes.
fn window_bytes(payload: &str) -> Vec<u8> {
    let value: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(value["uid"], "test-uid");

    let framed = base64::engine::general_purpose::STANDARD
        .decode(value["audio"].as_str().unwrap())
        .unwrap();
    framed[WAV_HEADER_LEN..].to_vec()
}

#[tokio::test]
async fn windows_are_emitted_in_read_order_without_overlap() {
    // 3200-byte reads divide the 32000-byte window evenly: two windows of
    // ten reads each.
    let reads: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; 3200]).collect();
    let format = CaptureFormat::default();
    assert_eq!(format.window_bytes(), 32000);

    let (mut rx, running, handle) = spawn_loop(ScriptedDevice::new(reads, 3200), format);

    let first = window_bytes(&rx.recv().await.unwrap());
    let second = window_bytes(&rx.recv().await.unwrap());

    running.store(false, Ordering::SeqCst);
    handle.await.unwrap();

    assert_eq!(first.len(), 32000);
    assert_eq!(second.len(), 32000);
    for i in 0..10usize {
        assert!(first[i * 3200..(i + 1) * 3200].iter().all(|&b| b == i as u8));
        assert!(second[i * 3200..(i + 1) * 3200]
            .iter()
            .all(|&b| b == (i + 10) as u8));
    }
}

#[tokio::test]
async fn bytes_past_the_window_boundary_are_discarded() {
    // 3000-byte reads do not divide 32000: each window takes ten full reads
    // plus 2000 bytes of an eleventh, whose final 1000 bytes are dropped.
    let reads: Vec<Vec<u8>> = (0..22u8).map(|i| vec![i; 3000]).collect();

    let (mut rx, running, handle) =
        spawn_loop(ScriptedDevice::new(reads, 3000), CaptureFormat::default());

    let first = window_bytes(&rx.recv().await.unwrap());
    let second = window_bytes(&rx.recv().await.unwrap());

    running.store(false, Ordering::SeqCst);
    handle.await.unwrap();

    // First window: reads 0-9 whole, then the first 2000 bytes of read 10.
    for i in 0..10usize {
        assert!(first[i * 3000..(i + 1) * 3000].iter().all(|&b| b == i as u8));
    }
    assert!(first[30000..].iter().all(|&b| b == 10));

    // Read 10's trailing 1000 bytes never carry over: the second window
    // starts with read 11.
    assert!(second[..3000].iter().all(|&b| b == 11));
    assert!(second[30000..].iter().all(|&b| b == 21));
}

#[tokio::test]
async fn zero_read_device_emits_nothing_and_stops_promptly() {
    let (mut rx, running, handle) =
        spawn_loop(ScriptedDevice::new(vec![], 3200), CaptureFormat::default());

    tokio::time::sleep(Duration::from_millis(100)).await;
    running.store(false, Ordering::SeqCst);

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("capture loop should stop within one read interval")
        .unwrap();

    assert!(rx.try_recv().is_err(), "no payload should have been emitted");
}

#[tokio::test]
async fn partial_trailing_window_is_discarded_at_stop() {
    // 15 reads of 3200 bytes: one full window plus half of the next.
    let reads: Vec<Vec<u8>> = (0..15u8).map(|i| vec![i; 3200]).collect();

    let (mut rx, running, handle) =
        spawn_loop(ScriptedDevice::new(reads, 3200), CaptureFormat::default());

    let first = rx.recv().await.unwrap();
    assert_eq!(window_bytes(&first).len(), 32000);

    running.store(false, Ordering::SeqCst);
    handle.await.unwrap();

    assert!(
        rx.try_recv().is_err(),
        "the half-filled trailing window must not be flushed"
    );
}

#[tokio::test]
async fn device_init_failure_emits_nothing_and_does_not_panic() {
    let (mut rx, _running, handle) =
        spawn_loop(ScriptedDevice::failing(3200), CaptureFormat::default());

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop should exit immediately on init failure")
        .unwrap();

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn wav_file_device_replays_fixture_audio() {
    use hound::{SampleFormat, WavSpec, WavWriter};
    use voxstream::WavFileDevice;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.wav");

    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..16000i32 {
        writer.write_sample((i % 1000) as i16).unwrap();
    }
    writer.finalize().unwrap();

    let format = CaptureFormat::default();
    let device = WavFileDevice::new(&path, format);

    let (tx, mut rx) = mpsc::channel(32);
    let running = Arc::new(AtomicBool::new(true));
    let capture = CaptureLoop::new(
        Box::new(device),
        format,
        "test-uid".to_string(),
        tx,
        running.clone(),
        Arc::new(AtomicUsize::new(0)),
    );
    let handle = tokio::task::spawn_blocking(move || capture.run());

    let window = window_bytes(&rx.recv().await.unwrap());
    running.store(false, Ordering::SeqCst);
    handle.await.unwrap();

    let samples: Vec<i16> = window
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(samples.len(), 16000);
    assert_eq!(samples[0], 0);
    assert_eq!(samples[999], 999);
    assert_eq!(samples[1000], 0);
}
