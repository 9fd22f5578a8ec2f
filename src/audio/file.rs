use hound::WavReader;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::info;

use super::device::{CaptureDevice, CaptureFormat};
use crate::error::{Result, StreamError};

/// Replays a WAV file as if it were a microphone.
///
/// Useful for running the client without audio hardware and for
/// deterministic tests. Reads are paced at the chunk's real-time duration;
/// once the file is exhausted the device reads 0 bytes, like a silent mic.
pub struct WavFileDevice {
    path: String,
    format: CaptureFormat,
    data: Vec<u8>,
    position: usize,
    capturing: bool,
}

impl WavFileDevice {
    pub fn new(path: impl AsRef<Path>, format: CaptureFormat) -> Self {
        Self {
            path: path.as_ref().display().to_string(),
            format,
            data: Vec::new(),
            position: 0,
            capturing: false,
        }
    }

    fn chunk_duration(&self) -> Duration {
        let bytes_per_sec = self.format.sample_rate as usize
            * self.format.channels as usize
            * (self.format.bits_per_sample / 8) as usize;
        Duration::from_secs_f64(self.read_chunk_bytes() as f64 / bytes_per_sec as f64)
    }
}

impl CaptureDevice for WavFileDevice {
    fn start_capture(&mut self) -> Result<()> {
        let reader = WavReader::open(&self.path)
            .map_err(|e| StreamError::DeviceInit(format!("{}: {}", self.path, e)))?;

        let spec = reader.spec();
        if spec.sample_rate != self.format.sample_rate
            || spec.channels != self.format.channels
            || spec.bits_per_sample != self.format.bits_per_sample
        {
            return Err(StreamError::DeviceInit(format!(
                "{}: expected {}Hz/{}ch/{}bit, got {}Hz/{}ch/{}bit",
                self.path,
                self.format.sample_rate,
                self.format.channels,
                self.format.bits_per_sample,
                spec.sample_rate,
                spec.channels,
                spec.bits_per_sample
            )));
        }

        let samples = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StreamError::DeviceInit(format!("{}: {}", self.path, e)))?;

        self.data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.position = 0;
        self.capturing = true;

        info!(
            "Replaying {} ({:.1}s of audio)",
            self.path,
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64)
        );

        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.capturing {
            return Ok(0);
        }

        thread::sleep(self.chunk_duration());

        if self.position >= self.data.len() {
            return Ok(0);
        }

        let n = buf.len().min(self.data.len() - self.position);
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn stop_capture(&mut self) {
        self.capturing = false;
        self.data.clear();
        self.position = 0;
    }

    fn read_chunk_bytes(&self) -> usize {
        // 100ms of audio per read, matching the microphone device
        (self.format.sample_rate / 10) as usize
            * self.format.channels as usize
            * (self.format.bits_per_sample / 8) as usize
    }
}
