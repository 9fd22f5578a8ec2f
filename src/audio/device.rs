use crate::error::Result;

/// Fixed capture format for a streaming run.
#[derive(Debug, Clone, Copy)]
pub struct CaptureFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Accumulation window length in seconds
    pub window_secs: u32,
}

impl CaptureFormat {
    /// Size of one full accumulation window in bytes.
    pub fn window_bytes(&self) -> usize {
        (self.window_secs * self.sample_rate) as usize
            * self.channels as usize
            * (self.bits_per_sample / 8) as usize
    }
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // what the endpoint expects
            channels: 1,        // Mono
            bits_per_sample: 16,
            window_secs: 1,
        }
    }
}

/// Audio capture device seam.
///
/// Implementations deliver raw PCM bytes on demand: `read` may block for up
/// to one device read-chunk, so callers run the loop on a dedicated blocking
/// context. Releasing the device is folded into `stop_capture` and `Drop`.
pub trait CaptureDevice: Send {
    /// Initialize the device and begin capturing.
    ///
    /// Fails with `DeviceInit` if the device cannot be opened.
    fn start_capture(&mut self) -> Result<()>;

    /// Read captured bytes into `buf`, returning how many were written.
    ///
    /// A return of 0 means no data was available within the device's read
    /// interval; it is not an error and not end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Stop capturing and release the device. Idempotent.
    fn stop_capture(&mut self);

    /// The device's preferred read-chunk size in bytes. The capture loop
    /// sizes its scratch buffer from this.
    fn read_chunk_bytes(&self) -> usize;
}
