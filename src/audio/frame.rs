use crate::error::{Result, StreamError};

/// Size of the RIFF/WAVE container header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// The 44-byte canonical WAV header, one field per container slot.
///
/// All multi-byte numeric fields are little-endian on the wire. The struct
/// exists so the layout is spelled out with named fields instead of
/// index-by-index byte assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WavHeader {
    /// "RIFF" chunk size: payload length + 36
    riff_size: u32,
    /// Audio format code, 1 = uncompressed PCM
    format: u16,
    channels: u16,
    sample_rate: u32,
    /// sample_rate * channels * bits_per_sample / 8
    byte_rate: u32,
    /// channels * bits_per_sample / 8
    block_align: u16,
    bits_per_sample: u16,
    /// "data" chunk size: payload length
    data_size: u32,
}

impl WavHeader {
    fn new(payload_len: u32, sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            riff_size: payload_len + 36,
            format: 1,
            channels,
            sample_rate,
            byte_rate: sample_rate * channels as u32 * bits_per_sample as u32 / 8,
            block_align: channels * bits_per_sample / 8,
            bits_per_sample,
            data_size: payload_len,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&self.riff_size.to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size for PCM
        out.extend_from_slice(&self.format.to_le_bytes());
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&self.byte_rate.to_le_bytes());
        out.extend_from_slice(&self.block_align.to_le_bytes());
        out.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&self.data_size.to_le_bytes());
    }
}

/// Wrap raw PCM bytes in a WAV container.
///
/// Pure function: the output is always `raw.len() + 44` bytes, the header
/// fields describing exactly the supplied format and payload length.
///
/// Fails with `InvalidArgument` on an empty payload or non-positive format
/// parameters; there are no other error conditions.
pub fn encode_wav(
    raw: &[u8],
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> Result<Vec<u8>> {
    if raw.is_empty() {
        return Err(StreamError::InvalidArgument(
            "audio payload must not be empty".into(),
        ));
    }
    if sample_rate == 0 || channels == 0 || bits_per_sample == 0 {
        return Err(StreamError::InvalidArgument(format!(
            "sample_rate, channels and bits_per_sample must be positive (got {}, {}, {})",
            sample_rate, channels, bits_per_sample
        )));
    }

    let header = WavHeader::new(raw.len() as u32, sample_rate, channels, bits_per_sample);

    let mut framed = Vec::with_capacity(WAV_HEADER_LEN + raw.len());
    header.write_to(&mut framed);
    framed.extend_from_slice(raw);

    Ok(framed)
}
