//! In-memory RIFF/WAVE encoding
//!
//! Serializes captured float samples to 16-bit PCM with the canonical
//! 44-byte header, all fields little-endian.

/// Size of the RIFF/WAVE header preceding PCM data
pub const HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// Captured samples with their stream layout
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSampleBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioSampleBuffer {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            channels,
            sample_rate,
        }
    }

    /// Interleaved samples, nominally in [-1.0, 1.0]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn extend_from_slice(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// A complete WAV file image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavPayload(Vec<u8>);

impl WavPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// RIFF chunk size field (bytes 4..8)
    pub fn riff_size(&self) -> u32 {
        read_u32_le(&self.0, 4)
    }

    /// Data chunk size field (bytes 40..44)
    pub fn data_size(&self) -> u32 {
        read_u32_le(&self.0, 40)
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    let mut field = [0u8; 4];
    field.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(field)
}

/// Convert one float sample to 16-bit PCM
///
/// `round(s * 32767)`; inputs outside [-1, 1] are not clamped first and
/// saturate at the `i16` limits in the float-to-int conversion.
pub fn quantize(sample: f32) -> i16 {
    (sample * f32::from(i16::MAX)).round() as i16
}

/// Encode a sample buffer as a 16-bit PCM WAV image
pub fn encode(buffer: &AudioSampleBuffer) -> WavPayload {
    let channels = buffer.channels();
    let sample_rate = buffer.sample_rate();
    let block_align = channels * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = buffer.len() * usize::from(BITS_PER_SAMPLE / 8);

    let mut buf = Vec::with_capacity(HEADER_LEN + data_len);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&((HEADER_LEN - 8 + data_len) as u32).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    buf.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &sample in buffer.samples() {
        buf.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    let payload = WavPayload(buf);
    assert_eq!(payload.riff_size() as usize, payload.len() - 8, "RIFF size field");
    assert_eq!(payload.data_size() as usize, payload.len() - HEADER_LEN, "data size field");
    payload
}
