//! Capture device abstraction and the simulated microphone
//!
//! The device contract follows a looping clip model: `open` starts writing
//! into a fixed-length clip, `position` reports the write head in frames,
//! `read_samples` copies interleaved samples from the start of the clip.

use std::path::Path;

use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Name reported by the simulated microphone
pub const SIMULATED_DEVICE: &str = "simulated-microphone";

/// Errors raised by capture devices
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no capture device available")]
    DeviceUnavailable,

    #[error("capture device not found: {0}")]
    DeviceNotFound(String),

    #[error("capture device is already open")]
    DeviceBusy,

    #[error("capture handle {0:?} is not open")]
    InvalidHandle(ClipHandle),

    #[error("failed to load source audio: {0}")]
    Source(#[from] hound::Error),
}

/// Handle to an open capture clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipHandle(pub u64);

/// A microphone-like capture device
pub trait CaptureDevice: Send {
    /// Names of the devices this backend can open
    fn devices(&self) -> Vec<String>;

    /// Start capturing into a clip of `max_secs` seconds
    fn open(
        &mut self,
        device: &str,
        looping: bool,
        max_secs: u32,
        sample_rate: u32,
    ) -> Result<ClipHandle, AudioError>;

    /// Current write position in frames
    fn position(&self, handle: ClipHandle) -> Result<usize, AudioError>;

    /// Channel count of the open clip
    fn channels(&self, handle: ClipHandle) -> Result<u16, AudioError>;

    /// Copy `count` interleaved samples from the start of the clip
    fn read_samples(&self, handle: ClipHandle, count: usize) -> Result<Vec<f32>, AudioError>;

    /// Stop capturing and release the device
    fn close(&mut self, handle: ClipHandle);
}

/// Signal the simulated microphone "hears"
#[derive(Debug, Clone)]
enum Source {
    Tone { frequency: f32, amplitude: f32 },
    Clip { samples: Vec<f32>, channels: u16 },
}

#[derive(Debug)]
struct OpenClip {
    handle: ClipHandle,
    started_at: Instant,
    looping: bool,
    clip_frames: usize,
    sample_rate: u32,
}

/// Wall-clock driven capture device
///
/// Frames accumulate at the requested sample rate from the moment the clip
/// is opened. Looping clips wrap their write position at the clip length.
#[derive(Debug)]
pub struct SimulatedMicrophone {
    source: Source,
    open: Option<OpenClip>,
    next_handle: u64,
}

impl SimulatedMicrophone {
    /// Microphone hearing a quiet 220 Hz tone
    pub fn new() -> Self {
        Self::with_source(Source::Tone {
            frequency: 220.0,
            amplitude: 0.1,
        })
    }

    /// Microphone replaying the samples of a WAV file
    pub fn from_wav(path: &Path) -> Result<Self, AudioError> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        info!(
            path = %path.display(),
            channels = spec.channels,
            sample_rate = spec.sample_rate,
            samples = samples.len(),
            "loaded microphone source"
        );

        Ok(Self::with_source(Source::Clip {
            samples,
            channels: spec.channels,
        }))
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            open: None,
            next_handle: 1,
        }
    }

    fn clip(&self, handle: ClipHandle) -> Result<&OpenClip, AudioError> {
        self.open
            .as_ref()
            .filter(|clip| clip.handle == handle)
            .ok_or(AudioError::InvalidHandle(handle))
    }

    fn source_channels(&self) -> u16 {
        match &self.source {
            Source::Tone { .. } => 1,
            Source::Clip { channels, .. } => *channels,
        }
    }

    fn sample_at(&self, index: usize, sample_rate: u32) -> f32 {
        match &self.source {
            Source::Tone {
                frequency,
                amplitude,
            } => {
                let t = index as f32 / sample_rate as f32;
                (t * frequency * std::f32::consts::TAU).sin() * amplitude
            }
            Source::Clip { samples, .. } if samples.is_empty() => 0.0,
            Source::Clip { samples, .. } => samples[index % samples.len()],
        }
    }
}

impl Default for SimulatedMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for SimulatedMicrophone {
    fn devices(&self) -> Vec<String> {
        vec![SIMULATED_DEVICE.to_string()]
    }

    fn open(
        &mut self,
        device: &str,
        looping: bool,
        max_secs: u32,
        sample_rate: u32,
    ) -> Result<ClipHandle, AudioError> {
        if device != SIMULATED_DEVICE {
            return Err(AudioError::DeviceNotFound(device.to_string()));
        }
        if self.open.is_some() {
            return Err(AudioError::DeviceBusy);
        }

        let handle = ClipHandle(self.next_handle);
        self.next_handle += 1;
        self.open = Some(OpenClip {
            handle,
            started_at: Instant::now(),
            looping,
            clip_frames: max_secs as usize * sample_rate as usize,
            sample_rate,
        });

        debug!(?handle, looping, max_secs, sample_rate, "capture clip opened");
        Ok(handle)
    }

    fn position(&self, handle: ClipHandle) -> Result<usize, AudioError> {
        let clip = self.clip(handle)?;
        if clip.clip_frames == 0 {
            return Ok(0);
        }

        let elapsed = clip.started_at.elapsed().as_secs_f64();
        let written = (elapsed * f64::from(clip.sample_rate)) as usize;
        let position = if clip.looping {
            written % clip.clip_frames
        } else {
            written.min(clip.clip_frames)
        };
        Ok(position)
    }

    fn channels(&self, handle: ClipHandle) -> Result<u16, AudioError> {
        self.clip(handle)?;
        Ok(self.source_channels())
    }

    fn read_samples(&self, handle: ClipHandle, count: usize) -> Result<Vec<f32>, AudioError> {
        let clip = self.clip(handle)?;
        let limit = clip.clip_frames * usize::from(self.source_channels());
        if count > limit {
            warn!(count, limit, "read past end of capture clip, truncating");
        }
        Ok((0..count.min(limit))
            .map(|i| self.sample_at(i, clip.sample_rate))
            .collect())
    }

    fn close(&mut self, handle: ClipHandle) {
        match &self.open {
            Some(clip) if clip.handle == handle => {
                self.open = None;
                debug!(?handle, "capture clip closed");
            }
            _ => warn!(?handle, "close for a clip that is not open"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_position_follows_real_time() {
        let mut mic = SimulatedMicrophone::new();
        let handle = mic.open(SIMULATED_DEVICE, true, 5, 16_000).unwrap();
        assert_eq!(mic.position(handle).unwrap(), 0);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(mic.position(handle).unwrap(), 8_000);
        mic.close(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_looping_clip_wraps() {
        let mut mic = SimulatedMicrophone::new();
        let handle = mic.open(SIMULATED_DEVICE, true, 1, 1_000).unwrap();
        tokio::time::advance(Duration::from_millis(1_250)).await;
        assert_eq!(mic.position(handle).unwrap(), 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_looping_clip_saturates() {
        let mut mic = SimulatedMicrophone::new();
        let handle = mic.open(SIMULATED_DEVICE, false, 1, 1_000).unwrap();
        tokio::time::advance(Duration::from_millis(1_250)).await;
        assert_eq!(mic.position(handle).unwrap(), 1_000);
    }

    #[test]
    fn test_single_open_clip() {
        let mut mic = SimulatedMicrophone::new();
        let handle = mic.open(SIMULATED_DEVICE, true, 5, 16_000).unwrap();
        assert!(matches!(
            mic.open(SIMULATED_DEVICE, true, 5, 16_000),
            Err(AudioError::DeviceBusy)
        ));

        mic.close(handle);
        assert!(matches!(mic.position(handle), Err(AudioError::InvalidHandle(_))));
        assert!(mic.open(SIMULATED_DEVICE, true, 5, 16_000).is_ok());
    }

    #[test]
    fn test_unknown_device() {
        let mut mic = SimulatedMicrophone::new();
        assert!(matches!(
            mic.open("usb-headset", true, 5, 16_000),
            Err(AudioError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_tone_samples_in_range() {
        let mut mic = SimulatedMicrophone::new();
        let handle = mic.open(SIMULATED_DEVICE, true, 1, 16_000).unwrap();
        let samples = mic.read_samples(handle, 1_600).unwrap();
        assert_eq!(samples.len(), 1_600);
        assert!(samples.iter().all(|s| s.abs() <= 0.1 + f32::EPSILON));
        assert!(samples.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_from_wav_source() {
        let path = std::env::temp_dir().join(format!("voxnav-mic-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for v in [0i16, 16_384, -16_384] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let mut mic = SimulatedMicrophone::from_wav(&path).unwrap();
        let handle = mic.open(SIMULATED_DEVICE, true, 1, 8_000).unwrap();
        let samples = mic.read_samples(handle, 4).unwrap();
        assert_eq!(samples, vec![0.0, 0.5, -0.5, 0.0]);

        std::fs::remove_file(&path).ok();
    }
}
