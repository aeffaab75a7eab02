//! Push-to-talk recording session
//!
//! One session handles one gesture at a time: `begin` opens the capture
//! device, `end` waits out the minimum recording time in real time, reads
//! the captured samples and encodes them to WAV.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::device::{AudioError, CaptureDevice, ClipHandle};
use super::wav::{self, AudioSampleBuffer, WavPayload};
use crate::config::VoiceConfig;

/// Errors raised while recording a gesture
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("recording too short, no samples captured")]
    RecordingTooShort,

    #[error(transparent)]
    Device(#[from] AudioError),
}

/// Output of one completed gesture
#[derive(Debug, Clone)]
pub struct CompletedRecording {
    pub payload: WavPayload,
    /// Time between `begin` and the sample read
    pub duration: Duration,
    /// Interleaved samples encoded into the payload
    pub samples: usize,
}

#[derive(Debug)]
struct ActiveCapture {
    handle: ClipHandle,
    started_at: Instant,
}

/// Owns the capture device and the sample buffer of the current gesture
pub struct RecordingSession<D: CaptureDevice> {
    device: D,
    device_name: String,
    sample_rate: u32,
    clip_secs: u32,
    min_duration: Duration,
    buffer: AudioSampleBuffer,
    active: Option<ActiveCapture>,
}

impl<D: CaptureDevice> RecordingSession<D> {
    /// Create a session on `device`, choosing the configured device name or
    /// the first one the backend reports
    pub fn new(device: D, cfg: &VoiceConfig) -> Result<Self, AudioError> {
        let available = device.devices();
        let device_name = match &cfg.device {
            Some(name) if available.iter().any(|d| d == name) => name.clone(),
            Some(name) => return Err(AudioError::DeviceNotFound(name.clone())),
            None => available
                .into_iter()
                .next()
                .ok_or(AudioError::DeviceUnavailable)?,
        };

        info!(device = %device_name, "recording session ready");

        Ok(Self {
            device,
            device_name,
            sample_rate: cfg.sample_rate,
            clip_secs: cfg.clip_secs,
            min_duration: Duration::from_secs_f32(cfg.min_recording_secs.max(0.0)),
            buffer: AudioSampleBuffer::new(1, cfg.sample_rate),
            active: None,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Start capturing a new gesture
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyRecording);
        }

        self.buffer.clear();
        let handle = self
            .device
            .open(&self.device_name, true, self.clip_secs, self.sample_rate)?;
        self.active = Some(ActiveCapture {
            handle,
            started_at: Instant::now(),
        });

        info!(device = %self.device_name, "recording started");
        Ok(())
    }

    /// Finish the gesture and encode what was captured
    ///
    /// Waits in real time until at least the minimum recording time has
    /// passed since `begin`. The device is closed on every path.
    pub async fn end(&mut self) -> Result<CompletedRecording, SessionError> {
        let capture = self.active.take().ok_or(SessionError::NotRecording)?;

        let elapsed = capture.started_at.elapsed();
        if elapsed < self.min_duration {
            let remaining = self.min_duration - elapsed;
            debug!(remaining_ms = remaining.as_millis() as u64, "extending recording to minimum length");
            tokio::time::sleep(remaining).await;
        }

        let result = self.collect(capture.handle);
        self.device.close(capture.handle);
        let samples = result?;

        let duration = capture.started_at.elapsed();
        let payload = wav::encode(&self.buffer);
        info!(
            duration_ms = duration.as_millis() as u64,
            samples,
            bytes = payload.len(),
            "recording finished"
        );

        Ok(CompletedRecording {
            payload,
            duration,
            samples,
        })
    }

    /// Read the captured frames into the buffer
    fn collect(&mut self, handle: ClipHandle) -> Result<usize, SessionError> {
        let frames = self.device.position(handle)?;
        if frames == 0 {
            warn!("recording too short, no samples captured");
            return Err(SessionError::RecordingTooShort);
        }

        let channels = self.device.channels(handle)?;
        let samples = self
            .device
            .read_samples(handle, frames * usize::from(channels))?;

        self.buffer = AudioSampleBuffer::new(channels, self.sample_rate);
        self.buffer.extend_from_slice(&samples);
        if self.buffer.is_empty() {
            warn!(frames, "device reported frames but returned no samples");
            return Err(SessionError::RecordingTooShort);
        }
        Ok(samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::{SimulatedMicrophone, SIMULATED_DEVICE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    /// Device that reports a fixed position and counts open/close calls
    struct ScriptedDevice {
        frames: usize,
        opens: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl CaptureDevice for ScriptedDevice {
        fn devices(&self) -> Vec<String> {
            vec!["scripted".to_string()]
        }

        fn open(&mut self, _: &str, _: bool, _: u32, _: u32) -> Result<ClipHandle, AudioError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(ClipHandle(7))
        }

        fn position(&self, _: ClipHandle) -> Result<usize, AudioError> {
            Ok(self.frames)
        }

        fn channels(&self, _: ClipHandle) -> Result<u16, AudioError> {
            Ok(2)
        }

        fn read_samples(&self, _: ClipHandle, count: usize) -> Result<Vec<f32>, AudioError> {
            Ok(vec![0.5; count])
        }

        fn close(&mut self, _: ClipHandle) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Backend with no devices at all
    struct NoDevices;

    impl CaptureDevice for NoDevices {
        fn devices(&self) -> Vec<String> {
            Vec::new()
        }

        fn open(&mut self, _: &str, _: bool, _: u32, _: u32) -> Result<ClipHandle, AudioError> {
            Err(AudioError::DeviceUnavailable)
        }

        fn position(&self, handle: ClipHandle) -> Result<usize, AudioError> {
            Err(AudioError::InvalidHandle(handle))
        }

        fn channels(&self, handle: ClipHandle) -> Result<u16, AudioError> {
            Err(AudioError::InvalidHandle(handle))
        }

        fn read_samples(&self, handle: ClipHandle, _: usize) -> Result<Vec<f32>, AudioError> {
            Err(AudioError::InvalidHandle(handle))
        }

        fn close(&mut self, _: ClipHandle) {}
    }

    fn scripted(frames: usize) -> (ScriptedDevice, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let opens = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let device = ScriptedDevice {
            frames,
            opens: Arc::clone(&opens),
            closes: Arc::clone(&closes),
        };
        (device, opens, closes)
    }

    #[test]
    fn test_no_device_is_unavailable() {
        let result = RecordingSession::new(NoDevices, &VoiceConfig::default());
        assert!(matches!(result, Err(AudioError::DeviceUnavailable)));
    }

    #[test]
    fn test_configured_device_must_exist() {
        let cfg = VoiceConfig {
            device: Some("usb-headset".to_string()),
            ..VoiceConfig::default()
        };
        let result = RecordingSession::new(SimulatedMicrophone::new(), &cfg);
        assert!(matches!(result, Err(AudioError::DeviceNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_press_is_extended_to_minimum() {
        let mut session =
            RecordingSession::new(SimulatedMicrophone::new(), &VoiceConfig::default()).unwrap();
        assert_eq!(session.device_name(), SIMULATED_DEVICE);

        let started = Instant::now();
        assert_ok!(session.begin());
        tokio::time::advance(Duration::from_millis(200)).await;

        let recording = session.end().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(recording.duration >= Duration::from_secs(1));
        // 1 s of mono audio at 16 kHz
        assert_eq!(recording.samples, 16_000);
        assert_eq!(recording.payload.len(), wav::HEADER_LEN + 32_000);
        assert!(session.active.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_short_press_reaches_minimum() {
        let mut session =
            RecordingSession::new(SimulatedMicrophone::new(), &VoiceConfig::default()).unwrap();

        for press_ms in [0, 1, 200, 500, 999] {
            let started = Instant::now();
            assert_ok!(session.begin());
            tokio::time::advance(Duration::from_millis(press_ms)).await;

            let recording = session.end().await.unwrap();
            assert!(started.elapsed() >= Duration::from_secs(1), "press of {} ms", press_ms);
            assert!(recording.duration >= Duration::from_secs(1), "press of {} ms", press_ms);
            assert_eq!(recording.samples, 16_000, "press of {} ms", press_ms);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_is_not_delayed() {
        let mut session =
            RecordingSession::new(SimulatedMicrophone::new(), &VoiceConfig::default()).unwrap();
        assert_ok!(session.begin());
        tokio::time::advance(Duration::from_millis(1_500)).await;

        let before_end = Instant::now();
        let recording = session.end().await.unwrap();
        assert_eq!(before_end.elapsed(), Duration::ZERO);
        assert_eq!(recording.samples, 24_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_twice_is_rejected() {
        let (device, opens, _) = scripted(10);
        let mut session = RecordingSession::new(device, &VoiceConfig::default()).unwrap();
        assert_ok!(session.begin());
        assert!(matches!(session.begin(), Err(SessionError::AlreadyRecording)));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_end_without_begin() {
        let (device, _, _) = scripted(10);
        let mut session = RecordingSession::new(device, &VoiceConfig::default()).unwrap();
        assert!(matches!(session.end().await, Err(SessionError::NotRecording)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_samples_aborts_and_releases_device() {
        let (device, opens, closes) = scripted(0);
        let mut session = RecordingSession::new(device, &VoiceConfig::default()).unwrap();
        assert_ok!(session.begin());

        let result = session.end().await;
        assert!(matches!(result, Err(SessionError::RecordingTooShort)));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        // Session is reusable after an aborted gesture
        assert_ok!(session.begin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_frames_times_channels() {
        let (device, opens, closes) = scripted(100);
        let mut session = RecordingSession::new(device, &VoiceConfig::default()).unwrap();
        assert_ok!(session.begin());

        let recording = session.end().await.unwrap();
        assert_eq!(recording.samples, 200);
        assert_eq!(recording.payload.data_size(), 400);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_err!(session.end().await);
    }
}
