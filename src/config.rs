//! Configuration loading and management
//!
//! Defaults match the tuning of the avatar controller; every value can be
//! overridden through a `VOXNAV_*` environment variable.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for status IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Simulation ticks per second
    pub tick_hz: u32,

    pub voice: VoiceConfig,

    pub locomotion: LocomotionConfig,
}

/// Voice capture and classification settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Classification service endpoint
    pub endpoint: String,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Minimum captured duration per gesture, in seconds of real time
    pub min_recording_secs: f32,

    /// Length of the looping device clip, in seconds
    pub clip_secs: u32,

    /// Timeout for one classification round trip
    pub request_timeout: Duration,

    /// Capture device to open; `None` picks the first one available
    pub device: Option<String>,

    /// WAV file replayed by the simulated microphone
    pub source_wav: Option<PathBuf>,
}

impl VoiceConfig {
    /// Reject values the capture path cannot represent
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.min_recording_secs.is_finite() && self.min_recording_secs >= 0.0,
            "VOXNAV_MIN_RECORDING_SECS must be a finite, non-negative number of seconds"
        );
        anyhow::ensure!(self.sample_rate > 0, "VOXNAV_SAMPLE_RATE must be positive");
        Ok(())
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5001/predict".to_string(),
            sample_rate: 16_000,
            min_recording_secs: 1.0,
            clip_secs: 5,
            request_timeout: Duration::from_secs(10),
            device: None,
            source_wav: None,
        }
    }
}

/// Movement tuning for the avatar
#[derive(Debug, Clone, PartialEq)]
pub struct LocomotionConfig {
    /// Speed before any walk/run/backward command has been issued
    pub initial_speed: f32,
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Vertical acceleration, negative is down
    pub gravity: f32,
    pub jump_height: f32,
    /// Height the one-time flight boost is sized to reach
    pub fly_boost_height: f32,
    /// Degrees applied per turn or look command
    pub rotation_amount: f32,
    /// Vertical velocity held while standing on the ground
    pub ground_floor_velocity: f32,
    /// Rate at which vertical velocity settles to zero while hovering
    pub hover_damping: f32,
    /// Radius of the ground contact probe
    pub ground_check_radius: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            initial_speed: 100.0,
            walk_speed: 10.0,
            run_speed: 18.0,
            gravity: -9.81 * 2.0,
            jump_height: 3.0,
            fly_boost_height: 20.0,
            rotation_amount: 35.0,
            ground_floor_velocity: -2.0,
            hover_damping: 5.0,
            ground_check_radius: 0.2,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = match std::env::var_os("VOXNAV_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&home)
                .join(".local")
                .join("share")
                .join("voxnav"),
        };

        let socket_path = match std::env::var_os("VOXNAV_SOCKET") {
            Some(path) => PathBuf::from(path),
            None => data_dir.join("daemon.sock"),
        };

        let mut voice = VoiceConfig::default();
        if let Ok(endpoint) = std::env::var("VOXNAV_ENDPOINT") {
            voice.endpoint = endpoint;
        }
        override_from_env("VOXNAV_SAMPLE_RATE", &mut voice.sample_rate)?;
        override_from_env("VOXNAV_MIN_RECORDING_SECS", &mut voice.min_recording_secs)?;
        override_from_env("VOXNAV_CLIP_SECS", &mut voice.clip_secs)?;
        let mut timeout_secs = voice.request_timeout.as_secs();
        override_from_env("VOXNAV_REQUEST_TIMEOUT_SECS", &mut timeout_secs)?;
        voice.request_timeout = Duration::from_secs(timeout_secs);
        voice.device = std::env::var("VOXNAV_DEVICE").ok();
        voice.source_wav = std::env::var_os("VOXNAV_SOURCE_WAV").map(PathBuf::from);
        voice.validate()?;

        let mut locomotion = LocomotionConfig::default();
        override_from_env("VOXNAV_WALK_SPEED", &mut locomotion.walk_speed)?;
        override_from_env("VOXNAV_RUN_SPEED", &mut locomotion.run_speed)?;
        override_from_env("VOXNAV_GRAVITY", &mut locomotion.gravity)?;
        override_from_env("VOXNAV_JUMP_HEIGHT", &mut locomotion.jump_height)?;
        override_from_env("VOXNAV_FLY_BOOST_HEIGHT", &mut locomotion.fly_boost_height)?;
        override_from_env("VOXNAV_ROTATION_AMOUNT", &mut locomotion.rotation_amount)?;

        let mut tick_hz: u32 = 60;
        override_from_env("VOXNAV_TICK_HZ", &mut tick_hz)?;
        anyhow::ensure!(tick_hz > 0, "VOXNAV_TICK_HZ must be positive");

        Ok(Self {
            socket_path,
            data_dir,
            tick_hz,
            voice,
            locomotion,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }

    /// Fixed simulation step derived from the tick rate
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz))
    }
}

/// Replace `target` with the parsed value of `key` when it is set
fn override_from_env<T>(key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Ok(raw) = std::env::var(key) {
        *target = parse_value(key, &raw)?;
    }
    Ok(())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", key, raw))
}
