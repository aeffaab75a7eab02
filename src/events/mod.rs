//! Session events
//!
//! Emitted by the voice pipeline, dispatcher and locomotion state machine,
//! and pushed to subscribed IPC clients such as the pause overlay.

use serde::{Deserialize, Serialize};

/// Events emitted while the daemon runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Push-to-talk pressed, capture device opened
    RecordingStarted,

    /// Gesture finished and encoded
    RecordingFinished {
        /// Captured duration in milliseconds, including the minimum-time wait
        duration_ms: u64,
        /// Number of samples handed to the encoder
        samples: usize,
    },

    /// Gesture produced no samples; nothing was sent
    RecordingTooShort,

    /// Classification service returned a label
    CommandRecognized {
        /// Label as returned by the service
        label: String,
    },

    /// Session paused; only resume and quit are accepted
    Paused,

    /// Session resumed
    Resumed,

    /// Flight boost applied
    FlightStarted,

    /// Flight ended by descending onto the ground
    Landed,

    /// Quit requested by voice
    QuitRequested,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::RecordingStarted => write!(f, "RECORDING_STARTED"),
            SessionEvent::RecordingFinished {
                duration_ms,
                samples,
            } => {
                write!(f, "RECORDING_FINISHED ({}ms, {} samples)", duration_ms, samples)
            }
            SessionEvent::RecordingTooShort => write!(f, "RECORDING_TOO_SHORT"),
            SessionEvent::CommandRecognized { label } => {
                write!(f, "COMMAND_RECOGNIZED ({})", label)
            }
            SessionEvent::Paused => write!(f, "PAUSED"),
            SessionEvent::Resumed => write!(f, "RESUMED"),
            SessionEvent::FlightStarted => write!(f, "FLIGHT_STARTED"),
            SessionEvent::Landed => write!(f, "LANDED"),
            SessionEvent::QuitRequested => write!(f, "QUIT_REQUESTED"),
        }
    }
}
