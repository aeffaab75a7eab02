//! Audio module for push-to-talk capture
//!
//! - `device`: capture device contract and the simulated microphone
//! - `session`: one gesture from key-down to encoded payload
//! - `wav`: 16-bit PCM RIFF/WAVE encoder

mod device;
mod session;
pub mod wav;

pub use device::{AudioError, CaptureDevice, SimulatedMicrophone};
pub use session::{CompletedRecording, RecordingSession, SessionError};
pub use wav::WavPayload;
