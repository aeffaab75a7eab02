//! Voice module: push-to-talk gestures to classification responses

mod pipeline;

pub use pipeline::{VoiceOutput, VoicePipeline};
