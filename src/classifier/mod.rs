//! Classification service client
//!
//! Uploads one WAV payload per gesture and returns the raw response body.
//! Decoding the body is left to the command dispatcher.

mod http;

pub use http::HttpClassifier;

use async_trait::async_trait;
use serde::Deserialize;

use crate::audio::WavPayload;

/// Response body of the classification service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassificationResult {
    /// Recognised command label
    pub command: String,
}

/// Errors from one classification round trip
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("classification service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Maps an audio payload to a response body naming a command
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, payload: WavPayload) -> Result<String, ClassifierError>;
}
