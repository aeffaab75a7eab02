//! Gesture-to-request pipeline
//!
//! Consumes push-to-talk events in order, so capture gestures are
//! serialized on the one device. Each finished gesture spawns its own
//! classification request; requests run concurrently and independently, and
//! their response bodies flow back to the tick loop over a channel.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::audio::{CaptureDevice, CompletedRecording, RecordingSession, SessionError};
use crate::classifier::Classifier;
use crate::events::SessionEvent;
use crate::ptt::PttEvent;

/// Output delivered to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutput {
    /// Raw classification response body
    Response(String),
    /// Label injected by the operator, already decoded
    Label(String),
}

/// Drives recording sessions and classification requests
pub struct VoicePipeline<D: CaptureDevice> {
    /// `None` when no capture device was available at startup
    session: Option<RecordingSession<D>>,
    classifier: Arc<dyn Classifier>,
    output_tx: mpsc::Sender<VoiceOutput>,
    event_tx: broadcast::Sender<SessionEvent>,
    gestures: u64,
}

impl<D: CaptureDevice + 'static> VoicePipeline<D> {
    pub fn new(
        session: Option<RecordingSession<D>>,
        classifier: Arc<dyn Classifier>,
        output_tx: mpsc::Sender<VoiceOutput>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            session,
            classifier,
            output_tx,
            event_tx,
            gestures: 0,
        }
    }

    /// Process push-to-talk events until the channel closes
    pub async fn run(mut self, mut ptt_rx: mpsc::Receiver<PttEvent>) {
        info!(capture = self.session.is_some(), "voice pipeline started");

        while let Some(event) = ptt_rx.recv().await {
            match event {
                PttEvent::Pressed => self.begin(),
                PttEvent::Released => self.finish().await,
                PttEvent::Injected(label) => {
                    if self.output_tx.send(VoiceOutput::Label(label)).await.is_err() {
                        break;
                    }
                }
            }
        }

        info!("voice pipeline stopped");
    }

    fn begin(&mut self) {
        let Some(session) = self.session.as_mut() else {
            warn!("talk key pressed but voice capture is unavailable");
            return;
        };

        match session.begin() {
            Ok(()) => {
                let _ = self.event_tx.send(SessionEvent::RecordingStarted);
            }
            Err(SessionError::AlreadyRecording) => {
                debug!("recording already in progress, ignoring press");
            }
            Err(e) => error!(%e, "failed to start recording"),
        }
    }

    async fn finish(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.end().await {
            Ok(recording) => self.submit(recording),
            Err(SessionError::RecordingTooShort) => {
                let _ = self.event_tx.send(SessionEvent::RecordingTooShort);
            }
            Err(SessionError::NotRecording) => {
                debug!("talk key released without an open recording");
            }
            Err(e) => error!(%e, "failed to finish recording"),
        }
    }

    /// Spawn the classification request for a finished gesture
    fn submit(&mut self, recording: CompletedRecording) {
        self.gestures += 1;
        let gesture = self.gestures;

        let _ = self.event_tx.send(SessionEvent::RecordingFinished {
            duration_ms: recording.duration.as_millis() as u64,
            samples: recording.samples,
        });

        let classifier = Arc::clone(&self.classifier);
        let output_tx = self.output_tx.clone();
        tokio::spawn(async move {
            match classifier.classify(recording.payload).await {
                Ok(body) => {
                    info!(gesture, %body, "classification response");
                    if output_tx.send(VoiceOutput::Response(body)).await.is_err() {
                        warn!(gesture, "dispatcher gone, dropping response");
                    }
                }
                Err(e) => error!(gesture, %e, "classification request failed"),
            }
        });
    }
}
