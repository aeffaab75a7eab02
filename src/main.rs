//! voxnav: voice-driven avatar locomotion daemon
//!
//! This daemon provides:
//! - Push-to-talk capture with a minimum recording time, encoded to WAV
//! - Classification of each gesture by an external HTTP service
//! - Command dispatch with a pause gate and flight-aware "up"/"down"
//! - A locomotion state machine integrated on a fixed tick
//! - IPC for status queries and session events (pause overlay)

mod audio;
mod classifier;
mod command;
mod config;
mod events;
mod host;
mod ipc;
mod lifecycle;
mod locomotion;
mod ptt;
mod simulation;
mod voice;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::{AudioError, RecordingSession, SimulatedMicrophone};
use crate::classifier::HttpClassifier;
use crate::command::Dispatcher;
use crate::config::{Config, VoiceConfig};
use crate::events::SessionEvent;
use crate::host::KinematicBody;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::locomotion::LocomotionStateMachine;
use crate::ptt::PttListener;
use crate::simulation::{Exit, Simulation};
use crate::voice::VoicePipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voxnav starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, endpoint = %config.voice.endpoint, "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // Push-to-talk listener -> voice pipeline
    let (ptt_tx, ptt_rx) = mpsc::channel(32);
    // Voice pipeline / IPC -> dispatcher on the tick task
    let (output_tx, output_rx) = mpsc::channel(32);
    // Session events -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<SessionEvent>(64);

    // Voice capture is optional; the avatar keeps running without it
    let session = match open_session(&config.voice) {
        Ok(session) => Some(session),
        Err(e) => {
            error!(%e, "failed to open capture device");
            warn!("continuing without voice capture");
            None
        }
    };

    let classifier = HttpClassifier::new(config.voice.endpoint.clone(), config.voice.request_timeout)
        .context("failed to build classification client")?;
    let pipeline = VoicePipeline::new(
        session,
        Arc::new(classifier),
        output_tx.clone(),
        event_tx.clone(),
    );
    let pipeline_task = tokio::spawn(pipeline.run(ptt_rx));

    let ptt_listener = PttListener::new(ptt_tx);
    match ptt_listener.start() {
        Ok(()) => {
            info!("push-to-talk listener started (v = press, ^v = release, say <word>)");
        }
        Err(e) => {
            error!(?e, "failed to start push-to-talk listener");
            warn!("continuing without push-to-talk input");
        }
    }

    let server = Server::new(&config.socket_path, event_tx.clone(), output_tx)?;

    let locomotion = LocomotionStateMachine::new(config.locomotion.clone(), event_tx.clone());
    let dispatcher = Dispatcher::new(event_tx);
    let mut simulation = Simulation::new(locomotion, dispatcher, KinematicBody::default());

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        exit = simulation.run(output_rx, config.tick_interval(), &server) => {
            match exit {
                Exit::Quit => info!("quit dispatched"),
                Exit::InputClosed => warn!("command input closed"),
            }
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    ptt_listener.stop();
    pipeline_task.abort();
    server.shutdown().await;

    info!("voxnav stopped");

    Ok(())
}

/// Open the recording session on the simulated microphone
fn open_session(cfg: &VoiceConfig) -> Result<RecordingSession<SimulatedMicrophone>, AudioError> {
    let device = match &cfg.source_wav {
        Some(path) => SimulatedMicrophone::from_wav(path)?,
        None => SimulatedMicrophone::new(),
    };
    RecordingSession::new(device, cfg)
}
