//! Command dispatcher
//!
//! Decodes classification responses into command tokens and routes them to
//! the locomotion state machine or to session actions. Runs on the tick
//! task between simulation steps, so flight state read here is current.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::token::{CommandToken, Word};
use crate::classifier::ClassificationResult;
use crate::events::SessionEvent;
use crate::locomotion::{LocomotionCommand, LocomotionStateMachine};

/// Errors raised while decoding a classification response
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid classification response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Outcome of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Routed to the locomotion state machine
    Locomotion(LocomotionCommand),
    Paused,
    Resumed,
    Quit,
    /// Discarded by the pause filter
    Filtered(CommandToken),
    /// Outside the vocabulary; no state change
    Unrecognized(String),
}

/// Routes recognised commands and owns the pause gate
pub struct Dispatcher {
    paused: bool,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl Dispatcher {
    pub fn new(event_tx: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            paused: false,
            event_tx,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Decode a raw response body and dispatch its command
    pub fn dispatch(
        &mut self,
        raw: &str,
        locomotion: &mut LocomotionStateMachine,
    ) -> Result<Action, DispatchError> {
        let result: ClassificationResult = serde_json::from_str(raw)?;
        Ok(self.dispatch_label(&result.command, locomotion))
    }

    /// Dispatch an already decoded command label
    pub fn dispatch_label(
        &mut self,
        label: &str,
        locomotion: &mut LocomotionStateMachine,
    ) -> Action {
        let _ = self.event_tx.send(SessionEvent::CommandRecognized {
            label: label.to_string(),
        });

        // Resolved against the flight state at dispatch time
        let token = Word::parse(label).resolve(locomotion.is_flying());

        if self.paused && !token.allowed_while_paused() {
            info!(%token, "paused, command ignored");
            return Action::Filtered(token);
        }

        match token {
            CommandToken::Move(command) => {
                debug!(%command, "routing to locomotion");
                locomotion.handle(command);
                Action::Locomotion(command)
            }
            CommandToken::Pause => {
                self.set_paused(true);
                Action::Paused
            }
            CommandToken::Resume => {
                self.set_paused(false);
                Action::Resumed
            }
            CommandToken::Quit => {
                info!("quit requested");
                let _ = self.event_tx.send(SessionEvent::QuitRequested);
                Action::Quit
            }
            CommandToken::Unknown(label) => {
                info!(%label, "unrecognized command");
                Action::Unrecognized(label)
            }
        }
    }

    fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            debug!(paused, "pause state unchanged");
            return;
        }
        self.paused = paused;
        if paused {
            info!("session paused");
            let _ = self.event_tx.send(SessionEvent::Paused);
        } else {
            info!("session resumed");
            let _ = self.event_tx.send(SessionEvent::Resumed);
        }
    }
}

/// Log a failed dispatch without disturbing the tick loop
pub fn log_dispatch_error(err: &DispatchError, raw: &str) {
    warn!(%err, body = %raw, "dropping malformed classification response");
}
