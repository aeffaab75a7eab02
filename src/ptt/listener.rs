//! Push-to-talk listener reading from stdin
//!
//! Runs on a dedicated thread because stdin reads block; events are handed
//! to the async side with `blocking_send`.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::{InputLine, TalkKeyState};

/// Events sent from the listener to the voice pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PttEvent {
    /// Talk key went down
    Pressed,
    /// Talk key went up
    Released,
    /// Command label typed by the operator
    Injected(String),
}

/// Errors that can occur in the push-to-talk listener
#[derive(Debug, thiserror::Error)]
pub enum PttError {
    #[error("push-to-talk listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Listener turning stdin lines into push-to-talk events
pub struct PttListener {
    event_tx: mpsc::Sender<PttEvent>,
    running: Arc<AtomicBool>,
}

impl PttListener {
    pub fn new(event_tx: mpsc::Sender<PttEvent>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start reading stdin on a dedicated thread
    pub fn start(&self) -> Result<(), PttError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PttError::AlreadyRunning);
        }

        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("ptt-listener".to_string())
            .spawn(move || {
                info!("push-to-talk listener thread started");
                let stdin = std::io::stdin();
                forward_lines(stdin.lock(), &event_tx, &running);
                running.store(false, Ordering::SeqCst);
                info!("push-to-talk listener thread stopped");
            })
            .map_err(|e| PttError::ThreadSpawn(e.to_string()))?;

        Ok(())
    }

    /// Ask the listener to stop after the next line
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Forward parsed lines until EOF, stop, or a closed channel
fn forward_lines<R: BufRead>(
    reader: R,
    event_tx: &mpsc::Sender<PttEvent>,
    running: &AtomicBool,
) {
    let mut key = TalkKeyState::default();

    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(?e, "failed to read input");
                break;
            }
        };

        let event = match InputLine::parse(&line) {
            Some(InputLine::Press) if key.update(true) => PttEvent::Pressed,
            Some(InputLine::Release) if key.update(false) => PttEvent::Released,
            Some(InputLine::Press) | Some(InputLine::Release) => {
                debug!(?key, "talk key unchanged, ignoring");
                continue;
            }
            Some(InputLine::Say(label)) => PttEvent::Injected(label),
            None => {
                if !line.trim().is_empty() {
                    warn!(%line, "unrecognized input line");
                }
                continue;
            }
        };

        debug!(?event, "push-to-talk event");
        if event_tx.blocking_send(event).is_err() {
            warn!("failed to send push-to-talk event - channel closed?");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = PttListener::new(tx);
        assert!(!listener.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_forward_lines_suppresses_repeats() {
        let (tx, mut rx) = mpsc::channel(32);
        let running = AtomicBool::new(true);
        let input = Cursor::new("v\nv\nnoise\n^v\n^v\nsay Vola\n");

        forward_lines(input, &tx, &running);
        drop(tx);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                PttEvent::Pressed,
                PttEvent::Released,
                PttEvent::Injected("Vola".to_string()),
            ]
        );
    }

    #[test]
    fn test_forward_lines_stops_when_not_running() {
        let (tx, mut rx) = mpsc::channel(32);
        let running = AtomicBool::new(false);
        forward_lines(Cursor::new("v\n"), &tx, &running);
        assert!(rx.try_recv().is_err());
    }
}
