//! Cooperative tick loop
//!
//! Integration steps and dispatches share one task: classification results
//! are only applied between ticks, so the locomotion state needs no locking.

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::command::{log_dispatch_error, Action, Dispatcher};
use crate::host::{GroundProbe, KinematicBody, LayerMask};
use crate::ipc::{AvatarStatus, Server};
use crate::locomotion::{LocomotionStateMachine, TickDisplacement};
use crate::voice::VoiceOutput;

/// Why the tick loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Quit was dispatched
    Quit,
    /// Every voice output sender is gone
    InputClosed,
}

/// Avatar world driven by the tick loop
pub struct Simulation {
    locomotion: LocomotionStateMachine,
    dispatcher: Dispatcher,
    body: KinematicBody,
}

impl Simulation {
    pub fn new(
        locomotion: LocomotionStateMachine,
        dispatcher: Dispatcher,
        body: KinematicBody,
    ) -> Self {
        Self {
            locomotion,
            dispatcher,
            body,
        }
    }

    pub fn locomotion(&self) -> &LocomotionStateMachine {
        &self.locomotion
    }

    pub fn body(&self) -> &KinematicBody {
        &self.body
    }

    /// Advance one tick of `dt` seconds of real time
    ///
    /// While paused simulation time is frozen: the step still runs, with a
    /// zero time delta.
    pub fn step(&mut self, dt: f32) -> TickDisplacement {
        let dt = if self.dispatcher.is_paused() { 0.0 } else { dt };
        let radius = self.locomotion.config().ground_check_radius;
        let grounded = self
            .body
            .is_grounded(self.body.feet(), radius, LayerMask::GROUND);
        self.locomotion.tick(dt, grounded, &mut self.body)
    }

    /// Dispatch one voice output; malformed responses are logged and dropped
    pub fn handle_output(&mut self, output: VoiceOutput) -> Option<Action> {
        let action = match output {
            VoiceOutput::Response(raw) => match self.dispatcher.dispatch(&raw, &mut self.locomotion) {
                Ok(action) => action,
                Err(e) => {
                    log_dispatch_error(&e, &raw);
                    return None;
                }
            },
            VoiceOutput::Label(label) => self.dispatcher.dispatch_label(&label, &mut self.locomotion),
        };
        debug!(?action, "dispatched");
        Some(action)
    }

    /// Snapshot for IPC clients
    pub fn status(&self) -> AvatarStatus {
        let intent = self.locomotion.intent();
        AvatarStatus {
            paused: self.dispatcher.is_paused(),
            flying: intent.flying,
            running: intent.running,
            motion: self.locomotion.motion_state().to_string(),
            position: self.body.position(),
            yaw: self.locomotion.yaw(),
            pitch: self.locomotion.pitch(),
            ..AvatarStatus::default()
        }
    }

    /// Run ticks and dispatches until quit or until input closes
    pub async fn run(
        &mut self,
        mut output_rx: mpsc::Receiver<VoiceOutput>,
        tick: std::time::Duration,
        server: &Server,
    ) -> Exit {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!(tick_ms = tick.as_millis() as u64, "simulation started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    self.step(dt);
                    server.set_status(self.status()).await;
                }
                output = output_rx.recv() => {
                    let Some(output) = output else {
                        return Exit::InputClosed;
                    };
                    if self.handle_output(output) == Some(Action::Quit) {
                        return Exit::Quit;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocomotionConfig;
    use crate::events::SessionEvent;
    use crate::locomotion::Vec3;
    use tokio::sync::broadcast;

    fn create_simulation() -> (Simulation, broadcast::Receiver<SessionEvent>) {
        let (tx, rx) = broadcast::channel(64);
        let locomotion = LocomotionStateMachine::new(LocomotionConfig::default(), tx.clone());
        let sim = Simulation::new(locomotion, Dispatcher::new(tx), KinematicBody::default());
        (sim, rx)
    }

    fn say(sim: &mut Simulation, label: &str) -> Option<Action> {
        sim.handle_output(VoiceOutput::Response(format!(r#"{{"command":"{}"}}"#, label)))
    }

    #[test]
    fn test_walk_moves_body_forward() {
        let (mut sim, _) = create_simulation();
        say(&mut sim, "cammina");
        for _ in 0..10 {
            sim.step(0.1);
        }
        let position = sim.body().position();
        assert!((position.z - 10.0).abs() < 1e-3);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn test_forward_from_rest_uses_walk_speed() {
        let (mut sim, _) = create_simulation();
        say(&mut sim, "avanti");
        for _ in 0..10 {
            sim.step(0.1);
        }
        assert!((sim.body().position().z - 10.0).abs() < 1e-3);

        for _ in 0..40 {
            sim.step(0.1);
        }
        assert!((sim.body().position().z - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_flight_and_landing() {
        let (mut sim, mut rx) = create_simulation();
        say(&mut sim, "vola");
        for _ in 0..30 {
            sim.step(1.0 / 60.0);
        }
        assert!(sim.body().position().y > 1.0);
        assert!(sim.locomotion().is_flying());

        // "giu" while flying descends; touching ground ends the flight
        say(&mut sim, "giu");
        assert!(sim.locomotion().intent().descend);
        let mut landed = false;
        for _ in 0..2_000 {
            sim.step(1.0 / 60.0);
            if !sim.locomotion().is_flying() {
                landed = true;
                break;
            }
        }
        assert!(landed);
        assert!(!sim.locomotion().intent().descend);

        let events: Vec<SessionEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(events.contains(&SessionEvent::FlightStarted));
        assert!(events.contains(&SessionEvent::Landed));
    }

    #[test]
    fn test_pause_freezes_motion() {
        let (mut sim, _) = create_simulation();
        say(&mut sim, "corri");
        say(&mut sim, "pausa");
        let before = sim.body().position();
        let out = sim.step(0.5);
        assert_eq!(out.intent, Vec3::ZERO);
        assert_eq!(sim.body().position(), before);
        assert!(sim.status().paused);

        say(&mut sim, "continua");
        sim.step(0.5);
        assert!(sim.body().position().z > before.z);
    }

    #[test]
    fn test_malformed_response_does_not_stop_ticks() {
        let (mut sim, _) = create_simulation();
        assert_eq!(
            sim.handle_output(VoiceOutput::Response("<html>502</html>".to_string())),
            None
        );
        sim.step(0.1);
        assert_eq!(say(&mut sim, "esci"), Some(Action::Quit));
    }

    #[test]
    fn test_status_snapshot() {
        let (mut sim, _) = create_simulation();
        say(&mut sim, "destra");
        say(&mut sim, "su");
        let status = sim.status();
        assert_eq!(status.yaw, 35.0);
        assert_eq!(status.pitch, -35.0);
        assert_eq!(status.motion, "GroundedIdle");
        assert!(!status.flying);
    }
}
