//! Avatar locomotion state machine
//!
//! States are composed from independent intent flags rather than one enum:
//! Grounded-Idle, Grounded-Walking, Grounded-Running and Flying. Commands
//! update the intent between ticks; [`LocomotionStateMachine::tick`]
//! integrates vertical velocity and hands displacements to the actuator.

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::intent::{LocomotionCommand, LocomotionIntent};
use super::vector::Vec3;
use crate::config::LocomotionConfig;
use crate::events::SessionEvent;
use crate::host::Actuator;

/// Pitch limit for the look angle, in degrees
pub const MAX_PITCH: f32 = 90.0;

/// Displacements emitted to the actuator during one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickDisplacement {
    /// Directional intents plus autorun, scaled by speed
    pub intent: Vec3,
    /// Vertical velocity contribution
    pub vertical: Vec3,
}

/// Coarse state derived from the intent flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    GroundedIdle,
    GroundedWalking,
    GroundedRunning,
    Flying,
}

impl std::fmt::Display for MotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionState::GroundedIdle => write!(f, "GroundedIdle"),
            MotionState::GroundedWalking => write!(f, "GroundedWalking"),
            MotionState::GroundedRunning => write!(f, "GroundedRunning"),
            MotionState::Flying => write!(f, "Flying"),
        }
    }
}

/// Owns intent, vertical velocity, yaw and look angle of the avatar
pub struct LocomotionStateMachine {
    cfg: LocomotionConfig,
    intent: LocomotionIntent,
    vertical_velocity: f32,
    /// Heading in degrees, [0, 360)
    yaw: f32,
    /// Look angle in degrees, negative looks up
    pitch: f32,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl LocomotionStateMachine {
    /// Create a grounded, idle state machine
    pub fn new(cfg: LocomotionConfig, event_tx: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            intent: LocomotionIntent::new(cfg.initial_speed),
            cfg,
            vertical_velocity: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            event_tx,
        }
    }

    pub fn intent(&self) -> &LocomotionIntent {
        &self.intent
    }

    pub fn is_flying(&self) -> bool {
        self.intent.flying
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.cfg
    }

    pub fn motion_state(&self) -> MotionState {
        if self.intent.flying {
            MotionState::Flying
        } else if self.intent.running {
            MotionState::GroundedRunning
        } else if self.intent.is_moving() {
            MotionState::GroundedWalking
        } else {
            MotionState::GroundedIdle
        }
    }

    /// Handle one locomotion command
    pub fn handle(&mut self, command: LocomotionCommand) {
        let before = self.motion_state();
        self.intent = self.intent.apply(command, &self.cfg);

        match command {
            LocomotionCommand::TurnLeft => self.turn(-self.cfg.rotation_amount),
            LocomotionCommand::TurnRight => self.turn(self.cfg.rotation_amount),
            LocomotionCommand::LookUp => self.look(-self.cfg.rotation_amount),
            LocomotionCommand::LookDown => self.look(self.cfg.rotation_amount),
            LocomotionCommand::Jump => {
                // Overwrites vertical velocity even mid-air
                self.vertical_velocity = impulse_for_height(self.cfg.jump_height, self.cfg.gravity);
                debug!(velocity = self.vertical_velocity, "jump");
            }
            LocomotionCommand::Fly => self.apply_flight_boost(),
            _ => {}
        }

        let after = self.motion_state();
        if before != after {
            info!(%command, from = %before, to = %after, "locomotion transition");
        } else {
            debug!(%command, state = %after, "locomotion command");
        }
    }

    fn apply_flight_boost(&mut self) {
        if self.intent.boost_applied {
            return;
        }
        self.vertical_velocity = impulse_for_height(self.cfg.fly_boost_height, self.cfg.gravity);
        self.intent.boost_applied = true;
        info!(
            height = self.cfg.fly_boost_height,
            velocity = self.vertical_velocity,
            "flight boost applied"
        );
        let _ = self.event_tx.send(SessionEvent::FlightStarted);
    }

    fn turn(&mut self, degrees: f32) {
        self.yaw = (self.yaw + degrees).rem_euclid(360.0);
        debug!(yaw = self.yaw, "turned");
    }

    fn look(&mut self, degrees: f32) {
        self.pitch = (self.pitch + degrees).clamp(-MAX_PITCH, MAX_PITCH);
        debug!(pitch = self.pitch, "look angle changed");
    }

    /// Integrate one simulation step of `dt` seconds
    ///
    /// `grounded` is the host's ground-contact signal for this tick. Both
    /// displacements are handed to `actuator` and returned.
    pub fn tick<A: Actuator + ?Sized>(
        &mut self,
        dt: f32,
        grounded: bool,
        actuator: &mut A,
    ) -> TickDisplacement {
        if !self.intent.flying {
            if grounded && self.vertical_velocity < 0.0 {
                self.vertical_velocity = self.cfg.ground_floor_velocity;
            } else {
                self.vertical_velocity += self.cfg.gravity * dt;
            }
        } else if self.intent.boost_applied {
            let t = (dt * self.cfg.hover_damping).clamp(0.0, 1.0);
            self.vertical_velocity += (0.0 - self.vertical_velocity) * t;
        }

        let forward = Vec3::forward_from_yaw(self.yaw);
        let right = Vec3::right_from_yaw(self.yaw);

        let mut autorun = Vec3::ZERO;
        if self.intent.running && !self.intent.flying {
            autorun = forward;
        }

        // Diagonal intents are summed without renormalising
        let mut direction = Vec3::ZERO;
        if self.intent.forward {
            direction += forward;
        }
        if self.intent.backward {
            direction -= forward;
        }
        if self.intent.strafe_left {
            direction -= right;
        }
        if self.intent.strafe_right {
            direction += right;
        }

        if self.intent.flying {
            if self.intent.ascend {
                direction += Vec3::UP;
            }
            if self.intent.descend {
                direction -= Vec3::UP;
                if grounded {
                    self.intent = self.intent.land();
                    info!("flight ended, avatar landed");
                    let _ = self.event_tx.send(SessionEvent::Landed);
                }
            }
        }

        let displacement = TickDisplacement {
            intent: (direction + autorun) * (self.intent.speed * dt),
            vertical: Vec3::new(0.0, self.vertical_velocity, 0.0) * dt,
        };

        actuator.move_by(displacement.intent);
        actuator.move_by(displacement.vertical);

        displacement
    }
}

/// Upward velocity that reaches `height` under `gravity`
fn impulse_for_height(height: f32, gravity: f32) -> f32 {
    (height * 2.0 * gravity.abs()).sqrt()
}
