//! Locomotion intent flags and their transitions
//!
//! All intent mutation goes through [`LocomotionIntent::apply`], which keeps
//! the flag invariants in one place:
//! - forward and backward are never both set
//! - running is never set while flying
//! - vertical flags are only set while flying

use serde::Serialize;

use crate::config::LocomotionConfig;

/// Commands the locomotion state machine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocomotionCommand {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Jump,
    Stop,
    Run,
    Walk,
    LookUp,
    LookDown,
    Fly,
    /// Ascend while flying
    VerticalUp,
    /// Descend while flying
    VerticalDown,
}

impl std::fmt::Display for LocomotionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LocomotionCommand::Forward => "forward",
            LocomotionCommand::Backward => "backward",
            LocomotionCommand::TurnLeft => "turn-left",
            LocomotionCommand::TurnRight => "turn-right",
            LocomotionCommand::Jump => "jump",
            LocomotionCommand::Stop => "stop",
            LocomotionCommand::Run => "run",
            LocomotionCommand::Walk => "walk",
            LocomotionCommand::LookUp => "look-up",
            LocomotionCommand::LookDown => "look-down",
            LocomotionCommand::Fly => "fly",
            LocomotionCommand::VerticalUp => "vertical-up",
            LocomotionCommand::VerticalDown => "vertical-down",
        };
        f.write_str(name)
    }
}

/// Persistent movement intents of the avatar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocomotionIntent {
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub ascend: bool,
    pub descend: bool,
    pub running: bool,
    pub flying: bool,
    /// Flight boost already applied in the current flight episode
    pub boost_applied: bool,
    /// Current horizontal speed
    pub speed: f32,
}

impl LocomotionIntent {
    /// Idle intent with the given starting speed
    pub fn new(initial_speed: f32) -> Self {
        Self {
            forward: false,
            backward: false,
            strafe_left: false,
            strafe_right: false,
            ascend: false,
            descend: false,
            running: false,
            flying: false,
            boost_applied: false,
            speed: initial_speed,
        }
    }

    /// Apply a command and return the resulting intent
    ///
    /// One-shot commands (turns, looks, jump) leave the intent untouched.
    /// `Fly` only raises the flying flag here; the boost impulse and its flag
    /// are owned by the state machine.
    pub fn apply(mut self, command: LocomotionCommand, cfg: &LocomotionConfig) -> Self {
        match command {
            LocomotionCommand::Forward => {
                self.backward = false;
                self.strafe_left = false;
                self.strafe_right = false;
                self.running = false;
                self.forward = true;
                self.speed = cfg.walk_speed;
            }
            LocomotionCommand::Walk => {
                self.backward = false;
                self.forward = true;
                self.running = false;
                self.speed = cfg.walk_speed;
            }
            LocomotionCommand::Run => {
                self.backward = false;
                self.forward = true;
                // Autorun is a ground mode
                self.running = !self.flying;
                self.speed = cfg.run_speed;
            }
            LocomotionCommand::Backward => {
                self.forward = false;
                self.running = false;
                self.backward = true;
                self.speed = cfg.walk_speed;
            }
            LocomotionCommand::Stop => {
                self.forward = false;
                self.backward = false;
                self.strafe_left = false;
                self.strafe_right = false;
                self.running = false;
                if self.flying {
                    self.clear_vertical();
                }
            }
            LocomotionCommand::Fly => {
                self.flying = true;
                self.running = false;
            }
            LocomotionCommand::VerticalUp if self.flying => {
                self.ascend = true;
                self.descend = false;
            }
            LocomotionCommand::VerticalDown if self.flying => {
                self.descend = true;
                self.ascend = false;
            }
            LocomotionCommand::VerticalUp
            | LocomotionCommand::VerticalDown
            | LocomotionCommand::TurnLeft
            | LocomotionCommand::TurnRight
            | LocomotionCommand::Jump
            | LocomotionCommand::LookUp
            | LocomotionCommand::LookDown => {}
        }
        self
    }

    /// Leave flight mode after touching down
    pub fn land(mut self) -> Self {
        self.flying = false;
        self.boost_applied = false;
        self.clear_vertical();
        self
    }

    fn clear_vertical(&mut self) {
        self.ascend = false;
        self.descend = false;
    }

    /// Whether any horizontal intent is active
    pub fn is_moving(&self) -> bool {
        self.forward || self.backward || self.strafe_left || self.strafe_right || self.running
    }
}
