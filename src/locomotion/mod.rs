//! Locomotion module for voice-driven avatar movement
//!
//! Composes directional intents, autorun, flight with a one-time boost,
//! gravity and look angle onto a single actuator.

mod intent;
mod machine;
mod vector;

pub use intent::LocomotionCommand;
pub use machine::{LocomotionStateMachine, TickDisplacement};
pub use vector::Vec3;
