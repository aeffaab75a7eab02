//! Physics host collaborators
//!
//! The locomotion state machine never moves the avatar itself; it hands
//! displacements to an [`Actuator`] and asks a [`GroundProbe`] for contact.
//! [`KinematicBody`] is a flat-world host used by the daemon.

mod body;

pub use body::KinematicBody;

use crate::locomotion::Vec3;

/// Bitmask of collision layers a probe considers walkable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const GROUND: LayerMask = LayerMask(1);

    pub fn contains(&self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// Applies displacements to the avatar; may be called several times per tick
pub trait Actuator {
    fn move_by(&mut self, displacement: Vec3);
}

/// Answers whether a sphere at `position` touches a walkable surface
pub trait GroundProbe {
    fn is_grounded(&self, position: Vec3, radius: f32, layers: LayerMask) -> bool;
}
