//! Kinematic avatar body on a flat walkable plane

use tracing::trace;

use super::{Actuator, GroundProbe, LayerMask};
use crate::locomotion::Vec3;

/// Avatar body standing on an infinite plane at `ground_height`
#[derive(Debug, Clone)]
pub struct KinematicBody {
    position: Vec3,
    ground_height: f32,
    ground_layers: LayerMask,
}

impl KinematicBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ground_height: 0.0,
            ground_layers: LayerMask::GROUND,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Feet position used for the ground probe
    pub fn feet(&self) -> Vec3 {
        self.position
    }
}

impl Default for KinematicBody {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Actuator for KinematicBody {
    fn move_by(&mut self, displacement: Vec3) {
        self.position += displacement;
        // The plane is solid
        if self.position.y < self.ground_height {
            self.position.y = self.ground_height;
        }
        trace!(?displacement, position = ?self.position, "body moved");
    }
}

impl GroundProbe for KinematicBody {
    fn is_grounded(&self, position: Vec3, radius: f32, layers: LayerMask) -> bool {
        layers.contains(self.ground_layers) && position.y - self.ground_height <= radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_cannot_sink_below_ground() {
        let mut body = KinematicBody::default();
        body.move_by(Vec3::new(1.0, -5.0, 2.0));
        assert_eq!(body.position(), Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_ground_probe_radius() {
        let mut body = KinematicBody::default();
        assert!(body.is_grounded(body.feet(), 0.2, LayerMask::GROUND));

        body.move_by(Vec3::new(0.0, 0.15, 0.0));
        assert!(body.is_grounded(body.feet(), 0.2, LayerMask::GROUND));

        body.move_by(Vec3::new(0.0, 1.0, 0.0));
        assert!(!body.is_grounded(body.feet(), 0.2, LayerMask::GROUND));
    }

    #[test]
    fn test_ground_probe_respects_layers() {
        let body = KinematicBody::default();
        assert!(!body.is_grounded(body.feet(), 0.2, LayerMask(0b10)));
    }
}
