// Leg geometry and indexing for the six-legged body
//
// Legs are indexed 0-5 (shown to operators as 1-6). Body frame is
// right-handed with z up: -x is the front, +x the rear, +y the side carrying
// legs 1-3 (the right side when facing forward) and -y the side carrying
// legs 4-6. Leg 1 and leg 6 are the front pair, leg 2 sits on +y and leg 5
// on -y.

use std::fmt::Display;

pub const LEG_COUNT: usize = 6;
pub const JOINTS_PER_LEG: usize = 3;
pub const JOINT_COUNT: usize = LEG_COUNT * JOINTS_PER_LEG;

/// Link lengths in millimeters, identical on every leg
pub const LINK_COXA: f32 = 27.5;
pub const LINK_TIBIA: f32 = 55.0;
pub const LINK_FEMUR: f32 = 77.5;

/// Distance from the body center to each coxa joint (mm)
pub const MOUNT_OFFSET: f32 = 60.0;

/// Leg frame rotation within the body frame (degrees), indexed by leg
pub const MOUNT_ANGLES_DEG: [f32; LEG_COUNT] = [60.0, 0.0, -60.0, -120.0, 180.0, 120.0];

/// Neutral stance: foot distance out from the coxa along the leg axis, and
/// foot height below the coxa plane (mm)
pub const NEUTRAL_REACH: f32 = 65.0;
pub const STANCE_Z: f32 = -20.0;

/// Joint within a leg, proximal to distal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Coxa = 0,
    Tibia = 1,
    Femur = 2,
}

impl Joint {
    pub const ALL: [Joint; JOINTS_PER_LEG] = [Joint::Coxa, Joint::Tibia, Joint::Femur];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl Display for Joint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Joint::Coxa => f.write_str("Coxa"),
            Joint::Tibia => f.write_str("Tibia"),
            Joint::Femur => f.write_str("Femur"),
        }
    }
}

/// Global actuator index of a joint: three consecutive slots per leg
pub fn joint_index(leg: usize, joint: Joint) -> usize {
    leg * JOINTS_PER_LEG + joint.index()
}

/// Static description of one leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegGeometry {
    pub link_coxa: f32,
    pub link_tibia: f32,
    pub link_femur: f32,
    pub mount_angle_deg: f32,
    pub mount_offset: f32,
}

impl LegGeometry {
    /// Standard leg mounted at the given angle
    pub fn mounted_at(mount_angle_deg: f32) -> Self {
        Self {
            link_coxa: LINK_COXA,
            link_tibia: LINK_TIBIA,
            link_femur: LINK_FEMUR,
            mount_angle_deg,
            mount_offset: MOUNT_OFFSET,
        }
    }

    /// All six legs of the body
    pub fn hexapod() -> [LegGeometry; LEG_COUNT] {
        MOUNT_ANGLES_DEG.map(Self::mounted_at)
    }

    /// Shortest reach from the tibia joint (links folded)
    pub fn min_reach(&self) -> f32 {
        (self.link_tibia - self.link_femur).abs()
    }

    /// Longest reach from the tibia joint (links stretched)
    pub fn max_reach(&self) -> f32 {
        self.link_tibia + self.link_femur
    }

    /// Unit vector of the leg's outward axis in the body frame.
    ///
    /// The leg frame's +y axis points outward, so this is +y rotated by the
    /// mount angle.
    pub fn outward_axis(&self) -> (f32, f32) {
        let (sin, cos) = self.mount_angle_deg.to_radians().sin_cos();
        (-sin, cos)
    }

    /// Express a horizontal body-frame vector in this leg's frame
    pub fn to_leg_frame(&self, x: f32, y: f32) -> (f32, f32) {
        let (sin, cos) = self.mount_angle_deg.to_radians().sin_cos();
        (cos * x + sin * y, cos * y - sin * x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_index_layout() {
        assert_eq!(joint_index(0, Joint::Coxa), 0);
        assert_eq!(joint_index(0, Joint::Femur), 2);
        assert_eq!(joint_index(1, Joint::Coxa), 3);
        assert_eq!(joint_index(5, Joint::Femur), JOINT_COUNT - 1);
    }

    #[test]
    fn test_joint_from_index() {
        assert_eq!(Joint::from_index(1), Some(Joint::Tibia));
        assert_eq!(Joint::from_index(3), None);
    }

    #[test]
    fn test_outward_axis_maps_to_leg_y() {
        // Every leg must see its own outward axis as pure +y
        for leg in LegGeometry::hexapod() {
            let (ux, uy) = leg.outward_axis();
            let (x, y) = leg.to_leg_frame(ux, uy);
            assert!(x.abs() < 1e-6, "mount {}: x={}", leg.mount_angle_deg, x);
            assert!((y - 1.0).abs() < 1e-6, "mount {}: y={}", leg.mount_angle_deg, y);
        }
    }

    #[test]
    fn test_reach_limits() {
        let leg = LegGeometry::mounted_at(0.0);
        assert_eq!(leg.min_reach(), 22.5);
        assert_eq!(leg.max_reach(), 132.5);
    }
}
