// Analytic inverse kinematics for one three-joint leg
//
// Coxa yaws the leg in the horizontal plane; tibia and femur form a planar
// two-link arm in the leg's vertical plane. Solved with the law of cosines.

use std::f32::consts::PI;

use super::geometry::LegGeometry;

/// Servo zero convention: the tibia joint sits at 90° when level
pub const CENTER_OFFSET_DEG: f32 = 90.0;

/// Slack on the workspace bounds to absorb float error at full stretch/fold
const REACH_TOLERANCE: f32 = 1e-3;

/// Joint angles for one leg in degrees (actuator convention, before trim)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegAngles {
    pub coxa: f32,
    pub tibia: f32,
    pub femur: f32,
}

impl LegAngles {
    /// Every servo at its center position
    pub const NEUTRAL: Self = Self {
        coxa: CENTER_OFFSET_DEG,
        tibia: CENTER_OFFSET_DEG,
        femur: CENTER_OFFSET_DEG,
    };

    pub fn new(coxa: f32, tibia: f32, femur: f32) -> Self {
        Self { coxa, tibia, femur }
    }

    /// Returns angles as array [coxa, tibia, femur]
    pub fn as_array(&self) -> [f32; 3] {
        [self.coxa, self.tibia, self.femur]
    }

    /// Add per-joint trim biases [coxa, tibia, femur] in degrees
    pub fn with_trim(&self, trim: [i32; 3]) -> Self {
        Self {
            coxa: self.coxa + trim[0] as f32,
            tibia: self.tibia + trim[1] as f32,
            femur: self.femur + trim[2] as f32,
        }
    }
}

impl Default for LegAngles {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum IkError {
    #[error("target out of reach: {reach:.2} mm not within [{min:.2}, {max:.2}] mm")]
    Unreachable { reach: f32, min: f32, max: f32 },
}

/// acos with its argument clamped into the valid domain
fn clamped_acos(value: f32) -> f32 {
    value.clamp(-1.0, 1.0).acos()
}

/// Solve joint angles for a leg-local target (mm).
///
/// The exact origin means "no movement requested" and hands back `previous`
/// untouched. Targets outside the reachable shell return `IkError::Unreachable`
/// so the caller keeps whatever it last applied.
pub fn solve_leg(
    geometry: &LegGeometry,
    target: [f32; 3],
    previous: LegAngles,
) -> Result<LegAngles, IkError> {
    let [x, y, z] = target;
    if x == 0.0 && y == 0.0 && z == 0.0 {
        return Ok(previous);
    }

    let tibia = geometry.link_tibia;
    let femur = geometry.link_femur;

    let r1 = (x.powi(2) + y.powi(2)).sqrt();
    let theta1 = y.atan2(x);
    let r2 = r1 - geometry.link_coxa;
    let r3 = (r2.powi(2) + z.powi(2)).sqrt();

    let (min, max) = (geometry.min_reach(), geometry.max_reach());
    // A non-finite target gives a NaN reach, which no range contains
    if !(min - REACH_TOLERANCE..=max + REACH_TOLERANCE).contains(&r3) {
        return Err(IkError::Unreachable { reach: r3, min, max });
    }

    let phi2 = clamped_acos((r3.powi(2) + tibia.powi(2) - femur.powi(2)) / (2.0 * r3 * tibia));
    let phi3 = z.atan2(r2);
    let theta2 = phi2 + phi3;
    let theta3 =
        clamped_acos((tibia.powi(2) + femur.powi(2) - r3.powi(2)) / (2.0 * tibia * femur));

    Ok(LegAngles {
        coxa: theta1.to_degrees(),
        tibia: theta2.to_degrees() + CENTER_OFFSET_DEG,
        femur: theta3.to_degrees(),
    })
}

/// Foot position (leg-local, mm) for a set of untrimmed joint angles
pub fn forward_leg(geometry: &LegGeometry, angles: LegAngles) -> [f32; 3] {
    let yaw = angles.coxa.to_radians();
    let tibia_pitch = (angles.tibia - CENTER_OFFSET_DEG).to_radians();
    // Femur direction: tibia direction turned down by the knee's exterior angle
    let femur_pitch = tibia_pitch - (PI - angles.femur.to_radians());

    let radial = geometry.link_coxa
        + geometry.link_tibia * tibia_pitch.cos()
        + geometry.link_femur * femur_pitch.cos();
    let z = geometry.link_tibia * tibia_pitch.sin() + geometry.link_femur * femur_pitch.sin();

    [radial * yaw.cos(), radial * yaw.sin(), z]
}
