// Body pose -> six leg-local foot targets -> joint angles
//
// The command displaces every neutral foot point: it is rotated about the
// body origin (roll, pitch, yaw) and then translated. Each result is taken
// relative to its coxa and expressed in that leg's frame.

use nalgebra::{Rotation3, Vector3};

use super::geometry::{JOINTS_PER_LEG, Joint, LEG_COUNT, LegGeometry, NEUTRAL_REACH, STANCE_Z};
use super::leg::{IkError, LegAngles, solve_leg};
use crate::messages::BodyCommand;
use crate::state::CalibrationTable;

/// Final per-joint angles for one cycle, trims included
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngleSet {
    legs: [LegAngles; LEG_COUNT],
}

impl JointAngleSet {
    pub fn new(legs: [LegAngles; LEG_COUNT]) -> Self {
        Self { legs }
    }

    pub fn leg(&self, leg: usize) -> LegAngles {
        self.legs[leg]
    }

    pub fn angle(&self, leg: usize, joint: Joint) -> f32 {
        self.legs[leg].as_array()[joint.index()]
    }

    /// (global joint index, degrees) for all eighteen joints
    pub fn joints(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.legs.iter().enumerate().flat_map(|(leg, angles)| {
            angles
                .as_array()
                .into_iter()
                .enumerate()
                .map(move |(joint, degrees)| (leg * JOINTS_PER_LEG + joint, degrees))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("leg {} rejected the pose: {source}", .leg + 1)]
pub struct BodyIkError {
    pub leg: usize,
    pub source: IkError,
}

/// Leg-local foot targets (mm) for a body command
pub fn leg_targets(
    command: &BodyCommand,
    geometry: &[LegGeometry; LEG_COUNT],
) -> [[f32; 3]; LEG_COUNT] {
    let rotation = Rotation3::from_euler_angles(
        command.roll.to_radians(),
        command.pitch.to_radians(),
        command.yaw.to_radians(),
    );
    let translation = Vector3::new(command.x, command.y, command.z);

    geometry.map(|leg| {
        let (ux, uy) = leg.outward_axis();
        let coxa = Vector3::new(ux, uy, 0.0) * leg.mount_offset;
        let reach = leg.mount_offset + NEUTRAL_REACH;
        let neutral_foot = Vector3::new(ux * reach, uy * reach, STANCE_Z);

        let foot = rotation * neutral_foot + translation - coxa;
        let (x, y) = leg.to_leg_frame(foot.x, foot.y);
        [x, y, foot.z]
    })
}

/// Whole-body solver holding the last angles that were committed.
///
/// A pose is committed only if all six legs solve; otherwise every leg keeps
/// its previous angles.
#[derive(Debug, Clone)]
pub struct BodyIk {
    geometry: [LegGeometry; LEG_COUNT],
    previous: [LegAngles; LEG_COUNT],
}

impl BodyIk {
    pub fn new(geometry: [LegGeometry; LEG_COUNT]) -> Self {
        Self {
            geometry,
            previous: [LegAngles::NEUTRAL; LEG_COUNT],
        }
    }

    /// Untrimmed angles of the last committed pose
    pub fn previous(&self) -> &[LegAngles; LEG_COUNT] {
        &self.previous
    }

    /// Last committed pose with the given trims applied
    pub fn held(&self, trims: &CalibrationTable) -> JointAngleSet {
        JointAngleSet::new(std::array::from_fn(|leg| {
            self.previous[leg].with_trim(trims.leg(leg))
        }))
    }

    pub fn solve(
        &mut self,
        command: &BodyCommand,
        trims: &CalibrationTable,
    ) -> Result<JointAngleSet, BodyIkError> {
        let targets = leg_targets(command, &self.geometry);

        let mut solved = self.previous;
        for (leg, target) in targets.iter().enumerate() {
            solved[leg] = solve_leg(&self.geometry[leg], *target, self.previous[leg])
                .map_err(|source| BodyIkError { leg, source })?;
        }

        self.previous = solved;
        Ok(self.held(trims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(x: f32, y: f32, z: f32) -> BodyCommand {
        BodyCommand {
            x,
            y,
            z,
            ..BodyCommand::default()
        }
    }

    fn assert_mirrored(a: LegAngles, b: LegAngles) {
        assert!(
            (a.coxa - 90.0 + (b.coxa - 90.0)).abs() < 1e-3,
            "coxa not mirrored: {} vs {}",
            a.coxa,
            b.coxa
        );
        assert!((a.tibia - b.tibia).abs() < 1e-3, "tibia {} vs {}", a.tibia, b.tibia);
        assert!((a.femur - b.femur).abs() < 1e-3, "femur {} vs {}", a.femur, b.femur);
    }

    #[test]
    fn test_zero_command_is_neutral_stance() {
        let targets = leg_targets(&BodyCommand::default(), &LegGeometry::hexapod());
        for target in targets {
            assert!(target[0].abs() < 1e-4, "{:?}", target);
            assert!((target[1] - NEUTRAL_REACH).abs() < 1e-4, "{:?}", target);
            assert!((target[2] - STANCE_Z).abs() < 1e-4, "{:?}", target);
        }
    }

    #[test]
    fn test_translation_rotated_into_each_leg() {
        let targets = leg_targets(&command(10.0, 0.0, 0.0), &LegGeometry::hexapod());
        // Leg 2 shares the body axes, leg 5 faces the opposite way
        assert!((targets[1][0] - 10.0).abs() < 1e-4);
        assert!((targets[4][0] + 10.0).abs() < 1e-4);
        // Leg 1 at 60°: x' = cos60*x, y' = reach - sin60*x
        assert!((targets[0][0] - 5.0).abs() < 1e-4);
        assert!((targets[0][1] - (NEUTRAL_REACH - 8.660_254)).abs() < 1e-3);
        // Opposite legs see opposite offsets
        for (a, b) in [(0, 3), (1, 4), (2, 5)] {
            assert!((targets[a][0] + targets[b][0]).abs() < 1e-3);
            assert!(((targets[a][1] - NEUTRAL_REACH) + (targets[b][1] - NEUTRAL_REACH)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_x_translation_mirrors_opposite_legs() {
        let mut ik = BodyIk::new(LegGeometry::hexapod());
        let angles = ik
            .solve(&command(10.0, 0.0, 0.0), &CalibrationTable::default())
            .unwrap();
        assert_mirrored(angles.leg(1), angles.leg(4));
    }

    #[test]
    fn test_tangential_translation_mirrors_leg_one_and_four() {
        // Along leg 1's tangent: (10 cos60, 10 sin60)
        let mut ik = BodyIk::new(LegGeometry::hexapod());
        let angles = ik
            .solve(&command(5.0, 8.660_254, 0.0), &CalibrationTable::default())
            .unwrap();
        assert_mirrored(angles.leg(0), angles.leg(3));
    }

    #[test]
    fn test_z_applies_to_every_leg() {
        let targets = leg_targets(&command(0.0, 0.0, 7.0), &LegGeometry::hexapod());
        for target in targets {
            assert!((target[2] - (STANCE_Z + 7.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_roll_tilts_sides_in_opposite_directions() {
        let roll = BodyCommand {
            roll: 10.0,
            ..BodyCommand::default()
        };
        let targets = leg_targets(&roll, &LegGeometry::hexapod());
        // Roll is about x: leg 2 (+y) rises and leg 5 (-y) drops
        let plus_y = targets[1][2] - STANCE_Z;
        let minus_y = targets[4][2] - STANCE_Z;
        assert!(plus_y.abs() > 1.0, "roll should move leg 2, dz={}", plus_y);
        assert!(plus_y > 0.0 && minus_y < 0.0, "dz {} vs {}", plus_y, minus_y);
        assert!((plus_y + minus_y).abs() < 1.0, "dz {} vs {}", plus_y, minus_y);
    }

    #[test]
    fn test_yaw_turns_every_coxa_the_same_way() {
        let mut ik = BodyIk::new(LegGeometry::hexapod());
        let trims = CalibrationTable::default();
        let neutral = ik.solve(&BodyCommand::default(), &trims).unwrap();
        let yawed = ik
            .solve(
                &BodyCommand {
                    yaw: 10.0,
                    ..BodyCommand::default()
                },
                &trims,
            )
            .unwrap();
        let first = yawed.leg(0).coxa - neutral.leg(0).coxa;
        assert!(first.abs() > 1.0);
        for leg in 1..LEG_COUNT {
            let delta = yawed.leg(leg).coxa - neutral.leg(leg).coxa;
            assert!((delta - first).abs() < 1e-2, "leg {}: {} vs {}", leg, delta, first);
        }
    }

    #[test]
    fn test_unreachable_leg_keeps_all_previous_angles() {
        let mut ik = BodyIk::new(LegGeometry::hexapod());
        let trims = CalibrationTable::default();
        ik.solve(&command(10.0, 0.0, 0.0), &trims).unwrap();
        let before = *ik.previous();

        // Pushes leg 2 past full stretch while other legs could still solve
        let err = ik.solve(&command(0.0, 100.0, 0.0), &trims).unwrap_err();
        assert!(matches!(err.source, IkError::Unreachable { .. }));
        assert_eq!(*ik.previous(), before);
    }

    #[test]
    fn test_trims_applied_after_solving() {
        let mut ik = BodyIk::new(LegGeometry::hexapod());
        let mut trims = CalibrationTable::default();
        let plain = ik.solve(&BodyCommand::default(), &trims).unwrap();

        trims.adjust(2, Joint::Femur, -4);
        let trimmed = ik.solve(&BodyCommand::default(), &trims).unwrap();
        assert_eq!(trimmed.angle(2, Joint::Femur), plain.angle(2, Joint::Femur) - 4.0);
        assert_eq!(trimmed.angle(2, Joint::Coxa), plain.angle(2, Joint::Coxa));
        // The committed pose stays untrimmed
        assert_eq!(ik.previous()[2], plain.leg(2));
    }

    #[test]
    fn test_joint_iteration_covers_all_indices() {
        let set = BodyIk::new(LegGeometry::hexapod()).held(&CalibrationTable::default());
        let indices: Vec<usize> = set.joints().map(|(index, _)| index).collect();
        assert_eq!(indices, (0..LEG_COUNT * JOINTS_PER_LEG).collect::<Vec<_>>());
    }
}
