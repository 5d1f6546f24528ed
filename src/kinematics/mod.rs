// Hexapod kinematics
//
// Provides:
// - Leg geometry, joint naming and actuator index layout
// - Analytic three-joint leg IK (and forward kinematics to check it)
// - Body pose -> six leg targets with all-or-nothing commit

mod body;
pub mod geometry;
pub mod leg;

pub use body::{BodyIk, BodyIkError, JointAngleSet, leg_targets};
pub use geometry::{JOINT_COUNT, JOINTS_PER_LEG, Joint, LEG_COUNT, LegGeometry, joint_index};
pub use leg::{IkError, LegAngles, forward_leg, solve_leg};
