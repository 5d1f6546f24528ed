// Hexapod IK runtime
//
// Body pose commands arrive over zenoh, are handed to a dedicated motion
// thread through a latest-wins mailbox, solved into eighteen joint angles
// and written to the servo bus. Per-joint trims are adjusted from a line
// console and persisted on request.

pub mod calibration;
pub mod config;
pub mod kinematics;
pub mod mailbox;
pub mod messages;
pub mod motion;
pub mod motor;
pub mod runtime;
pub mod state;
