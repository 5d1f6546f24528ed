// Motion loop: latest body command -> whole-body IK -> eighteen joint angles
//
// Runs on its own OS thread. The only blocking point is the mailbox take;
// everything else is pure computation plus actuator writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, info, warn};

use crate::kinematics::{BodyIk, BodyIkError, JointAngleSet};
use crate::mailbox::CommandMailbox;
use crate::messages::{BodyCommand, MotionCounters};
use crate::motor::Actuator;
use crate::state::RobotState;

/// Counters shared with the telemetry publisher
#[derive(Debug, Default)]
pub struct MotionStats {
    cycles: AtomicU64,
    unreachable: AtomicU64,
    actuator_faults: AtomicU64,
}

impl MotionStats {
    pub fn snapshot(&self) -> MotionCounters {
        MotionCounters {
            cycles: self.cycles.load(Ordering::Relaxed),
            unreachable: self.unreachable.load(Ordering::Relaxed),
            actuator_faults: self.actuator_faults.load(Ordering::Relaxed),
        }
    }
}

/// What one motion cycle did with its command
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Applied,
    /// Pose rejected; no joint was touched
    Unreachable(BodyIkError),
    /// Pose solved but `failed` joints could not be written
    ActuatorFault { failed: usize },
}

pub struct MotionLoop<A: Actuator> {
    state: Arc<RobotState>,
    mailbox: Arc<CommandMailbox>,
    actuator: A,
    ik: BodyIk,
    stats: Arc<MotionStats>,
}

impl<A: Actuator> MotionLoop<A> {
    pub fn new(state: Arc<RobotState>, mailbox: Arc<CommandMailbox>, actuator: A) -> Self {
        let ik = BodyIk::new(*state.geometry());
        Self {
            state,
            mailbox,
            actuator,
            ik,
            stats: Arc::new(MotionStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<MotionStats> {
        Arc::clone(&self.stats)
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Wait for commands forever
    pub fn run(mut self) {
        info!("Motion loop started");
        loop {
            let command = self.mailbox.take_blocking();
            self.cycle(&command);
        }
    }

    /// Solve one command and drive the joints
    pub fn cycle(&mut self, command: &BodyCommand) -> CycleOutcome {
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);
        debug!("Motion cycle for {:?}", command);

        // One snapshot per cycle so a concurrent trim edit is never half-applied
        let trims = self.state.trims();
        match self.ik.solve(command, &trims) {
            Ok(angles) => self.apply(&angles),
            Err(e) => {
                self.stats.unreachable.fetch_add(1, Ordering::Relaxed);
                warn!("Skipping pose {:?}: {}", command, e);
                CycleOutcome::Unreachable(e)
            }
        }
    }

    /// Drive every joint to the last committed pose with current trims.
    /// At startup that is 90° + trim on each joint.
    pub fn hold_pose(&mut self) -> CycleOutcome {
        let angles = self.ik.held(&self.state.trims());
        info!("Holding pose with current trims");
        self.apply(&angles)
    }

    fn apply(&mut self, angles: &JointAngleSet) -> CycleOutcome {
        let mut failed = 0;
        for (joint, degrees) in angles.joints() {
            if let Err(e) = self.actuator.set_joint_angle(joint, degrees) {
                error!("Joint {} write failed: {}", joint, e);
                failed += 1;
            }
        }

        if failed == 0 {
            debug!("Applied {:?}", angles);
            CycleOutcome::Applied
        } else {
            self.stats
                .actuator_faults
                .fetch_add(failed as u64, Ordering::Relaxed);
            CycleOutcome::ActuatorFault { failed }
        }
    }
}
