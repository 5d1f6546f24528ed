// Robot state shared between the motion thread and the calibration console

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::kinematics::{JOINTS_PER_LEG, Joint, LEG_COUNT, LegGeometry};

/// Per-joint trims in whole degrees, indexed [leg][coxa, tibia, femur]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalibrationTable {
    trims: [[i32; JOINTS_PER_LEG]; LEG_COUNT],
}

impl CalibrationTable {
    pub fn from_rows(trims: [[i32; JOINTS_PER_LEG]; LEG_COUNT]) -> Self {
        Self { trims }
    }

    pub fn rows(&self) -> &[[i32; JOINTS_PER_LEG]; LEG_COUNT] {
        &self.trims
    }

    pub fn leg(&self, leg: usize) -> [i32; JOINTS_PER_LEG] {
        self.trims[leg]
    }

    pub fn trim(&self, leg: usize, joint: Joint) -> i32 {
        self.trims[leg][joint.index()]
    }

    /// Add `delta` to a trim and return the new value
    pub fn adjust(&mut self, leg: usize, joint: Joint, delta: i32) -> i32 {
        let slot = &mut self.trims[leg][joint.index()];
        *slot = slot.saturating_add(delta);
        *slot
    }
}

/// Geometry plus live trims. Created once by the runtime and shared by `Arc`.
#[derive(Debug)]
pub struct RobotState {
    geometry: [LegGeometry; LEG_COUNT],
    trims: Mutex<CalibrationTable>,
}

impl RobotState {
    pub fn new(trims: CalibrationTable) -> Self {
        Self::with_geometry(LegGeometry::hexapod(), trims)
    }

    pub fn with_geometry(geometry: [LegGeometry; LEG_COUNT], trims: CalibrationTable) -> Self {
        Self {
            geometry,
            trims: Mutex::new(trims),
        }
    }

    pub fn geometry(&self) -> &[LegGeometry; LEG_COUNT] {
        &self.geometry
    }

    // Every mutation is a single slot store, so a poisoned table is still whole
    fn lock(&self) -> MutexGuard<'_, CalibrationTable> {
        self.trims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consistent copy of all trims
    pub fn trims(&self) -> CalibrationTable {
        *self.lock()
    }

    pub fn adjust_trim(&self, leg: usize, joint: Joint, delta: i32) -> i32 {
        self.lock().adjust(leg, joint, delta)
    }
}
