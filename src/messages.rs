// Define message types for the runtime

use serde::{Deserialize, Serialize};

// Body pose command from teleop/scripts -> runtime
// Translation in mm, rotation in degrees; missing fields default to zero
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyCommand {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl BodyCommand {
    /// False if any field is NaN or infinite (JSON numbers beyond f32 range
    /// parse as infinity)
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

/// Motion loop counters since startup
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MotionCounters {
    pub cycles: u64,
    pub unreachable: u64,
    pub actuator_faults: u64,
}

/// Periodic telemetry sample published by runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    pub health: RuntimeHealth,
    pub motion: MotionCounters,
    /// Milliseconds since the last accepted command, if any arrived
    pub cmd_age_ms: Option<u64>,
}
