// Joint actuators for the eighteen leg servos
//
// The motion loop only sees the Actuator trait: enable everything once, then
// set one joint angle (degrees) at a time by global joint index.

use serialport::SerialPort;
use std::io::{Read, Write};
use tracing::{debug, info, warn};

use super::feetech::{FeetechBus, FeetechError, OperatingMode};
use crate::kinematics::JOINT_COUNT;

/// Bus IDs by global joint index (leg * 3 + joint)
pub const SERVO_IDS: [u8; JOINT_COUNT] = [
    1, 2, 3, // leg 1
    4, 5, 6, // leg 2
    7, 8, 9, // leg 3
    10, 11, 12, // leg 4
    13, 14, 15, // leg 5
    16, 17, 18, // leg 6
];

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("joint index {0} out of range (0..{max})", max = JOINT_COUNT)]
    UnknownJoint(usize),

    #[error("joint {joint} asked for non-finite angle {degrees}")]
    InvalidAngle { joint: usize, degrees: f32 },

    #[error("servo {id} not responding to ping")]
    NotResponding { id: u8 },

    #[error(transparent)]
    Bus(#[from] FeetechError),
}

pub trait Actuator: Send {
    /// Power every joint and put it under position control
    fn enable_all(&mut self) -> Result<(), ActuatorError>;

    fn set_joint_angle(&mut self, joint: usize, degrees: f32) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn enable_all(&mut self) -> Result<(), ActuatorError> {
        (**self).enable_all()
    }

    fn set_joint_angle(&mut self, joint: usize, degrees: f32) -> Result<(), ActuatorError> {
        (**self).set_joint_angle(joint, degrees)
    }
}

/// Piecewise-linear map from joint degrees to raw servo position, defined by
/// three (degrees, raw) pairs. Inputs outside the end points are clamped;
/// NaN and infinities have no position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleCurve {
    points: [(f32, f32); 3],
}

impl AngleCurve {
    /// STS3215: 4096 ticks per turn, 90° at mid-travel
    pub const STS3215: Self = Self::three_pairs((0.0, 1024.0), (90.0, 2048.0), (180.0, 3072.0));

    pub const fn three_pairs(low: (f32, f32), mid: (f32, f32), high: (f32, f32)) -> Self {
        Self {
            points: [low, mid, high],
        }
    }

    pub fn raw_for(&self, degrees: f32) -> Option<u16> {
        if !degrees.is_finite() {
            return None;
        }
        let [low, mid, high] = self.points;
        let degrees = degrees.clamp(low.0, high.0);
        let (from, to) = if degrees <= mid.0 { (low, mid) } else { (mid, high) };
        let t = (degrees - from.0) / (to.0 - from.0);
        Some((from.1 + t * (to.1 - from.1)).round().clamp(0.0, u16::MAX as f32) as u16)
    }

    /// Inverse of `raw_for` for a monotonic curve
    pub fn degrees_for(&self, raw: u16) -> f32 {
        let [low, mid, high] = self.points;
        let raw = (raw as f32).clamp(low.1.min(high.1), low.1.max(high.1));
        let on_low_side = (raw - mid.1) * (low.1 - mid.1) >= 0.0;
        let (from, to) = if on_low_side { (mid, low) } else { (mid, high) };
        from.0 + (raw - from.1) / (to.1 - from.1) * (to.0 - from.0)
    }
}

impl Default for AngleCurve {
    fn default() -> Self {
        Self::STS3215
    }
}

/// Eighteen Feetech servos on one serial bus
pub struct FeetechActuator<P: Read + Write = Box<dyn SerialPort>> {
    bus: FeetechBus<P>,
    curve: AngleCurve,
}

impl FeetechActuator {
    pub fn open(port: &str) -> Result<Self, ActuatorError> {
        info!("Opening servo bus on {}", port);
        Ok(Self::new(FeetechBus::open(port)?))
    }
}

impl<P: Read + Write> FeetechActuator<P> {
    pub fn new(bus: FeetechBus<P>) -> Self {
        Self {
            bus,
            curve: AngleCurve::default(),
        }
    }

    pub fn with_curve(mut self, curve: AngleCurve) -> Self {
        self.curve = curve;
        self
    }

    fn servo_id(joint: usize) -> Result<u8, ActuatorError> {
        SERVO_IDS
            .get(joint)
            .copied()
            .ok_or(ActuatorError::UnknownJoint(joint))
    }

    /// Drop torque on every servo (legs go limp)
    pub fn release(&mut self) -> Result<(), ActuatorError> {
        info!("Disabling torque on all servos");
        for id in SERVO_IDS {
            self.bus.set_torque(id, false)?;
        }
        Ok(())
    }
}

impl<P: Read + Write + Send> Actuator for FeetechActuator<P> {
    fn enable_all(&mut self) -> Result<(), ActuatorError> {
        info!("Initializing servos {:?} for position control", SERVO_IDS);

        for id in SERVO_IDS {
            if !self.bus.ping(id)? {
                warn!("Servo {} not responding to ping", id);
                return Err(ActuatorError::NotResponding { id });
            }
            debug!("Servo {} responding", id);
        }
        for id in SERVO_IDS {
            self.bus.set_torque(id, false)?;
            self.bus.set_operating_mode(id, OperatingMode::Position)?;
            self.bus.set_torque(id, true)?;
        }

        info!("Servos initialized successfully");
        Ok(())
    }

    fn set_joint_angle(&mut self, joint: usize, degrees: f32) -> Result<(), ActuatorError> {
        let id = Self::servo_id(joint)?;
        let raw = self
            .curve
            .raw_for(degrees)
            .ok_or(ActuatorError::InvalidAngle { joint, degrees })?;
        debug!("Joint {} (servo {}) -> {:.1}° raw={}", joint, id, degrees, raw);
        self.bus.set_goal_position(id, raw)?;
        Ok(())
    }
}

impl<P: Read + Write> Drop for FeetechActuator<P> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release servos on drop: {}", e);
        }
    }
}

/// Stand-in used when no servo bus is attached; remembers the last angle per joint
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    angles: [Option<f32>; JOINT_COUNT],
    enabled: bool,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self {
            angles: [None; JOINT_COUNT],
            enabled: false,
        }
    }

    pub fn angles(&self) -> &[Option<f32>; JOINT_COUNT] {
        &self.angles
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for SimulatedActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SimulatedActuator {
    fn enable_all(&mut self) -> Result<(), ActuatorError> {
        info!("Simulated servos enabled");
        self.enabled = true;
        Ok(())
    }

    fn set_joint_angle(&mut self, joint: usize, degrees: f32) -> Result<(), ActuatorError> {
        let slot = self
            .angles
            .get_mut(joint)
            .ok_or(ActuatorError::UnknownJoint(joint))?;
        if !degrees.is_finite() {
            return Err(ActuatorError::InvalidAngle { joint, degrees });
        }
        debug!("Simulated joint {} -> {:.1}°", joint, degrees);
        *slot = Some(degrees);
        Ok(())
    }
}
