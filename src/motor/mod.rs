// Joint actuation for the hexapod
//
// Provides:
// - Feetech STS serial bus protocol
// - Actuator trait with Feetech and simulated implementations
// - Degrees -> raw position calibration curve

mod actuator;
pub mod feetech;

pub use actuator::{Actuator, ActuatorError, AngleCurve, FeetechActuator, SERVO_IDS, SimulatedActuator};
pub use feetech::{FeetechBus, FeetechError};
