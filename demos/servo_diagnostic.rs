// Servo diagnostic: READ-ONLY check of all eighteen leg servos
//
// Nothing is written to the servos; no leg moves.
//
// Usage: cargo run --example servo_diagnostic -- [port]

use hexapod_ik_runtime::config::SERVO_PORT;
use hexapod_ik_runtime::kinematics::{JOINTS_PER_LEG, Joint};
use hexapod_ik_runtime::motor::feetech::{FeetechBus, OperatingMode, Register};
use hexapod_ik_runtime::motor::{AngleCurve, SERVO_IDS};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

fn label(index: usize) -> String {
    let joint = Joint::from_index(index % JOINTS_PER_LEG).map_or("?".to_string(), |j| j.to_string());
    format!("Leg {} {}", index / JOINTS_PER_LEG + 1, joint)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .init();

    let port = std::env::args().nth(1).unwrap_or_else(|| SERVO_PORT.to_string());
    let curve = AngleCurve::default();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Hexapod Servo Diagnostic (READ-ONLY)                ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Serial port: {}", port);
    println!("Expected servo IDs: {:?}", SERVO_IDS);
    println!();

    println!("Step 1: Opening serial port...");
    let mut bus = match FeetechBus::open(&port) {
        Ok(bus) => {
            println!("  ✓ Serial port opened successfully");
            bus
        }
        Err(e) => {
            println!("  ✗ Failed to open serial port: {}", e);
            println!("  - Check the port path and the USB cable");
            return Err(e.into());
        }
    };
    println!();

    println!("Step 2: Pinging servos...");
    let mut responding = Vec::new();
    for (index, &id) in SERVO_IDS.iter().enumerate() {
        print!("  {:<14} (ID {:>2}): ", label(index), id);
        io::stdout().flush()?;
        match bus.ping(id) {
            Ok(true) => {
                println!("✓ RESPONDING");
                responding.push((index, id));
            }
            Ok(false) => println!("✗ NO RESPONSE"),
            Err(e) => println!("✗ ERROR: {}", e),
        }
    }
    println!();
    if responding.len() < SERVO_IDS.len() {
        println!(
            "⚠ {} of {} servos missing; check power, IDs and wiring",
            SERVO_IDS.len() - responding.len(),
            SERVO_IDS.len()
        );
        println!();
    }

    println!("Step 3: Reading servo registers...");
    println!();
    for (index, id) in responding {
        println!("  === {} (ID {}) ===", label(index), id);

        match bus.read_u8(id, Register::OperatingMode) {
            Ok(raw) => match OperatingMode::from_raw(raw) {
                Some(mode) => println!("    Operating Mode: {} ({:?})", raw, mode),
                None => println!("    Operating Mode: {} (Unknown)", raw),
            },
            Err(e) => println!("    Operating Mode: ERROR - {}", e),
        }

        match bus.read_u8(id, Register::TorqueEnable) {
            Ok(val) => {
                let status = if val == 1 { "ENABLED" } else { "disabled" };
                println!("    Torque Enable:  {} ({})", val, status);
            }
            Err(e) => println!("    Torque Enable:  ERROR - {}", e),
        }

        match bus.read_u8(id, Register::PresentVoltage) {
            Ok(val) => println!("    Voltage:        {:.1} V", val as f32 / 10.0),
            Err(e) => println!("    Voltage:        ERROR - {}", e),
        }

        match bus.read_u8(id, Register::PresentTemperature) {
            Ok(val) => println!("    Temperature:    {} °C", val),
            Err(e) => println!("    Temperature:    ERROR - {}", e),
        }

        match bus.present_position(id) {
            Ok(pos) => println!("    Present Position: {} ({:.1}°)", pos, curve.degrees_for(pos)),
            Err(e) => println!("    Present Position: ERROR - {}", e),
        }
        println!();
    }

    println!("Diagnostic complete. Joints at rest with zero trim should read near 90°.");
    Ok(())
}
