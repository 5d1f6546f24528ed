// Timeouts, topics, hardware defaults and command-line settings
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

// Telemetry publish period
pub const TELEMETRY_PERIOD: Duration = Duration::from_millis(100);

// A command older than this marks the runtime stale (reported, pose is held)
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_BODY: &str = "hexapod/cmd/body"; // body pose commands
pub const TOPIC_HEALTH: &str = "hexapod/state/health"; // telemetry

// Serial port for the Feetech servo bus
pub const SERVO_PORT: &str = "/dev/ttyACM0";

// Trim table location
pub const CALIBRATION_FILE: &str = "calibration.json";

// Baud rate when the calibration console is a serial device
pub const CONSOLE_BAUDRATE: u32 = 115_200;

/// Where the calibration console reads and writes lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdio,
    Serial(String),
}

/// Hexapod body-pose runtime
#[derive(Parser, Debug, Clone)]
#[command(name = "hexapod-ik-runtime")]
#[command(version)]
#[command(about = "Body pose commands over zenoh -> eighteen servo angles")]
pub struct Settings {
    /// Serial port of the servo bus
    #[arg(short, long, default_value = SERVO_PORT)]
    pub port: String,

    /// Drive a simulated actuator instead of the servo bus
    #[arg(short, long)]
    pub simulate: bool,

    /// Trim table file
    #[arg(short, long, value_name = "PATH", default_value = CALIBRATION_FILE)]
    pub calibration: PathBuf,

    /// Start the calibration console on `stdio` or a serial device path
    #[arg(long, value_name = "stdio|DEVICE")]
    pub console: Option<String>,

    /// Topic to receive body commands on
    #[arg(long, default_value = TOPIC_CMD_BODY)]
    pub cmd_topic: String,
}

impl Settings {
    pub fn console_target(&self) -> Option<ConsoleTarget> {
        self.console.as_deref().map(|console| match console {
            "stdio" | "-" => ConsoleTarget::Stdio,
            device => ConsoleTarget::Serial(device.to_string()),
        })
    }
}
