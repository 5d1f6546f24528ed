// Process wiring: zenoh command link, motion thread, calibration console
//
// The tokio context only receives commands and publishes telemetry. It hands
// each command to the motion thread through the mailbox and never waits on it.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::calibration::{CalibrationSession, CalibrationStore, JsonFileStore, SerialLines, StdioLines};
use crate::config::{CMD_TIMEOUT, CONSOLE_BAUDRATE, ConsoleTarget, Settings, TELEMETRY_PERIOD, TOPIC_HEALTH};
use crate::mailbox::CommandMailbox;
use crate::messages::{BodyCommand, MotionCounters, RuntimeHealth, Telemetry};
use crate::motion::MotionLoop;
use crate::motor::{Actuator, FeetechActuator, SimulatedActuator};
use crate::state::{CalibrationTable, RobotState};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Receiving side of the command transport
pub struct CommandLink {
    mailbox: Arc<CommandMailbox>,
    received_at: Option<Instant>,
    health: RuntimeHealth,
}

impl CommandLink {
    pub fn new(mailbox: Arc<CommandMailbox>) -> Self {
        Self {
            mailbox,
            received_at: None,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Parse a JSON sample and forward it. Malformed payloads and commands
    /// with non-finite fields are dropped.
    pub fn on_payload(&mut self, payload: &[u8]) -> bool {
        match serde_json::from_slice::<BodyCommand>(payload) {
            Ok(cmd) if !cmd.is_finite() => {
                warn!("Dropping command with non-finite field: {:?}", cmd);
                false
            }
            Ok(cmd) => {
                self.on_command(cmd);
                true
            }
            Err(e) => {
                warn!("Failed to parse command: {}", e);
                false
            }
        }
    }

    pub fn on_command(&mut self, cmd: BodyCommand) {
        if self.received_at.is_none() {
            info!("First command received: {:?}", cmd);
        }
        self.received_at = Some(Instant::now());
        if self.mailbox.publish(cmd) {
            debug!("Unread command superseded by {:?}", cmd);
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Recompute health as of `now`, logging transitions
    fn update_health(&mut self, now: Instant) -> RuntimeHealth {
        let fresh = self
            .received_at
            .is_some_and(|at| now.saturating_duration_since(at) <= CMD_TIMEOUT);
        let health = if fresh {
            RuntimeHealth::Ok
        } else {
            RuntimeHealth::CmdStale
        };

        if health != self.health {
            match health {
                RuntimeHealth::Ok => info!("Commands flowing again"),
                RuntimeHealth::CmdStale => warn!(
                    "No command for {}ms, holding last pose",
                    CMD_TIMEOUT.as_millis()
                ),
            }
        }
        self.health = health;
        health
    }

    pub fn telemetry(&mut self, motion: MotionCounters) -> Telemetry {
        let now = Instant::now();
        let health = self.update_health(now);
        Telemetry {
            health,
            motion,
            cmd_age_ms: self
                .received_at
                .map(|at| now.saturating_duration_since(at).as_millis() as u64),
        }
    }
}

fn load_trims(store: &JsonFileStore) -> CalibrationTable {
    match store.load_table() {
        Ok(Some(table)) => table,
        Ok(None) => {
            info!("No saved calibration, starting with zero trims");
            CalibrationTable::default()
        }
        Err(e) => {
            warn!("Ignoring calibration at {}: {}", store.path().display(), e);
            CalibrationTable::default()
        }
    }
}

fn run_console(target: ConsoleTarget, state: Arc<RobotState>, store: JsonFileStore) -> Result<(), BoxError> {
    match target {
        ConsoleTarget::Stdio => CalibrationSession::new(state, StdioLines::new(), store).run()?,
        ConsoleTarget::Serial(device) => {
            info!("Calibration console on {}", device);
            let lines = SerialLines::open(&device, CONSOLE_BAUDRATE)?;
            CalibrationSession::new(state, lines, store).run()?
        }
    }
    Ok(())
}

pub async fn run(settings: Settings) -> Result<(), BoxError> {
    let store = JsonFileStore::new(&settings.calibration);
    let state = Arc::new(RobotState::new(load_trims(&store)));
    let mailbox = Arc::new(CommandMailbox::new());

    let mut actuator: Box<dyn Actuator> = if settings.simulate {
        info!("Simulation mode, no servo bus");
        Box::new(SimulatedActuator::new())
    } else {
        Box::new(FeetechActuator::open(&settings.port)?)
    };
    actuator.enable_all()?;

    let mut motion = MotionLoop::new(Arc::clone(&state), Arc::clone(&mailbox), actuator);
    motion.hold_pose();
    let stats = motion.stats();
    thread::Builder::new()
        .name("motion".to_string())
        .spawn(move || motion.run())?;

    if let Some(target) = settings.console_target() {
        let state = Arc::clone(&state);
        let store = store.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = run_console(target, state, store) {
                error!("Calibration console failed: {}", e);
            }
        });
    }

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(settings.cmd_topic.clone()).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut link = CommandLink::new(mailbox);
    let mut tick = interval(TELEMETRY_PERIOD);

    info!(
        "Runtime started: {}ms telemetry, {}ms stale threshold",
        TELEMETRY_PERIOD.as_millis(),
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", settings.cmd_topic);
    info!("Publishing to: {}", TOPIC_HEALTH);

    loop {
        tokio::select! {
            sample = subscriber.recv_async() => {
                let sample = sample?;
                link.on_payload(&sample.payload().to_bytes());
            }
            _ = tick.tick() => {
                let telemetry = link.telemetry(stats.snapshot());
                pub_health.put(serde_json::to_string(&telemetry)?).await?;
            }
        }
    }
}
