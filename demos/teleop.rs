// Keyboard teleop for the body pose: hold keys to offset, release to return
//
// W/S forward/back (-x/+x), A/D left/right (-y/+y), R/F up/down, I/K pitch,
// J/L roll, Z/X yaw, +/- step size, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use hexapod_ik_runtime::config::TOPIC_CMD_BODY;
use hexapod_ik_runtime::messages::BodyCommand;
use std::time::{Duration, Instant};
use tracing::info;

const STEPS_MM: [f32; 3] = [5.0, 10.0, 20.0];
const STEPS_DEG: [f32; 3] = [3.0, 6.0, 12.0];
const INPUT_TIMEOUT_MS: u64 = 150; // Return to neutral after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_BODY).await?;

    info!("Controls: WASD=move, R/F=z, I/K=pitch, J/L=roll, Z/X=yaw, +/-=step, Q=quit");
    print_step(0);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut step_idx: usize = 0;
    let mut cmd = BodyCommand::default();
    let mut last_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let (mm, deg) = (STEPS_MM[step_idx], STEPS_DEG[step_idx]);

                let mut moved = true;
                match code {
                    KeyCode::Char('w') if pressed => cmd.x = -mm,
                    KeyCode::Char('s') if pressed => cmd.x = mm,
                    KeyCode::Char('a') if pressed => cmd.y = -mm,
                    KeyCode::Char('d') if pressed => cmd.y = mm,
                    KeyCode::Char('r') if pressed => cmd.z = mm,
                    KeyCode::Char('f') if pressed => cmd.z = -mm,
                    KeyCode::Char('i') if pressed => cmd.pitch = deg,
                    KeyCode::Char('k') if pressed => cmd.pitch = -deg,
                    KeyCode::Char('j') if pressed => cmd.roll = -deg,
                    KeyCode::Char('l') if pressed => cmd.roll = deg,
                    KeyCode::Char('z') if pressed => cmd.yaw = deg,
                    KeyCode::Char('x') if pressed => cmd.yaw = -deg,

                    KeyCode::Char('+') | KeyCode::Char('=') if pressed => {
                        step_idx = (step_idx + 1).min(STEPS_MM.len() - 1);
                        print_step(step_idx);
                        moved = false;
                    }
                    KeyCode::Char('-') if pressed => {
                        step_idx = step_idx.saturating_sub(1);
                        print_step(step_idx);
                        moved = false;
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,
                    _ => moved = false,
                }
                if moved {
                    last_input = Instant::now();
                }
            }
        }

        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            cmd = BodyCommand::default();
        }

        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_step(idx: usize) {
    info!("Step: {} mm / {} deg", STEPS_MM[idx], STEPS_DEG[idx]);
}
