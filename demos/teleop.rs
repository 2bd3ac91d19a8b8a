// Keyboard teleop (cargo run --example teleop)
// WASD translate, Z/X turn, R/F speed level, I/K intake, U/J lift,
// Space emergency stop, 1/2/3 phase (disabled/autonomous/driver), Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use omni_drive_runtime::config::{MAX_AXIS_VALUE, TOPIC_CONTROLLER, TOPIC_PHASE};
use omni_drive_runtime::messages::{CompetitionPhase, ControllerSample};

const FULL_STICK: i32 = MAX_AXIS_VALUE as i32;
const INPUT_TIMEOUT_MS: u64 = 100; // Release sticks and buttons after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_controller = session.declare_publisher(TOPIC_CONTROLLER).await?;
    let pub_phase = session.declare_publisher(TOPIC_PHASE).await?;

    info!("Controls: WASD=move, Z/X=turn, R/F=speed, I/K=intake, U/J=lift");
    info!("          Space=stop, 1/2/3=phase, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&pub_controller, &pub_phase).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    pub_controller: &zenoh::pubsub::Publisher<'_>,
    pub_phase: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Persistent controller state
    let mut sample = ControllerSample::default();
    let mut last_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                if pressed {
                    last_input = Instant::now();
                }

                match code {
                    KeyCode::Char('w') if pressed => sample.y = FULL_STICK,
                    KeyCode::Char('s') if pressed => sample.y = -FULL_STICK,
                    KeyCode::Char('a') if pressed => sample.x = -FULL_STICK,
                    KeyCode::Char('d') if pressed => sample.x = FULL_STICK,

                    KeyCode::Char('z') if pressed => sample.turn = -FULL_STICK,
                    KeyCode::Char('x') if pressed => sample.turn = FULL_STICK,

                    KeyCode::Char('r') if pressed => sample.buttons.speed_up = true,
                    KeyCode::Char('f') if pressed => sample.buttons.speed_down = true,
                    KeyCode::Char('i') if pressed => sample.buttons.intake_in = true,
                    KeyCode::Char('k') if pressed => sample.buttons.intake_out = true,
                    KeyCode::Char('u') if pressed => sample.buttons.lift_up = true,
                    KeyCode::Char('j') if pressed => sample.buttons.lift_down = true,
                    KeyCode::Char(' ') if pressed => sample.buttons.emergency_stop = true,

                    KeyCode::Char('1') if pressed => {
                        publish_phase(pub_phase, CompetitionPhase::Disabled).await?
                    }
                    KeyCode::Char('2') if pressed => {
                        publish_phase(pub_phase, CompetitionPhase::Autonomous).await?
                    }
                    KeyCode::Char('3') if pressed => {
                        publish_phase(pub_phase, CompetitionPhase::Driver).await?
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Terminals report no key release, so treat silence as letting go
        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            sample = ControllerSample::default();
        }

        // Always publish at ~50Hz
        pub_controller.put(serde_json::to_string(&sample)?).await?;
    }

    Ok(())
}

async fn publish_phase(
    publisher: &zenoh::pubsub::Publisher<'_>,
    phase: CompetitionPhase,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Phase: {:?}", phase);
    publisher.put(serde_json::to_string(&phase)?).await?;
    Ok(())
}
