// Fixed-rate control loop with watchdog and competition phases
// Note: the watchdog stops the robot if controller samples stop arriving, e.g. when
// the teleop bridge crashes, instead of driving on with the last stick position.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use crate::autonomous::{Script, ScriptRunner, Side};
use crate::config::{
    RobotConfig, TOPIC_CONTROLLER, TOPIC_HEALTH, TOPIC_PHASE, TOPIC_RT_DRIVE, TOPIC_TELEMETRY,
};
use crate::drive::MotionController;
use crate::hardware::{CommandBuffer, RobotHardware, ThreadClock};
use crate::messages::{
    CompetitionPhase, ControllerSample, MotorFrame, RuntimeHealth, TelemetryFrame,
};

/// Startup options, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub side: Side,
    pub phase: CompetitionPhase,
}

/// Everything the runtime emits for one tick
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub motors: MotorFrame,
    pub telemetry: TelemetryFrame,
    pub health: RuntimeHealth,
}

pub struct Runtime {
    controller: MotionController,
    hardware: RobotHardware<CommandBuffer, ThreadClock>,
    cmd_timeout: Duration,
    latest_sample: Option<ControllerSample>,
    sample_received_at: Option<Instant>,
    health: RuntimeHealth,
    phase: CompetitionPhase,
    script: Option<Script>,
    runner: Option<ScriptRunner>,
}

impl Runtime {
    pub fn new(config: &RobotConfig, script: Option<Script>) -> Self {
        Self {
            controller: MotionController::new(config),
            hardware: RobotHardware::new(CommandBuffer::new(), ThreadClock),
            cmd_timeout: config.cmd_timeout(),
            latest_sample: None,
            sample_received_at: None,
            health: RuntimeHealth::Disabled,
            phase: CompetitionPhase::Disabled,
            script,
            runner: None,
        }
    }

    /// Process incoming controller sample
    pub fn on_sample(&mut self, sample: ControllerSample, now: Instant) {
        self.latest_sample = Some(sample);
        self.sample_received_at = Some(now);
    }

    /// Switch competition phase. Any change stops the robot first.
    pub fn on_phase(&mut self, phase: CompetitionPhase) {
        if phase == self.phase {
            return;
        }
        info!("Phase {:?} -> {:?}", self.phase, phase);
        self.controller.emergency_stop(&mut self.hardware);
        self.phase = phase;

        self.runner = match phase {
            CompetitionPhase::Autonomous => match &self.script {
                Some(script) => Some(ScriptRunner::new(script)),
                None => {
                    warn!("Autonomous phase but no script loaded");
                    None
                }
            },
            _ => None,
        };
    }

    /// Advance one tick and collect what should be published
    pub fn step(&mut self, now: Instant) -> TickOutput {
        match self.phase {
            CompetitionPhase::Disabled => {
                self.health = RuntimeHealth::Disabled;
            }
            CompetitionPhase::Autonomous => {
                self.health = RuntimeHealth::Ok;
                if let Some(runner) = &mut self.runner {
                    if runner.advance(&mut self.controller, &mut self.hardware) {
                        info!("Autonomous script complete");
                        self.runner = None;
                    }
                }
            }
            CompetitionPhase::Driver => self.driver_step(now),
        }

        TickOutput {
            motors: MotorFrame {
                commands: self.hardware.motors.drain(),
            },
            telemetry: self.controller.telemetry(),
            health: self.health,
        }
    }

    fn driver_step(&mut self, now: Instant) {
        let fresh = match (self.latest_sample, self.sample_received_at) {
            (Some(sample), Some(at)) if now.saturating_duration_since(at) <= self.cmd_timeout => {
                Some(sample)
            }
            _ => None,
        };

        match fresh {
            Some(sample) => {
                self.health = RuntimeHealth::Ok;
                self.controller.operator_tick(&mut self.hardware, &sample);
            }
            None => {
                // Watchdog triggered - stop the robot once
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Controller samples stale, stopping robot");
                    self.controller.emergency_stop(&mut self.hardware);
                }
                self.health = RuntimeHealth::CmdStale;
            }
        }
    }

    pub fn phase(&self) -> CompetitionPhase {
        self.phase
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn controller(&self) -> &MotionController {
        &self.controller
    }
}

pub async fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match &options.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RobotConfig::load(path)?
        }
        None => RobotConfig::default(),
    };
    let script = match &options.script {
        Some(path) => {
            info!("Loading {:?} side script from {}", options.side, path.display());
            Some(Script::load(path)?.for_side(options.side))
        }
        None => None,
    };

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_controller = session.declare_subscriber(TOPIC_CONTROLLER).await?;
    let sub_phase = session.declare_subscriber(TOPIC_PHASE).await?;
    let pub_motors = session.declare_publisher(TOPIC_RT_DRIVE).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_TELEMETRY).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(&config, script);
    runtime.on_phase(options.phase);
    let mut tick = interval(config.tick_length());

    info!(
        "Runtime started: {}ms tick, {}ms watchdog timeout",
        config.tick_ms, config.cmd_timeout_ms
    );
    info!("Subscribed to: {}, {}", TOPIC_CONTROLLER, TOPIC_PHASE);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_RT_DRIVE, TOPIC_TELEMETRY, TOPIC_HEALTH
    );

    loop {
        tick.tick().await;

        // 1. Apply phase changes first so a stop takes effect this tick
        while let Ok(Some(sample)) = sub_phase.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<CompetitionPhase>(&payload) {
                Ok(phase) => runtime.on_phase(phase),
                Err(e) => warn!("Failed to parse phase: {}", e),
            }
        }

        // 2. Drain all pending controller samples (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_controller.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<ControllerSample>(&payload) {
                Ok(cmd) => runtime.on_sample(cmd, Instant::now()),
                Err(e) => warn!("Failed to parse controller sample: {}", e),
            }
        }

        // 3. Run the tick (includes watchdog logic)
        let output = runtime.step(Instant::now());

        // 4. Publish motor commands, telemetry and health
        if !output.motors.commands.is_empty() {
            pub_motors.put(serde_json::to_string(&output.motors)?).await?;
        }
        pub_telemetry
            .put(serde_json::to_string(&output.telemetry)?)
            .await?;
        pub_health.put(serde_json::to_string(&output.health)?).await?;
    }
}
