// Scripted autonomous routines
//
// A script is an ordered list of timed drive moves, mechanism commands and pauses.
// Scripts are written for the right side of the field and mirrored for the left.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::drive::{DriveRequest, MotionController};
use crate::hardware::{MotorSink, RobotHardware, StopMode, TickClock};
use crate::mechanism::{MechanismAction, MechanismKind};

/// Field side the robot starts on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    /// Hold the sticks at (x, y, turn) for `duration_ms`, then stop the drive
    Drive {
        x: f64,
        y: f64,
        turn: f64,
        duration_ms: u64,
    },
    Mechanism {
        mechanism: MechanismKind,
        action: MechanismAction,
    },
    Pause { duration_ms: u64 },
}

impl ScriptStep {
    /// Mirror across the robot's forward axis
    fn mirrored(self) -> Self {
        match self {
            ScriptStep::Drive {
                x,
                y,
                turn,
                duration_ms,
            } => ScriptStep::Drive {
                x: -x,
                y,
                turn: -turn,
                duration_ms,
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps }
    }

    /// Read a JSON script file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The script as it should run from `side`
    pub fn for_side(&self, side: Side) -> Self {
        match side {
            Side::Right => self.clone(),
            Side::Left => Self::new(self.steps.iter().map(|s| s.mirrored()).collect()),
        }
    }
}

/// Run a script to completion, blocking on the hardware clock between ticks
pub fn run_script<M: MotorSink, C: TickClock>(
    controller: &mut MotionController,
    hw: &mut RobotHardware<M, C>,
    script: &Script,
) {
    info!("Running script with {} steps", script.steps.len());
    for step in &script.steps {
        debug!("Script step {:?}", step);
        match *step {
            ScriptStep::Drive {
                x,
                y,
                turn,
                duration_ms,
            } => {
                controller.timed_move(
                    hw,
                    DriveRequest::new(x, y, turn),
                    Duration::from_millis(duration_ms),
                );
            }
            ScriptStep::Mechanism { mechanism, action } => {
                controller.run_mechanism(hw, mechanism, action);
            }
            ScriptStep::Pause { duration_ms } => {
                let tick = controller.tick_length();
                let ticks = ticks_for(duration_ms, tick);
                for _ in 0..ticks {
                    hw.clock.sleep_until_next_tick(tick);
                }
            }
        }
    }
    info!("Script finished");
}

fn ticks_for(duration_ms: u64, tick: Duration) -> u64 {
    let tick_ms = (tick.as_millis() as u64).max(1);
    duration_ms.div_ceil(tick_ms)
}

/// Non-blocking script executor, advanced once per control tick
///
/// Produces the same tick sequence as `run_script`, but never sleeps, so it can
/// live inside the runtime loop and be dropped at any tick.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    steps: VecDeque<ScriptStep>,
    /// Ticks left in the step at the front, once started
    remaining: Option<u64>,
}

impl ScriptRunner {
    pub fn new(script: &Script) -> Self {
        Self {
            steps: script.steps.iter().copied().collect(),
            remaining: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    /// Advance by one tick. Returns `true` once the script has finished.
    pub fn advance<M: MotorSink, C>(
        &mut self,
        controller: &mut MotionController,
        hw: &mut RobotHardware<M, C>,
    ) -> bool {
        let tick = controller.tick_length();
        while let Some(&step) = self.steps.front() {
            match step {
                ScriptStep::Mechanism { mechanism, action } => {
                    controller.run_mechanism(hw, mechanism, action);
                    self.steps.pop_front();
                }
                ScriptStep::Drive {
                    x,
                    y,
                    turn,
                    duration_ms,
                } => {
                    let remaining = *self
                        .remaining
                        .get_or_insert_with(|| ticks_for(duration_ms, tick));
                    if remaining == 0 {
                        controller.halt(&mut hw.motors, StopMode::Hold);
                        self.finish_step();
                        continue;
                    }
                    controller.script_tick(hw, DriveRequest::new(x, y, turn));
                    self.remaining = Some(remaining - 1);
                    return false;
                }
                ScriptStep::Pause { duration_ms } => {
                    let remaining = *self
                        .remaining
                        .get_or_insert_with(|| ticks_for(duration_ms, tick));
                    if remaining == 0 {
                        self.finish_step();
                        continue;
                    }
                    self.remaining = Some(remaining - 1);
                    return false;
                }
            }
        }
        true
    }

    fn finish_step(&mut self) {
        self.steps.pop_front();
        self.remaining = None;
    }
}
