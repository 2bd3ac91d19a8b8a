// Tick timing, topics, drive limits and the loadable robot configuration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drive::kinematics::{DriveLayout, WheelPosition};
use crate::hardware::MotorId;

// Control loop frequency (one tick every 20ms)
pub const LOOP_HZ: u64 = 50;
pub const TICK_LENGTH: Duration = Duration::from_millis(1000 / LOOP_HZ);

// Controller sample timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CONTROLLER: &str = "robot/cmd/controller"; // joystick samples
pub const TOPIC_PHASE: &str = "robot/cmd/phase"; // competition phase changes
pub const TOPIC_RT_DRIVE: &str = "robot/rt/motors"; // motor commands
pub const TOPIC_TELEMETRY: &str = "robot/state/telemetry"; // wheel velocities, angle
pub const TOPIC_HEALTH: &str = "robot/state/health"; // health status

/// Largest magnitude a joystick axis reports
pub const MAX_AXIS_VALUE: f64 = 127.0;

/// Top wheel speed in rpm
pub const MAX_SPEED: f64 = 100.0;

/// Net stick displacement (x and y combined) below which no translation is issued
pub const MIN_MOVEMENT_DISPLACEMENT: f64 = 10.0;

/// Turning stick displacement that must be exceeded before the chassis rotates
pub const MIN_TURNING_DISPLACEMENT: f64 = 10.0;

/// Fraction of the goal change applied per tick; 1/20 reaches the goal in 20 ticks (~400ms)
pub const RAMP_CONSTANT: f64 = 1.0 / 20.0;

/// Velocity samples kept per wheel for drift correction
pub const HISTORY_CAPACITY: usize = 10;

/// Share of the rolling average subtracted when slip is predicted
pub const DRIFT_CORRECTION_FRACTION: f64 = 0.25;

/// Fixed speed of intake and lift motors (rpm)
pub const MECHANISM_RPM: f64 = 200.0;

/// Speed scales the operator can step through
pub const SPEED_LEVELS: [f64; 3] = [0.4, 0.8, 1.0];

/// Error types for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {reason}")]
    Invalid { reason: String },
}

/// One drive wheel: where it sits and which motor spins it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub position: WheelPosition,
    pub motor: MotorId,
    /// Motor is mounted so that positive rpm drives the chassis backward
    #[serde(default)]
    pub reversed: bool,
}

/// Drive limits and dead zones used by the kinematics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveLimits {
    pub max_speed: f64,
    pub max_axis_value: f64,
    pub min_movement_displacement: f64,
    pub min_turning_displacement: f64,
}

impl Default for DriveLimits {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            max_axis_value: MAX_AXIS_VALUE,
            min_movement_displacement: MIN_MOVEMENT_DISPLACEMENT,
            min_turning_displacement: MIN_TURNING_DISPLACEMENT,
        }
    }
}

/// Anti-slip heuristic settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftCorrectionConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub fraction: f64,
}

impl Default for DriftCorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: HISTORY_CAPACITY,
            fraction: DRIFT_CORRECTION_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub layout: DriveLayout,
    pub wheels: Vec<WheelConfig>,
    pub limits: DriveLimits,
    pub ramp_constant: f64,
    pub drift_correction: DriftCorrectionConfig,
}

impl Default for DriveConfig {
    /// Four-wheel X layout with the east motors mounted reversed
    fn default() -> Self {
        let wheel = |position, motor, reversed| WheelConfig {
            position,
            motor,
            reversed,
        };
        Self {
            layout: DriveLayout::OmniX,
            wheels: vec![
                wheel(WheelPosition::NorthEast, 11, true),
                wheel(WheelPosition::NorthWest, 20, false),
                wheel(WheelPosition::SouthEast, 10, true),
                wheel(WheelPosition::SouthWest, 9, false),
            ],
            limits: DriveLimits::default(),
            ramp_constant: RAMP_CONSTANT,
            drift_correction: DriftCorrectionConfig::default(),
        }
    }
}

impl DriveConfig {
    /// Two-wheel tank layout
    pub fn differential(left: MotorId, right: MotorId) -> Self {
        Self {
            layout: DriveLayout::Differential,
            wheels: vec![
                WheelConfig {
                    position: WheelPosition::Left,
                    motor: left,
                    reversed: false,
                },
                WheelConfig {
                    position: WheelPosition::Right,
                    motor: right,
                    reversed: true,
                },
            ],
            ..Self::default()
        }
    }
}

/// Motors and speed for an auxiliary mechanism (intake, lift)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismConfig {
    pub motors: Vec<MotorId>,
    #[serde(default = "default_mechanism_rpm")]
    pub rpm: f64,
    /// Swap which spin direction counts as forward (intake in / lift up)
    #[serde(default)]
    pub inverted: bool,
}

fn default_mechanism_rpm() -> f64 {
    MECHANISM_RPM
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub drive: DriveConfig,
    pub tick_ms: u64,
    pub cmd_timeout_ms: u64,
    pub intake: MechanismConfig,
    pub lift: MechanismConfig,
    pub speed_levels: Vec<f64>,
    pub initial_speed_level: usize,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            drive: DriveConfig::default(),
            tick_ms: TICK_LENGTH.as_millis() as u64,
            cmd_timeout_ms: CMD_TIMEOUT.as_millis() as u64,
            intake: MechanismConfig {
                motors: vec![1, 8],
                rpm: MECHANISM_RPM,
                inverted: true,
            },
            lift: MechanismConfig {
                motors: vec![5, 7],
                rpm: MECHANISM_RPM,
                inverted: true,
            },
            speed_levels: SPEED_LEVELS.to_vec(),
            initial_speed_level: SPEED_LEVELS.len() - 1,
        }
    }
}

impl RobotConfig {
    /// Read a JSON config file; missing fields fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: RobotConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn tick_length(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn cmd_timeout(&self) -> Duration {
        Duration::from_millis(self.cmd_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid { reason });

        let ramp = self.drive.ramp_constant;
        if !(ramp > 0.0 && ramp <= 1.0) {
            return invalid(format!("ramp_constant {} must be in (0, 1]", ramp));
        }
        if self.tick_ms == 0 {
            return invalid("tick_ms must be nonzero".to_string());
        }
        if self.drive.limits.max_axis_value <= 0.0 {
            return invalid("max_axis_value must be positive".to_string());
        }
        if self.drive.drift_correction.capacity == 0 {
            return invalid("drift correction capacity must be nonzero".to_string());
        }
        if self.speed_levels.is_empty() {
            return invalid("at least one speed level is required".to_string());
        }
        if self.initial_speed_level >= self.speed_levels.len() {
            return invalid(format!(
                "initial_speed_level {} out of range (have {} levels)",
                self.initial_speed_level,
                self.speed_levels.len()
            ));
        }

        let expected = self.drive.layout.positions();
        if self.drive.wheels.len() != expected.len()
            || !expected
                .iter()
                .all(|pos| self.drive.wheels.iter().any(|w| w.position == *pos))
        {
            return invalid(format!(
                "{:?} layout needs exactly one wheel at each of {:?}",
                self.drive.layout, expected
            ));
        }
        Ok(())
    }
}
