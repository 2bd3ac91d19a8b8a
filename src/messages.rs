// Message types exchanged with the controller bridge and the motor bridge

use serde::{Deserialize, Serialize};

use crate::drive::kinematics::WheelPosition;
use crate::hardware::{Axis, Button, InputSource, MotorCommand};

/// Which buttons are held in one controller sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonState {
    pub intake_in: bool,
    pub intake_out: bool,
    pub lift_up: bool,
    pub lift_down: bool,
    pub speed_up: bool,
    pub speed_down: bool,
    pub emergency_stop: bool,
}

impl ButtonState {
    pub fn get(&self, button: Button) -> bool {
        match button {
            Button::IntakeIn => self.intake_in,
            Button::IntakeOut => self.intake_out,
            Button::LiftUp => self.lift_up,
            Button::LiftDown => self.lift_down,
            Button::SpeedUp => self.speed_up,
            Button::SpeedDown => self.speed_down,
            Button::EmergencyStop => self.emergency_stop,
        }
    }
}

// Joystick snapshot from teleop -> runtime, one per controller poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerSample {
    pub x: i32,
    pub y: i32,
    pub turn: i32,
    #[serde(default)]
    pub buttons: ButtonState,
}

impl InputSource for ControllerSample {
    fn axis_value(&self, axis: Axis) -> i32 {
        match axis {
            Axis::TranslateX => self.x,
            Axis::TranslateY => self.y,
            Axis::Turn => self.turn,
        }
    }

    fn button_pressed(&self, button: Button) -> bool {
        self.buttons.get(button)
    }
}

/// Competition phase, switched by the field control bridge
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionPhase {
    #[default]
    Disabled,
    Autonomous,
    Driver,
}

/// Velocities of one wheel after a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelTelemetry {
    pub position: WheelPosition,
    pub current: f64,
    pub goal: f64,
}

// Telemetry from runtime -> display, best effort
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Heading of the translation stick in radians, absent when idle
    pub angle: Option<f64>,
    pub speed_scale: f64,
    pub wheels: Vec<WheelTelemetry>,
}

// Motor commands issued during one tick, runtime -> motor bridge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorFrame {
    pub commands: Vec<MotorCommand>,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    Disabled,
}
