// Stick-to-wheel kinematics for the X omni base and the two-wheel tank base
// Converts joystick displacement (x, y, turn) into per-wheel goal velocities.
//
// Goals are "chassis-forward": a positive goal pushes the robot forward at that
// wheel's corner. Motor polarity is applied later, when commands are issued.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DriveLimits;
use crate::hardware::{Axis, InputSource};

use super::error::{DriveError, Result};

/// Logical wheel positions, named by compass corner with north at the front (intake)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPosition {
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Left,
    Right,
}

impl WheelPosition {
    /// Angle of the wheel's diagonal on the unit circle (X layout only)
    pub fn mount_angle(&self) -> Option<f64> {
        match self {
            WheelPosition::NorthEast => Some(FRAC_PI_4),
            WheelPosition::NorthWest => Some(3.0 * FRAC_PI_4),
            WheelPosition::SouthWest => Some(-3.0 * FRAC_PI_4),
            WheelPosition::SouthEast => Some(-FRAC_PI_4),
            WheelPosition::Left | WheelPosition::Right => None,
        }
    }

    /// +1 for wheels on the west (left) side, -1 for the east (right) side
    pub fn mount_sign(&self) -> f64 {
        match self {
            WheelPosition::NorthWest | WheelPosition::SouthWest | WheelPosition::Left => 1.0,
            WheelPosition::NorthEast | WheelPosition::SouthEast | WheelPosition::Right => -1.0,
        }
    }
}

/// Wheel arrangement of the drive base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveLayout {
    /// Four omni wheels on 45° diagonals
    OmniX,
    /// Left and right wheel (tank)
    Differential,
}

const OMNI_X_POSITIONS: [WheelPosition; 4] = [
    WheelPosition::NorthEast,
    WheelPosition::NorthWest,
    WheelPosition::SouthEast,
    WheelPosition::SouthWest,
];

const DIFFERENTIAL_POSITIONS: [WheelPosition; 2] = [WheelPosition::Left, WheelPosition::Right];

impl DriveLayout {
    pub fn positions(&self) -> &'static [WheelPosition] {
        match self {
            DriveLayout::OmniX => &OMNI_X_POSITIONS,
            DriveLayout::Differential => &DIFFERENTIAL_POSITIONS,
        }
    }
}

/// Raw stick values for one tick, nominally in [-127, 127]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveRequest {
    pub x: f64,
    pub y: f64,
    pub turn: f64,
}

impl DriveRequest {
    pub fn new(x: f64, y: f64, turn: f64) -> Self {
        Self { x, y, turn }
    }

    pub fn idle() -> Self {
        Self::default()
    }

    /// Read the drive axes from an input source
    pub fn from_input(input: &impl InputSource) -> Self {
        Self::new(
            input.axis_value(Axis::TranslateX) as f64,
            input.axis_value(Axis::TranslateY) as f64,
            input.axis_value(Axis::Turn) as f64,
        )
    }

    /// Copy with every axis clamped into range; NaN becomes zero
    pub fn sanitized(&self, max_axis_value: f64) -> Self {
        let fix = |axis: &'static str, value: f64| match check_axis(axis, value, max_axis_value) {
            Ok(v) => v,
            Err(e) => {
                warn!("{}, clamping", e);
                if value.is_nan() {
                    0.0
                } else {
                    value.clamp(-max_axis_value, max_axis_value)
                }
            }
        };
        Self {
            x: fix("x", self.x),
            y: fix("y", self.y),
            turn: fix("turn", self.turn),
        }
    }
}

/// Validate one axis value against the expected range
pub fn check_axis(axis: &'static str, value: f64, limit: f64) -> Result<f64> {
    if value.is_nan() || value.abs() > limit {
        return Err(DriveError::InvalidAxisRange { axis, value, limit });
    }
    Ok(value)
}

/// Per-wheel goal velocities (rpm) for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct WheelGoals {
    /// Heading of the translation stick, `None` when inside the dead zone
    pub angle: Option<f64>,
    pub goals: Vec<(WheelPosition, f64)>,
}

impl WheelGoals {
    pub fn get(&self, position: WheelPosition) -> Option<f64> {
        self.goals
            .iter()
            .find(|(pos, _)| *pos == position)
            .map(|&(_, goal)| goal)
    }

    /// Multiply every goal by `scale`
    pub fn scaled(mut self, scale: f64) -> Self {
        for (_, goal) in &mut self.goals {
            *goal *= scale;
        }
        self
    }
}

/// Full-circle heading of the stick vector
///
/// The `x == 0` case is branched on explicitly rather than left to `atan2`.
pub fn desired_angle(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        if y > 0.0 {
            FRAC_PI_2
        } else if y < 0.0 {
            -FRAC_PI_2
        } else {
            0.0
        }
    } else {
        y.atan2(x)
    }
}

/// Compute goal velocities for every wheel of `layout`
///
/// # Arguments
/// * `request` - stick values; expected to be sanitized already
/// * `layout` - wheel arrangement
/// * `limits` - max speed, axis range and dead zones
///
/// # Returns
/// A goal for every wheel of the layout. Inputs inside the dead zones give exact zeros.
pub fn compute_wheel_goals(
    request: &DriveRequest,
    layout: DriveLayout,
    limits: &DriveLimits,
) -> WheelGoals {
    match layout {
        DriveLayout::OmniX => omni_x_goals(request, limits),
        DriveLayout::Differential => differential_goals(request, limits),
    }
}

fn turn_contribution(turn: f64, limits: &DriveLimits) -> f64 {
    if turn.abs() > limits.min_turning_displacement {
        limits.max_speed * (turn / limits.max_axis_value)
    } else {
        0.0
    }
}

fn omni_x_goals(request: &DriveRequest, limits: &DriveLimits) -> WheelGoals {
    let magnitude = request.x.hypot(request.y);
    let angle = (magnitude >= limits.min_movement_displacement)
        .then(|| desired_angle(request.x, request.y));
    let turn = turn_contribution(request.turn, limits);

    let goals = OMNI_X_POSITIONS
        .iter()
        .map(|&position| {
            let translation = match (angle, position.mount_angle()) {
                (Some(angle), Some(mount)) => {
                    (magnitude / limits.max_axis_value) * limits.max_speed * (mount - angle).sin()
                }
                _ => 0.0,
            };
            // East wheels are mirrored, so the same turn term spins the chassis
            let goal = position.mount_sign() * (translation + turn);
            (position, normalize_zero(goal))
        })
        .collect();

    WheelGoals { angle, goals }
}

fn differential_goals(request: &DriveRequest, limits: &DriveLimits) -> WheelGoals {
    let forward = if request.y.abs() >= limits.min_movement_displacement {
        limits.max_speed * (request.y / limits.max_axis_value)
    } else {
        0.0
    };
    let turn = turn_contribution(request.turn, limits);

    WheelGoals {
        angle: None,
        goals: vec![
            (WheelPosition::Left, normalize_zero(forward + turn)),
            (WheelPosition::Right, normalize_zero(forward - turn)),
        ],
    }
}

/// Turn -0.0 into 0.0 so sign checks downstream stay simple
fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}
