// Velocity state for one drive wheel with gradual acceleration
//
// The ramp is linear: each tick moves the velocity by a fixed fraction of the
// difference between the goal and the velocity the wheel had when that goal was set.

use crate::config::WheelConfig;
use crate::hardware::MotorId;

use super::history::VelocityHistory;
use super::kinematics::WheelPosition;

/// One physical wheel, bound to exactly one motor
#[derive(Debug, Clone)]
pub struct Wheel {
    position: WheelPosition,
    motor: MotorId,
    reversed: bool,
    /// Velocity last commanded to the motor (rpm, signed)
    current_velocity: f64,
    /// Velocity this wheel is ramping toward
    goal_velocity: f64,
    /// Velocity recorded when the goal last changed
    ramp_origin_velocity: f64,
    acceleration_per_tick: f64,
    history: VelocityHistory,
}

impl Wheel {
    pub fn new(config: &WheelConfig, history_capacity: usize) -> Self {
        Self {
            position: config.position,
            motor: config.motor,
            reversed: config.reversed,
            current_velocity: 0.0,
            goal_velocity: 0.0,
            ramp_origin_velocity: 0.0,
            acceleration_per_tick: 0.0,
            history: VelocityHistory::new(history_capacity),
        }
    }

    /// Set the goal velocity. A repeated goal leaves the ramp untouched.
    pub fn set_goal_velocity(&mut self, goal: f64) {
        if goal != self.goal_velocity {
            self.ramp_origin_velocity = self.current_velocity;
            self.goal_velocity = goal;
        }
    }

    /// Advance the ramp by one tick
    ///
    /// # Arguments
    /// * `ramp_constant` - fraction of the total goal change applied per tick, in (0, 1]
    pub fn advance_ramp(&mut self, ramp_constant: f64) {
        let delta = self.goal_velocity - self.ramp_origin_velocity;
        self.acceleration_per_tick = delta * ramp_constant;

        // Snap when within one step so we never overshoot or creep forever
        let remaining = self.goal_velocity - self.current_velocity;
        if remaining.abs() <= self.acceleration_per_tick.abs() {
            self.current_velocity = self.goal_velocity;
        } else {
            self.current_velocity += self.acceleration_per_tick;
        }
    }

    /// Zero everything immediately, bypassing the ramp
    pub fn halt(&mut self) {
        self.current_velocity = 0.0;
        self.goal_velocity = 0.0;
        self.ramp_origin_velocity = 0.0;
        self.acceleration_per_tick = 0.0;
    }

    /// Velocity in the motor's own frame (polarity applied)
    pub fn motor_velocity(&self) -> f64 {
        if self.reversed {
            -self.current_velocity
        } else {
            self.current_velocity
        }
    }

    pub fn position(&self) -> WheelPosition {
        self.position
    }

    pub fn motor(&self) -> MotorId {
        self.motor
    }

    pub fn current_velocity(&self) -> f64 {
        self.current_velocity
    }

    pub fn goal_velocity(&self) -> f64 {
        self.goal_velocity
    }

    pub fn ramp_origin_velocity(&self) -> f64 {
        self.ramp_origin_velocity
    }

    pub fn acceleration_per_tick(&self) -> f64 {
        self.acceleration_per_tick
    }

    pub fn is_moving(&self) -> bool {
        self.current_velocity != 0.0
    }

    pub fn history(&self) -> &VelocityHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut VelocityHistory {
        &mut self.history
    }
}
