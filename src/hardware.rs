// Interfaces to the devices the drive core commands
//
// Device binding lives outside this crate. The core only needs somewhere to send
// motor commands and a way to wait for the next tick; both are traits so tests and
// the zenoh runtime can supply their own.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Motor port number
pub type MotorId = u8;

/// Spin direction as understood by the motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

/// How a motor behaves once stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Short the windings; stops quickly but does not fight external force
    Brake,
    /// Actively hold position
    Hold,
    /// Let the motor spin down freely
    Coast,
}

/// Error types reported by the hardware layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HardwareError {
    #[error("Motor {motor} is disconnected")]
    Disconnected { motor: MotorId },

    #[error("Motor {motor} rejected command: {reason}")]
    Rejected { motor: MotorId, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Sink for motor commands. Commands are fire-and-forget: the core never retries.
pub trait MotorSink {
    /// Set the velocity (rpm) used by the next `spin`
    fn set_velocity(&mut self, motor: MotorId, rpm: f64) -> Result<(), HardwareError>;

    fn spin(&mut self, motor: MotorId, direction: Direction) -> Result<(), HardwareError>;

    fn stop(&mut self, motor: MotorId, mode: StopMode) -> Result<(), HardwareError>;
}

/// Log a failed command and move on; retrying is the hardware layer's business
pub fn report_failure(result: Result<(), HardwareError>) {
    if let Err(e) = result {
        warn!("Motor command failed: {}", e);
    }
}

/// Tick timing for blocking (scripted) motion
pub trait TickClock {
    fn sleep_until_next_tick(&mut self, tick: Duration);
}

/// Raw operator input, polled once per tick
pub trait InputSource {
    fn axis_value(&self, axis: Axis) -> i32;

    fn button_pressed(&self, button: Button) -> bool;
}

/// Joystick axes used by the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Translation stick, horizontal
    TranslateX,
    /// Translation stick, vertical
    TranslateY,
    /// Turning stick, horizontal
    Turn,
}

/// Controller buttons with an assigned function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    IntakeIn,
    IntakeOut,
    LiftUp,
    LiftDown,
    SpeedUp,
    SpeedDown,
    EmergencyStop,
}

/// Devices the motion core drives, handed to it by reference
pub struct RobotHardware<M, C> {
    pub motors: M,
    pub clock: C,
}

impl<M: MotorSink, C: TickClock> RobotHardware<M, C> {
    pub fn new(motors: M, clock: C) -> Self {
        Self { motors, clock }
    }
}

/// One command as it was issued to a motor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum MotorCommand {
    SetVelocity { motor: MotorId, rpm: f64 },
    Spin { motor: MotorId, direction: Direction },
    Stop { motor: MotorId, mode: StopMode },
}

impl MotorCommand {
    pub fn motor(&self) -> MotorId {
        match *self {
            MotorCommand::SetVelocity { motor, .. }
            | MotorCommand::Spin { motor, .. }
            | MotorCommand::Stop { motor, .. } => motor,
        }
    }
}

/// Collects commands in issue order; drained once per tick by whoever forwards them
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<MotorCommand>,
    /// Motors that report as unplugged
    offline: Vec<MotorId>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a motor as disconnected so commands to it fail
    pub fn set_offline(&mut self, motor: MotorId) {
        if !self.offline.contains(&motor) {
            self.offline.push(motor);
        }
    }

    pub fn commands(&self) -> &[MotorCommand] {
        &self.commands
    }

    /// Take all buffered commands, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<MotorCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Most recent command issued to `motor`
    pub fn last_for(&self, motor: MotorId) -> Option<&MotorCommand> {
        self.commands.iter().rev().find(|c| c.motor() == motor)
    }

    fn push(&mut self, command: MotorCommand) -> Result<(), HardwareError> {
        let motor = command.motor();
        if self.offline.contains(&motor) {
            return Err(HardwareError::Disconnected { motor });
        }
        self.commands.push(command);
        Ok(())
    }
}

impl MotorSink for CommandBuffer {
    fn set_velocity(&mut self, motor: MotorId, rpm: f64) -> Result<(), HardwareError> {
        self.push(MotorCommand::SetVelocity { motor, rpm })
    }

    fn spin(&mut self, motor: MotorId, direction: Direction) -> Result<(), HardwareError> {
        self.push(MotorCommand::Spin { motor, direction })
    }

    fn stop(&mut self, motor: MotorId, mode: StopMode) -> Result<(), HardwareError> {
        self.push(MotorCommand::Stop { motor, mode })
    }
}

/// Blocks the calling thread for one tick
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadClock;

impl TickClock for ThreadClock {
    fn sleep_until_next_tick(&mut self, tick: Duration) {
        debug!("Sleeping {:?} until next tick", tick);
        std::thread::sleep(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_buffer_records_in_order() {
        let mut buffer = CommandBuffer::new();
        buffer.set_velocity(3, 50.0).unwrap();
        buffer.spin(3, Direction::Forward).unwrap();
        buffer.stop(4, StopMode::Coast).unwrap();

        assert_eq!(buffer.commands().len(), 3);
        assert_eq!(
            buffer.last_for(3),
            Some(&MotorCommand::Spin {
                motor: 3,
                direction: Direction::Forward
            })
        );

        let drained = buffer.drain();
        assert_eq!(drained.len(), 3);
        assert!(buffer.commands().is_empty());
    }

    #[test]
    fn test_offline_motor_reports_disconnected() {
        let mut buffer = CommandBuffer::new();
        buffer.set_offline(9);
        assert_eq!(
            buffer.stop(9, StopMode::Brake),
            Err(HardwareError::Disconnected { motor: 9 })
        );
        assert!(buffer.commands().is_empty());
    }

    #[test]
    fn test_motor_command_json_shape() {
        let json = serde_json::to_string(&MotorCommand::Stop {
            motor: 2,
            mode: StopMode::Hold,
        })
        .unwrap();
        assert_eq!(json, r#"{"cmd":"stop","motor":2,"mode":"hold"}"#);
    }
}
