// Auxiliary mechanisms (intake rollers, lift)
//
// Each mechanism is a group of motors run together at a fixed speed. Stopping
// holds position so a loaded lift does not sag.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MechanismConfig;
use crate::hardware::{report_failure, Direction, MotorId, MotorSink, StopMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismKind {
    Intake,
    Lift,
}

/// What a mechanism should do. `Forward` is intake-in / lift-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismAction {
    Forward,
    #[default]
    Stop,
    Reverse,
}

#[derive(Debug, Clone)]
pub struct Mechanism {
    kind: MechanismKind,
    motors: Vec<MotorId>,
    rpm: f64,
    inverted: bool,
    action: MechanismAction,
}

impl Mechanism {
    pub fn new(kind: MechanismKind, config: &MechanismConfig) -> Self {
        Self {
            kind,
            motors: config.motors.clone(),
            rpm: config.rpm,
            inverted: config.inverted,
            action: MechanismAction::Stop,
        }
    }

    /// Issue `action` to every motor of the mechanism
    pub fn command(&mut self, sink: &mut impl MotorSink, action: MechanismAction) {
        debug!("{:?} -> {:?}", self.kind, action);
        self.action = action;

        let direction = match (action, self.inverted) {
            (MechanismAction::Stop, _) => None,
            (MechanismAction::Forward, false) | (MechanismAction::Reverse, true) => {
                Some(Direction::Forward)
            }
            (MechanismAction::Forward, true) | (MechanismAction::Reverse, false) => {
                Some(Direction::Reverse)
            }
        };

        for &motor in &self.motors {
            match direction {
                Some(direction) => {
                    report_failure(sink.set_velocity(motor, self.rpm));
                    report_failure(sink.spin(motor, direction));
                }
                None => report_failure(sink.stop(motor, StopMode::Hold)),
            }
        }
    }

    /// Brake every motor, used by the emergency stop
    pub fn brake(&mut self, sink: &mut impl MotorSink) {
        info!("Braking {:?}", self.kind);
        self.action = MechanismAction::Stop;
        for &motor in &self.motors {
            report_failure(sink.stop(motor, StopMode::Brake));
        }
    }

    pub fn kind(&self) -> MechanismKind {
        self.kind
    }

    pub fn action(&self) -> MechanismAction {
        self.action
    }
}
