// Error types for the drive core
//
// Nothing here is fatal to the control loop: axis errors are clamped, hardware
// errors are logged and the next tick carries on.

use crate::hardware::HardwareError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriveError {
    #[error("Axis {axis} value {value} outside [-{limit}, {limit}]")]
    InvalidAxisRange {
        axis: &'static str,
        value: f64,
        limit: f64,
    },

    #[error("Velocity history is empty")]
    EmptyHistory,

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
}

pub type Result<T> = std::result::Result<T, DriveError>;
