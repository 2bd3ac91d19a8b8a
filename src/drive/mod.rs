// Motion core for the drive base
//
// Provides:
// - Stick-to-wheel kinematics (X omni and differential layouts)
// - Per-wheel velocity ramps with gradual acceleration
// - Rolling velocity history for drift correction
// - Tick orchestration: goals -> ramps -> motor commands

mod controller;
pub mod error;
pub mod history;
pub mod kinematics;
pub mod wheel;

pub use controller::MotionController;
pub use error::{DriveError, Result};
pub use history::{drift_corrected, VelocityHistory};
pub use kinematics::{compute_wheel_goals, DriveLayout, DriveRequest, WheelGoals, WheelPosition};
pub use wheel::Wheel;
