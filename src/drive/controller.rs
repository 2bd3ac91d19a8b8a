// Per-tick orchestration of the drive base
//
// Combines kinematics, wheel ramps and drift correction, then turns the resulting
// wheel velocities into motor commands. Also owns the auxiliary mechanisms so that
// driver input and the emergency stop reach everything from one place.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{DriveConfig, RobotConfig};
use crate::hardware::{
    report_failure, Button, Direction, MotorSink, RobotHardware, StopMode, TickClock,
};
use crate::mechanism::{Mechanism, MechanismAction, MechanismKind};
use crate::messages::{ControllerSample, TelemetryFrame, WheelTelemetry};
use crate::operator::ButtonEdges;

use super::history::drift_corrected;
use super::kinematics::{compute_wheel_goals, DriveRequest, WheelPosition};
use super::wheel::Wheel;

/// Drive base controller: one instance for the lifetime of the program
pub struct MotionController {
    drive: DriveConfig,
    wheels: Vec<Wheel>,
    intake: Mechanism,
    lift: Mechanism,
    speed_levels: Vec<f64>,
    speed_level: usize,
    tick_length: Duration,
    previous_sample: ControllerSample,
    last_angle: Option<f64>,
    /// Stop mode for wheels that were already at rest when the tick started
    rest_mode: StopMode,
}

impl MotionController {
    /// Build the controller from a validated config
    pub fn new(config: &RobotConfig) -> Self {
        let capacity = config.drive.drift_correction.capacity;
        let wheels = config
            .drive
            .wheels
            .iter()
            .map(|wheel| Wheel::new(wheel, capacity))
            .collect();

        let speed_levels = if config.speed_levels.is_empty() {
            vec![1.0]
        } else {
            config.speed_levels.clone()
        };
        let speed_level = config.initial_speed_level.min(speed_levels.len() - 1);

        info!(
            "Motion controller ready: {:?} layout, {} wheels, ramp constant {}",
            config.drive.layout,
            config.drive.wheels.len(),
            config.drive.ramp_constant
        );

        Self {
            drive: config.drive.clone(),
            wheels,
            intake: Mechanism::new(MechanismKind::Intake, &config.intake),
            lift: Mechanism::new(MechanismKind::Lift, &config.lift),
            speed_levels,
            speed_level,
            tick_length: config.tick_length(),
            previous_sample: ControllerSample::default(),
            last_angle: None,
            rest_mode: StopMode::Coast,
        }
    }

    /// One driver-control tick from raw stick values
    ///
    /// Drift correction (when enabled) and the active speed level apply here only.
    pub fn tick<M: MotorSink, C>(
        &mut self,
        hw: &mut RobotHardware<M, C>,
        request: DriveRequest,
    ) -> TelemetryFrame {
        let correct = self.drive.drift_correction.enabled;
        self.step(&mut hw.motors, request, self.speed_scale(), correct)
    }

    /// One scripted tick: full speed, no drift correction
    pub fn script_tick<M: MotorSink, C>(
        &mut self,
        hw: &mut RobotHardware<M, C>,
        request: DriveRequest,
    ) -> TelemetryFrame {
        self.step(&mut hw.motors, request, 1.0, false)
    }

    /// Hold `request` for `duration`, ramping every tick, then stop the drive
    ///
    /// Runs `ceil(duration / tick)` ticks. Returns the number of ticks run.
    pub fn timed_move<M: MotorSink, C: TickClock>(
        &mut self,
        hw: &mut RobotHardware<M, C>,
        request: DriveRequest,
        duration: Duration,
    ) -> u64 {
        let tick_ms = self.tick_length.as_millis().max(1);
        let ticks = duration.as_millis().div_ceil(tick_ms) as u64;
        debug!("Timed move {:?} for {:?} ({} ticks)", request, duration, ticks);

        for _ in 0..ticks {
            self.script_tick(hw, request);
            hw.clock.sleep_until_next_tick(self.tick_length);
        }

        self.halt(&mut hw.motors, StopMode::Hold);
        ticks
    }

    /// Zero every wheel and mechanism immediately and brake, bypassing the ramps
    pub fn emergency_stop<M: MotorSink, C>(&mut self, hw: &mut RobotHardware<M, C>) {
        info!("Emergency stop");
        self.halt(&mut hw.motors, StopMode::Brake);
        self.reset_history();
        self.intake.brake(&mut hw.motors);
        self.lift.brake(&mut hw.motors);
    }

    /// Driver control from a full controller snapshot
    ///
    /// Button edges are found by diffing against the previous snapshot. While the
    /// emergency stop button is held the drive stays at rest and mechanisms are ignored.
    pub fn operator_tick<M: MotorSink, C>(
        &mut self,
        hw: &mut RobotHardware<M, C>,
        sample: &ControllerSample,
    ) -> TelemetryFrame {
        let edges = ButtonEdges::between(&self.previous_sample, sample);
        self.previous_sample = *sample;

        if edges.was_pressed(Button::EmergencyStop) {
            self.emergency_stop(hw);
            return self.telemetry();
        }
        if sample.buttons.emergency_stop {
            return self.step(&mut hw.motors, DriveRequest::idle(), 1.0, false);
        }

        if edges.was_pressed(Button::SpeedUp) {
            self.set_speed_level(self.speed_level + 1);
        }
        if edges.was_pressed(Button::SpeedDown) {
            self.set_speed_level(self.speed_level.saturating_sub(1));
        }

        if edges.changed(Button::IntakeIn, Button::IntakeOut) {
            let action = held_action(sample.buttons.intake_in, sample.buttons.intake_out);
            self.intake.command(&mut hw.motors, action);
        }
        if edges.changed(Button::LiftUp, Button::LiftDown) {
            let action = held_action(sample.buttons.lift_up, sample.buttons.lift_down);
            self.lift.command(&mut hw.motors, action);
        }

        self.tick(hw, DriveRequest::from_input(sample))
    }

    /// Run an auxiliary mechanism
    pub fn run_mechanism<M: MotorSink, C>(
        &mut self,
        hw: &mut RobotHardware<M, C>,
        kind: MechanismKind,
        action: MechanismAction,
    ) {
        let mechanism = match kind {
            MechanismKind::Intake => &mut self.intake,
            MechanismKind::Lift => &mut self.lift,
        };
        mechanism.command(&mut hw.motors, action);
    }

    /// Zero all goals and velocities and stop every wheel motor with `mode`
    ///
    /// The wheels keep `mode` on later idle ticks until the drive moves again.
    pub fn halt(&mut self, motors: &mut impl MotorSink, mode: StopMode) {
        self.last_angle = None;
        self.rest_mode = mode;
        for wheel in &mut self.wheels {
            wheel.halt();
            report_failure(motors.stop(wheel.motor(), mode));
        }
    }

    /// Forget drift history
    pub fn reset_history(&mut self) {
        for wheel in &mut self.wheels {
            wheel.history_mut().clear();
        }
    }

    fn step(
        &mut self,
        motors: &mut impl MotorSink,
        request: DriveRequest,
        scale: f64,
        correct_drift: bool,
    ) -> TelemetryFrame {
        let request = request.sanitized(self.drive.limits.max_axis_value);
        let goals =
            compute_wheel_goals(&request, self.drive.layout, &self.drive.limits).scaled(scale);
        self.last_angle = goals.angle;

        let was_moving = self.wheels.iter().any(Wheel::is_moving);
        let fraction = self.drive.drift_correction.fraction;
        let ramp_constant = self.drive.ramp_constant;

        for wheel in &mut self.wheels {
            let Some(target) = goals.get(wheel.position()) else {
                warn!("No goal for wheel {:?}", wheel.position());
                continue;
            };
            let target = if correct_drift {
                drift_corrected(target, wheel.history_mut(), fraction)
            } else {
                target
            };

            wheel.set_goal_velocity(target);
            wheel.advance_ramp(ramp_constant);
            issue(motors, wheel, was_moving, self.rest_mode);
        }
        if was_moving {
            self.rest_mode = StopMode::Hold;
        }

        let frame = self.telemetry();
        debug!(
            "Tick: angle={:?}, wheels={:?}",
            frame.angle,
            frame
                .wheels
                .iter()
                .map(|w| (w.position, w.current, w.goal))
                .collect::<Vec<_>>()
        );
        frame
    }

    fn set_speed_level(&mut self, level: usize) {
        let level = level.min(self.speed_levels.len() - 1);
        if level != self.speed_level {
            info!(
                "Speed level {} -> {} (scale {})",
                self.speed_level + 1,
                level + 1,
                self.speed_levels[level]
            );
            self.speed_level = level;
        }
    }

    pub fn telemetry(&self) -> TelemetryFrame {
        TelemetryFrame {
            angle: self.last_angle,
            speed_scale: self.speed_scale(),
            wheels: self
                .wheels
                .iter()
                .map(|wheel| WheelTelemetry {
                    position: wheel.position(),
                    current: wheel.current_velocity(),
                    goal: wheel.goal_velocity(),
                })
                .collect(),
        }
    }

    pub fn speed_scale(&self) -> f64 {
        self.speed_levels[self.speed_level]
    }

    pub fn speed_level(&self) -> usize {
        self.speed_level
    }

    pub fn wheels(&self) -> &[Wheel] {
        &self.wheels
    }

    pub fn wheel(&self, position: WheelPosition) -> Option<&Wheel> {
        self.wheels.iter().find(|w| w.position() == position)
    }

    pub fn mechanism_action(&self, kind: MechanismKind) -> MechanismAction {
        match kind {
            MechanismKind::Intake => self.intake.action(),
            MechanismKind::Lift => self.lift.action(),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }
}

/// Spin at the ramped velocity, or stop: hold if the chassis was moving, else keep
/// the mode the drive came to rest with
fn issue(motors: &mut impl MotorSink, wheel: &Wheel, was_moving: bool, rest_mode: StopMode) {
    let motor = wheel.motor();
    if wheel.is_moving() {
        report_failure(motors.set_velocity(motor, wheel.motor_velocity()));
        report_failure(motors.spin(motor, Direction::Forward));
    } else {
        let mode = if was_moving { StopMode::Hold } else { rest_mode };
        report_failure(motors.stop(motor, mode));
    }
}

/// Hold-to-run mapping for a forward/reverse button pair
fn held_action(forward: bool, reverse: bool) -> MechanismAction {
    match (forward, reverse) {
        (true, false) => MechanismAction::Forward,
        (false, true) => MechanismAction::Reverse,
        _ => MechanismAction::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{CommandBuffer, MotorCommand};
    use crate::messages::ButtonState;

    /// Counts ticks instead of sleeping
    #[derive(Default)]
    struct CountingClock {
        ticks: u64,
        slept: Duration,
    }

    impl TickClock for CountingClock {
        fn sleep_until_next_tick(&mut self, tick: Duration) {
            self.ticks += 1;
            self.slept += tick;
        }
    }

    type TestHardware = RobotHardware<CommandBuffer, CountingClock>;

    fn setup(config: RobotConfig) -> (MotionController, TestHardware) {
        let controller = MotionController::new(&config);
        let hw = RobotHardware::new(CommandBuffer::new(), CountingClock::default());
        (controller, hw)
    }

    fn default_setup() -> (MotionController, TestHardware) {
        setup(RobotConfig::default())
    }

    fn goal(controller: &MotionController, pos: WheelPosition) -> f64 {
        controller.wheel(pos).unwrap().goal_velocity()
    }

    #[test]
    fn test_full_forward_equal_goals() {
        let (mut controller, mut hw) = default_setup();
        controller.tick(&mut hw, DriveRequest::new(0.0, 100.0, 0.0));

        let first = goal(&controller, WheelPosition::NorthEast);
        assert!(first > 0.0);
        for wheel in controller.wheels() {
            assert!((wheel.goal_velocity() - first).abs() < 1e-9);
            assert!(wheel.current_velocity() > 0.0);
            assert!(wheel.current_velocity() < wheel.goal_velocity(), "should ramp");
        }
    }

    #[test]
    fn test_turn_in_place_splits_sides() {
        let (mut controller, mut hw) = default_setup();
        let frame = controller.tick(&mut hw, DriveRequest::new(0.0, 0.0, 100.0));
        assert_eq!(frame.angle, None);

        let positive: Vec<f64> = frame
            .wheels
            .iter()
            .filter(|w| w.goal > 0.0)
            .map(|w| w.goal)
            .collect();
        let negative: Vec<f64> = frame
            .wheels
            .iter()
            .filter(|w| w.goal < 0.0)
            .map(|w| w.goal)
            .collect();
        assert_eq!(positive.len(), 2);
        assert_eq!(negative.len(), 2);
        assert_eq!(positive[0], -negative[0]);
        assert_eq!(
            goal(&controller, WheelPosition::NorthEast),
            -goal(&controller, WheelPosition::SouthWest)
        );
    }

    #[test]
    fn test_polarity_applied_to_motor_commands() {
        let (mut controller, mut hw) = default_setup();
        controller.tick(&mut hw, DriveRequest::new(0.0, 127.0, 0.0));

        let ne = controller.wheel(WheelPosition::NorthEast).unwrap();
        let nw = controller.wheel(WheelPosition::NorthWest).unwrap();
        // NE motor is mounted reversed in the default config
        assert_eq!(
            hw.motors.commands().iter().find(|c| c.motor() == ne.motor()),
            Some(&MotorCommand::SetVelocity {
                motor: ne.motor(),
                rpm: -ne.current_velocity()
            })
        );
        assert_eq!(
            hw.motors.commands().iter().find(|c| c.motor() == nw.motor()),
            Some(&MotorCommand::SetVelocity {
                motor: nw.motor(),
                rpm: nw.current_velocity()
            })
        );
    }

    #[test]
    fn test_ramp_reaches_goal_over_ticks() {
        let (mut controller, mut hw) = default_setup();
        let request = DriveRequest::new(0.0, 127.0, 0.0);
        for _ in 0..25 {
            controller.tick(&mut hw, request);
        }
        for wheel in controller.wheels() {
            assert_eq!(wheel.current_velocity(), wheel.goal_velocity());
        }
    }

    #[test]
    fn test_idle_robot_coasts() {
        let (mut controller, mut hw) = default_setup();
        controller.tick(&mut hw, DriveRequest::idle());
        for wheel in controller.wheels() {
            assert_eq!(
                hw.motors.last_for(wheel.motor()),
                Some(&MotorCommand::Stop {
                    motor: wheel.motor(),
                    mode: StopMode::Coast
                })
            );
        }
    }

    #[test]
    fn test_wheel_reaching_zero_while_moving_holds() {
        let mut config = RobotConfig::default();
        config.drive.ramp_constant = 1.0;
        let (mut controller, mut hw) = setup(config);

        controller.tick(&mut hw, DriveRequest::new(0.0, 127.0, 0.0));
        controller.tick(&mut hw, DriveRequest::idle());
        for wheel in controller.wheels() {
            assert_eq!(
                hw.motors.last_for(wheel.motor()),
                Some(&MotorCommand::Stop {
                    motor: wheel.motor(),
                    mode: StopMode::Hold
                })
            );
        }

        // Later idle ticks keep holding until the drive moves again
        for _ in 0..3 {
            controller.tick(&mut hw, DriveRequest::idle());
        }
        let ne = controller.wheel(WheelPosition::NorthEast).unwrap().motor();
        assert_eq!(
            hw.motors.last_for(ne),
            Some(&MotorCommand::Stop {
                motor: ne,
                mode: StopMode::Hold
            })
        );
    }

    #[test]
    fn test_idle_after_emergency_stop_keeps_braking() {
        let (mut controller, mut hw) = default_setup();
        controller.tick(&mut hw, DriveRequest::new(0.0, 127.0, 0.0));
        controller.emergency_stop(&mut hw);
        hw.motors.drain();

        controller.tick(&mut hw, DriveRequest::idle());
        for wheel in controller.wheels() {
            assert_eq!(
                hw.motors.last_for(wheel.motor()),
                Some(&MotorCommand::Stop {
                    motor: wheel.motor(),
                    mode: StopMode::Brake
                })
            );
        }
    }

    #[test]
    fn test_emergency_stop_mid_ramp() {
        let (mut controller, mut hw) = default_setup();
        for _ in 0..3 {
            controller.tick(&mut hw, DriveRequest::new(60.0, 100.0, 20.0));
        }
        let ne = controller.wheel(WheelPosition::NorthEast).unwrap();
        assert_ne!(ne.current_velocity(), ne.goal_velocity());

        hw.motors.drain();
        controller.emergency_stop(&mut hw);

        for wheel in controller.wheels() {
            assert_eq!(wheel.current_velocity(), 0.0);
            assert_eq!(wheel.goal_velocity(), 0.0);
            assert_eq!(
                hw.motors.last_for(wheel.motor()),
                Some(&MotorCommand::Stop {
                    motor: wheel.motor(),
                    mode: StopMode::Brake
                })
            );
        }
        assert_eq!(controller.telemetry().angle, None);

        // Mechanisms are braked too, and nothing spins
        assert!(hw.motors.commands().iter().all(|c| matches!(
            c,
            MotorCommand::Stop {
                mode: StopMode::Brake,
                ..
            }
        )));
    }

    #[test]
    fn test_timed_move_runs_exact_ticks() {
        let (mut controller, mut hw) = default_setup();
        let ticks = controller.timed_move(
            &mut hw,
            DriveRequest::new(100.0, 0.0, 0.0),
            Duration::from_millis(100),
        );

        assert_eq!(ticks, 5);
        assert_eq!(hw.clock.ticks, 5);
        assert_eq!(hw.clock.slept, Duration::from_millis(100));

        let ne = controller.wheel(WheelPosition::NorthEast).unwrap().motor();
        let spins = hw
            .motors
            .commands()
            .iter()
            .filter(|c| matches!(c, MotorCommand::Spin { motor, .. } if *motor == ne))
            .count();
        assert_eq!(spins, 5);

        for wheel in controller.wheels() {
            assert_eq!(wheel.goal_velocity(), 0.0);
            assert_eq!(wheel.current_velocity(), 0.0);
            assert_eq!(
                hw.motors.last_for(wheel.motor()),
                Some(&MotorCommand::Stop {
                    motor: wheel.motor(),
                    mode: StopMode::Hold
                })
            );
        }
    }

    #[test]
    fn test_timed_move_clears_heading() {
        let (mut controller, mut hw) = default_setup();
        let frame = controller.script_tick(&mut hw, DriveRequest::new(0.0, 127.0, 0.0));
        assert_eq!(frame.angle, Some(std::f64::consts::FRAC_PI_2));

        controller.timed_move(&mut hw, DriveRequest::new(0.0, 127.0, 0.0), Duration::ZERO);
        assert_eq!(controller.telemetry().angle, None);
    }

    #[test]
    fn test_timed_move_rounds_partial_tick_up() {
        let (mut controller, mut hw) = default_setup();
        let ticks = controller.timed_move(
            &mut hw,
            DriveRequest::new(0.0, 127.0, 0.0),
            Duration::from_millis(50),
        );
        assert_eq!(ticks, 3);
    }

    #[test]
    fn test_bad_input_is_clamped() {
        let (mut controller, mut hw) = default_setup();
        let frame = controller.tick(&mut hw, DriveRequest::new(f64::NAN, 500.0, -900.0));
        assert_eq!(frame.angle, Some(std::f64::consts::FRAC_PI_2));
        for wheel in controller.wheels() {
            assert!(wheel.goal_velocity().is_finite());
            assert!(wheel.goal_velocity().abs() <= 2.0 * 100.0);
        }
    }

    #[test]
    fn test_disconnected_motor_does_not_stall_tick() {
        let (mut controller, mut hw) = default_setup();
        let ne = controller.wheel(WheelPosition::NorthEast).unwrap().motor();
        hw.motors.set_offline(ne);

        controller.tick(&mut hw, DriveRequest::new(0.0, 127.0, 0.0));
        assert!(hw.motors.last_for(ne).is_none());
        let nw = controller.wheel(WheelPosition::NorthWest).unwrap().motor();
        assert!(hw.motors.last_for(nw).is_some());
    }

    #[test]
    fn test_drift_correction_only_in_driver_ticks() {
        let mut config = RobotConfig::default();
        config.drive.ramp_constant = 1.0;
        config.drive.drift_correction.enabled = true;
        let (mut controller, mut hw) = setup(config);

        for _ in 0..5 {
            controller.tick(&mut hw, DriveRequest::new(0.0, 127.0, 0.0));
        }
        // Stick reverses hard: correction pushes the goal further back
        controller.tick(&mut hw, DriveRequest::new(0.0, -127.0, 0.0));
        let corrected = goal(&controller, WheelPosition::NorthWest);
        let plain = -100.0 * std::f64::consts::FRAC_PI_4.sin();
        assert!(corrected < plain - 1.0);

        // Scripted ticks never correct
        let (mut controller, mut hw) = setup({
            let mut config = RobotConfig::default();
            config.drive.ramp_constant = 1.0;
            config.drive.drift_correction.enabled = true;
            config
        });
        for _ in 0..5 {
            controller.script_tick(&mut hw, DriveRequest::new(0.0, 127.0, 0.0));
        }
        controller.script_tick(&mut hw, DriveRequest::new(0.0, -127.0, 0.0));
        assert!((goal(&controller, WheelPosition::NorthWest) - plain).abs() < 1e-9);
    }

    #[test]
    fn test_differential_layout() {
        let config = RobotConfig {
            drive: DriveConfig::differential(11, 1),
            ..RobotConfig::default()
        };
        let (mut controller, mut hw) = setup(config);
        controller.tick(&mut hw, DriveRequest::new(0.0, 127.0, 127.0));
        assert_eq!(goal(&controller, WheelPosition::Left), 200.0);
        assert_eq!(goal(&controller, WheelPosition::Right), 0.0);
    }

    fn sample_with(buttons: ButtonState) -> ControllerSample {
        ControllerSample {
            buttons,
            ..Default::default()
        }
    }

    #[test]
    fn test_speed_buttons_step_and_saturate() {
        let (mut controller, mut hw) = default_setup();
        assert_eq!(controller.speed_scale(), 1.0);

        let up = sample_with(ButtonState {
            speed_up: true,
            ..Default::default()
        });
        let down = sample_with(ButtonState {
            speed_down: true,
            ..Default::default()
        });
        let released = ControllerSample::default();

        // Already at the top level
        controller.operator_tick(&mut hw, &up);
        controller.operator_tick(&mut hw, &released);
        assert_eq!(controller.speed_level(), 2);

        for _ in 0..3 {
            controller.operator_tick(&mut hw, &down);
            controller.operator_tick(&mut hw, &released);
        }
        assert_eq!(controller.speed_level(), 0);
        assert_eq!(controller.speed_scale(), 0.4);

        // Holding the button does not repeat
        controller.operator_tick(&mut hw, &up);
        controller.operator_tick(&mut hw, &up);
        assert_eq!(controller.speed_level(), 1);
    }

    #[test]
    fn test_speed_level_scales_goals() {
        let mut config = RobotConfig::default();
        config.initial_speed_level = 0;
        let (mut controller, mut hw) = setup(config);
        let sample = ControllerSample {
            x: 0,
            y: 0,
            turn: 127,
            ..Default::default()
        };
        controller.operator_tick(&mut hw, &sample);
        assert!((goal(&controller, WheelPosition::NorthWest) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_mechanism_hold_to_run() {
        let (mut controller, mut hw) = default_setup();
        let held = sample_with(ButtonState {
            intake_in: true,
            lift_down: true,
            ..Default::default()
        });
        controller.operator_tick(&mut hw, &held);
        assert_eq!(
            controller.mechanism_action(MechanismKind::Intake),
            MechanismAction::Forward
        );
        assert_eq!(
            controller.mechanism_action(MechanismKind::Lift),
            MechanismAction::Reverse
        );

        controller.operator_tick(&mut hw, &ControllerSample::default());
        assert_eq!(
            controller.mechanism_action(MechanismKind::Intake),
            MechanismAction::Stop
        );
        assert_eq!(
            controller.mechanism_action(MechanismKind::Lift),
            MechanismAction::Stop
        );
    }

    #[test]
    fn test_emergency_stop_button() {
        let (mut controller, mut hw) = default_setup();
        let driving = ControllerSample {
            y: 127,
            ..Default::default()
        };
        controller.operator_tick(&mut hw, &driving);
        controller.operator_tick(&mut hw, &driving);

        let stop = ControllerSample {
            y: 127,
            buttons: ButtonState {
                emergency_stop: true,
                ..Default::default()
            },
            ..Default::default()
        };
        controller.operator_tick(&mut hw, &stop);
        for wheel in controller.wheels() {
            assert_eq!(wheel.current_velocity(), 0.0);
            assert!(wheel.history().is_empty());
        }
    }

    #[test]
    fn test_held_emergency_stop_blocks_driving() {
        let (mut controller, mut hw) = default_setup();
        let driving = ControllerSample {
            y: 127,
            ..Default::default()
        };
        controller.operator_tick(&mut hw, &driving);

        let stop = ControllerSample {
            y: 127,
            buttons: ButtonState {
                emergency_stop: true,
                intake_in: true,
                ..Default::default()
            },
            ..Default::default()
        };
        controller.operator_tick(&mut hw, &stop);
        hw.motors.drain();

        // Button still held, stick still forward
        for _ in 0..3 {
            controller.operator_tick(&mut hw, &stop);
        }
        assert!(hw
            .motors
            .commands()
            .iter()
            .all(|c| matches!(c, MotorCommand::Stop { mode: StopMode::Brake, .. })));
        assert_eq!(
            controller.mechanism_action(MechanismKind::Intake),
            MechanismAction::Stop
        );
        for wheel in controller.wheels() {
            assert_eq!(wheel.current_velocity(), 0.0);
        }

        // Releasing the button hands control back to the stick
        controller.operator_tick(&mut hw, &driving);
        assert!(controller.wheels().iter().all(|w| w.current_velocity() > 0.0));
    }
}
