// Frame execution: resolve, dispatch, settle
//
// One frame is in flight at a time. A frame is resolved into all twelve
// servo commands before any of them is dispatched, so a failed solve leaves
// the robot untouched. After dispatch the sequencer waits out a settle delay
// sized to the largest angular move of the frame, which keeps the slowest
// servo from lagging the others.

use std::time::Duration;

use tracing::debug;

use crate::calibration::CalibrationStore;
use crate::config::{
    LEG_COUNT, MAX_SPEED, SERVO_COUNT, SLEW_MAX_DEG_PER_S, SLEW_MIN_DEG_PER_S,
};
use crate::error::CrawlerError;
use crate::gait::actions::Frame;
use crate::gait::kinematics::Coordinate;
use crate::gait::leg::{legs, Leg};
use crate::servo::{ServoCommand, ServoDriver};

pub(crate) struct Sequencer {
    legs: [Leg; LEG_COUNT],
    current: Frame,
    last_angles: [f32; SERVO_COUNT],
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            legs: legs(),
            current: [Coordinate::rest(); LEG_COUNT],
            // No frame has been dispatched yet; deltas are measured against
            // the neutral pose.
            last_angles: [90.0; SERVO_COUNT],
        }
    }

    /// Commanded foot positions of the last dispatched frame.
    pub fn current_frame(&self) -> &Frame {
        &self.current
    }

    /// Resolve a frame into its twelve servo commands, or fail with no side
    /// effects.
    fn plan(
        &self,
        frame: &Frame,
        calibration: &CalibrationStore,
    ) -> Result<[ServoCommand; SERVO_COUNT], CrawlerError> {
        let mut commands = [ServoCommand {
            servo: 0,
            pin: 0,
            degrees: 0.0,
        }; SERVO_COUNT];
        for leg in &self.legs {
            let target = frame[leg.index()];
            let angles = leg
                .solve(target)
                .map_err(|err| CrawlerError::UnreachableTarget {
                    leg: leg.index(),
                    target: err.target,
                })?;
            for command in leg.servo_commands(angles, calibration) {
                commands[command.servo as usize] = command;
            }
        }
        Ok(commands)
    }

    /// Dispatch one frame as a single move and wait out its settle delay.
    pub async fn execute<D: ServoDriver>(
        &mut self,
        driver: &mut D,
        calibration: &CalibrationStore,
        frame: &Frame,
        speed: u8,
    ) -> Result<(), CrawlerError> {
        let commands = self.plan(frame, calibration)?;
        driver.set_angles(&commands)?;

        let max_delta = commands
            .iter()
            .map(|c| (c.degrees - self.last_angles[c.servo as usize]).abs())
            .fold(0.0_f32, f32::max);
        for command in &commands {
            self.last_angles[command.servo as usize] = command.degrees;
        }
        self.current = *frame;

        let delay = settle_delay(speed, max_delta);
        debug!(
            speed,
            max_delta,
            delay_ms = delay.as_millis() as u64,
            "frame dispatched"
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

/// Settle delay for one frame: the largest angular move, paced at a slew
/// rate interpolated linearly from [`SLEW_MIN_DEG_PER_S`] at speed 0 to
/// [`SLEW_MAX_DEG_PER_S`] at speed 100. Monotonic: more speed never
/// lengthens the delay.
pub fn settle_delay(speed: u8, max_delta_deg: f32) -> Duration {
    let speed = f32::from(speed.min(MAX_SPEED));
    let rate = SLEW_MIN_DEG_PER_S + (SLEW_MAX_DEG_PER_S - SLEW_MIN_DEG_PER_S) * speed / 100.0;
    Duration::from_secs_f32(max_delta_deg.max(0.0) / rate)
}
