// One leg: its mounting side and the three servos driving it
//
// Servo indices are fixed by position: leg index * 3 + joint, with joints
// ordered shoulder, upper, lower. Calibration is applied here, on every
// dispatch path, so built-in actions and custom steps behave identically.

use tracing::warn;

use crate::calibration::CalibrationStore;
use crate::config::{JOINTS_PER_LEG, LEG_COUNT, PIN_MAP};
use crate::gait::kinematics::{self, Coordinate, JointAngles, Side, Unreachable};
use crate::servo::ServoCommand;

#[derive(Debug, Clone, Copy)]
pub struct Leg {
    index: usize,
    side: Side,
}

impl Leg {
    pub(crate) const fn new(index: usize, side: Side) -> Self {
        Self { index, side }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// The three servo indices for this leg, joint order shoulder, upper, lower.
    pub fn servo_indices(&self) -> [usize; JOINTS_PER_LEG] {
        let base = self.index * JOINTS_PER_LEG;
        [base, base + 1, base + 2]
    }

    /// Solve a foot target for this leg's mounting side.
    pub fn solve(&self, target: Coordinate) -> Result<JointAngles, Unreachable> {
        kinematics::solve(target, self.side)
    }

    /// Resolve joint angles into dispatchable servo commands: inversion,
    /// then offset, then the [0, 180] safety clamp, then the pin mapping.
    /// Clamping is not an error, but it is logged.
    pub fn servo_commands(
        &self,
        angles: JointAngles,
        calibration: &CalibrationStore,
    ) -> [ServoCommand; JOINTS_PER_LEG] {
        let mut commands = [ServoCommand {
            servo: 0,
            pin: 0,
            degrees: 0.0,
        }; JOINTS_PER_LEG];
        for (joint, &angle) in angles.as_array().iter().enumerate() {
            let servo = self.index * JOINTS_PER_LEG + joint;
            let trim = calibration.offset_for(servo);
            let mut degrees = if trim.inverted { 180.0 - angle } else { angle };
            degrees += trim.offset_degrees as f32;
            if !(0.0..=180.0).contains(&degrees) {
                warn!(servo, degrees, "servo target outside [0, 180], clamping");
                degrees = degrees.clamp(0.0, 180.0);
            }
            commands[joint] = ServoCommand {
                servo: servo as u8,
                pin: PIN_MAP[servo],
                degrees,
            };
        }
        commands
    }
}

/// The four legs in frame order: front-left, front-right, rear-left,
/// rear-right. Left legs are mirror-mounted.
pub(crate) const fn legs() -> [Leg; LEG_COUNT] {
    [
        Leg::new(0, Side::Left),
        Leg::new(1, Side::Right),
        Leg::new(2, Side::Left),
        Leg::new(3, Side::Right),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;

    fn angles() -> JointAngles {
        JointAngles {
            shoulder: 90.0,
            upper: 60.0,
            lower: 140.0,
        }
    }

    #[test]
    fn servo_indices_follow_the_leg_index() {
        assert_eq!(legs()[0].servo_indices(), [0, 1, 2]);
        assert_eq!(legs()[3].servo_indices(), [9, 10, 11]);
    }

    #[test]
    fn identity_calibration_passes_angles_through() {
        let leg = legs()[1];
        let commands = leg.servo_commands(angles(), &CalibrationStore::identity());
        assert_eq!(commands[0].servo, 3);
        assert_eq!(commands[0].pin, PIN_MAP[3]);
        assert_eq!(commands[0].degrees, 90.0);
        assert_eq!(commands[1].degrees, 60.0);
        assert_eq!(commands[2].degrees, 140.0);
    }

    #[test]
    fn inversion_applies_before_the_offset() {
        let leg = legs()[0];
        let mut calibration = CalibrationStore::identity();
        calibration.set_inverted(1, true).unwrap();
        calibration.set_offset(1, 4).unwrap();
        let commands = leg.servo_commands(angles(), &calibration);
        // 180 - 60, then + 4
        assert_eq!(commands[1].degrees, 124.0);
    }

    #[test]
    fn out_of_range_targets_are_clamped() {
        let leg = legs()[1];
        let mut calibration = CalibrationStore::identity();
        calibration.set_offset(5, 140).unwrap();
        let commands = leg.servo_commands(angles(), &calibration);
        assert_eq!(commands[2].degrees, 180.0);
    }

    #[test]
    fn command_generation_is_idempotent() {
        let leg = legs()[2];
        let mut calibration = CalibrationStore::identity();
        calibration.set_offset(7, -3).unwrap();
        let first = leg.servo_commands(angles(), &calibration);
        let second = leg.servo_commands(angles(), &calibration);
        assert_eq!(first, second);
    }
}
