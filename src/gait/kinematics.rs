// Inverse kinematics for one three-servo leg
//
// The leg is a yaw joint at the shoulder followed by a two-link planar
// linkage: shoulder offset C out to the hip, upper link A, lower link B.
// Targets are foot positions in the per-leg frame: x out from the body,
// y toward the front of the robot, z up, millimeters, origin at the
// shoulder yaw axis.
//
// Servo angles are degrees in [0, 180] with 90 as the neutral pose. Left
// legs are mirror-mounted; the solver flips the lateral axis before solving
// and reflects the resulting angles, so callers use one sign convention for
// all four legs.

use std::fmt;

use crate::config::{LINK_A, LINK_B, LINK_C, REST_POSITION};

/// Target foot position in the per-leg frame, millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Coordinate {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Default rest stance position.
    pub const fn rest() -> Self {
        Self::new(REST_POSITION[0], REST_POSITION[1], REST_POSITION[2])
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Servo targets for one leg, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngles {
    pub shoulder: f32,
    pub upper: f32,
    pub lower: f32,
}

impl JointAngles {
    pub fn as_array(&self) -> [f32; 3] {
        [self.shoulder, self.upper, self.lower]
    }

    /// Reflection for mirror-mounted servos.
    fn mirrored(self) -> Self {
        Self {
            shoulder: 180.0 - self.shoulder,
            upper: 180.0 - self.upper,
            lower: 180.0 - self.lower,
        }
    }
}

/// Which trunk side a leg is mounted on. Left legs are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Right,
    Left,
}

/// The target lies outside the annulus the two leg links can span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unreachable {
    pub target: Coordinate,
}

/// Solve one foot target into servo angles.
///
/// Pure function of the target and the link constants. Fails on targets the
/// law of cosines cannot satisfy rather than producing NaN angles; the check
/// also rejects non-finite inputs.
pub fn solve(target: Coordinate, side: Side) -> Result<JointAngles, Unreachable> {
    let y = match side {
        Side::Right => target.y,
        Side::Left => -target.y,
    };

    // Horizontal projection: shoulder yaw, and the spread from the yaw axis
    // out to the foot.
    let yaw = y.atan2(target.x).to_degrees();
    let spread = (target.x * target.x + y * y).sqrt();

    // Planar problem in the leg's vertical plane, origin at the hip.
    let reach = spread - LINK_C;
    let span = (reach * reach + target.z * target.z).sqrt();
    let max_span = LINK_A + LINK_B;
    let min_span = (LINK_A - LINK_B).abs();
    if !(span >= min_span && span <= max_span) {
        return Err(Unreachable { target });
    }

    // Law of cosines: hip opening against the foot ray, then the knee.
    // The span check keeps both arguments in [-1, 1]; the clamp only absorbs
    // float rounding at the workspace boundary.
    let hip_open = ((LINK_A * LINK_A + span * span - LINK_B * LINK_B) / (2.0 * LINK_A * span))
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();
    let knee = ((LINK_A * LINK_A + LINK_B * LINK_B - span * span) / (2.0 * LINK_A * LINK_B))
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();
    let drop = (-target.z).atan2(reach).to_degrees();

    let angles = JointAngles {
        shoulder: 90.0 + yaw,
        upper: 90.0 + drop - hip_open,
        lower: 180.0 - knee,
    };
    Ok(match side {
        Side::Right => angles,
        Side::Left => angles.mirrored(),
    })
}

/// Foot position a set of servo angles puts the leg at.
///
/// Exact inverse of [`solve`]; used by diagnostics and the round-trip tests.
pub fn foot_position(angles: JointAngles, side: Side) -> Coordinate {
    let a = match side {
        Side::Right => angles,
        Side::Left => angles.mirrored(),
    };
    let knee = (180.0 - a.lower).to_radians();
    let span = (LINK_A * LINK_A + LINK_B * LINK_B - 2.0 * LINK_A * LINK_B * knee.cos()).sqrt();
    let hip_open = ((LINK_A * LINK_A + span * span - LINK_B * LINK_B) / (2.0 * LINK_A * span))
        .clamp(-1.0, 1.0)
        .acos();
    let drop = (a.upper - 90.0).to_radians() + hip_open;
    let reach = span * drop.cos();
    let z = -span * drop.sin();

    let spread = reach + LINK_C;
    let yaw = (a.shoulder - 90.0).to_radians();
    let x = spread * yaw.cos();
    let y = spread * yaw.sin();
    Coordinate {
        x,
        y: match side {
            Side::Right => y,
            Side::Left => -y,
        },
        z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE_MM: f32 = 0.05;

    fn assert_close(a: Coordinate, b: Coordinate) {
        assert!(
            (a.x - b.x).abs() < TOLERANCE_MM
                && (a.y - b.y).abs() < TOLERANCE_MM
                && (a.z - b.z).abs() < TOLERANCE_MM,
            "{a} != {b}"
        );
    }

    #[test]
    fn rest_pose_centers_the_shoulder() {
        let angles = solve(Coordinate::rest(), Side::Right).unwrap();
        assert!((angles.shoulder - 90.0).abs() < 1e-3);
        assert!((50.0..60.0).contains(&angles.upper), "upper {}", angles.upper);
        assert!((130.0..145.0).contains(&angles.lower), "lower {}", angles.lower);
    }

    #[test]
    fn solve_round_trips_across_the_workspace() {
        let mut solved = 0;
        for side in [Side::Right, Side::Left] {
            for xi in 0..6 {
                for yi in 0..5 {
                    for zi in 0..5 {
                        let target = Coordinate::new(
                            40.0 + 10.0 * xi as f32,
                            -30.0 + 15.0 * yi as f32,
                            -60.0 + 15.0 * zi as f32,
                        );
                        let Ok(angles) = solve(target, side) else {
                            continue;
                        };
                        solved += 1;
                        assert_close(foot_position(angles, side), target);
                    }
                }
            }
        }
        assert!(solved > 100, "only {solved} grid points were reachable");
    }

    #[test]
    fn overextended_target_is_unreachable() {
        let target = Coordinate::new(200.0, 0.0, -120.0);
        assert_eq!(
            solve(target, Side::Right),
            Err(Unreachable { target })
        );
    }

    #[test]
    fn folded_target_is_unreachable() {
        // Inside the inner annulus bound |A - B|.
        let target = Coordinate::new(34.0, 0.0, -2.0);
        assert!(solve(target, Side::Right).is_err());
    }

    #[test]
    fn non_finite_target_is_rejected_not_propagated() {
        let target = Coordinate::new(f32::NAN, 0.0, -30.0);
        assert!(solve(target, Side::Right).is_err());
    }

    #[test]
    fn left_leg_mirrors_the_right_solution() {
        let right = solve(Coordinate::new(60.0, 15.0, -30.0), Side::Right).unwrap();
        let left = solve(Coordinate::new(60.0, 15.0, -30.0), Side::Left).unwrap();
        // Same planar pose, reflected servo angles; the yaw flip and the
        // mirror cancel on the shoulder.
        assert!((left.shoulder - right.shoulder).abs() < 1e-3);
        assert!((left.upper - (180.0 - right.upper)).abs() < 1e-3);
        assert!((left.lower - (180.0 - right.lower)).abs() < 1e-3);
    }

    #[test]
    fn identical_inputs_solve_identically() {
        let target = Coordinate::new(55.0, -10.0, -40.0);
        assert_eq!(
            solve(target, Side::Right).unwrap(),
            solve(target, Side::Right).unwrap()
        );
    }
}
