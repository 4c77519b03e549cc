// Gait layer
//
// Provides:
// - Per-leg inverse kinematics (foot target -> three servo angles)
// - The leg model binding legs to servos and applying calibration
// - The built-in action library (walking gaits and poses)
// - The frame execution loop with speed-derived settle delays

pub mod actions;
pub mod kinematics;
pub mod leg;
pub(crate) mod sequencer;

pub use actions::{ActionLibrary, Frame, REST};
pub use kinematics::{foot_position, solve, Coordinate, JointAngles, Side, Unreachable};
pub use leg::Leg;
pub use sequencer::settle_delay;
