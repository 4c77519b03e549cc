// Error taxonomy for the public command surface

use crate::calibration::CalibrationError;
use crate::gait::kinematics::Coordinate;
use crate::servo::BusError;

#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    /// The kinematic solve was infeasible for this target; no servo command
    /// of the frame was dispatched.
    #[error("leg {leg}: foot target {target} is outside the reachable workspace")]
    UnreachableTarget { leg: usize, target: Coordinate },

    #[error("unknown action {name:?}")]
    UnknownAction { name: String },

    #[error("invalid coordinate frame: {reason}")]
    InvalidFrame { reason: String },

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error("servo bus: {0}")]
    Bus(#[from] BusError),
}
