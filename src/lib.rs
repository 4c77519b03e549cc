// Gait and kinematics runtime for a twelve-servo quadruped crawler
//
// The crate converts per-leg foot targets in Cartesian space into servo
// angles and sequences them over time to realize named actions and custom
// step sequences. It is open-loop: angles come from a static kinematic
// model and the actuator layer is trusted to reach them.

pub mod calibration;
pub mod config;
pub mod crawler;
pub mod error;
pub mod gait;
pub mod servo;
pub mod tracker;

pub use calibration::{CalibrationError, CalibrationStore, ServoOffset};
pub use crawler::{Crawler, StopHandle};
pub use error::CrawlerError;
pub use gait::{Coordinate, Frame, JointAngles, Side};
pub use servo::{BusError, RecordingDriver, SerialServoDriver, ServoCommand, ServoDriver};
