// Servo actuation module
//
// Provides:
// - The ServoDriver capability the gait layer dispatches through
// - A serial bus backend (STS-style protocol, position mode)
// - A recording driver for tests and dry runs

pub mod bus;
mod driver;

pub use bus::{BusError, ServoBus};
pub use driver::{RecordingDriver, SerialServoDriver, ServoCommand, ServoDriver};
