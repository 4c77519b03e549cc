// Actuator layer: the ServoDriver capability and its backends
//
// The gait layer only ever talks to the `ServoDriver` trait, so hardware,
// simulation, and test doubles are interchangeable.

use tracing::{debug, info, trace, warn};

use super::bus::{BusError, ServoBus};

/// A fully resolved command for one servo: logical index, physical pin, and
/// the calibrated angle to reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoCommand {
    pub servo: u8,
    pub pin: u8,
    pub degrees: f32,
}

/// Capability over the actuator hardware. Commands are fire-and-forget:
/// delivery is best-effort and the core never waits for an acknowledgment.
pub trait ServoDriver {
    fn set_angle(&mut self, command: ServoCommand) -> Result<(), BusError>;

    /// Deliver a batch of commands as one logical move. Every command of one
    /// frame is issued before any command of the next frame.
    fn set_angles(&mut self, commands: &[ServoCommand]) -> Result<(), BusError> {
        for &command in commands {
            self.set_angle(command)?;
        }
        Ok(())
    }
}

impl<D: ServoDriver + ?Sized> ServoDriver for Box<D> {
    fn set_angle(&mut self, command: ServoCommand) -> Result<(), BusError> {
        (**self).set_angle(command)
    }

    fn set_angles(&mut self, commands: &[ServoCommand]) -> Result<(), BusError> {
        (**self).set_angles(commands)
    }
}

/// Hardware backend over the serial servo bus.
pub struct SerialServoDriver {
    bus: ServoBus,
}

impl SerialServoDriver {
    pub fn open(port: &str) -> Result<Self, BusError> {
        info!(port, "opening servo bus");
        Ok(Self {
            bus: ServoBus::open(port)?,
        })
    }

    /// Ping every servo and enable torque. Call once before commanding
    /// motion.
    pub fn initialize(&mut self, pins: &[u8]) -> Result<(), BusError> {
        for &pin in pins {
            if self.bus.ping(pin)? {
                debug!(pin, "servo responding");
            } else {
                warn!(pin, "servo not responding");
                return Err(BusError::Timeout { id: pin });
            }
        }
        for &pin in pins {
            self.bus.enable_torque(pin)?;
        }
        info!(servos = pins.len(), "servo bus initialized");
        Ok(())
    }

    /// Drop torque on all servos so the legs move freely.
    pub fn relax(&mut self, pins: &[u8]) -> Result<(), BusError> {
        for &pin in pins {
            self.bus.disable_torque(pin)?;
        }
        Ok(())
    }

    pub fn bus_mut(&mut self) -> &mut ServoBus {
        &mut self.bus
    }
}

impl ServoDriver for SerialServoDriver {
    fn set_angle(&mut self, command: ServoCommand) -> Result<(), BusError> {
        self.bus.set_position_deg(command.pin, command.degrees)
    }

    fn set_angles(&mut self, commands: &[ServoCommand]) -> Result<(), BusError> {
        let targets: Vec<(u8, f32)> = commands.iter().map(|c| (c.pin, c.degrees)).collect();
        self.bus.sync_write_positions(&targets)
    }
}

/// Records commands instead of touching hardware. Stands in for the bus in
/// tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    commands: Vec<ServoCommand>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command received, in dispatch order.
    pub fn commands(&self) -> &[ServoCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// The most recent command for a servo index, if any.
    pub fn last_for(&self, servo: u8) -> Option<ServoCommand> {
        self.commands.iter().rev().find(|c| c.servo == servo).copied()
    }
}

impl ServoDriver for RecordingDriver {
    fn set_angle(&mut self, command: ServoCommand) -> Result<(), BusError> {
        trace!(servo = command.servo, pin = command.pin, degrees = command.degrees, "recorded");
        self.commands.push(command);
        Ok(())
    }
}
