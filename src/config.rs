// Leg geometry, servo layout, and motion timing

/// Horizontal offset from the shoulder yaw axis to the hip joint, millimeters.
pub const LINK_C: f32 = 32.0;

/// Hip to knee (upper leg link), millimeters.
pub const LINK_A: f32 = 50.0;

/// Knee to foot tip (lower leg link), millimeters.
pub const LINK_B: f32 = 60.0;

pub const LEG_COUNT: usize = 4;
pub const JOINTS_PER_LEG: usize = 3;
pub const SERVO_COUNT: usize = LEG_COUNT * JOINTS_PER_LEG;

/// Rest stance foot position `(x, y, z)` in the per-leg frame, millimeters.
pub const REST_POSITION: [f32; 3] = [60.0, 0.0, -30.0];

/// Servo index -> physical bus pin.
/// The left trunk carries pins 1-6 front to rear, the right trunk 7-12.
pub const PIN_MAP: [u8; SERVO_COUNT] = [1, 2, 3, 7, 8, 9, 4, 5, 6, 10, 11, 12];

// Speed 0-100 maps linearly onto a servo slew rate; the settle delay for a
// frame is the largest angular move divided by that rate.
pub const SLEW_MIN_DEG_PER_S: f32 = 60.0;
pub const SLEW_MAX_DEG_PER_S: f32 = 600.0;

pub const MAX_SPEED: u8 = 100;
pub const DEFAULT_SPEED: u8 = 50;

/// Default serial port for the servo bus (demos; library callers pass their own).
pub const SERVO_PORT: &str = "/dev/ttyUSB0";

/// Default calibration file (demos; library callers pass their own path).
pub const CALIBRATION_PATH: &str = "crawler-calibration.json";
