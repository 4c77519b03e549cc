// Open-loop dead reckoning from executed actions
//
// The robot has no odometry; the tracker folds each executed named action
// into a pose estimate using the nominal travel of one gait cycle. Good
// enough for teleop status readouts, not for navigation.

/// Nominal body travel per forward/backward cycle: four beats of a quarter
/// stride each, centimeters.
pub const STEP_LENGTH_CM: f32 = 4.0;

/// Nominal rotation per turn cycle, degrees.
pub const TURN_STEP_DEG: f32 = 45.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionTracker {
    x_cm: f32,
    y_cm: f32,
    heading_deg: f32,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one executed action into the pose estimate. Actions that do not
    /// translate or rotate the body (stand, sit, wave) are ignored.
    pub fn record(&mut self, action: &str, steps: u32) {
        let steps = steps as f32;
        match action {
            "forward" => self.advance(STEP_LENGTH_CM * steps),
            "backward" => self.advance(-STEP_LENGTH_CM * steps),
            "turn left" => self.rotate(TURN_STEP_DEG * steps),
            "turn right" => self.rotate(-TURN_STEP_DEG * steps),
            _ => {}
        }
    }

    /// Estimated pose: x, y in centimeters and heading in degrees [0, 360).
    pub fn position(&self) -> (f32, f32, f32) {
        (self.x_cm, self.y_cm, self.heading_deg)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn advance(&mut self, distance_cm: f32) {
        let heading = self.heading_deg.to_radians();
        self.x_cm += distance_cm * heading.cos();
        self.y_cm += distance_cm * heading.sin();
    }

    fn rotate(&mut self, delta_deg: f32) {
        self.heading_deg = (self.heading_deg + delta_deg).rem_euclid(360.0);
    }
}
