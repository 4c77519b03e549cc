// Robot facade
//
// `Crawler` is the single public entry point: it owns the driver, the
// calibration store, the action library, and the sequencer, and exposes
// `do_action` / `do_step` plus the diagnostic accessors. Every motion entry
// point takes `&mut self`, so one logical owner drives the robot at a time
// and recalibration can never race an in-flight action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::calibration::CalibrationStore;
use crate::config::LEG_COUNT;
use crate::error::CrawlerError;
use crate::gait::actions::{ActionLibrary, Frame};
use crate::gait::kinematics::Coordinate;
use crate::gait::sequencer::Sequencer;
use crate::servo::ServoDriver;

/// Cooperative cancellation for multi-frame actions.
///
/// The flag is checked before each frame, never mid-frame (frames are
/// short). When it fires, the running action consumes it and returns
/// cleanly between frames.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

pub struct Crawler<D> {
    driver: D,
    calibration: CalibrationStore,
    actions: ActionLibrary,
    sequencer: Sequencer,
    stop: StopHandle,
}

impl<D: ServoDriver> Crawler<D> {
    pub fn new(driver: D, calibration: CalibrationStore) -> Self {
        Self {
            driver,
            calibration,
            actions: ActionLibrary::builtin(),
            sequencer: Sequencer::new(),
            stop: StopHandle::default(),
        }
    }

    /// Run a named action `steps` times at `speed` (0-100), blocking the
    /// caller until the last frame has settled. Unknown names fail before
    /// any servo command is issued. `steps` below 1 is treated as 1.
    pub async fn do_action(&mut self, name: &str, steps: u32, speed: u8) -> Result<(), CrawlerError> {
        let frames = self
            .actions
            .frames(name)
            .ok_or_else(|| CrawlerError::UnknownAction {
                name: name.to_string(),
            })?
            .to_vec();
        info!(action = name, steps, speed, "running action");
        for _ in 0..steps.max(1) {
            for frame in &frames {
                if self.stop.is_requested() {
                    self.stop.clear();
                    info!(action = name, "action stopped between frames");
                    return Ok(());
                }
                self.sequencer
                    .execute(&mut self.driver, &self.calibration, frame, speed)
                    .await?;
            }
        }
        Ok(())
    }

    /// Execute one custom frame: exactly four finite leg coordinates,
    /// validated before any kinematics runs.
    pub async fn do_step(&mut self, frame: &[Coordinate], speed: u8) -> Result<(), CrawlerError> {
        let frame = validate_frame(frame)?;
        self.sequencer
            .execute(&mut self.driver, &self.calibration, &frame, speed)
            .await
    }

    /// Commanded foot position of one leg (0-3), for diagnostics.
    pub fn leg_coordinate(&self, leg: usize) -> Option<Coordinate> {
        self.sequencer.current_frame().get(leg).copied()
    }

    /// Commanded foot positions of all four legs.
    pub fn current_frame(&self) -> &Frame {
        self.sequencer.current_frame()
    }

    pub fn action_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.names()
    }

    /// Update one servo's offset and persist it. Only possible while no
    /// action is executing, by way of the `&mut self` receiver.
    pub fn recalibrate(&mut self, servo: usize, offset_degrees: i32) -> Result<(), CrawlerError> {
        self.calibration.set_offset(servo, offset_degrees)?;
        Ok(())
    }

    pub fn set_inverted(&mut self, servo: usize, inverted: bool) -> Result<(), CrawlerError> {
        self.calibration.set_inverted(servo, inverted)?;
        Ok(())
    }

    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    /// Handle for requesting a stop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

fn validate_frame(frame: &[Coordinate]) -> Result<Frame, CrawlerError> {
    if frame.len() != LEG_COUNT {
        return Err(CrawlerError::InvalidFrame {
            reason: format!("expected {LEG_COUNT} leg coordinates, got {}", frame.len()),
        });
    }
    for (leg, coordinate) in frame.iter().enumerate() {
        if !coordinate.is_finite() {
            return Err(CrawlerError::InvalidFrame {
                reason: format!("non-finite coordinate for leg {leg}"),
            });
        }
    }
    Ok([frame[0], frame[1], frame[2], frame[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gait::actions::REST;
    use crate::servo::RecordingDriver;

    fn crawler() -> Crawler<RecordingDriver> {
        Crawler::new(RecordingDriver::new(), CalibrationStore::identity())
    }

    #[tokio::test(start_paused = true)]
    async fn stand_commands_the_rest_position_on_all_legs() {
        let mut crawler = crawler();
        crawler.do_action("stand", 1, 50).await.unwrap();
        for leg in 0..LEG_COUNT {
            assert_eq!(crawler.leg_coordinate(leg), Some(REST));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_action_issues_no_servo_commands() {
        let mut crawler = crawler();
        let err = crawler
            .do_action("unknown_action_xyz", 1, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlerError::UnknownAction { .. }));
        assert!(crawler.driver().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn short_frame_fails_before_any_kinematics() {
        let mut crawler = crawler();
        let err = crawler.do_step(&[REST; 3], 50).await.unwrap_err();
        assert!(matches!(err, CrawlerError::InvalidFrame { .. }));
        assert!(crawler.driver().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn non_finite_coordinate_fails_validation() {
        let mut crawler = crawler();
        let mut frame = [REST; LEG_COUNT];
        frame[1] = Coordinate::new(60.0, f32::INFINITY, -30.0);
        let err = crawler.do_step(&frame, 50).await.unwrap_err();
        assert!(matches!(err, CrawlerError::InvalidFrame { .. }));
        assert!(crawler.driver().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn recalibration_shifts_exactly_one_servo() {
        let mut crawler = crawler();
        let frame = [REST; LEG_COUNT];
        crawler.do_step(&frame, 50).await.unwrap();
        let before: Vec<_> = crawler.driver().commands().to_vec();

        crawler.recalibrate(0, 5).unwrap();
        crawler.driver_mut().clear();
        crawler.do_step(&frame, 50).await.unwrap();
        let after: Vec<_> = crawler.driver().commands().to_vec();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.servo, a.servo);
            if b.servo == 0 {
                assert!((a.degrees - b.degrees - 5.0).abs() < 1e-4);
            } else {
                assert_eq!(a.degrees, b.degrees);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn higher_speed_never_lengthens_a_sequence() {
        let mut elapsed = Vec::new();
        for speed in [10u8, 50, 90] {
            let mut crawler = crawler();
            let start = tokio::time::Instant::now();
            crawler.do_action("forward", 1, speed).await.unwrap();
            elapsed.push(start.elapsed());
        }
        assert!(elapsed[1] <= elapsed[0]);
        assert!(elapsed[2] <= elapsed[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_stop_halts_an_action_before_its_first_frame() {
        let mut crawler = crawler();
        crawler.stop_handle().request();
        crawler.do_action("forward", 3, 50).await.unwrap();
        assert!(crawler.driver().commands().is_empty());
        // The stop is consumed; the next action runs normally.
        crawler.do_action("stand", 1, 50).await.unwrap();
        assert!(!crawler.driver().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_step_leaves_commanded_state_untouched() {
        let mut crawler = crawler();
        crawler.do_action("stand", 1, 50).await.unwrap();
        let mut frame = [REST; LEG_COUNT];
        frame[3] = Coordinate::new(500.0, 0.0, 0.0);
        let err = crawler.do_step(&frame, 50).await.unwrap_err();
        assert!(matches!(
            err,
            CrawlerError::UnreachableTarget { leg: 3, .. }
        ));
        assert_eq!(crawler.current_frame(), &[REST; LEG_COUNT]);
    }
}
