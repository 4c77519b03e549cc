// Built-in action library
//
// Every action is an ordered sequence of coordinate frames, one target per
// leg. The walking gaits are creep cycles: one leg in the air at a time
// while the other three push the body along. Frames are discrete waypoints;
// the sequencer does not interpolate between them.

use std::collections::HashMap;

use crate::config::{LEG_COUNT, REST_POSITION};
use crate::gait::kinematics::Coordinate;

/// One motion waypoint: a foot target per leg, order FL, FR, RL, RR.
pub type Frame = [Coordinate; LEG_COUNT];

/// Rest stance.
pub const REST: Coordinate = Coordinate::new(REST_POSITION[0], REST_POSITION[1], REST_POSITION[2]);

/// Retracted low stance, feet out for stability.
const SIT: Coordinate = Coordinate::new(70.0, 0.0, -12.0);

const STANCE_Z: f32 = REST_POSITION[2];
const LIFT_Z: f32 = -10.0;

/// Half-stride: a swing leg lands at `+STRIDE` and leaves at `-STRIDE`.
const STRIDE: f32 = 15.0;
/// Body travel per beat, pushed through each planted foot.
const STANCE_SHIFT: f32 = 10.0;
/// Swing order over one cycle: FL, RR, FR, RL.
const SWING_ORDER: [usize; LEG_COUNT] = [0, 3, 1, 2];

pub struct ActionLibrary {
    actions: HashMap<&'static str, Vec<Frame>>,
}

impl ActionLibrary {
    /// The fixed built-in set. Custom sequences go through `do_step`.
    pub fn builtin() -> Self {
        let mut actions = HashMap::new();
        actions.insert("forward", creep_cycle([1.0; LEG_COUNT]));
        actions.insert("backward", creep_cycle([-1.0; LEG_COUNT]));
        // Turning runs the forward pattern on one side and the backward
        // pattern on the other, pivoting the body between them.
        actions.insert("turn left", creep_cycle([-1.0, 1.0, -1.0, 1.0]));
        actions.insert("turn right", creep_cycle([1.0, -1.0, 1.0, -1.0]));
        actions.insert("stand", vec![[REST; LEG_COUNT]]);
        actions.insert("sit", vec![[SIT; LEG_COUNT]]);
        actions.insert("wave", wave_cycle());
        Self { actions }
    }

    pub fn frames(&self, name: &str) -> Option<&[Frame]> {
        self.actions.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.keys().copied()
    }
}

fn frame_with(y: &[f32; LEG_COUNT], lifted: Option<usize>, dir: &[f32; LEG_COUNT]) -> Frame {
    let mut frame = [REST; LEG_COUNT];
    for (leg, target) in frame.iter_mut().enumerate() {
        let z = if lifted == Some(leg) { LIFT_Z } else { STANCE_Z };
        *target = Coordinate::new(REST.x, dir[leg] * y[leg], z);
    }
    frame
}

/// Eight-frame creep cycle. Each beat is two frames: the swing leg lifts and
/// advances to the front of its stride while the planted legs push the body
/// a quarter stride, then the swing leg plants. `dir` flips the stride per
/// leg, which also yields the turning gaits. The cycle is periodic: leg
/// positions at the end match the start.
fn creep_cycle(dir: [f32; LEG_COUNT]) -> Vec<Frame> {
    let mut y = [0.0_f32; LEG_COUNT];
    for (beat, &leg) in SWING_ORDER.iter().enumerate() {
        y[leg] = -STRIDE + STANCE_SHIFT * beat as f32;
    }
    let mut frames = Vec::with_capacity(2 * LEG_COUNT);
    for &swing in &SWING_ORDER {
        for (leg, pos) in y.iter_mut().enumerate() {
            if leg != swing {
                *pos -= STANCE_SHIFT;
            }
        }
        y[swing] = STRIDE;
        frames.push(frame_with(&y, Some(swing), &dir));
        frames.push(frame_with(&y, None, &dir));
    }
    frames
}

/// Front-right foot raised to shoulder height and swept sideways twice,
/// then back to rest.
fn wave_cycle() -> Vec<Frame> {
    let raised = |y: f32| Coordinate::new(80.0, y, 0.0);
    [
        raised(0.0),
        raised(25.0),
        raised(-25.0),
        raised(25.0),
        raised(-25.0),
        REST,
    ]
    .into_iter()
    .map(|target| {
        let mut frame = [REST; LEG_COUNT];
        frame[1] = target;
        frame
    })
    .collect()
}
