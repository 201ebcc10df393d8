//! Breakshot - a deterministic nine-ball billiards simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, turn and rules
//!   state machines, replay-by-resimulation)
//!
//! Rendering, camera work, audio and raw input capture are presentation
//! concerns that live outside this crate; they consume the event queue and
//! per-ball poses exposed by `sim`.

pub mod sim;

pub use sim::{Ball, BallState, SimEvent, Table, TablePhase};
pub use sim::{FixedTimestep, TickInput, tick};

/// Physics and table configuration constants (SI units: meters, seconds, kg)
pub mod consts {
    /// Regulation ball diameter (57.15mm)
    pub const BALL_DIAMETER: f32 = 57.15e-3;
    pub const BALL_RADIUS: f32 = BALL_DIAMETER / 2.0;

    /// Rolling resistance between ball and cloth (typical range 0.005-0.015)
    pub const BALL_CLOTH_ROLLING_RESISTANCE_COEFF: f32 = 0.010;
    /// Bounciness of a ball-cushion impact (typical range 0.6-0.9)
    pub const BALL_CLOTH_RESTITUTION: f32 = 0.75;
    /// Bounciness of a ball-ball impact (typical range 0.92-0.98).
    /// Unused by the elastic collision model, which treats impacts as
    /// perfectly elastic; kept for tuning experiments.
    pub const BALL_BALL_RESTITUTION: f32 = 0.95;
    /// Speeds below this are snapped to exactly zero to stop asymptotic
    /// rolling (m/s)
    pub const BALL_VELOCITY_EPSILON: f32 = 0.001;

    pub const GRAVITY_ACCELERATION: f32 = 9.80665;
    /// Deceleration opposing the velocity of a rolling ball
    pub const ROLLING_RESISTANCE_DECEL: f32 =
        BALL_CLOTH_ROLLING_RESISTANCE_COEFF * GRAVITY_ACCELERATION;

    /// Ball masses. The collision model is mass-blind (equal-mass elastic
    /// reflection); these document the physical quantities it approximates.
    pub const CUE_BALL_MASS: f32 = 0.17;
    pub const NUMBERED_BALL_MASS: f32 = 0.16;

    /// Time for a released cue stick to travel to ball contact
    pub const CUE_STICK_TIME_TO_COLLISION: f32 = 0.1 / 2.666_666_6;
    /// Follow-through time after contact before the stick goes idle
    pub const CUE_STICK_TIME_AFTER_COLLISION: f32 = 0.1;
    /// Cursor dead zone around the cue ball; shots inside it are clamped to
    /// the weakest shot
    pub const CURSOR_RADIUS_EPSILON: f32 = 0.4;
    /// Weakest possible shot velocity (m/s)
    pub const SHOT_VELOCITY_EPSILON: f32 = 0.03;
    /// Strongest possible shot velocity (m/s)
    pub const MAX_SHOT_VELOCITY: f32 = 8.0;

    /// Balls slower than this near a pocket lip get nudged toward the pocket
    /// center so they do not stall on the edge
    pub const POCKET_EDGE_MIN_FUDGE_VELOCITY: f32 = 3.0e-2;
    pub const POCKET_EDGE_FUDGE_ACCELERATION: f32 = GRAVITY_ACCELERATION / 2.0;
    /// Damping applied when a falling ball bounces off the pocket wall
    pub const POCKET_DAMPER: f32 = 0.75;

    /// Play area of an eight-foot table (234cm x 117cm)
    pub const TABLE_LENGTH: f32 = 234.0e-2;
    pub const TABLE_WIDTH: f32 = 117.0e-2;

    pub const POCKET_DIAMETER: f32 = 19.377e-2;
    pub const POCKET_RADIUS: f32 = POCKET_DIAMETER / 2.0;
    /// Z coordinate of the pocket floor
    pub const POCKET_BOTTOM: f32 = -10.1446e-2;

    /// Fixed simulation timestep; the simulation never advances by any other
    /// amount, which is what makes replay-by-resimulation exact
    pub const MAX_DT: f32 = 0.007;
    /// Maximum fixed steps drained per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Replay lead-in before the cue ball's first hit
    pub const REPLAY_TIME_BEFORE_HIT: f32 = 0.5;
    /// Relative impact speed above which a ball-ball collision is loud
    /// enough for presentation to play a sound
    pub const LOUD_COLLISION_MIN_SPEED: f32 = 0.8;

    /// Cue ball plus object balls 1-9
    pub const BALL_COUNT: usize = 10;
}
