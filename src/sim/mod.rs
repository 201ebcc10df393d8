//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (ball numbers, fixed pocket order)
//! - No rendering or platform dependencies

pub mod ball;
pub mod collision;
pub mod cue;
pub mod geom;
pub mod rules;
pub mod state;
pub mod table;
pub mod tick;

pub use ball::{Ball, BallState};
pub use cue::{CueStick, CueStickState};
pub use geom::{Polygon, elastic_collision_reflection, line_circle_intersection, reflect};
pub use rules::{NineBallRules, Player};
pub use state::{
    ReplayEntry, RngState, SimEvent, Table, TablePhase, TableSnapshot,
};
pub use table::{CushionSide, DropRegion, PocketId, TableLayout, diamond_rack, triangle_rack};
pub use tick::{FixedTimestep, TickInput, run_frame, tick};
