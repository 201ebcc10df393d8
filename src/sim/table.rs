//! Table geometry: cushions, pockets, rack positions and drop regions
//!
//! Two canonical cushions (southeast and east) and two canonical pockets
//! (southeast and south) define everything; the rest of the table is their
//! image under the mirror group {x -> -x, y -> -y}.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geom::Polygon;
use crate::consts::*;

/// The six pockets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PocketId {
    Southeast,
    Southwest,
    Northeast,
    Northwest,
    South,
    North,
}

/// Canonical pocket centers, measured from the table model
pub const SOUTHEAST_POCKET: Vec2 = Vec2::new(1.20688, -62.29423e-2);
pub const SOUTH_POCKET: Vec2 = Vec2::new(0.0, -67.94704e-2);

impl PocketId {
    pub const ALL: [PocketId; 6] = [
        PocketId::Southeast,
        PocketId::Southwest,
        PocketId::Northeast,
        PocketId::Northwest,
        PocketId::South,
        PocketId::North,
    ];

    pub fn center(self) -> Vec2 {
        match self {
            PocketId::Southeast => SOUTHEAST_POCKET,
            PocketId::Southwest => Vec2::new(-SOUTHEAST_POCKET.x, SOUTHEAST_POCKET.y),
            PocketId::Northeast => Vec2::new(SOUTHEAST_POCKET.x, -SOUTHEAST_POCKET.y),
            PocketId::Northwest => Vec2::new(-SOUTHEAST_POCKET.x, -SOUTHEAST_POCKET.y),
            PocketId::South => SOUTH_POCKET,
            PocketId::North => Vec2::new(SOUTH_POCKET.x, -SOUTH_POCKET.y),
        }
    }
}

/// Table side owning a cushion group, used for broad-phase pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CushionSide {
    North,
    South,
    East,
    West,
}

/// Immutable cushion polygons grouped by table side
#[derive(Debug, Clone)]
pub struct TableLayout {
    northern: Vec<Polygon>,
    southern: Vec<Polygon>,
    eastern: Vec<Polygon>,
    western: Vec<Polygon>,
}

fn southeast_cushion() -> Polygon {
    // Wound counter-clockwise: right back, right corner, left corner, left
    // back (values from the table model)
    Polygon::new(vec![
        Vec2::new(1.3362, -83.0000e-2),
        Vec2::new(1.08992, -58.50002e-2),
        Vec2::new(7.45926e-2, -58.50002e-2),
        Vec2::new(0.0, -83.0000e-2),
    ])
}

fn east_cushion() -> Polygon {
    let bottom_back = Vec2::new(1.4365, -76.8976e-2);
    let bottom_corner = Vec2::new(1.17074, -50.41774e-2);
    Polygon::new(vec![
        Vec2::new(bottom_back.x, -bottom_back.y),
        Vec2::new(bottom_corner.x, -bottom_corner.y),
        bottom_corner,
        bottom_back,
    ])
}

impl TableLayout {
    pub fn new() -> Self {
        let southeast = southeast_cushion();
        let east = east_cushion();
        let southwest = southeast.mirrored(-1.0, 1.0);
        let northeast = southeast.mirrored(1.0, -1.0);
        let northwest = southeast.mirrored(-1.0, -1.0);
        let west = east.mirrored(-1.0, 1.0);
        Self {
            northern: vec![northeast, northwest],
            southern: vec![southeast, southwest],
            eastern: vec![east],
            western: vec![west],
        }
    }

    pub fn side(&self, side: CushionSide) -> &[Polygon] {
        match side {
            CushionSide::North => &self.northern,
            CushionSide::South => &self.southern,
            CushionSide::East => &self.eastern,
            CushionSide::West => &self.western,
        }
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the cue ball starts and returns when racking
pub const CUE_BALL_RACK_POSITION: Vec2 = Vec2::new(-3.0 / 8.0 * TABLE_LENGTH, 0.0);

/// Fifteen-slot triangular rack lattice, apex toward the kitchen
pub fn triangle_rack() -> Vec<Vec2> {
    let row_spacing = (3.0 * BALL_RADIUS * BALL_RADIUS).sqrt();
    let mut slots = Vec::with_capacity(15);
    for i in 0..5 {
        for j in 0..=i {
            slots.push(Vec2::new(
                TABLE_LENGTH / 4.0 + i as f32 * row_spacing,
                j as f32 * BALL_DIAMETER - i as f32 * BALL_RADIUS,
            ));
        }
    }
    slots
}

/// Nine-slot diamond, the subset of the triangle used for nine-ball.
/// Slot 0 is the apex and slot 4 the center.
pub fn diamond_rack() -> Vec<Vec2> {
    let triangle = triangle_rack();
    [0, 1, 2, 3, 4, 5, 7, 8, 12]
        .iter()
        .map(|&i| triangle[i])
        .collect()
}

/// Legal area for a cue ball drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropRegion {
    /// Behind the head string; used for the opening drop
    Kitchen,
    /// The whole play area; used after a scratch
    FullTable,
}

impl DropRegion {
    pub fn contains(self, p: Vec2) -> bool {
        let north = TABLE_WIDTH / 2.0 - BALL_RADIUS;
        let south = -north;
        let west = -(TABLE_LENGTH / 2.0) + BALL_RADIUS;
        let east = match self {
            DropRegion::Kitchen => -TABLE_LENGTH / 4.0 - BALL_RADIUS,
            DropRegion::FullTable => TABLE_LENGTH / 2.0 - BALL_RADIUS,
        };
        p.y < north && p.y > south && p.x < east && p.x > west
    }
}
