//! Ball entity and per-ball lifecycle state machine

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::geom::reflect;
use super::table::PocketId;
use crate::consts::*;

/// Lifecycle of a ball across one rack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallState {
    /// Not on the table and not simulated
    Idle,
    /// Held by the player for placement; rendered but no physics
    Drop,
    /// Rolling (or at rest) on the table surface
    InPlay,
    /// Captured by a pocket, falling toward its floor
    FallingInPocket,
    /// At rest at the bottom of a pocket; terminal for this rack
    Pocketed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    /// 0 is the cue ball, 1-9 the object balls
    pub number: usize,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Visual-only rolling orientation
    pub orientation: Quat,
    pub state: BallState,
    /// Rack slot this ball returns to when put in play without an explicit
    /// position
    pub initial_position: Vec2,
    pub pocket: Option<PocketId>,
    /// Simulation time this ball was pocketed this shot
    pub pocket_time: Option<f32>,
    /// Simulation time of this ball's first ball-ball hit this shot
    pub first_hit_time: Option<f32>,
    pub time_in_play: f32,
    pub time_since_pocketed: f32,
}

impl Ball {
    pub fn new(number: usize, rack_position: Vec2) -> Self {
        Self {
            number,
            position: Vec3::new(rack_position.x, rack_position.y, BALL_RADIUS),
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            state: BallState::Idle,
            initial_position: rack_position,
            pocket: None,
            pocket_time: None,
            first_hit_time: None,
            time_in_play: 0.0,
            time_since_pocketed: 0.0,
        }
    }

    /// Place the ball on the table at rest, at `position` or at its rack
    /// slot, clearing all pocket bookkeeping from the previous rack
    pub fn put_in_play(&mut self, position: Option<Vec2>) {
        let p = position.unwrap_or(self.initial_position);
        self.position = Vec3::new(p.x, p.y, BALL_RADIUS);
        self.velocity = Vec3::ZERO;
        self.pocket = None;
        self.pocket_time = None;
        self.first_hit_time = None;
        self.time_in_play = 0.0;
        self.state = BallState::InPlay;
    }

    /// Hand the ball to the player for placement
    pub fn start_drop(&mut self, position: Vec2) {
        self.position = Vec3::new(position.x, position.y, BALL_RADIUS);
        self.velocity = Vec3::ZERO;
        self.state = BallState::Drop;
    }

    /// Capture by a pocket; the collision engine calls this when the ball
    /// center enters the pocket radius
    pub fn set_pocket(&mut self, pocket: PocketId) {
        self.pocket = Some(pocket);
        self.time_since_pocketed = 0.0;
        self.state = BallState::FallingInPocket;
    }

    pub fn is_in_play(&self) -> bool {
        self.state == BallState::InPlay
    }

    pub fn tick(&mut self, dt: f32) {
        match self.state {
            BallState::Idle | BallState::Drop | BallState::Pocketed => {}
            BallState::InPlay => {
                self.time_in_play += dt;
                self.tick_rolling(dt);
            }
            BallState::FallingInPocket => {
                self.time_since_pocketed += dt;
                self.tick_pocket_fall(dt);
            }
        }
    }

    /// Rolling physics on the table surface
    fn tick_rolling(&mut self, dt: f32) {
        // Balls never leave the table plane while rolling
        self.velocity.z = 0.0;
        if self.velocity.length() < BALL_VELOCITY_EPSILON {
            // Snap to exactly zero; otherwise rolling resistance approaches
            // rest asymptotically and the shot never settles
            self.velocity = Vec3::ZERO;
            return;
        }
        self.velocity += self.velocity.normalize() * (-dt * ROLLING_RESISTANCE_DECEL);
        let displacement = self.velocity * dt;
        if displacement.length() > 0.0 {
            self.roll(displacement);
            self.position += displacement;
        }
    }

    /// Falling physics inside a pocket cylinder
    fn tick_pocket_fall(&mut self, dt: f32) {
        let Some(pocket) = self.pocket else {
            panic!("ball {} is falling without a pocket assignment", self.number);
        };
        let center = pocket.center();

        // Nudge slow balls toward the pocket center so they do not stall on
        // the lip. Only while still at lip level; once the ball is inside
        // the cylinder the nudge would pump energy back in forever.
        let speed = self.velocity.length();
        if self.position.z > 0.0 && speed > 0.0 && speed < POCKET_EDGE_MIN_FUDGE_VELOCITY {
            let toward = (center - self.position.truncate()).normalize_or_zero();
            self.velocity +=
                Vec3::new(toward.x, toward.y, 0.0) * (POCKET_EDGE_FUDGE_ACCELERATION * dt);
        }
        self.velocity.z -= GRAVITY_ACCELERATION * dt;
        // Rolling resistance on the pocket floor, so the fall settles
        if self.position.z <= POCKET_BOTTOM + BALL_RADIUS {
            let horizontal = Vec3::new(self.velocity.x, self.velocity.y, 0.0);
            if horizontal.length() > BALL_VELOCITY_EPSILON {
                self.velocity +=
                    horizontal.normalize() * (-dt * ROLLING_RESISTANCE_DECEL);
            }
        }
        if self.position.truncate().distance(center) > POCKET_RADIUS - BALL_RADIUS {
            // Keep the ball inside the pocket cylinder
            let normal = (Vec3::new(center.x, center.y, 0.0) - self.position).normalize();
            self.velocity = reflect(self.velocity, normal) * POCKET_DAMPER;
        }
        if self.velocity.truncate().length() < BALL_VELOCITY_EPSILON {
            self.velocity.x = 0.0;
            self.velocity.y = 0.0;
        }

        let displacement = self.velocity * dt;
        if displacement.length() > 0.0 {
            self.roll(displacement);
            self.position += displacement;
            if self.position.z <= POCKET_BOTTOM + BALL_RADIUS {
                self.position.z = POCKET_BOTTOM + BALL_RADIUS;
                self.velocity.z = 0.0;
            }
        }

        // At rest on the pocket floor the fall is over
        if self.velocity == Vec3::ZERO && self.position.z <= POCKET_BOTTOM + BALL_RADIUS {
            self.state = BallState::Pocketed;
        }
    }

    /// Rolling rotation: the axis is perpendicular to both the displacement
    /// and the table normal, and the angle is the arc length over the radius
    fn roll(&mut self, displacement: Vec3) {
        let axis = Vec3::Z.cross(displacement);
        if axis.length_squared() == 0.0 {
            // Straight vertical fall imparts no spin
            return;
        }
        let angle = displacement.length() / BALL_RADIUS;
        self.orientation = Quat::from_axis_angle(axis.normalize(), angle) * self.orientation;
    }
}
