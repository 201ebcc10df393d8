//! Cue stick state machine
//!
//! The stick aims by trailing the cursor-to-cue-ball direction, converts the
//! pull-back distance into an impact velocity, and animates release and
//! follow-through. The table machine reads `collision_velocity` at the
//! moment of contact and hands it to the cue ball.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueStickState {
    /// Out of play between shots
    Idle,
    /// Trailing the cursor while the player aims
    SetupShot,
    /// Traveling from the pull-back position to ball contact
    Released,
    /// Brief hold at the contact point before going idle
    FollowThrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueStick {
    pub state: CueStickState,
    pub position: Vec3,
    pub orientation: Quat,
    /// Velocity delivered to the cue ball at contact
    pub collision_velocity: Vec3,
    cue_ball_position: Vec3,
    cursor_position: Option<Vec2>,
    initial_position: Vec3,
    collision_position: Vec3,
    released_time: f32,
}

impl CueStick {
    pub fn new() -> Self {
        Self {
            state: CueStickState::Idle,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            collision_velocity: Vec3::ZERO,
            cue_ball_position: Vec3::ZERO,
            cursor_position: None,
            initial_position: Vec3::ZERO,
            collision_position: Vec3::ZERO,
            released_time: 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == CueStickState::Idle
    }

    /// Time since the player released the stick; reaches
    /// `CUE_STICK_TIME_TO_COLLISION` at ball contact
    pub fn time_since_release(&self) -> f32 {
        self.released_time
    }

    pub fn set_cue_ball_position(&mut self, position: Vec3) {
        self.cue_ball_position = position;
    }

    pub fn set_cursor_position(&mut self, position: Vec2) {
        self.cursor_position = Some(position);
    }

    /// Begin aiming. The stick must be idle; anything else means the table
    /// machine lost synchronization with the stick.
    pub fn start_setup_shot(&mut self) {
        if self.state != CueStickState::Idle {
            panic!("cue stick is not idle at shot setup");
        }
        self.position = self.cue_ball_position + Vec3::new(-2.0 * BALL_DIAMETER, 0.0, 0.0);
        self.orientation = Quat::IDENTITY;
        self.cursor_position = None;
        self.state = CueStickState::SetupShot;
    }

    /// Commit the shot: freeze the pull-back position and compute the
    /// contact point and impact velocity
    pub fn release(&mut self) {
        self.released_time = 0.0;
        self.initial_position = self.position;
        let back = (self.position - self.cue_ball_position).normalize();
        // Contact happens one ball radius short of the cue ball center
        self.collision_position = self.cue_ball_position + back * BALL_RADIUS;
        self.collision_velocity =
            (self.collision_position - self.initial_position) / CUE_STICK_TIME_TO_COLLISION;
        self.state = CueStickState::Released;
    }

    pub fn tick(&mut self, dt: f32) {
        match self.state {
            CueStickState::Idle => {}
            CueStickState::SetupShot => {
                self.aim();
            }
            CueStickState::Released => {
                self.released_time += dt;
                // Linear travel from pull-back to contact
                let t = self.released_time / CUE_STICK_TIME_TO_COLLISION;
                self.position = self.initial_position.lerp(self.collision_position, t.min(1.0));
                if self.released_time >= CUE_STICK_TIME_TO_COLLISION {
                    self.state = CueStickState::FollowThrough;
                }
            }
            CueStickState::FollowThrough => {
                self.released_time += dt;
                self.position = self.collision_position;
                if self.released_time >= CUE_STICK_TIME_TO_COLLISION + CUE_STICK_TIME_AFTER_COLLISION
                {
                    self.released_time = 0.0;
                    self.collision_velocity = Vec3::ZERO;
                    self.state = CueStickState::Idle;
                }
            }
        }
    }

    /// Trail the cursor: point at the cue ball and map the cursor distance
    /// to a pull-back distance (and therefore a shot velocity)
    fn aim(&mut self) {
        let Some(cursor) = self.cursor_position else {
            return;
        };
        let cursor3 = Vec3::new(cursor.x, cursor.y, self.cue_ball_position.z);
        let to_ball = self.cue_ball_position - cursor3;
        let distance = to_ball.length();
        if distance == 0.0 {
            return;
        }
        let direction = to_ball / distance;
        self.orientation = Quat::from_rotation_z(direction.y.atan2(direction.x));

        let pull_back = if distance < CURSOR_RADIUS_EPSILON {
            // Inside the dead zone every shot is clamped to the weakest
            BALL_RADIUS + SHOT_VELOCITY_EPSILON * CUE_STICK_TIME_TO_COLLISION
        } else if distance < CURSOR_RADIUS_EPSILON + MAX_SHOT_VELOCITY * CUE_STICK_TIME_TO_COLLISION
        {
            // Linear region; subtracting the dead zone radius gives the
            // cursor more travel for weak shots
            distance + BALL_RADIUS - CURSOR_RADIUS_EPSILON
        } else {
            BALL_RADIUS + MAX_SHOT_VELOCITY * CUE_STICK_TIME_TO_COLLISION
        };
        self.position = self.cue_ball_position - direction * pull_back;
    }
}

impl Default for CueStick {
    fn default() -> Self {
        Self::new()
    }
}
