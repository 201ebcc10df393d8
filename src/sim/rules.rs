//! Nine-ball rules
//!
//! Tracks whose turn it is, which ball must be struck first, and decides
//! after each shot whether the shooter continues, the turn passes, or the
//! rack is won. The rules engine is fed facts by the simulation (first cue
//! ball contact, pocketed balls) and reports outcomes through the event
//! queue.

use serde::{Deserialize, Serialize};

use super::state::SimEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NineBallRules {
    pub current_player: Player,
    /// Lowest-numbered ball on the table; the cue ball must strike it first
    pub next_ball: usize,
    /// Object balls still on the table, kept sorted ascending
    balls_in_play: Vec<usize>,
    /// First object ball the cue ball touched this shot
    first_cue_ball_hit: Option<usize>,
    pub winner: Option<Player>,
}

impl NineBallRules {
    pub fn new() -> Self {
        Self {
            current_player: Player::One,
            next_ball: 1,
            balls_in_play: Vec::new(),
            first_cue_ball_hit: None,
            winner: None,
        }
    }

    pub fn start_rack(&mut self) {
        self.balls_in_play = (1..=9).collect();
        self.next_ball = 1;
        self.first_cue_ball_hit = None;
        self.winner = None;
    }

    pub fn begin_shot(&mut self) {
        self.first_cue_ball_hit = None;
    }

    /// Record the first object ball the cue ball touches; later contacts
    /// this shot are ignored
    pub fn note_first_hit(&mut self, ball: usize) {
        if self.first_cue_ball_hit.is_none() {
            self.first_cue_ball_hit = Some(ball);
        }
    }

    pub fn first_cue_ball_hit(&self) -> Option<usize> {
        self.first_cue_ball_hit
    }

    /// Apply the outcome of a completed shot. `pocketed` lists every ball
    /// that dropped this shot, cue ball included.
    pub fn post_shot(&mut self, pocketed: &[usize], events: &mut Vec<SimEvent>) {
        for &ball in pocketed {
            if ball == 0 {
                continue;
            }
            let Some(index) = self.balls_in_play.iter().position(|&b| b == ball) else {
                panic!("pocketed ball {ball} was not in play");
            };
            self.balls_in_play.remove(index);
        }

        let cue_pocketed = pocketed.contains(&0);
        let foul_hit = self.first_cue_ball_hit != Some(self.next_ball);

        if pocketed.contains(&9) {
            // Nine ball down ends the rack. Only a wrong first hit hands the
            // win to the opponent; a scratch on the same shot does not.
            let winner = if foul_hit {
                self.current_player.opponent()
            } else {
                self.current_player
            };
            self.winner = Some(winner);
            events.push(SimEvent::RackWon { player: winner });
            return;
        }

        if cue_pocketed || foul_hit {
            events.push(SimEvent::Foul {
                player: self.current_player,
            });
            self.pass_turn(events);
        } else if pocketed.is_empty() {
            self.pass_turn(events);
        }
        // A legal shot that pockets a ball keeps the shooter at the table

        if let Some(&lowest) = self.balls_in_play.first() {
            self.next_ball = lowest;
            events.push(SimEvent::NextBall { ball: lowest });
        }
    }

    fn pass_turn(&mut self, events: &mut Vec<SimEvent>) {
        self.current_player = self.current_player.opponent();
        events.push(SimEvent::PlayerChanged {
            player: self.current_player,
        });
    }
}

impl Default for NineBallRules {
    fn default() -> Self {
        Self::new()
    }
}
