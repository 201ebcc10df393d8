//! Table state, snapshots and the simulation event queue
//!
//! `Table` owns everything the simulation touches: the balls, the
//! sorted-order arrays used by the broad phase, the cue stick, the rules
//! engine and the replay bookkeeping. Snapshots capture the parts that
//! evolve during a shot; restoring one and re-running the fixed-step
//! simulation reproduces the shot exactly, which is how replays work.

use glam::{Vec2, Vec3};
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;

use super::ball::Ball;
use super::cue::CueStick;
use super::rules::{NineBallRules, Player};
use super::table::{
    CUE_BALL_RACK_POSITION, DropRegion, PocketId, TableLayout, diamond_rack,
};

/// Seed material for the deterministic rack shuffle. Stored instead of the
/// generator itself so snapshots stay plain data; a fresh `Pcg32` is built
/// each time balls are racked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn to_rng(self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream)
    }
}

/// Everything of note that happened during a tick, drained by the caller.
/// Presentation layers map these to sounds and on-screen messages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Two balls collided; `a < b`
    BallsCollided {
        a: usize,
        b: usize,
        relative_speed: f32,
        time: f32,
    },
    BallPocketed {
        ball: usize,
        pocket: PocketId,
        time: f32,
    },
    CueStruck {
        speed: f32,
    },
    Foul {
        player: Player,
    },
    PlayerChanged {
        player: Player,
    },
    NextBall {
        ball: usize,
    },
    RackWon {
        player: Player,
    },
}

/// Turn state machine phases. Transitions happen inside `tick::advance_phase`;
/// several phases fall straight through to the next in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TablePhase {
    Start,
    PlaceBalls,
    /// Cue ball drop restricted to the kitchen (start of rack)
    InitialDropCueBall,
    /// Cue ball drop anywhere (after a scratch)
    DropCueBall,
    SetupShot,
    /// Stick released, waiting for it to reach the cue ball
    CueStickRelease,
    Simulation,
    /// Resimulating from the shot start, capturing per-pocket checkpoints
    InitialReplay,
    SetupReplay,
    /// Playing one pocket's replay segment
    PocketReplay,
    PostReplay,
    NextTurnSetup,
    PostRack,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PocketedBall {
    pub number: usize,
    pub pocket_time: f32,
}

/// One replay segment: all balls that dropped into the same pocket this
/// shot, shown from just before the cue ball's first contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub pocket: PocketId,
    pub pocket_time: f32,
    /// Simulation time the replay segment starts from
    pub time_of_interest: f32,
    /// First ball to drop into this pocket
    pub ball_of_interest: usize,
    /// Sorted by pocket time
    pub balls: Vec<PocketedBall>,
    /// Checkpoint captured at `time_of_interest` during the initial replay
    /// resimulation
    pub state: Option<TableSnapshot>,
}

/// The shot-varying portion of the table, sufficient to resimulate from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub balls: Vec<Ball>,
    pub pocketed: Vec<usize>,
    pub recently_pocketed: Vec<usize>,
    pub sim_elapsed: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub rng_state: RngState,
    /// Indexed by ball number; 0 is the cue ball
    pub balls: Vec<Ball>,
    /// In-play ball numbers, kept sorted by x (resp. y) position each tick
    pub x_order: Vec<usize>,
    pub y_order: Vec<usize>,
    /// Ball numbers pocketed this rack, oldest first
    pub pocketed: Vec<usize>,
    /// Ball numbers pocketed this shot (or replay segment)
    pub recently_pocketed: Vec<usize>,
    pub sim_elapsed: f32,
    pub sim_running: bool,
    pub is_replay: bool,
    pub phase: TablePhase,
    pub cue_stick: CueStick,
    pub rules: NineBallRules,
    #[serde(skip, default)]
    pub layout: TableLayout,
    #[serde(skip, default)]
    pub events: Vec<SimEvent>,
    /// Snapshot taken just before the cue stick strikes, restored to start
    /// the replay resimulation
    pub initial_shot_state: Option<TableSnapshot>,
    /// Snapshot of the settled table, restored after replays finish
    pub next_turn_state: Option<TableSnapshot>,
    pub replay_queue: Vec<ReplayEntry>,
    pub replay_index: usize,
    /// Simulation clock reading when the shot settled
    pub sim_end_time: f32,
}

impl Table {
    pub fn new(seed: u64) -> Self {
        let balls = (0..BALL_COUNT).map(|n| Ball::new(n, Vec2::ZERO)).collect();
        Self {
            rng_state: RngState { seed, stream: 0 },
            balls,
            x_order: Vec::new(),
            y_order: Vec::new(),
            pocketed: Vec::new(),
            recently_pocketed: Vec::new(),
            sim_elapsed: 0.0,
            sim_running: false,
            is_replay: false,
            phase: TablePhase::Start,
            cue_stick: CueStick::new(),
            rules: NineBallRules::new(),
            layout: TableLayout::default(),
            events: Vec::new(),
            initial_shot_state: None,
            next_turn_state: None,
            replay_queue: Vec::new(),
            replay_index: 0,
            sim_end_time: 0.0,
        }
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Every ball at rest and the stick out of play
    pub fn quiescent(&self) -> bool {
        self.cue_stick.is_idle() && self.balls.iter().all(|b| b.velocity == Vec3::ZERO)
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            balls: self.balls.clone(),
            pocketed: self.pocketed.clone(),
            recently_pocketed: self.recently_pocketed.clone(),
            sim_elapsed: self.sim_elapsed,
        }
    }

    pub fn restore(&mut self, snapshot: &TableSnapshot) {
        self.balls = snapshot.balls.clone();
        self.pocketed = snapshot.pocketed.clone();
        self.recently_pocketed = snapshot.recently_pocketed.clone();
        self.sim_elapsed = snapshot.sim_elapsed;
        self.rebuild_orders();
    }

    /// Reseed the broad-phase order arrays from ball state. Sort order does
    /// not matter here; the collision pass re-sorts every tick.
    fn rebuild_orders(&mut self) {
        self.x_order.clear();
        self.y_order.clear();
        for ball in &self.balls {
            if ball.is_in_play() {
                self.x_order.push(ball.number);
                self.y_order.push(ball.number);
            }
        }
    }

    /// Rack balls 1-9 in the diamond, one at the apex, nine in the middle,
    /// the rest shuffled by the rack generator. The cue ball is placed in
    /// the kitchen but stays out of the order arrays until dropped.
    pub fn place_rack(&mut self) {
        let slots = diamond_rack();
        let mut rng = self.rng_state.to_rng();
        self.rng_state.stream += 1;

        self.x_order.clear();
        self.y_order.clear();
        self.pocketed.clear();
        self.recently_pocketed.clear();
        self.replay_queue.clear();
        self.replay_index = 0;

        self.balls[1].put_in_play(Some(slots[0]));
        self.balls[9].put_in_play(Some(slots[4]));
        let mut unracked: Vec<usize> = vec![2, 3, 4, 5, 6, 7, 8];
        for slot in [1, 2, 3, 5, 6, 7, 8] {
            let pick = rng.random_range(0..unracked.len());
            let number = unracked.swap_remove(pick);
            self.balls[number].put_in_play(Some(slots[slot]));
        }
        for number in 1..=9 {
            self.x_order.push(number);
            self.y_order.push(number);
        }

        self.balls[0].put_in_play(Some(CUE_BALL_RACK_POSITION));
        self.rules.start_rack();
        self.events.push(SimEvent::NextBall { ball: 1 });
    }

    /// Slide the not-yet-dropped cue ball to follow the cursor, clamped to
    /// the drop region. Overlap with other balls is allowed while sliding;
    /// only the final drop is validated fully.
    pub fn slide_cue_ball(&mut self, cursor: Vec2, region: DropRegion) {
        if region.contains(cursor) {
            self.balls[0].position = Vec3::new(cursor.x, cursor.y, BALL_RADIUS);
        }
    }

    pub fn can_drop_cue_ball(&self, point: Vec2, region: DropRegion) -> bool {
        if !region.contains(point) {
            return false;
        }
        for ball in &self.balls[1..] {
            if !ball.is_in_play() {
                continue;
            }
            let d = Vec2::new(ball.position.x, ball.position.y) - point;
            if d.length() < BALL_DIAMETER {
                return false;
            }
        }
        // Only a ball whose center would sit inside the pocket mouth is
        // rejected; resting on the lip is a legal placement
        for pocket in PocketId::ALL {
            if (pocket.center() - point).length() < POCKET_RADIUS - BALL_RADIUS {
                return false;
            }
        }
        true
    }

    pub fn commit_cue_ball_drop(&mut self, point: Vec2) {
        self.balls[0].put_in_play(Some(point));
        self.x_order.push(0);
        self.y_order.push(0);
    }

    pub fn begin_setup_shot(&mut self) {
        self.cue_stick.set_cue_ball_position(self.balls[0].position);
        self.cue_stick.start_setup_shot();
    }

    /// Arm the simulation for a stick strike: clear per-shot bookkeeping
    /// and capture the state the replay will resimulate from
    pub fn begin_shot(&mut self) {
        for ball in &mut self.balls {
            ball.first_hit_time = None;
        }
        self.recently_pocketed.clear();
        self.rules.begin_shot();
        // Backdate so the first running tick lands on time zero
        self.sim_elapsed = -MAX_DT;
        self.sim_running = true;
        self.is_replay = false;
        self.initial_shot_state = Some(self.snapshot());
    }

    /// The shot has settled: remember the outcome, build the replay queue
    /// and rewind to the shot start
    pub fn finish_shot(&mut self) {
        self.sim_running = false;
        self.sim_end_time = self.sim_elapsed;
        self.next_turn_state = Some(self.snapshot());

        self.replay_queue.clear();
        self.replay_index = 0;
        for &number in &self.recently_pocketed {
            let ball = &self.balls[number];
            let Some(pocket) = ball.pocket else {
                panic!("recently pocketed ball {number} has no pocket");
            };
            let Some(pocket_time) = ball.pocket_time else {
                panic!("recently pocketed ball {number} has no pocket time");
            };
            let hit_time = ball.first_hit_time.unwrap_or(pocket_time);
            let time_of_interest = (hit_time - REPLAY_TIME_BEFORE_HIT).max(0.0);
            match self.replay_queue.iter_mut().find(|e| e.pocket == pocket) {
                Some(entry) => {
                    if pocket_time < entry.pocket_time {
                        entry.pocket_time = pocket_time;
                        entry.ball_of_interest = number;
                    }
                    entry.time_of_interest = entry.time_of_interest.min(time_of_interest);
                    entry.balls.push(PocketedBall { number, pocket_time });
                }
                None => self.replay_queue.push(ReplayEntry {
                    pocket,
                    pocket_time,
                    time_of_interest,
                    ball_of_interest: number,
                    balls: vec![PocketedBall { number, pocket_time }],
                    state: None,
                }),
            }
        }
        for entry in &mut self.replay_queue {
            entry.balls.sort_by(|a, b| a.pocket_time.total_cmp(&b.pocket_time));
            log::info!(
                "replay queued: ball {} into {:?} at {:.3}s",
                entry.ball_of_interest,
                entry.pocket,
                entry.pocket_time
            );
        }
        self.replay_queue
            .sort_by(|a, b| a.time_of_interest.total_cmp(&b.time_of_interest));

        let Some(initial) = self.initial_shot_state.take() else {
            panic!("shot finished with no initial snapshot");
        };
        self.restore(&initial);
        self.is_replay = true;
        self.sim_running = true;
    }

    /// During the initial replay resimulation, capture a checkpoint for
    /// every queue entry whose start time has been reached
    pub fn capture_due_checkpoints(&mut self) {
        while self.replay_index < self.replay_queue.len() {
            if self.sim_elapsed < self.replay_queue[self.replay_index].time_of_interest {
                break;
            }
            let snapshot = self.snapshot();
            self.replay_queue[self.replay_index].state = Some(snapshot);
            self.replay_index += 1;
        }
    }
}
