//! Fixed timestep simulation tick and the turn state machine
//!
//! `tick` advances the table by exactly one `MAX_DT` step. All gameplay
//! flows through the phase machine here: ball drops, aiming, the shot
//! simulation, the replay resimulation and the turn handover. Given the
//! same starting state and the same per-tick inputs, the outcome is
//! identical every time.

use glam::Vec2;

use crate::consts::*;

use super::state::{SimEvent, Table, TablePhase};
use super::table::DropRegion;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Cursor position on the table plane
    pub cursor: Option<Vec2>,
    /// Click position on the table plane (drop a ball, release the stick)
    pub click: Option<Vec2>,
    /// Advance past a replay or a finished rack (click/space)
    pub proceed: bool,
}

/// Frame-time accumulator that doles out whole fixed steps
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTimestep {
    accumulator: f32,
}

impl FixedTimestep {
    /// Feed a frame's wall-clock delta; returns how many fixed steps to run.
    /// The accumulator is capped so a long stall cannot demand unbounded
    /// catch-up work.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt;
        let cap = MAX_DT * MAX_SUBSTEPS as f32;
        if self.accumulator > cap {
            self.accumulator = cap;
        }
        let steps = (self.accumulator / MAX_DT) as u32;
        self.accumulator -= steps as f32 * MAX_DT;
        steps
    }
}

/// Advance the table by one fixed timestep
pub fn tick(table: &mut Table, input: &TickInput, dt: f32) {
    for ball in &mut table.balls {
        ball.tick(dt);
    }
    advance_phase(table, input);
    table.cue_stick.tick(dt);
    if table.sim_running {
        table.sim_elapsed += dt;
        table.resolve_collisions();
    }
}

/// Run a frame: accumulate `frame_dt` and execute the due fixed steps.
/// Input edges (clicks, proceed) apply to the first step only so a frame
/// spanning several steps does not repeat them.
pub fn run_frame(table: &mut Table, clock: &mut FixedTimestep, input: &TickInput, frame_dt: f32) {
    let steps = clock.accumulate(frame_dt);
    for step in 0..steps {
        if step == 0 {
            tick(table, input, MAX_DT);
        } else {
            tick(table, &TickInput::default(), MAX_DT);
        }
    }
}

/// Drive the turn state machine. Loops so that phases which complete
/// instantly (rack placement, replay setup) fall through to the next phase
/// within the same tick.
fn advance_phase(table: &mut Table, input: &TickInput) {
    loop {
        let next = match table.phase {
            TablePhase::Start => Some(TablePhase::PlaceBalls),
            TablePhase::PlaceBalls => {
                table.place_rack();
                Some(TablePhase::InitialDropCueBall)
            }
            TablePhase::InitialDropCueBall => drop_cue_ball(table, input, DropRegion::Kitchen),
            TablePhase::DropCueBall => drop_cue_ball(table, input, DropRegion::FullTable),
            TablePhase::SetupShot => {
                if let Some(cursor) = input.cursor {
                    table.cue_stick.set_cursor_position(cursor);
                }
                if input.click.is_some() {
                    table.cue_stick.release();
                    Some(TablePhase::CueStickRelease)
                } else {
                    None
                }
            }
            TablePhase::CueStickRelease => {
                if table.cue_stick.time_since_release() >= CUE_STICK_TIME_TO_COLLISION {
                    let velocity = table.cue_stick.collision_velocity;
                    table.balls[0].velocity = velocity;
                    table.events.push(SimEvent::CueStruck {
                        speed: velocity.length(),
                    });
                    table.begin_shot();
                    Some(TablePhase::Simulation)
                } else {
                    None
                }
            }
            TablePhase::Simulation => {
                if table.quiescent() {
                    table.finish_shot();
                    Some(TablePhase::InitialReplay)
                } else {
                    None
                }
            }
            TablePhase::InitialReplay => {
                table.capture_due_checkpoints();
                if input.proceed {
                    if table.replay_index < table.replay_queue.len() {
                        // Impatient skip before all checkpoints exist:
                        // abandon the replays entirely
                        Some(TablePhase::PostReplay)
                    } else {
                        table.replay_index = 0;
                        Some(TablePhase::SetupReplay)
                    }
                } else if table.sim_elapsed > table.sim_end_time {
                    table.replay_index = 0;
                    Some(TablePhase::SetupReplay)
                } else {
                    None
                }
            }
            TablePhase::SetupReplay => {
                if table.replay_index >= table.replay_queue.len() {
                    Some(TablePhase::PostReplay)
                } else {
                    if let Some(snapshot) = table.replay_queue[table.replay_index].state.take() {
                        table.restore(&snapshot);
                        table.replay_queue[table.replay_index].state = Some(snapshot);
                    }
                    Some(TablePhase::PocketReplay)
                }
            }
            TablePhase::PocketReplay => {
                if input.proceed {
                    Some(TablePhase::PostReplay)
                } else {
                    let entry = &table.replay_queue[table.replay_index];
                    let done = entry
                        .balls
                        .iter()
                        .all(|b| table.recently_pocketed.contains(&b.number));
                    if done {
                        table.replay_index += 1;
                        if table.replay_index < table.replay_queue.len() {
                            Some(TablePhase::SetupReplay)
                        } else {
                            Some(TablePhase::PostReplay)
                        }
                    } else {
                        None
                    }
                }
            }
            TablePhase::PostReplay => {
                table.sim_running = false;
                table.is_replay = false;
                let Some(settled) = table.next_turn_state.take() else {
                    panic!("replay finished with no settled state");
                };
                table.restore(&settled);
                let pocketed_this_shot = table.recently_pocketed.clone();
                let mut events = std::mem::take(&mut table.events);
                table.rules.post_shot(&pocketed_this_shot, &mut events);
                table.events = events;
                table.recently_pocketed.clear();
                table.replay_queue.clear();
                table.replay_index = 0;
                Some(TablePhase::NextTurnSetup)
            }
            TablePhase::NextTurnSetup => {
                if table.rules.winner.is_some() {
                    Some(TablePhase::PostRack)
                } else if let Some(index) = table.pocketed.iter().position(|&n| n == 0) {
                    // Scratched: the incoming player places the cue ball
                    table.pocketed.remove(index);
                    table.balls[0].start_drop(Vec2::ZERO);
                    Some(TablePhase::DropCueBall)
                } else {
                    table.begin_setup_shot();
                    Some(TablePhase::SetupShot)
                }
            }
            TablePhase::PostRack => {
                if input.proceed {
                    let Some(winner) = table.rules.winner else {
                        panic!("rack ended with no winner");
                    };
                    // Loser breaks the next rack
                    table.rules.current_player = winner.opponent();
                    table.events.push(SimEvent::PlayerChanged {
                        player: table.rules.current_player,
                    });
                    Some(TablePhase::PlaceBalls)
                } else {
                    None
                }
            }
        };
        match next {
            Some(phase) => table.phase = phase,
            None => break,
        }
    }
}

/// Shared drop handling for both drop phases: the undropped cue ball
/// follows the cursor; a validated click commits it and moves straight to
/// aiming
fn drop_cue_ball(table: &mut Table, input: &TickInput, region: DropRegion) -> Option<TablePhase> {
    if let Some(cursor) = input.cursor {
        table.slide_cue_ball(cursor, region);
    }
    if let Some(click) = input.click {
        if table.can_drop_cue_ball(click, region) {
            table.commit_cue_ball_drop(click);
            table.begin_setup_shot();
            return Some(TablePhase::SetupShot);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::sim::rules::Player;

    fn click(p: Vec2) -> TickInput {
        TickInput {
            cursor: Some(p),
            click: Some(p),
            proceed: false,
        }
    }

    fn cursor(p: Vec2) -> TickInput {
        TickInput {
            cursor: Some(p),
            click: None,
            proceed: false,
        }
    }

    const PROCEED: TickInput = TickInput {
        cursor: None,
        click: None,
        proceed: true,
    };

    fn tick_until<F: Fn(&Table) -> bool>(table: &mut Table, limit: u32, done: F) {
        for _ in 0..limit {
            if done(table) {
                return;
            }
            tick(table, &TickInput::default(), MAX_DT);
        }
        panic!("condition not reached within {limit} ticks (phase {:?})", table.phase);
    }

    /// Walk a fresh table to the aiming phase with the cue ball dropped in
    /// the kitchen
    fn table_ready_to_shoot(seed: u64) -> Table {
        let mut table = Table::new(seed);
        tick(&mut table, &TickInput::default(), MAX_DT);
        assert_eq!(table.phase, TablePhase::InitialDropCueBall);
        tick(&mut table, &click(Vec2::new(-0.7, 0.0)), MAX_DT);
        assert_eq!(table.phase, TablePhase::SetupShot);
        table
    }

    /// Aim from behind the cue ball and fire with the given cursor pull
    fn shoot(table: &mut Table, pull: f32) {
        let cue = Vec2::new(table.balls[0].position.x, table.balls[0].position.y);
        let aim = cue - Vec2::new(pull, 0.0);
        tick(table, &cursor(aim), MAX_DT);
        tick(table, &click(aim), MAX_DT);
        assert_eq!(table.phase, TablePhase::CueStickRelease);
    }

    #[test]
    fn test_rack_then_drop_then_aim() {
        let table = table_ready_to_shoot(5);
        assert!(table.x_order.contains(&0));
        assert!(!table.cue_stick.is_idle());
        assert_eq!(table.rules.next_ball, 1);
    }

    #[test]
    fn test_drop_outside_kitchen_is_ignored() {
        let mut table = Table::new(5);
        tick(&mut table, &TickInput::default(), MAX_DT);
        tick(&mut table, &click(Vec2::new(0.5, 0.0)), MAX_DT);
        assert_eq!(table.phase, TablePhase::InitialDropCueBall);
    }

    #[test]
    fn test_stick_strike_starts_simulation_at_time_zero() {
        let mut table = table_ready_to_shoot(5);
        shoot(&mut table, 1.0);
        tick_until(&mut table, 100, |t| t.phase == TablePhase::Simulation);
        assert!(table.sim_running);
        assert!(table.balls[0].velocity.x > 0.0);
        assert!(table.sim_elapsed >= 0.0 && table.sim_elapsed < 2.0 * MAX_DT);
        let events = table.drain_events();
        assert!(events.iter().any(|e| matches!(e, SimEvent::CueStruck { .. })));
    }

    #[test]
    fn test_missed_shot_is_a_foul_and_passes_turn() {
        let mut table = table_ready_to_shoot(5);
        // Dead-zone shot away from the rack: the cue ball creeps a few
        // millimeters west and stops without touching anything
        let cue = Vec2::new(table.balls[0].position.x, table.balls[0].position.y);
        let aim = cue + Vec2::new(0.1, 0.0);
        tick(&mut table, &cursor(aim), MAX_DT);
        tick(&mut table, &click(aim), MAX_DT);
        tick_until(&mut table, 50_000, |t| t.phase == TablePhase::SetupShot);
        assert_eq!(table.rules.current_player, Player::Two);
        assert!(table.replay_queue.is_empty());
        let events = table.drain_events();
        assert!(events.iter().any(|e| matches!(e, SimEvent::Foul { player: Player::One })));
    }

    #[test]
    fn test_break_shot_reaches_next_turn() {
        let mut table = table_ready_to_shoot(5);
        shoot(&mut table, 3.0);
        tick_until(&mut table, 400_000, |t| {
            matches!(t.phase, TablePhase::SetupShot | TablePhase::DropCueBall | TablePhase::PostRack)
        });
        // However the break resolved, the table must be settled again
        assert!(!table.sim_running);
        assert!(table.balls.iter().all(|b| b.velocity == Vec3::ZERO));
    }

    #[test]
    fn test_replay_resimulates_identically() {
        let mut table = table_ready_to_shoot(9);
        shoot(&mut table, 3.0);
        tick_until(&mut table, 200_000, |t| t.phase == TablePhase::InitialReplay);
        let settled = table
            .next_turn_state
            .clone()
            .unwrap_or_else(|| panic!("no settled snapshot"));

        // Let the replay resimulation run to its end, then compare against
        // the recorded outcome
        tick_until(&mut table, 200_000, |t| t.sim_elapsed > t.sim_end_time);
        let replayed = table.snapshot();
        assert_eq!(replayed.balls, settled.balls);
        assert_eq!(replayed.pocketed, settled.pocketed);
    }

    #[test]
    fn test_proceed_skips_replays() {
        let mut table = table_ready_to_shoot(9);
        shoot(&mut table, 3.0);
        tick_until(&mut table, 200_000, |t| t.phase == TablePhase::InitialReplay);
        tick(&mut table, &PROCEED, MAX_DT);
        // Skipping lands on the settled table with the turn resolved
        assert!(matches!(
            table.phase,
            TablePhase::SetupShot | TablePhase::DropCueBall | TablePhase::PostRack
        ));
        assert!(table.replay_queue.is_empty());
    }

    #[test]
    fn test_fixed_timestep_caps_catchup() {
        let mut clock = FixedTimestep::default();
        assert_eq!(clock.accumulate(MAX_DT * 3.5), 3);
        // Half a step carried over
        assert_eq!(clock.accumulate(MAX_DT * 0.5), 1);
        // A stall is capped at MAX_SUBSTEPS worth of work
        assert_eq!(clock.accumulate(10.0), MAX_SUBSTEPS);
    }

    #[test]
    fn test_same_inputs_same_outcome() {
        let run = |seed: u64| {
            let mut table = table_ready_to_shoot(seed);
            shoot(&mut table, 2.0);
            tick_until(&mut table, 400_000, |t| {
                matches!(
                    t.phase,
                    TablePhase::SetupShot | TablePhase::DropCueBall | TablePhase::PostRack
                )
            });
            table.balls.iter().map(|b| b.position).collect::<Vec<_>>()
        };
        assert_eq!(run(77), run(77));
    }
}
