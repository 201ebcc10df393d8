//! Breakshot entry point
//!
//! Headless demo driver: plays scripted nine-ball against itself with a
//! seeded table, logging events as they happen. Useful for exercising the
//! simulation end to end and for generating deterministic traces.
//!
//! Usage: `breakshot [seed] [shots]`

use glam::Vec2;

use breakshot::consts::*;
use breakshot::sim::{FixedTimestep, SimEvent, Table, TablePhase, TickInput, run_frame};

/// Synthesizes per-frame input the way a (not very good) player would:
/// drop the cue ball mid-kitchen, aim at the lowest ball on the table,
/// fire, and click through replays.
struct DemoDriver {
    /// Frames to let the stick settle on an aim point before firing
    aim_frames: u32,
    /// Rotates through candidate drop spots until one is legal
    drop_attempt: usize,
}

/// Spots tried in order when placing the cue ball after a scratch
const DROP_SPOTS: [Vec2; 4] = [
    Vec2::new(-TABLE_LENGTH / 4.0, 0.0),
    Vec2::new(-TABLE_LENGTH / 4.0, TABLE_WIDTH / 4.0),
    Vec2::new(-TABLE_LENGTH / 4.0, -TABLE_WIDTH / 4.0),
    Vec2::new(-TABLE_LENGTH / 2.0 + 2.0 * BALL_DIAMETER, 0.0),
];

impl DemoDriver {
    fn new() -> Self {
        Self {
            aim_frames: 0,
            drop_attempt: 0,
        }
    }

    fn next_input(&mut self, table: &Table) -> TickInput {
        match table.phase {
            TablePhase::InitialDropCueBall => {
                let spot = Vec2::new(-3.0 / 8.0 * TABLE_LENGTH, 0.0);
                TickInput {
                    cursor: Some(spot),
                    click: Some(spot),
                    proceed: false,
                }
            }
            TablePhase::DropCueBall => {
                let spot = DROP_SPOTS[self.drop_attempt % DROP_SPOTS.len()];
                self.drop_attempt += 1;
                TickInput {
                    cursor: Some(spot),
                    click: Some(spot),
                    proceed: false,
                }
            }
            TablePhase::SetupShot => {
                let cue = Vec2::new(table.balls[0].position.x, table.balls[0].position.y);
                let target = table.rules.next_ball;
                let object = &table.balls[target];
                let object = Vec2::new(object.position.x, object.position.y);
                let direction = (object - cue).normalize_or_zero();
                let power = 3.0;
                let pull = CURSOR_RADIUS_EPSILON + power * CUE_STICK_TIME_TO_COLLISION;
                let aim = cue - direction * pull;
                self.aim_frames += 1;
                TickInput {
                    cursor: Some(aim),
                    // A few frames with the cursor held so the stick tracks
                    // the aim point before the release
                    click: (self.aim_frames > 5).then_some(aim),
                    proceed: false,
                }
            }
            TablePhase::InitialReplay | TablePhase::PocketReplay | TablePhase::PostRack => {
                TickInput {
                    cursor: None,
                    click: None,
                    proceed: true,
                }
            }
            _ => {
                self.aim_frames = 0;
                TickInput::default()
            }
        }
    }
}

fn describe(event: &SimEvent) -> String {
    match event {
        SimEvent::BallsCollided { a, b, relative_speed, time } => {
            format!("t={time:.2}s balls {a} and {b} collide at {relative_speed:.2} m/s")
        }
        SimEvent::BallPocketed { ball, pocket, time } => {
            format!("t={time:.2}s ball {ball} drops into {pocket:?}")
        }
        SimEvent::CueStruck { speed } => format!("cue struck at {speed:.2} m/s"),
        SimEvent::Foul { player } => format!("foul on {player:?}"),
        SimEvent::PlayerChanged { player } => format!("{player:?} to shoot"),
        SimEvent::NextBall { ball } => format!("next ball: {ball}"),
        SimEvent::RackWon { player } => format!("rack won by {player:?}"),
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0xB1111A5D);
    let max_shots: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(50);

    log::info!("breakshot demo, seed {seed}, up to {max_shots} shots");

    let mut table = Table::new(seed);
    let mut clock = FixedTimestep::default();
    let mut driver = DemoDriver::new();
    let frame_dt = 1.0 / 60.0;

    let mut shots = 0;
    let mut frames: u64 = 0;
    loop {
        let input = driver.next_input(&table);
        if table.phase == TablePhase::SetupShot && input.click.is_some() {
            shots += 1;
        }
        run_frame(&mut table, &mut clock, &input, frame_dt);
        for event in table.drain_events() {
            println!("{}", describe(&event));
            if let SimEvent::RackWon { .. } = event {
                match serde_json::to_string(&table.rules) {
                    Ok(json) => log::debug!("final rules state: {json}"),
                    Err(err) => log::warn!("could not serialize rules state: {err}"),
                }
            }
        }
        frames += 1;

        if table.rules.winner.is_some() {
            println!("game over after {shots} shots ({frames} frames)");
            break;
        }
        if shots >= max_shots {
            println!("shot limit reached ({max_shots} shots, {frames} frames)");
            break;
        }
        if frames > 10_000_000 {
            log::error!("frame limit reached without a result");
            break;
        }
    }
}
