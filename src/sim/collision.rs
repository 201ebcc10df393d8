//! Collision detection and response
//!
//! Runs once per fixed step: ball-ball impacts via a sweep-and-prune broad
//! phase over the sorted order arrays, cushion impacts via SAT against the
//! cushion polygons (only for balls near a rail), and pocket capture for
//! balls inside a pocket mouth. Everything here is deterministic; iteration
//! orders are fixed so resimulating a shot reproduces it bit for bit.

use std::collections::{BTreeSet, HashSet};

use glam::{Vec2, Vec3};

use crate::consts::*;

use super::geom::{
    collision_displacement, elastic_collision_reflection, line_circle_intersection, perp, reflect,
};
use super::state::{SimEvent, Table};
use super::table::{CushionSide, PocketId, SOUTH_POCKET, SOUTHEAST_POCKET};

/// Canonical key for an unordered ball pair
fn pair_key(a: usize, b: usize) -> usize {
    a.min(b) + a.max(b) * BALL_COUNT
}

impl Table {
    /// One full narrow/broad-phase pass: ball-ball impacts, cushion impacts
    /// for rail outliers, then pocket capture
    pub fn resolve_collisions(&mut self) {
        self.sort_orders();
        self.resolve_ball_ball_collisions();
        self.resolve_cushion_collisions();
        self.resolve_pockets();
    }

    fn sort_orders(&mut self) {
        let Self { balls, x_order, y_order, .. } = self;
        x_order.sort_by(|&a, &b| balls[a].position.x.total_cmp(&balls[b].position.x));
        y_order.sort_by(|&a, &b| balls[a].position.y.total_cmp(&balls[b].position.y));
    }

    /// Sweep-and-prune: a pair can only touch if it is within one ball
    /// diameter on both axes. The x sweep records candidate keys, the y
    /// sweep confirms them and runs the exact distance test.
    fn resolve_ball_ball_collisions(&mut self) {
        let candidates = self.candidate_pairs();
        for i in 1..self.y_order.len() {
            let bi = self.y_order[i];
            for j in (0..i).rev() {
                let bj = self.y_order[j];
                if self.balls[bi].position.y - self.balls[bj].position.y >= BALL_DIAMETER {
                    break;
                }
                if !candidates.contains(&pair_key(bi, bj)) {
                    continue;
                }
                if self.balls[bi].position.distance(self.balls[bj].position) < BALL_DIAMETER {
                    self.resolve_ball_ball(bi, bj);
                }
            }
        }
    }

    /// Pairs within one ball diameter along x
    pub(crate) fn candidate_pairs(&self) -> HashSet<usize> {
        let mut keys = HashSet::new();
        for i in 1..self.x_order.len() {
            let bi = self.x_order[i];
            for j in (0..i).rev() {
                let bj = self.x_order[j];
                if self.balls[bi].position.x - self.balls[bj].position.x >= BALL_DIAMETER {
                    break;
                }
                keys.insert(pair_key(bi, bj));
            }
        }
        keys
    }

    fn resolve_ball_ball(&mut self, bi: usize, bj: usize) {
        let u = self.balls[bi].velocity;
        let v = self.balls[bj].velocity;
        let p = self.balls[bi].position;
        let q = self.balls[bj].position;

        self.note_ball_hit(bi, bj);
        self.note_ball_hit(bj, bi);

        self.balls[bi].velocity = elastic_collision_reflection(u, v, p, q);
        self.balls[bj].velocity = elastic_collision_reflection(v, u, q, p);
        // Push slightly past touching so the pair cannot re-collide next tick
        self.balls[bi].position += collision_displacement(p, q, BALL_RADIUS) * 1.01;
        self.balls[bj].position += collision_displacement(q, p, BALL_RADIUS) * 1.01;

        self.events.push(SimEvent::BallsCollided {
            a: bi.min(bj),
            b: bi.max(bj),
            relative_speed: (v - u).length(),
            time: self.sim_elapsed,
        });
    }

    fn note_ball_hit(&mut self, ball: usize, other: usize) {
        if self.balls[ball].first_hit_time.is_none() {
            self.balls[ball].first_hit_time = Some(self.sim_elapsed);
            if ball == 0 {
                self.rules.note_first_hit(other);
            }
        }
    }

    /// Only balls within a ball radius of a rail can touch a cushion; pick
    /// them off the ends of the sorted order arrays
    fn resolve_cushion_collisions(&mut self) {
        let west_limit = -(TABLE_LENGTH / 2.0 - BALL_RADIUS);
        let east_limit = TABLE_LENGTH / 2.0 - BALL_RADIUS;
        let south_limit = -(TABLE_WIDTH / 2.0 - BALL_RADIUS);
        let north_limit = TABLE_WIDTH / 2.0 - BALL_RADIUS;

        for i in 0..self.x_order.len() {
            let number = self.x_order[i];
            if self.balls[number].position.x >= west_limit {
                break;
            }
            self.handle_cushion_collisions(number, CushionSide::West);
        }
        for i in (0..self.x_order.len()).rev() {
            let number = self.x_order[i];
            if self.balls[number].position.x <= east_limit {
                break;
            }
            self.handle_cushion_collisions(number, CushionSide::East);
        }
        for i in 0..self.y_order.len() {
            let number = self.y_order[i];
            if self.balls[number].position.y >= south_limit {
                break;
            }
            self.handle_cushion_collisions(number, CushionSide::South);
        }
        for i in (0..self.y_order.len()).rev() {
            let number = self.y_order[i];
            if self.balls[number].position.y <= north_limit {
                break;
            }
            self.handle_cushion_collisions(number, CushionSide::North);
        }
    }

    /// Test a ball against the cushion polygons on one side; the first
    /// polygon reporting contact wins
    fn handle_cushion_collisions(&mut self, number: usize, side: CushionSide) {
        let center = Vec2::new(self.balls[number].position.x, self.balls[number].position.y);
        let layout = std::mem::take(&mut self.layout);
        for polygon in layout.side(side) {
            let Some(edges) = polygon.check_collision(center, BALL_RADIUS) else {
                continue;
            };
            match edges.len() {
                0 => {}
                1 => self.handle_edge_collision(number, edges[0]),
                2 => self.handle_corner_collision(number, &edges),
                n => panic!("ball {number} overlaps {n} cushion edges at once"),
            }
            break;
        }
        self.layout = layout;
    }

    fn handle_edge_collision(&mut self, number: usize, edge: [Vec2; 2]) {
        let n2 = perp(edge[1] - edge[0]).normalize();
        let normal = Vec3::new(n2.x, n2.y, 0.0);
        let ball = &mut self.balls[number];
        let before = ball.velocity;
        ball.velocity = reflect(ball.velocity, normal);
        // Step clear of the cushion before restitution bleeds speed
        ball.position += ball.velocity * MAX_DT;
        if ball.velocity != before {
            ball.velocity *= BALL_CLOTH_RESTITUTION;
        }
    }

    /// Two edges of one polygon touch the ball: reflect off a blend of
    /// their normals, weighted by how much of each edge the ball covers
    fn handle_corner_collision(&mut self, number: usize, edges: &[[Vec2; 2]]) {
        if !edges[0].iter().any(|a| edges[1].contains(a)) {
            panic!("cushion edges share no vertex at ball {number}");
        }

        let center = Vec2::new(self.balls[number].position.x, self.balls[number].position.y);
        let mut composite = Vec2::ZERO;
        let mut weight_sum = 0.0;
        for edge in edges {
            let weight = match line_circle_intersection(edge[0], edge[1], center, BALL_RADIUS) {
                Some([p, q]) => (q - p).length(),
                None => 0.0,
            };
            composite += perp(edge[1] - edge[0]).normalize() * weight;
            weight_sum += weight;
        }
        if weight_sum == 0.0 {
            return;
        }
        let n2 = composite.normalize();
        let normal = Vec3::new(n2.x, n2.y, 0.0);

        let ball = &mut self.balls[number];
        let before = ball.velocity;
        ball.velocity = reflect(ball.velocity, normal);
        if ball.velocity != before {
            ball.velocity *= BALL_CLOTH_RESTITUTION;
        }
    }

    /// Balls whose center is inside a pocket mouth start falling. Pocket
    /// neighborhoods come from the same sorted-order outlier scans as the
    /// cushions; corner pockets need a ball near two rails at once.
    fn resolve_pockets(&mut self) {
        let pocket_reach = POCKET_RADIUS;
        let mut east = BTreeSet::new();
        for i in (0..self.x_order.len()).rev() {
            let number = self.x_order[i];
            if self.balls[number].position.x <= SOUTHEAST_POCKET.x - pocket_reach {
                break;
            }
            east.insert(number);
        }
        let mut west = BTreeSet::new();
        for i in 0..self.x_order.len() {
            let number = self.x_order[i];
            if self.balls[number].position.x >= -SOUTHEAST_POCKET.x + pocket_reach {
                break;
            }
            west.insert(number);
        }
        let south_limit = SOUTH_POCKET.y.max(SOUTHEAST_POCKET.y) + pocket_reach;
        let mut south = BTreeSet::new();
        for i in 0..self.y_order.len() {
            let number = self.y_order[i];
            if self.balls[number].position.y >= south_limit {
                break;
            }
            south.insert(number);
        }
        let north_limit = (-SOUTH_POCKET.y).min(-SOUTHEAST_POCKET.y) - pocket_reach;
        let mut north = BTreeSet::new();
        for i in (0..self.y_order.len()).rev() {
            let number = self.y_order[i];
            if self.balls[number].position.y <= north_limit {
                break;
            }
            north.insert(number);
        }

        let near: [(PocketId, Vec<usize>); 6] = [
            (PocketId::Southeast, south.intersection(&east).copied().collect()),
            (PocketId::Southwest, south.intersection(&west).copied().collect()),
            (PocketId::Northeast, north.intersection(&east).copied().collect()),
            (PocketId::Northwest, north.intersection(&west).copied().collect()),
            (PocketId::South, south.iter().copied().collect()),
            (PocketId::North, north.iter().copied().collect()),
        ];
        for (pocket, numbers) in near {
            let center = pocket.center();
            for number in numbers {
                let ball = Vec2::new(self.balls[number].position.x, self.balls[number].position.y);
                if (ball - center).length() < POCKET_RADIUS {
                    self.pocket_ball(number, pocket);
                }
            }
        }
    }

    fn pocket_ball(&mut self, number: usize, pocket: PocketId) {
        self.x_order.retain(|&n| n != number);
        self.y_order.retain(|&n| n != number);
        self.balls[number].set_pocket(pocket);
        self.balls[number].pocket_time = Some(self.sim_elapsed);
        self.pocketed.push(number);
        self.recently_pocketed.push(number);
        self.events.push(SimEvent::BallPocketed {
            ball: number,
            pocket,
            time: self.sim_elapsed,
        });
        log::debug!("ball {number} pocketed into {pocket:?} at {:.3}s", self.sim_elapsed);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::sim::ball::BallState;

    /// Table with only the listed balls in play, at the given positions
    fn sparse_table(placed: &[(usize, Vec2)]) -> Table {
        let mut table = Table::new(0);
        for &(number, position) in placed {
            table.balls[number].put_in_play(Some(position));
            table.x_order.push(number);
            table.y_order.push(number);
        }
        table
    }

    #[test]
    fn test_head_on_impact_swaps_velocities() {
        let mut table = sparse_table(&[
            (0, Vec2::new(-0.3, 0.0)),
            (1, Vec2::ZERO),
        ]);
        table.balls[0].velocity = Vec3::new(2.0, 0.0, 0.0);

        let mut hit = false;
        for _ in 0..200 {
            for number in 0..BALL_COUNT {
                table.balls[number].tick(MAX_DT);
            }
            table.sim_elapsed += MAX_DT;
            table.resolve_collisions();
            if table.balls[1].velocity != Vec3::ZERO {
                hit = true;
                break;
            }
        }
        assert!(hit, "balls never collided");
        // Equal masses head on: the moving ball stops, the target takes
        // nearly all its speed (less what rolling resistance ate en route)
        assert!(table.balls[0].velocity.length() < 0.05);
        assert!(table.balls[1].velocity.x > 1.8);
        assert!(table.balls[1].velocity.y.abs() < 1e-3);
    }

    #[test]
    fn test_first_hit_recorded_once() {
        let mut table = sparse_table(&[
            (0, Vec2::new(-BALL_DIAMETER * 0.99, 0.0)),
            (1, Vec2::ZERO),
        ]);
        table.balls[0].velocity = Vec3::new(1.0, 0.0, 0.0);
        table.sim_elapsed = 2.0;
        table.resolve_collisions();
        assert_eq!(table.balls[0].first_hit_time, Some(2.0));
        assert_eq!(table.balls[1].first_hit_time, Some(2.0));
        assert_eq!(table.rules.first_cue_ball_hit(), Some(1));

        // A later contact does not overwrite the first
        table.sim_elapsed = 3.0;
        table.balls[0].position = Vec3::new(-BALL_DIAMETER * 0.99, 0.0, BALL_RADIUS);
        table.balls[1].position = Vec3::new(0.0, 0.0, BALL_RADIUS);
        table.resolve_collisions();
        assert_eq!(table.balls[0].first_hit_time, Some(2.0));
    }

    #[test]
    fn test_collision_event_reports_relative_speed() {
        let mut table = sparse_table(&[
            (0, Vec2::new(-BALL_DIAMETER * 0.99, 0.0)),
            (1, Vec2::ZERO),
        ]);
        table.balls[0].velocity = Vec3::new(1.5, 0.0, 0.0);
        table.resolve_collisions();
        let events = table.drain_events();
        let Some(SimEvent::BallsCollided { a, b, relative_speed, .. }) = events.first() else {
            panic!("no collision event");
        };
        assert_eq!((*a, *b), (0, 1));
        assert!((*relative_speed - 1.5).abs() < 1e-5);
        assert!(*relative_speed > LOUD_COLLISION_MIN_SPEED);
    }

    #[test]
    fn test_east_cushion_reflects_and_damps() {
        // Pressed into the east cushion face (face sits at x = 1.17074)
        let mut table = sparse_table(&[(1, Vec2::new(1.15, 0.0))]);
        table.balls[1].velocity = Vec3::new(1.0, 0.2, 0.0);
        table.resolve_collisions();
        let v = table.balls[1].velocity;
        assert!(v.x < 0.0, "x velocity should reverse, got {v:?}");
        assert!((v.x + BALL_CLOTH_RESTITUTION).abs() < 1e-4);
        assert!((v.y - 0.2 * BALL_CLOTH_RESTITUTION).abs() < 1e-4);
    }

    #[test]
    fn test_ball_leaving_cushion_is_untouched() {
        let mut table = sparse_table(&[(1, Vec2::new(1.15, 0.0))]);
        table.balls[1].velocity = Vec3::new(-1.0, 0.0, 0.0);
        table.handle_cushion_collisions(1, CushionSide::East);
        assert_eq!(table.balls[1].velocity, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_cushion_corner_blends_normals() {
        // Overlap the corner where the southeast cushion's playing face
        // meets its pocket-side slant; the blended normal points up-right
        let corner = Vec2::new(1.08992, -0.5850002);
        let center = corner + Vec2::new(-0.005, 0.010);
        let mut table = sparse_table(&[(1, center)]);
        let before = Vec3::new(0.5, -1.0, 0.0);
        table.balls[1].velocity = before;
        table.handle_cushion_collisions(1, CushionSide::South);
        let v = table.balls[1].velocity;
        assert!(v.y > 0.0, "expected a bounce away from the rail, got {v:?}");
        assert!((v.length() - BALL_CLOTH_RESTITUTION * before.length()).abs() < 1e-3);
    }

    #[test]
    fn test_ball_in_pocket_mouth_starts_falling() {
        let center = PocketId::Southeast.center();
        let mut table = sparse_table(&[(3, center + Vec2::new(0.01, 0.0))]);
        table.sim_elapsed = 1.25;
        table.resolve_collisions();
        assert_eq!(table.balls[3].state, BallState::FallingInPocket);
        assert_eq!(table.balls[3].pocket, Some(PocketId::Southeast));
        assert_eq!(table.balls[3].pocket_time, Some(1.25));
        assert!(table.x_order.is_empty());
        assert_eq!(table.recently_pocketed, vec![3]);
    }

    #[test]
    fn test_ball_near_rail_but_outside_mouth_stays_up() {
        let center = PocketId::South.center();
        let mut table = sparse_table(&[(3, center + Vec2::new(POCKET_RADIUS + 0.01, 0.0))]);
        table.resolve_collisions();
        assert_eq!(table.balls[3].state, BallState::InPlay);
    }

    proptest! {
        /// Broad-phase candidates must be a superset of truly touching pairs
        #[test]
        fn test_candidates_cover_all_touching_pairs(
            positions in proptest::collection::vec(
                (
                    -(TABLE_LENGTH / 2.0)..(TABLE_LENGTH / 2.0),
                    -(TABLE_WIDTH / 2.0)..(TABLE_WIDTH / 2.0),
                ),
                2..10,
            )
        ) {
            let placed: Vec<(usize, Vec2)> = positions
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| (i, Vec2::new(x, y)))
                .collect();
            let mut table = sparse_table(&placed);
            table.sort_orders();
            let candidates = table.candidate_pairs();
            for i in 0..placed.len() {
                for j in (i + 1)..placed.len() {
                    let d = table.balls[i].position.distance(table.balls[j].position);
                    if d < BALL_DIAMETER {
                        prop_assert!(
                            candidates.contains(&pair_key(i, j)),
                            "touching pair ({i},{j}) missing from candidates",
                        );
                    }
                }
            }
        }
    }
}
