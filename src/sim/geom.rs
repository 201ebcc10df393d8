//! Geometry primitives for ball and cushion collision
//!
//! Pure functions with no shared state. Cushion geometry is 2D (the table
//! plane); ball kinematics are 3D with z up.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Outward edge normal direction for a counter-clockwise wound polygon edge
/// `d = b - a` (the 2D cross product with +Z)
#[inline]
pub fn perp(d: Vec2) -> Vec2 {
    Vec2::new(d.y, -d.x)
}

/// Reflect `v` about the surface normal `n`.
///
/// If `v` already points away from the surface (`dot(v, n) > 0`) it is
/// returned unchanged, so calling this on a ball that is separating from a
/// wall never re-captures it.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    let d = v.dot(n);
    if d > 0.0 {
        return v;
    }
    v - 2.0 * d * n
}

/// Post-collision velocity of the ball at `p` with velocity `u`, colliding
/// elastically with the ball at `q` with velocity `v`.
///
/// Equal-mass model: the component of the relative velocity along the center
/// line transfers entirely to the other ball. The mass difference between
/// the cue ball and object balls is deliberately ignored.
pub fn elastic_collision_reflection(u: Vec3, v: Vec3, p: Vec3, q: Vec3) -> Vec3 {
    let center_line = p - q;
    u - center_line * ((u - v).dot(center_line) / center_line.length_squared())
}

/// Minimum translation moving the circle centered at `p` out of overlap with
/// the circle at `q`, both of radius `r`. Callers apply a small overshoot
/// multiplier so the pair does not re-collide on the next tick.
pub fn collision_displacement(p: Vec3, q: Vec3, r: f32) -> Vec3 {
    let d = p - q;
    let dist = d.length();
    d * ((2.0 * r - dist) / (2.0 * dist))
}

/// Intersection of a line with a plane, or `None` when they are parallel.
/// Used to turn a presentation-layer screen ray into a table-plane point.
pub fn line_plane_intersection(
    line_point: Vec3,
    line_dir: Vec3,
    plane_point: Vec3,
    plane_normal: Vec3,
) -> Option<Vec3> {
    let denominator = line_dir.dot(plane_normal);
    if denominator == 0.0 {
        return None;
    }
    Some(line_point + line_dir * ((plane_point - line_point).dot(plane_normal) / denominator))
}

/// Portion of the segment `[a, b]` inside the circle at `center`.
///
/// Returns `None` when the segment misses the circle or only grazes it
/// tangentially. When both endpoints are outside, the two boundary crossings
/// are returned; when exactly one endpoint is inside, the crossing nearest
/// the outside endpoint and the inside endpoint; when both are inside, the
/// segment itself.
pub fn line_circle_intersection(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> Option<[Vec2; 2]> {
    let a_inside = center.distance(a) < radius;
    let b_inside = center.distance(b) < radius;
    if a_inside && b_inside {
        return Some([a, b]);
    }

    // Solve the ray-circle quadratic along the normalized segment direction
    let v = (b - a).normalize();
    let s = a - center;
    let qb = 2.0 * s.dot(v);
    let qc = s.length_squared() - radius * radius;
    let discriminant = qb * qb - 4.0 * qc;
    if discriminant <= 0.0 {
        // Tangential grazes carry no chord
        return None;
    }
    let root = discriminant.sqrt();
    let p0 = a + v * ((-qb + root) / 2.0);
    let p1 = a + v * ((-qb - root) / 2.0);

    if !a_inside && !b_inside {
        // The line goes in one side and out the other
        return Some([p0, p1]);
    }
    let (inside, outside) = if a_inside { (a, b) } else { (b, a) };
    // The crossing between the two endpoints is the one nearest the outside
    // endpoint
    if p0.distance(outside) < p1.distance(outside) {
        Some([p0, inside])
    } else {
        Some([p1, inside])
    }
}

/// A convex polygon with counter-clockwise winding, used for cushion
/// collision via the Separating Axis Theorem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Project all points onto `normal`, returning the (min, max) extent
    pub fn project(&self, normal: Vec2) -> (f32, f32) {
        let mut min = self.points[0].dot(normal);
        let mut max = min;
        for p in &self.points[1..] {
            let d = p.dot(normal);
            if d < min {
                min = d;
            } else if d > max {
                max = d;
            }
        }
        (min, max)
    }

    /// Mirror by scaling each axis by `sx`/`sy` (each +1 or -1). A mirror
    /// that flips winding reverses the point order so edge normals keep
    /// pointing outward.
    pub fn mirrored(&self, sx: f32, sy: f32) -> Polygon {
        let mut points: Vec<Vec2> = self
            .points
            .iter()
            .map(|p| Vec2::new(p.x * sx, p.y * sy))
            .collect();
        if sx * sy < 0.0 {
            points.reverse();
        }
        Polygon { points }
    }

    /// SAT collision test against a circle.
    ///
    /// Returns `None` when a separating axis exists (no collision).
    /// Otherwise returns the edges whose projection interval is straddled by
    /// the circle's far end; 0, 1 or 2 edges are expected, and the caller
    /// treats more than 2 as a fatal geometry inconsistency.
    pub fn check_collision(&self, center: Vec2, radius: f32) -> Option<Vec<[Vec2; 2]>> {
        let mut collided_edges = Vec::new();
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            let normal = perp(b - a).normalize();
            let (self_min, self_max) = self.project(normal);
            let c = center.dot(normal);
            let (other_min, other_max) = (c - radius, c + radius);
            if self_max < other_min || other_max < self_min {
                // Separating axis found
                return None;
            }
            // With outward normals, the far end of our projection on this
            // axis is always this edge; the circle straddling it means this
            // edge is the one being hit
            if other_min < self_max && other_max > self_max {
                collided_edges.push([a, b]);
            }
        }
        Some(collided_edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_flips_approaching_velocity() {
        let v = Vec3::new(1.0, -1.0, 0.0);
        let n = Vec3::new(0.0, 1.0, 0.0);
        let r = reflect(v, n);
        assert!((r.x - 1.0).abs() < 1e-6);
        assert!((r.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_leaves_separating_velocity_unchanged() {
        let v = Vec3::new(0.3, 0.7, 0.0);
        let n = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(reflect(v, n), v);
    }

    #[test]
    fn test_elastic_collision_head_on_swap() {
        // Equal-mass head-on impact along the center line transfers the
        // moving ball's velocity entirely
        let p = Vec3::new(-0.05, 0.0, 0.0);
        let q = Vec3::ZERO;
        let u = Vec3::new(2.0, 0.0, 0.0);
        let v = Vec3::ZERO;
        let u_after = elastic_collision_reflection(u, v, p, q);
        let v_after = elastic_collision_reflection(v, u, q, p);
        assert!(u_after.length() < 1e-6);
        assert!((v_after.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_collision_displacement_separates_overlap() {
        let r = 0.5;
        let p = Vec3::new(0.8, 0.0, 0.0);
        let q = Vec3::ZERO;
        let d = collision_displacement(p, q, r);
        let d2 = collision_displacement(q, p, r);
        // Applying both displacements leaves the centers exactly 2r apart
        let gap = ((p + d) - (q + d2)).length();
        assert!((gap - 2.0 * r).abs() < 1e-6);
    }

    #[test]
    fn test_line_plane_intersection() {
        let hit = line_plane_intersection(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::ZERO,
            Vec3::Z,
        );
        assert_eq!(hit, Some(Vec3::ZERO));
        // Parallel line never intersects
        let miss = line_plane_intersection(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::Z,
        );
        assert_eq!(miss, None);
    }

    #[test]
    fn test_line_circle_both_endpoints_outside() {
        let seg = line_circle_intersection(
            Vec2::new(-2.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::ZERO,
            1.0,
        )
        .unwrap();
        // Chord through the center has length 2r
        assert!((seg[0].distance(seg[1]) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_line_circle_one_endpoint_inside() {
        let inside = Vec2::new(0.5, 0.0);
        let outside = Vec2::new(3.0, 0.0);
        let seg = line_circle_intersection(inside, outside, Vec2::ZERO, 1.0).unwrap();
        assert!((seg[0].x - 1.0).abs() < 1e-5);
        assert_eq!(seg[1], inside);
    }

    #[test]
    fn test_line_circle_both_endpoints_inside() {
        let a = Vec2::new(-0.2, 0.0);
        let b = Vec2::new(0.3, 0.1);
        assert_eq!(line_circle_intersection(a, b, Vec2::ZERO, 1.0), Some([a, b]));
    }

    #[test]
    fn test_line_circle_miss_and_tangent() {
        assert_eq!(
            line_circle_intersection(Vec2::new(-2.0, 5.0), Vec2::new(2.0, 5.0), Vec2::ZERO, 1.0),
            None
        );
        // Exact tangent grazes; treated as a miss
        assert_eq!(
            line_circle_intersection(Vec2::new(-2.0, 1.0), Vec2::new(2.0, 1.0), Vec2::ZERO, 1.0),
            None
        );
    }

    fn unit_square() -> Polygon {
        Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ])
    }

    #[test]
    fn test_polygon_project() {
        let (min, max) = unit_square().project(Vec2::new(1.0, 0.0));
        assert_eq!((min, max), (0.0, 1.0));
    }

    #[test]
    fn test_sat_miss() {
        assert_eq!(
            unit_square().check_collision(Vec2::new(3.0, 0.5), 0.25),
            None
        );
    }

    #[test]
    fn test_sat_single_edge_hit() {
        // Circle just past the right edge of the square
        let edges = unit_square()
            .check_collision(Vec2::new(1.1, 0.5), 0.2)
            .unwrap();
        assert_eq!(edges.len(), 1);
        let [a, b] = edges[0];
        let normal = perp(b - a).normalize();
        assert!((normal.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sat_corner_hit_reports_two_edges() {
        let edges = unit_square()
            .check_collision(Vec2::new(1.05, 1.05), 0.2)
            .unwrap();
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_mirrored_polygon_keeps_outward_normals() {
        let square = unit_square();
        let mirrored = square.mirrored(-1.0, 1.0);
        // The edge to the left of the mirrored square must have an outward
        // (-x) normal, which requires the winding reversal
        let edges = mirrored.check_collision(Vec2::new(-1.1, 0.5), 0.2).unwrap();
        assert_eq!(edges.len(), 1);
        let [a, b] = edges[0];
        let normal = perp(b - a).normalize();
        assert!((normal.x + 1.0).abs() < 1e-6);
    }
}
