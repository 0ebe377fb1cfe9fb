// src/geometry.rs
//
// Pure 2D geometry used by the zone and line analyzers. No state here —
// everything operates on explicit points so the tie-break rules stay
// identical across frames.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Which side of a directed line a point falls on, by the sign of the
/// 2D cross product of the line vector and the start→point vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Crossing direction relative to the line's own start→end orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftToRight => "left_to_right",
            Self::RightToLeft => "right_to_left",
        }
    }
}

/// Ray-casting containment test. A ray is extended from the point along
/// +x and edge crossings are counted; an odd count means inside.
///
/// Edge tie-break: the `y > min && y <= max` half-open rule, so a point
/// level with a vertex is counted against exactly one of the two edges
/// meeting there, never both. The rule must not change between frames or
/// membership flickers at polygon boundaries.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut p1 = polygon[0];
    for i in 1..=n {
        let p2 = polygon[i % n];
        if point.y > p1.y.min(p2.y) && point.y <= p1.y.max(p2.y) && point.x <= p1.x.max(p2.x) {
            // p1.y == p2.y cannot reach here (the half-open window is empty),
            // so the division is safe.
            let x_intersect = (point.y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;
            if p1.x == p2.x || point.x <= x_intersect {
                inside = !inside;
            }
        }
        p1 = p2;
    }
    inside
}

/// Counter-clockwise orientation test for the triplet (a, b, c).
fn ccw(a: Point, b: Point, c: Point) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// True iff segment a1–a2 and segment b1–b2 properly intersect.
///
/// Both orientation conditions are required: the endpoints of each
/// segment must straddle the other segment. Testing only one of them
/// fires false positives on near-parallel configurations.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    ccw(a1, b1, b2) != ccw(a2, b1, b2) && ccw(a1, a2, b1) != ccw(a1, a2, b2)
}

/// Classify a crossing by the cross product of the line's direction
/// vector and the motion vector. Correct for diagonal lines, unlike a
/// raw x-coordinate comparison which only works near-vertical.
pub fn crossing_direction(line_start: Point, line_end: Point, prev: Point, curr: Point) -> Direction {
    let line_dx = line_end.x - line_start.x;
    let line_dy = line_end.y - line_start.y;
    let move_dx = curr.x - prev.x;
    let move_dy = curr.y - prev.y;

    let cross = line_dx * move_dy - line_dy * move_dx;
    if cross > 0.0 {
        Direction::LeftToRight
    } else {
        Direction::RightToLeft
    }
}

/// Signed side of the directed line start→end the point is on.
/// The zero (exactly on the line) case collapses into `Right` so a point
/// sliding along the line never oscillates between sides.
pub fn point_side(point: Point, line_start: Point, line_end: Point) -> Side {
    let d = (line_end.x - line_start.x) * (point.y - line_start.y)
        - (line_end.y - line_start.y) * (point.x - line_start.x);
    if d > 0.0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Perpendicular distance from a point to the infinite line through
/// start→end. Callers must reject zero-length lines beforehand.
pub fn point_line_distance(point: Point, line_start: Point, line_end: Point) -> f32 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        return distance(point, line_start);
    }
    let cross = dx * (point.y - line_start.y) - dy * (point.x - line_start.x);
    cross.abs() / len
}

pub fn distance(a: Point, b: Point) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn square() -> Vec<Point> {
        vec![p(100.0, 100.0), p(300.0, 100.0), p(300.0, 300.0), p(100.0, 300.0)]
    }

    #[test]
    fn test_point_inside_square() {
        assert!(point_in_polygon(p(200.0, 200.0), &square()));
    }

    #[test]
    fn test_point_outside_square() {
        assert!(!point_in_polygon(p(50.0, 50.0), &square()));
    }

    #[test]
    fn test_point_in_polygon_is_idempotent() {
        let poly = square();
        let pt = p(200.0, 200.0);
        let first = point_in_polygon(pt, &poly);
        for _ in 0..10 {
            assert_eq!(point_in_polygon(pt, &poly), first);
        }
    }

    #[test]
    fn test_degenerate_polygon_is_never_inside() {
        assert!(!point_in_polygon(p(0.0, 0.0), &[p(1.0, 1.0), p(2.0, 2.0)]));
    }

    #[test]
    fn test_triangle_containment() {
        let tri = vec![p(0.0, 0.0), p(10.0, 0.0), p(5.0, 10.0)];
        assert!(point_in_polygon(p(5.0, 3.0), &tri));
        assert!(!point_in_polygon(p(9.0, 9.0), &tri));
    }

    #[test]
    fn test_segments_cross() {
        assert!(segments_intersect(
            p(0.0, 0.0),
            p(10.0, 10.0),
            p(0.0, 10.0),
            p(10.0, 0.0)
        ));
    }

    #[test]
    fn test_segments_parallel_no_cross() {
        assert!(!segments_intersect(
            p(0.0, 0.0),
            p(10.0, 0.0),
            p(0.0, 5.0),
            p(10.0, 5.0)
        ));
    }

    #[test]
    fn test_segments_near_parallel_disjoint() {
        // Near-parallel, never touching — the one-sided test would fire here.
        assert!(!segments_intersect(
            p(0.0, 0.0),
            p(100.0, 1.0),
            p(0.0, 5.0),
            p(100.0, 7.0)
        ));
    }

    #[test]
    fn test_collinear_but_disjoint() {
        assert!(!segments_intersect(
            p(0.0, 0.0),
            p(5.0, 0.0),
            p(10.0, 0.0),
            p(20.0, 0.0)
        ));
    }

    #[test]
    fn test_direction_diagonal_line_right_to_left() {
        // Entrance line from the capture site: movement from the right
        // side toward the left side must classify as right_to_left.
        let ls = p(1003.0, 851.0);
        let le = p(1666.0, 351.0);
        let prev = p(1083.0, 911.0);
        let curr = p(923.0, 791.0);

        assert!(segments_intersect(ls, le, prev, curr), "motion must cross the line");
        assert_eq!(crossing_direction(ls, le, prev, curr), Direction::RightToLeft);
    }

    #[test]
    fn test_direction_flips_when_motion_reversed() {
        let ls = p(1003.0, 851.0);
        let le = p(1666.0, 351.0);
        let a = p(1083.0, 911.0);
        let b = p(923.0, 791.0);

        let forward = crossing_direction(ls, le, a, b);
        let backward = crossing_direction(ls, le, b, a);
        assert_ne!(forward, backward, "reversing motion must flip the direction");
    }

    #[test]
    fn test_point_side_changes_across_line() {
        let ls = p(0.0, 0.0);
        let le = p(0.0, 10.0);
        assert_ne!(
            point_side(p(-5.0, 5.0), ls, le),
            point_side(p(5.0, 5.0), ls, le)
        );
    }

    #[test]
    fn test_point_line_distance_vertical() {
        let d = point_line_distance(p(5.0, 3.0), p(0.0, 0.0), p(0.0, 10.0));
        assert!((d - 5.0).abs() < 1e-5);
    }
}
