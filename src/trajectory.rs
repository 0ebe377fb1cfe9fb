// src/trajectory.rs
//
// Bounded per-entity position history. A sliding window, not a log:
// oldest positions are evicted at capacity (30 frames by default, the
// same as the drawing trail upstream). The crossing detector only needs
// the previous/current pair; the rest of the window exists for callers
// that want the recent trail.

use std::collections::{HashMap, VecDeque};

use crate::geometry::Point;

pub struct TrajectoryStore {
    capacity: usize,
    trails: HashMap<u64, VecDeque<Point>>,
}

impl TrajectoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            trails: HashMap::new(),
        }
    }

    pub fn push(&mut self, stable_id: u64, position: Point) {
        let trail = self
            .trails
            .entry(stable_id)
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        if trail.len() == self.capacity {
            trail.pop_front();
        }
        trail.push_back(position);
    }

    /// The (previous, current) position pair, if the entity has been seen
    /// at least twice. One position is not enough to detect a crossing.
    pub fn last_two(&self, stable_id: u64) -> Option<(Point, Point)> {
        let trail = self.trails.get(&stable_id)?;
        if trail.len() < 2 {
            return None;
        }
        Some((trail[trail.len() - 2], trail[trail.len() - 1]))
    }

    pub fn last(&self, stable_id: u64) -> Option<Point> {
        self.trails.get(&stable_id)?.back().copied()
    }

    pub fn trail(&self, stable_id: u64) -> Option<&VecDeque<Point>> {
        self.trails.get(&stable_id)
    }

    pub fn len(&self, stable_id: u64) -> usize {
        self.trails.get(&stable_id).map_or(0, |t| t.len())
    }
}

// ============================================================================
// TESTS
// ============================================================================
