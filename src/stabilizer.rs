// src/stabilizer.rs
//
// Maps the upstream tracker's per-run ids onto stable entity ids. The
// upstream tracker retires and reuses its ids; stable ids are assigned
// monotonically and never reused for the session.
//
// Resolution never fails — the policy only decides WHEN a raw id becomes
// visible downstream. Under qualification, a raw id must be seen in
// enough consecutive frames first; a gap resets the streak.

use std::collections::HashMap;

use tracing::debug;

use crate::types::IdPolicy;

#[derive(Debug, Clone, Copy)]
struct RawIdState {
    streak: u32,
    last_frame: u64,
    stable_id: Option<u64>,
}

pub struct IdentityStabilizer {
    policy: IdPolicy,
    qualify_frames: u32,
    raw_states: HashMap<u32, RawIdState>,
    next_stable_id: u64,
}

impl IdentityStabilizer {
    pub fn new(policy: IdPolicy, qualify_frames: u32) -> Self {
        Self {
            policy,
            qualify_frames: qualify_frames.max(1),
            raw_states: HashMap::new(),
            next_stable_id: 1,
        }
    }

    /// Record one observation of `raw_id` at `frame_number` and resolve it.
    /// Returns the stable id once the raw id is visible downstream.
    pub fn observe(&mut self, raw_id: u32, frame_number: u64) -> Option<u64> {
        let state = self.raw_states.entry(raw_id).or_insert(RawIdState {
            streak: 0,
            last_frame: 0,
            stable_id: None,
        });

        if state.stable_id.is_some() {
            state.last_frame = frame_number;
            return state.stable_id;
        }

        // Consecutive-frame streak; a missed frame starts over.
        if state.streak > 0 && frame_number == state.last_frame + 1 {
            state.streak += 1;
        } else {
            state.streak = 1;
        }
        state.last_frame = frame_number;

        let qualified = match self.policy {
            IdPolicy::Immediate => true,
            IdPolicy::Qualify => state.streak >= self.qualify_frames,
        };

        if qualified {
            let stable = self.next_stable_id;
            self.next_stable_id += 1;
            state.stable_id = Some(stable);
            debug!("Raw id {} qualified as stable id {}", raw_id, stable);
            Some(stable)
        } else {
            None
        }
    }

    /// Resolve without recording an observation.
    pub fn resolve(&self, raw_id: u32) -> Option<u64> {
        self.raw_states.get(&raw_id).and_then(|s| s.stable_id)
    }

    pub fn confirmed_count(&self) -> usize {
        self.raw_states
            .values()
            .filter(|s| s.stable_id.is_some())
            .count()
    }
}

// ============================================================================
// TESTS
// ============================================================================
