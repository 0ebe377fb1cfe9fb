// src/session.rs
//
// TrackingSession owns every piece of per-entity state for one analysis
// run: the id stabilizer, the trajectory window, and each entity's zone
// membership and crossing history. There are no globals — callers hold
// the session and feed it frames in order. One session per stream; core
// calls are never made concurrently.
//
// Frame loop, per detection: resolve stable id → append trajectory →
// polygon membership checks → line crossing checks → sink. Step N's
// output never depends on frame N+1.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::geometry::{Direction, Point, Side};
use crate::sink::EventSink;
use crate::stabilizer::IdentityStabilizer;
use crate::trajectory::TrajectoryStore;
use crate::types::{
    EventContext, FrameDetections, FrameStats, IdPolicy, SessionSummary, TrackingConfig,
};
use crate::zones::ZoneSet;
use crate::{line_crossing, zone_membership};

/// Everything remembered about one confirmed entity. Entities are never
/// destroyed — when the upstream tracker stops reporting them their last
/// known state stays queryable for the rest of the session.
#[derive(Debug, Clone)]
pub struct EntityState {
    pub stable_id: u64,
    pub class_name: String,
    pub last_confidence: f32,
    pub last_position: Option<Point>,
    pub last_seen_frame: u64,
    /// Zone ids the entity is currently inside.
    pub zone_membership: HashSet<String>,
    /// Line ids this entity has been reported as crossing.
    pub crossed_lines: HashSet<String>,
    /// Last confirmed side per line, for sudden-appearance suppression.
    pub line_sides: HashMap<String, Side>,
}

impl EntityState {
    pub fn new(stable_id: u64, class_name: &str) -> Self {
        Self {
            stable_id,
            class_name: class_name.to_string(),
            last_confidence: 0.0,
            last_position: None,
            last_seen_frame: 0,
            zone_membership: HashSet::new(),
            crossed_lines: HashSet::new(),
            line_sides: HashMap::new(),
        }
    }
}

pub struct TrackingSession {
    config: TrackingConfig,
    zones: ZoneSet,
    stabilizer: IdentityStabilizer,
    trajectories: TrajectoryStore,
    entities: HashMap<u64, EntityState>,
    /// Positions seen while a raw id is still qualifying. Flushed into
    /// the trajectory the moment the id qualifies so the crossing
    /// detector is not blind at the qualification boundary.
    pending_positions: HashMap<u32, Vec<Point>>,

    frames_processed: u64,
    zone_enters: u64,
    zone_exits: u64,
    left_to_right: u64,
    right_to_left: u64,
}

impl TrackingSession {
    pub fn new(zones: ZoneSet, config: TrackingConfig) -> Self {
        Self {
            stabilizer: IdentityStabilizer::new(config.id_policy, config.qualify_frames),
            trajectories: TrajectoryStore::new(config.trajectory_capacity),
            entities: HashMap::new(),
            pending_positions: HashMap::new(),
            frames_processed: 0,
            zone_enters: 0,
            zone_exits: 0,
            left_to_right: 0,
            right_to_left: 0,
            zones,
            config,
        }
    }

    /// Process one frame of detections, emitting any state-change events
    /// to the sink. Sink failures drop the affected event with a warning
    /// and never halt the loop.
    pub fn process_frame(&mut self, frame: &FrameDetections, sink: &mut dyn EventSink) -> FrameStats {
        self.frames_processed += 1;
        let mut stats = FrameStats {
            detections: frame.detections.len(),
            ..FrameStats::default()
        };

        for detection in &frame.detections {
            let position = detection.center();

            let Some(stable_id) = self.stabilizer.observe(detection.raw_id, frame.frame_number)
            else {
                // Still qualifying: remember the position, emit nothing.
                if self.config.id_policy == IdPolicy::Qualify {
                    let pending = self.pending_positions.entry(detection.raw_id).or_default();
                    if pending.len() >= self.config.qualify_frames as usize {
                        pending.remove(0);
                    }
                    pending.push(position);
                }
                continue;
            };

            let entity = self.entities.entry(stable_id).or_insert_with(|| {
                debug!(
                    "Entity {} confirmed (raw id {}, class {})",
                    stable_id, detection.raw_id, detection.class_name
                );
                EntityState::new(stable_id, &detection.class_name)
            });

            // First visible frame: backfill the qualification window.
            if let Some(pending) = self.pending_positions.remove(&detection.raw_id) {
                for p in pending {
                    self.trajectories.push(stable_id, p);
                }
            }
            self.trajectories.push(stable_id, position);

            entity.last_confidence = detection.confidence;
            entity.last_position = Some(position);
            entity.last_seen_frame = frame.frame_number;

            let ctx = EventContext {
                stable_id,
                frame_number: frame.frame_number,
                timestamp_ms: frame.timestamp_ms,
                class_name: &detection.class_name,
                confidence: detection.confidence,
            };

            for zone in &self.zones.polygons {
                if let Some(event) = zone_membership::update_membership(entity, zone, position, &ctx)
                {
                    match event.kind {
                        crate::types::ZoneEventKind::Enter => self.zone_enters += 1,
                        crate::types::ZoneEventKind::Exit => self.zone_exits += 1,
                    }
                    stats.zone_events += 1;
                    if let Err(e) = sink.record_zone_event(&event) {
                        warn!(
                            "Dropping zone event for entity {} in {}: {}",
                            event.stable_id, event.zone_id, e
                        );
                    }
                }
            }

            let prev = self
                .trajectories
                .last_two(stable_id)
                .map(|(prev, _curr)| prev);
            for line in &self.zones.lines {
                if let Some(event) =
                    line_crossing::check_crossing(entity, line, prev, position, &ctx, self.config.crossing_dedup)
                {
                    match event.direction {
                        Direction::LeftToRight => self.left_to_right += 1,
                        Direction::RightToLeft => self.right_to_left += 1,
                    }
                    stats.line_crossings += 1;
                    if let Err(e) = sink.record_line_crossing(&event) {
                        warn!(
                            "Dropping crossing event for entity {} at {}: {}",
                            event.stable_id, event.line_id, e
                        );
                    }
                }
            }
        }

        stats.confirmed_entities = self.entities.len();
        stats
    }

    /// Last-known state of a confirmed entity.
    pub fn entity(&self, stable_id: u64) -> Option<&EntityState> {
        self.entities.get(&stable_id)
    }

    /// In-memory totals; valid at any point of the run, not only at the end.
    pub fn summary(&self) -> SessionSummary {
        let mut by_direction = HashMap::new();
        by_direction.insert(Direction::LeftToRight.as_str().to_string(), self.left_to_right);
        by_direction.insert(Direction::RightToLeft.as_str().to_string(), self.right_to_left);

        SessionSummary {
            frames_processed: self.frames_processed,
            unique_entities: self.entities.len(),
            zone_enters: self.zone_enters,
            zone_exits: self.zone_exits,
            line_crossings: self.left_to_right + self.right_to_left,
            crossings_by_direction: by_direction,
            entities_in_zones: self
                .entities
                .values()
                .filter(|e| !e.zone_membership.is_empty())
                .count(),
            entities_crossed_lines: self
                .entities
                .values()
                .filter(|e| !e.crossed_lines.is_empty())
                .count(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemoryEventSink, SinkError};
    use crate::types::{CrossingDedup, LineCrossingEvent, RawDetection, ZoneEvent, ZoneEventKind};
    use crate::zones::parse_zones;

    fn test_zones() -> ZoneSet {
        parse_zones(
            r#"{
                "lines": [{
                    "id": "line_gate",
                    "name": "gate",
                    "coordinates": [[400, 0], [400, 600]]
                }],
                "polygons": [{
                    "id": "zone_patio",
                    "name": "patio",
                    "coordinates": [[100, 100], [300, 100], [300, 300], [100, 300]]
                }]
            }"#,
        )
        .unwrap()
    }

    fn detection(raw_id: u32, cx: f32, cy: f32) -> RawDetection {
        RawDetection {
            raw_id,
            class_name: "person".to_string(),
            confidence: 0.9,
            bbox: [cx - 20.0, cy - 40.0, cx + 20.0, cy + 40.0],
        }
    }

    fn frame(n: u64, detections: Vec<RawDetection>) -> FrameDetections {
        FrameDetections {
            frame_number: n,
            timestamp_ms: n as f64 * 33.3,
            detections,
        }
    }

    fn immediate_config() -> TrackingConfig {
        TrackingConfig {
            id_policy: IdPolicy::Immediate,
            ..TrackingConfig::default()
        }
    }

    #[test]
    fn test_short_lived_raw_id_emits_nothing_under_qualification() {
        // Raw id 7 appears in frames 1-4 only, inside the zone the whole
        // time. Under K=5 qualification no stable id exists, so no events.
        let mut session = TrackingSession::new(test_zones(), TrackingConfig::default());
        let mut sink = MemoryEventSink::new();

        for n in 1..=4 {
            session.process_frame(&frame(n, vec![detection(7, 200.0, 200.0)]), &mut sink);
        }

        assert!(sink.zone_events.is_empty());
        assert!(sink.line_crossings.is_empty());
        assert_eq!(session.summary().unique_entities, 0);
    }

    #[test]
    fn test_enter_and_exit_once_across_many_frames() {
        let mut session = TrackingSession::new(test_zones(), immediate_config());
        let mut sink = MemoryEventSink::new();

        // Outside, then 10 frames inside, then outside again.
        let mut n = 0;
        let mut run = |x: f32, y: f32, session: &mut TrackingSession, sink: &mut MemoryEventSink| {
            n += 1;
            session.process_frame(&frame(n, vec![detection(1, x, y)]), sink);
        };
        run(50.0, 50.0, &mut session, &mut sink);
        for _ in 0..10 {
            run(200.0, 200.0, &mut session, &mut sink);
        }
        run(50.0, 350.0, &mut session, &mut sink);

        assert_eq!(sink.zone_events.len(), 2);
        assert_eq!(sink.zone_events[0].kind, ZoneEventKind::Enter);
        assert_eq!(sink.zone_events[1].kind, ZoneEventKind::Exit);
        assert!(sink.zone_events[0].frame_number < sink.zone_events[1].frame_number);

        let summary = session.summary();
        assert_eq!(summary.zone_enters, 1);
        assert_eq!(summary.zone_exits, 1);
        assert_eq!(summary.entities_in_zones, 0, "entity left the zone");
    }

    #[test]
    fn test_line_crossing_with_direction_and_dedup() {
        let mut session = TrackingSession::new(test_zones(), immediate_config());
        let mut sink = MemoryEventSink::new();

        // Cross the x=400 gate, then wander back and forth over it.
        let xs = [380.0, 420.0, 380.0, 420.0];
        for (i, x) in xs.iter().enumerate() {
            session.process_frame(&frame(i as u64 + 1, vec![detection(1, *x, 300.0)]), &mut sink);
        }

        assert_eq!(sink.line_crossings.len(), 1, "once-per-session dedup");
        let summary = session.summary();
        assert_eq!(summary.line_crossings, 1);
        assert_eq!(summary.entities_crossed_lines, 1);
    }

    #[test]
    fn test_every_crossing_policy_counts_each_pass() {
        let config = TrackingConfig {
            id_policy: IdPolicy::Immediate,
            crossing_dedup: CrossingDedup::EveryCrossing,
            ..TrackingConfig::default()
        };
        let mut session = TrackingSession::new(test_zones(), config);
        let mut sink = MemoryEventSink::new();

        let xs = [380.0, 420.0, 380.0, 420.0];
        for (i, x) in xs.iter().enumerate() {
            session.process_frame(&frame(i as u64 + 1, vec![detection(1, *x, 300.0)]), &mut sink);
        }

        assert_eq!(sink.line_crossings.len(), 3);
        let summary = session.summary();
        assert_eq!(summary.crossings_by_direction["left_to_right"], 1);
        assert_eq!(summary.crossings_by_direction["right_to_left"], 2);
    }

    #[test]
    fn test_crossing_caught_at_qualification_boundary() {
        // The entity walks through the gate during its qualification
        // window; the backfilled trajectory must still surface the
        // crossing once the id becomes visible.
        let mut session = TrackingSession::new(test_zones(), TrackingConfig::default());
        let mut sink = MemoryEventSink::new();

        let xs = [380.0, 390.0, 395.0, 398.0, 420.0]; // crosses on frame 5
        for (i, x) in xs.iter().enumerate() {
            session.process_frame(&frame(i as u64 + 1, vec![detection(7, *x, 300.0)]), &mut sink);
        }

        assert_eq!(sink.line_crossings.len(), 1);
        assert_eq!(sink.line_crossings[0].frame_number, 5);
    }

    #[test]
    fn test_two_entities_do_not_interfere() {
        let mut session = TrackingSession::new(test_zones(), immediate_config());
        let mut sink = MemoryEventSink::new();

        for n in 1..=3 {
            session.process_frame(
                &frame(
                    n,
                    vec![detection(1, 200.0, 200.0), detection(2, 50.0, 500.0)],
                ),
                &mut sink,
            );
        }

        assert_eq!(sink.zone_events.len(), 1, "only entity 1 entered");
        let summary = session.summary();
        assert_eq!(summary.unique_entities, 2);
        assert_eq!(summary.entities_in_zones, 1);
    }

    #[test]
    fn test_entity_state_queryable_after_disappearing() {
        let mut session = TrackingSession::new(test_zones(), immediate_config());
        let mut sink = MemoryEventSink::new();

        session.process_frame(&frame(1, vec![detection(1, 200.0, 200.0)]), &mut sink);
        // Entity stops being reported; state must remain.
        session.process_frame(&frame(2, vec![]), &mut sink);
        session.process_frame(&frame(3, vec![]), &mut sink);

        let entity = session.entity(1).expect("entity state is never destroyed");
        assert!(entity.zone_membership.contains("zone_patio"));
        assert_eq!(entity.last_seen_frame, 1);
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn record_zone_event(&mut self, _: &ZoneEvent) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
        fn record_line_crossing(&mut self, _: &LineCrossingEvent) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
        fn flush(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_never_halts_the_loop() {
        let mut session = TrackingSession::new(test_zones(), immediate_config());
        let mut sink = FailingSink;

        let xs = [380.0, 420.0];
        for (i, x) in xs.iter().enumerate() {
            session.process_frame(&frame(i as u64 + 1, vec![detection(1, *x, 200.0)]), &mut sink);
        }

        // Events were dropped at the sink but the engine state advanced.
        let summary = session.summary();
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(summary.line_crossings, 1);
    }
}
