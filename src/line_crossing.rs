// src/line_crossing.rs
//
// Directional line-crossing detection over the entity's latest motion
// segment. A crossing requires BOTH a proper segment-segment
// intersection with the reference line AND a confirmed side change —
// distance alone is not evidence. An entity's very first observation
// near a line has no confirmed prior side and never counts, which is
// what kills the sudden-appearance false positives.

use crate::geometry::{crossing_direction, point_side, segments_intersect, Point};
use crate::session::EntityState;
use crate::types::{CrossingDedup, EventContext, LineCrossingEvent};
use crate::zones::Zone;

/// Check the entity's previous→current motion against one line zone.
///
/// `prev` is `None` when the trajectory holds fewer than two positions;
/// the current side is still recorded so the next frame has a confirmed
/// prior side to compare against.
pub fn check_crossing(
    entity: &mut EntityState,
    line: &Zone,
    prev: Option<Point>,
    curr: Point,
    ctx: &EventContext,
    dedup: CrossingDedup,
) -> Option<LineCrossingEvent> {
    let (start, end) = line.line_endpoints();

    let curr_side = point_side(curr, start, end);
    let stored_side = entity.line_sides.insert(line.id.clone(), curr_side);

    let prev = prev?;
    // Prefer the side confirmed on the last processed frame; fall back to
    // the previous position for an entity whose history predates its
    // first visible frame (qualification backfill).
    let prev_side = stored_side.unwrap_or_else(|| point_side(prev, start, end));

    if prev_side == curr_side {
        return None;
    }
    if !segments_intersect(start, end, prev, curr) {
        // Side changed beyond the line's extent — not a crossing of THIS line.
        return None;
    }
    if dedup == CrossingDedup::OncePerSession && entity.crossed_lines.contains(&line.id) {
        return None;
    }

    entity.crossed_lines.insert(line.id.clone());

    Some(LineCrossingEvent {
        stable_id: ctx.stable_id,
        line_id: line.id.clone(),
        line_name: line.name.clone(),
        direction: crossing_direction(start, end, prev, curr),
        frame_number: ctx.frame_number,
        timestamp_ms: ctx.timestamp_ms,
        position: curr,
        class_name: ctx.class_name.to_string(),
        confidence: ctx.confidence,
    })
}

// ============================================================================
// TESTS
// ============================================================================
