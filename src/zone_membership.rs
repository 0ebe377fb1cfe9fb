// src/zone_membership.rs
//
// Per (entity, polygon) membership state machine. Stateless geometry
// plus one bit of remembered state per pair: events fire strictly on
// transitions, never on steady state, so an entity parked inside a zone
// produces exactly one enter no matter how many frames it stays.

use crate::geometry::{point_in_polygon, Point};
use crate::session::EntityState;
use crate::types::{EventContext, ZoneEvent, ZoneEventKind};
use crate::zones::Zone;

/// Evaluate containment of the entity's latest position against one
/// polygon zone and flip the membership bit if it changed.
pub fn update_membership(
    entity: &mut EntityState,
    zone: &Zone,
    position: Point,
    ctx: &EventContext,
) -> Option<ZoneEvent> {
    let inside = point_in_polygon(position, &zone.points);
    let was_inside = entity.zone_membership.contains(&zone.id);

    let kind = match (was_inside, inside) {
        (false, true) => {
            entity.zone_membership.insert(zone.id.clone());
            ZoneEventKind::Enter
        }
        (true, false) => {
            entity.zone_membership.remove(&zone.id);
            ZoneEventKind::Exit
        }
        _ => return None,
    };

    Some(ZoneEvent {
        stable_id: ctx.stable_id,
        zone_id: zone.id.clone(),
        zone_name: zone.name.clone(),
        kind,
        frame_number: ctx.frame_number,
        timestamp_ms: ctx.timestamp_ms,
        position,
        class_name: ctx.class_name.to_string(),
        confidence: ctx.confidence,
    })
}

// ============================================================================
// TESTS
// ============================================================================
