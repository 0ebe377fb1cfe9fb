// src/zones.rs
//
// Zone/line configuration. Two document formats are accepted (bare
// coordinate arrays, and objects carrying id/name/coordinates); both are
// normalized into the single `Zone` type at load time so nothing
// downstream ever re-inspects raw JSON shapes. Invalid entries are
// rejected here, per entry, without aborting their siblings.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::geometry::{distance, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    Line,
    Polygon,
}

/// A configured spatial trigger, immutable for the session.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub kind: ZoneKind,
    pub points: Vec<Point>,
}

impl Zone {
    /// The two defining points of a line zone.
    /// Callers must only use this on `ZoneKind::Line` (validated at load).
    pub fn line_endpoints(&self) -> (Point, Point) {
        (self.points[0], self.points[1])
    }
}

#[derive(Debug, Error)]
pub enum ZoneConfigError {
    #[error("line '{0}' must have exactly 2 points, got {1}")]
    BadLinePointCount(String, usize),
    #[error("polygon '{0}' must have at least 3 points, got {1}")]
    BadPolygonPointCount(String, usize),
    #[error("line '{0}' has zero length")]
    DegenerateLine(String),
    #[error("polygon '{0}' collapses to a degenerate shape")]
    DegeneratePolygon(String),
    #[error("duplicate zone id '{0}'")]
    DuplicateId(String),
}

/// All valid zones for a session, split by kind for the per-frame loop.
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    pub polygons: Vec<Zone>,
    pub lines: Vec<Zone>,
}

impl ZoneSet {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.lines.is_empty()
    }
}

// Raw document shapes, normalized away immediately after parsing.

#[derive(Debug, Deserialize)]
struct ZoneDocument {
    #[serde(default)]
    lines: Vec<ZoneEntry>,
    #[serde(default)]
    polygons: Vec<ZoneEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZoneEntry {
    Named {
        id: Option<String>,
        name: Option<String>,
        coordinates: Vec<(f32, f32)>,
    },
    Bare(Vec<(f32, f32)>),
}

impl ZoneEntry {
    fn into_zone(self, kind: ZoneKind, index: usize) -> Zone {
        let fallback = match kind {
            ZoneKind::Line => format!("line_{}", index + 1),
            ZoneKind::Polygon => format!("polygon_{}", index + 1),
        };
        let (id, name, coords) = match self {
            ZoneEntry::Named {
                id,
                name,
                coordinates,
            } => {
                let name = name.unwrap_or_else(|| fallback.clone());
                let id = id.unwrap_or_else(|| fallback.clone());
                (id, name, coordinates)
            }
            ZoneEntry::Bare(coordinates) => (fallback.clone(), fallback, coordinates),
        };
        Zone {
            id,
            name,
            kind,
            points: coords.into_iter().map(Point::from).collect(),
        }
    }
}

fn validate(zone: &Zone) -> Result<(), ZoneConfigError> {
    match zone.kind {
        ZoneKind::Line => {
            if zone.points.len() != 2 {
                return Err(ZoneConfigError::BadLinePointCount(
                    zone.id.clone(),
                    zone.points.len(),
                ));
            }
            if distance(zone.points[0], zone.points[1]) < f32::EPSILON {
                return Err(ZoneConfigError::DegenerateLine(zone.id.clone()));
            }
        }
        ZoneKind::Polygon => {
            if zone.points.len() < 3 {
                return Err(ZoneConfigError::BadPolygonPointCount(
                    zone.id.clone(),
                    zone.points.len(),
                ));
            }
            // All vertices collapsed onto one point breaks the ray test.
            let first = zone.points[0];
            if zone
                .points
                .iter()
                .all(|p| distance(*p, first) < f32::EPSILON)
            {
                return Err(ZoneConfigError::DegeneratePolygon(zone.id.clone()));
            }
        }
    }
    Ok(())
}

/// Parse and normalize a zone document. Entries that fail validation are
/// excluded from the session with a warning; a malformed document is fatal.
pub fn parse_zones(json: &str) -> Result<ZoneSet> {
    let doc: ZoneDocument = serde_json::from_str(json).context("parsing zone document")?;

    let mut set = ZoneSet::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    let entries = doc
        .lines
        .into_iter()
        .enumerate()
        .map(|(i, e)| e.into_zone(ZoneKind::Line, i))
        .chain(
            doc.polygons
                .into_iter()
                .enumerate()
                .map(|(i, e)| e.into_zone(ZoneKind::Polygon, i)),
        );

    for zone in entries {
        let check = if seen_ids.contains(&zone.id) {
            Err(ZoneConfigError::DuplicateId(zone.id.clone()))
        } else {
            validate(&zone)
        };
        match check {
            Ok(()) => {
                seen_ids.insert(zone.id.clone());
                match zone.kind {
                    ZoneKind::Line => set.lines.push(zone),
                    ZoneKind::Polygon => set.polygons.push(zone),
                }
            }
            Err(e) => warn!("Zone excluded from analysis: {}", e),
        }
    }

    info!(
        "Loaded {} line(s) and {} polygon(s)",
        set.lines.len(),
        set.polygons.len()
    );
    Ok(set)
}

pub fn load_zones(path: &Path) -> Result<ZoneSet> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_zones(&contents)
}

// ============================================================================
// TESTS
// ============================================================================
