use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Direction, Point};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub tracking: TrackingConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory scanned for detection capture files (*.jsonl).
    pub captures_dir: String,
    /// Zone/line definition document.
    pub zones_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            captures_dir: "data/captures".to_string(),
            zones_file: "configs/zonas.json".to_string(),
        }
    }
}

/// Which identity-confirmation policy the stabilizer runs.
///
/// The two are not interchangeable: qualification suppresses transient
/// false detections at the cost of missing crossings shorter than the
/// window, immediate does the opposite. The session default is
/// qualification with 5 consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    Qualify,
    Immediate,
}

/// Whether a (entity, line) pair may report more than one crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingDedup {
    /// At most one crossing event per entity per line for the session.
    OncePerSession,
    /// Every genuine side change emits; back-and-forth is re-counted.
    EveryCrossing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub id_policy: IdPolicy,
    /// Consecutive frames a raw id must be seen before it qualifies.
    /// Ignored under the immediate policy.
    pub qualify_frames: u32,
    /// Sliding-window capacity of each entity's position history.
    pub trajectory_capacity: usize,
    pub crossing_dedup: CrossingDedup,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            id_policy: IdPolicy::Qualify,
            qualify_frames: 5,
            trajectory_capacity: 30,
            crossing_dedup: CrossingDedup::OncePerSession,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkFormat {
    Jsonl,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub format: SinkFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "outputs".to_string(),
            format: SinkFormat::Jsonl,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// FRAME INPUT
// ============================================================================

/// One detection as handed over by the upstream detector/tracker.
/// `raw_id` is only stable for the current tracking run — it may be
/// retired and reused, which is exactly what the stabilizer papers over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    pub raw_id: u32,
    pub class_name: String,
    pub confidence: f32,
    /// [x1, y1, x2, y2] pixels
    pub bbox: [f32; 4],
}

impl RawDetection {
    /// Bounding-box center, the position the engine reasons about.
    pub fn center(&self) -> Point {
        Point::new(
            (self.bbox[0] + self.bbox[2]) * 0.5,
            (self.bbox[1] + self.bbox[3]) * 0.5,
        )
    }
}

/// A full frame of detections. No ordering is assumed within a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_number: u64,
    pub timestamp_ms: f64,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Per-detection context threaded to the analyzers so emitted events
/// carry enough to be persisted and queried on their own.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub stable_id: u64,
    pub frame_number: u64,
    pub timestamp_ms: f64,
    pub class_name: &'a str,
    pub confidence: f32,
}

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneEventKind {
    Enter,
    Exit,
}

impl ZoneEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }
}

/// Immutable fact: an entity's membership in a polygon zone flipped.
/// Emitted exactly once per state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneEvent {
    pub stable_id: u64,
    pub zone_id: String,
    pub zone_name: String,
    pub kind: ZoneEventKind,
    pub frame_number: u64,
    pub timestamp_ms: f64,
    pub position: Point,
    pub class_name: String,
    pub confidence: f32,
}

/// Immutable fact: an entity crossed a reference line in a known direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCrossingEvent {
    pub stable_id: u64,
    pub line_id: String,
    pub line_name: String,
    pub direction: Direction,
    pub frame_number: u64,
    pub timestamp_ms: f64,
    pub position: Point,
    pub class_name: String,
    pub confidence: f32,
}

// ============================================================================
// SUMMARIES
// ============================================================================

/// Per-frame counters returned by `TrackingSession::process_frame`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub detections: usize,
    pub confirmed_entities: usize,
    pub zone_events: usize,
    pub line_crossings: usize,
}

/// In-memory session totals, computable at any point of the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub unique_entities: usize,
    pub zone_enters: u64,
    pub zone_exits: u64,
    pub line_crossings: u64,
    pub crossings_by_direction: HashMap<String, u64>,
    pub entities_in_zones: usize,
    pub entities_crossed_lines: usize,
}
