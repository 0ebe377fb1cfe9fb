// src/sink.rs
//
// The persistence boundary. The engine only ever emits state
// transitions — never per-frame detections — and only ever talks to the
// `EventSink` trait, so backends are swappable without touching the
// detection logic. All disk I/O lives behind this seam.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::json;
use thiserror::Error;

use crate::types::{LineCrossingEvent, ZoneEvent};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait EventSink {
    fn record_zone_event(&mut self, event: &ZoneEvent) -> Result<(), SinkError>;
    fn record_line_crossing(&mut self, event: &LineCrossingEvent) -> Result<(), SinkError>;
    fn flush(&mut self) -> Result<(), SinkError>;
}

// ============================================================================
// JSONL BACKEND
// ============================================================================

/// One JSON object per line, tagged with an event type, in a single file.
pub struct JsonlEventSink {
    writer: BufWriter<File>,
}

impl JsonlEventSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl EventSink for JsonlEventSink {
    fn record_zone_event(&mut self, event: &ZoneEvent) -> Result<(), SinkError> {
        let mut value = serde_json::to_value(event)?;
        value["type"] = json!("zone_event");
        writeln!(self.writer, "{}", serde_json::to_string(&value)?)?;
        Ok(())
    }

    fn record_line_crossing(&mut self, event: &LineCrossingEvent) -> Result<(), SinkError> {
        let mut value = serde_json::to_value(event)?;
        value["type"] = json!("line_crossing");
        writeln!(self.writer, "{}", serde_json::to_string(&value)?)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// CSV BACKEND
// ============================================================================

/// Two CSV files with the legacy column layout: `zone_events.csv` and
/// `line_crossing_events.csv`. Row ids are synthesized from the track,
/// frame and timestamp the same way the old exporter did.
pub struct CsvEventSink {
    zone_writer: BufWriter<File>,
    crossing_writer: BufWriter<File>,
    analysis_id: String,
}

impl CsvEventSink {
    pub fn create(dir: &Path, analysis_id: &str) -> Result<Self, SinkError> {
        fs::create_dir_all(dir)?;

        let mut zone_writer = BufWriter::new(File::create(dir.join("zone_events.csv"))?);
        writeln!(
            zone_writer,
            "id,analysis_id,zone_id,zone_name,track_id,event_type,frame_number,\
             timestamp_ms,position_x,position_y,class_name,confidence"
        )?;

        let mut crossing_writer =
            BufWriter::new(File::create(dir.join("line_crossing_events.csv"))?);
        writeln!(
            crossing_writer,
            "id,analysis_id,line_id,line_name,track_id,direction,frame_number,\
             timestamp_ms,position_x,position_y,class_name,confidence"
        )?;

        Ok(Self {
            zone_writer,
            crossing_writer,
            analysis_id: analysis_id.to_string(),
        })
    }
}

impl EventSink for CsvEventSink {
    fn record_zone_event(&mut self, event: &ZoneEvent) -> Result<(), SinkError> {
        writeln!(
            self.zone_writer,
            "event_{}_{}_{},{},{},{},{},{},{},{:.0},{:.0},{},{:.4}",
            event.stable_id,
            event.frame_number,
            event.timestamp_ms as i64,
            self.analysis_id,
            event.zone_id,
            event.zone_name,
            event.stable_id,
            event.kind.as_str(),
            event.frame_number,
            event.position.x,
            event.position.y,
            event.class_name,
            event.confidence
        )?;
        Ok(())
    }

    fn record_line_crossing(&mut self, event: &LineCrossingEvent) -> Result<(), SinkError> {
        writeln!(
            self.crossing_writer,
            "crossing_{}_{}_{},{},{},{},{},{},{},{:.0},{:.0},{},{:.4}",
            event.stable_id,
            event.frame_number,
            event.timestamp_ms as i64,
            self.analysis_id,
            event.line_id,
            event.line_name,
            event.stable_id,
            event.direction.as_str(),
            event.frame_number,
            event.position.x,
            event.position.y,
            event.class_name,
            event.confidence
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.zone_writer.flush()?;
        self.crossing_writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// Collects events in memory. Used by tests and by callers that want to
/// post-process events without touching disk.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    pub zone_events: Vec<ZoneEvent>,
    pub line_crossings: Vec<LineCrossingEvent>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MemoryEventSink {
    fn record_zone_event(&mut self, event: &ZoneEvent) -> Result<(), SinkError> {
        self.zone_events.push(event.clone());
        Ok(())
    }

    fn record_line_crossing(&mut self, event: &LineCrossingEvent) -> Result<(), SinkError> {
        self.line_crossings.push(event.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
