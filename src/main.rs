// src/main.rs

mod config;
mod geometry;
mod line_crossing;
mod session;
mod sink;
mod stabilizer;
mod trajectory;
mod types;
mod zone_membership;
mod zones;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use session::TrackingSession;
use sink::{CsvEventSink, EventSink, JsonlEventSink};
use types::{Config, FrameDetections, SessionSummary, SinkFormat};
use zones::load_zones;

fn main() -> Result<()> {
    let config = Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("zone_tracking={}", config.logging.level))
        .init();

    info!("📍 Zone tracking analysis starting");
    info!(
        "Tracking policy: {:?} (qualify_frames={}), dedup: {:?}",
        config.tracking.id_policy, config.tracking.qualify_frames, config.tracking.crossing_dedup
    );

    let zones = load_zones(Path::new(&config.input.zones_file))?;
    if zones.is_empty() {
        error!("No valid zones in {}", config.input.zones_file);
        return Ok(());
    }

    let captures = find_capture_files(&config.input.captures_dir);
    if captures.is_empty() {
        error!("No capture files found in {}", config.input.captures_dir);
        return Ok(());
    }
    info!("Found {} capture file(s) to process", captures.len());

    for (idx, capture_path) in captures.iter().enumerate() {
        info!("========================================");
        info!(
            "Processing capture {}/{}: {}",
            idx + 1,
            captures.len(),
            capture_path.display()
        );

        match process_capture(capture_path, &zones, &config) {
            Ok(summary) => report_summary(&summary),
            Err(e) => error!("Capture failed: {:#}", e),
        }
    }

    Ok(())
}

fn find_capture_files(dir: &str) -> Vec<PathBuf> {
    let mut captures: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    captures.sort();
    captures
}

/// Replay one detection capture through a fresh session.
fn process_capture(path: &Path, zones: &zones::ZoneSet, config: &Config) -> Result<SessionSummary> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("capture");

    let mut sink: Box<dyn EventSink> = match config.output.format {
        SinkFormat::Jsonl => {
            let out = PathBuf::from(&config.output.dir).join(format!("{}_events.jsonl", stem));
            info!("Events → {}", out.display());
            Box::new(JsonlEventSink::create(&out)?)
        }
        SinkFormat::Csv => {
            let out = PathBuf::from(&config.output.dir).join(stem);
            info!("Events → {}", out.display());
            Box::new(CsvEventSink::create(&out, stem)?)
        }
    };

    let mut session = TrackingSession::new(zones.clone(), config.tracking.clone());

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameDetections = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping malformed frame at line {}: {}", line_no + 1, e);
                continue;
            }
        };
        let stats = session.process_frame(&frame, sink.as_mut());
        if stats.zone_events > 0 || stats.line_crossings > 0 {
            info!(
                "Frame {}: {} zone event(s), {} crossing(s)",
                frame.frame_number, stats.zone_events, stats.line_crossings
            );
        }
    }

    if let Err(e) = sink.flush() {
        warn!("Final sink flush failed: {}", e);
    }

    Ok(session.summary())
}

fn report_summary(summary: &SessionSummary) {
    info!("✓ Capture processed");
    info!("  Frames processed: {}", summary.frames_processed);
    info!("  Unique confirmed entities: {}", summary.unique_entities);
    info!(
        "  Zone events: {} enter / {} exit",
        summary.zone_enters, summary.zone_exits
    );
    info!("  Line crossings: {}", summary.line_crossings);
    for (direction, count) in &summary.crossings_by_direction {
        info!("    {}: {}", direction, count);
    }
    info!(
        "  Currently in zones: {} | crossed a line: {}",
        summary.entities_in_zones, summary.entities_crossed_lines
    );
}
