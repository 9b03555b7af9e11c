//! Inspect command implementation.

use super::open_log;
use serde::Serialize;
use std::path::Path;
use txlog_core::{LogFiles, SegmentStore};

/// Log inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Log directory.
    pub path: String,
    /// Lowest retained version.
    pub lowest_version: u64,
    /// Highest version, the one receiving appends.
    pub highest_version: u64,
    /// Total size of all segments in bytes.
    pub total_size: u64,
    /// Per-segment details, ascending by version.
    pub segments: Vec<SegmentInfo>,
}

/// Details for a single segment.
#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    /// Segment version.
    pub version: u64,
    /// File size in bytes.
    pub size: u64,
    /// Last transaction committed before the segment was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_committed_tx_id: Option<u64>,
    /// Header problem, if the header could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_error: Option<String>,
}

/// Runs the inspect command.
pub fn run(path: &Path, prefix: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let log = open_log(path, prefix)?;
    let result = inspect(&log)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects sizes and headers of every retained segment.
pub fn inspect(log: &LogFiles) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut segments = Vec::new();
    for version in log.versions() {
        let size = log.segment_size(version)?;
        let (last_committed_tx_id, header_error) = match log.extract_header(version) {
            Ok(header) => (Some(header.last_committed_tx_id.as_u64()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        segments.push(SegmentInfo {
            version: version.as_u64(),
            size,
            last_committed_tx_id,
            header_error,
        });
    }

    Ok(InspectResult {
        path: log.dir().display().to_string(),
        lowest_version: log.lowest_version().as_u64(),
        highest_version: log.highest_version()?.as_u64(),
        total_size: segments.iter().map(|s| s.size).sum(),
        segments,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Transaction Log Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);
    println!(
        "Versions: {} to {} ({} segments)",
        result.lowest_version,
        result.highest_version,
        result.segments.len()
    );
    println!("Total size: {}", format_size(result.total_size));
    println!();
    println!("Segments:");
    for segment in &result.segments {
        match (&segment.last_committed_tx_id, &segment.header_error) {
            (Some(tx), _) => println!(
                "  v{:<6} {:>10}  last committed before: {}",
                segment.version,
                format_size(segment.size),
                tx
            ),
            (None, Some(error)) => println!(
                "  v{:<6} {:>10}  bad header: {}",
                segment.version,
                format_size(segment.size),
                error
            ),
            (None, None) => println!("  v{:<6} {:>10}", segment.version, format_size(segment.size)),
        }
    }
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
