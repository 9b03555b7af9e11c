//! Export command implementation.
//!
//! Segment headers only locate the first transaction of each segment, so the
//! export begins at the start of the segment holding the requested
//! transaction. Each channel is copied into `<out>/<prefix>.<version>`. The
//! first file starts after its header; the others are whole segments, header
//! included. An `export.json` manifest records the requested transaction,
//! the one the export actually starts from, and where each file starts.

use super::inspect::format_size;
use super::open_log;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use txlog_core::{
    CoreError, HeaderIndex, LogFiles, SegmentStore, TransactionId, TransactionLogExporter,
};

/// Name of the manifest written next to the exported files.
pub const MANIFEST_FILE: &str = "export.json";

/// Summary of an export.
#[derive(Debug, Serialize)]
pub struct ExportManifest {
    /// Transaction asked for on the command line.
    pub requested_tx_id: u64,
    /// First transaction of the segment holding the requested one, where the
    /// exported bytes start.
    pub from_tx_id: u64,
    /// Exported files, ascending by version.
    pub files: Vec<ExportedFile>,
}

/// One exported segment.
#[derive(Debug, Serialize)]
pub struct ExportedFile {
    /// File name inside the output directory.
    pub name: String,
    /// Segment version.
    pub version: u64,
    /// First transaction the file covers.
    pub start_tx_id: u64,
    /// Offset in the segment where the copy began.
    pub start_offset: u64,
    /// Bytes copied.
    pub bytes: u64,
}

/// Runs the export command.
pub fn run(
    path: &Path,
    prefix: &str,
    from_tx: TransactionId,
    last_tx: Option<TransactionId>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Exporting {:?} from {} to {:?}", path, from_tx, out);

    let log = Arc::new(open_log(path, prefix)?);
    let manifest = export(log, from_tx, last_tx, out)?;

    let total: u64 = manifest.files.iter().map(|f| f.bytes).sum();
    println!("✓ Export complete");
    println!("  Requested: {}", manifest.requested_tx_id);
    println!("  From: {}", manifest.from_tx_id);
    println!("  Files: {}", manifest.files.len());
    for file in &manifest.files {
        println!(
            "    {} (from {}, {})",
            file.name,
            file.start_tx_id,
            format_size(file.bytes)
        );
    }
    println!("  Total: {}", format_size(total));

    Ok(())
}

/// Copies the log from the segment holding `from_tx` onward into `out` and
/// writes the manifest.
///
/// `last_tx` is the newest committed transaction, when known. Without it,
/// only ids up to the first transaction of the highest segment are accepted.
/// Every channel is closed before returning, on success and on failure.
///
/// # Errors
///
/// Fails with [`CoreError::TransactionNotFound`] if `from_tx` was pruned or
/// is newer than the newest transaction. Nothing is written in that case.
pub fn export(
    log: Arc<LogFiles>,
    from_tx: TransactionId,
    last_tx: Option<TransactionId>,
    out: &Path,
) -> Result<ExportManifest, Box<dyn std::error::Error>> {
    if from_tx == TransactionId::NONE {
        return Err(CoreError::invalid_argument("transaction id must be positive").into());
    }

    let store = Arc::clone(&log) as Arc<dyn SegmentStore>;
    let mut index = HeaderIndex::new(store);
    if let Some(last) = last_tx {
        index = index.with_last_committed(last);
    }
    let (version, start) = index
        .segment_start_of(from_tx)
        .map_err(|e| CoreError::from_index(from_tx, e))?;
    info!(requested = %from_tx, %start, %version, "resolved export start");

    let exporter = TransactionLogExporter::for_log_files(Arc::clone(&log), Arc::new(index));
    let mut set = exporter.build_channel_set(start)?;

    fs::create_dir_all(out)?;
    let copied = copy_channels(&log, &mut set, out);
    let closed = set.close_all();
    let files = copied?;
    closed?;

    let manifest = ExportManifest {
        requested_tx_id: from_tx.as_u64(),
        from_tx_id: start.as_u64(),
        files,
    };
    let mut file = File::create(out.join(MANIFEST_FILE))?;
    serde_json::to_writer_pretty(&mut file, &manifest)?;
    file.write_all(b"\n")?;
    file.sync_all()?;

    Ok(manifest)
}

fn copy_channels(
    log: &LogFiles,
    set: &mut txlog_core::ChannelSet,
    out: &Path,
) -> Result<Vec<ExportedFile>, Box<dyn std::error::Error>> {
    let mut files = Vec::with_capacity(set.len());
    for descriptor in set {
        let version = descriptor.version();
        let start_tx_id = descriptor.start_tx_id().as_u64();
        let name = log.config().segment_file_name(version.as_u64());

        let channel = descriptor.channel_mut();
        let start_offset = channel.position()?;
        let mut file = File::create(out.join(&name))?;
        let bytes = io::copy(channel, &mut file)?;
        file.sync_all()?;

        files.push(ExportedFile {
            name,
            version: version.as_u64(),
            start_tx_id,
            start_offset,
            bytes,
        });
    }
    Ok(files)
}
