//! Directory-backed segment store.
//!
//! This module handles the file system layout of a transaction log:
//!
//! ```text
//! <log_dir>/
//! ├─ txlog.0          # oldest retained segment
//! ├─ txlog.1
//! └─ txlog.N          # current segment, receives appends
//! ```
//!
//! Each file starts with a [`SegmentHeader`]. New segments are written to a
//! temporary file and renamed into place, so a segment name never refers to a
//! half-written header.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::retention::RetentionLock;
use crate::segment::header::{SegmentHeader, HEADER_SIZE};
use crate::segment::registry::{ReaderId, ReaderRegistry};
use crate::segment::store::SegmentStore;
use crate::types::{LogPosition, LogVersion, TransactionId};
use parking_lot::RwLock;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use txlog_storage::{FileChannel, SegmentAppender, SegmentChannel};

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Versions whose files were deleted, ascending.
    pub deleted: Vec<LogVersion>,
    /// First version that was eligible but kept because a reader holds it.
    pub retained_in_use: Option<LogVersion>,
}

struct LogState {
    lowest: LogVersion,
    highest: LogVersion,
    current: SegmentAppender,
}

/// Transaction log segments stored as numbered files in one directory.
///
/// # Thread Safety
///
/// `LogFiles` is `Send + Sync`. Appends and rotation serialize on an internal
/// lock; reads open independent file handles. Pruning additionally holds the
/// shared [`RetentionLock`].
pub struct LogFiles {
    dir: PathBuf,
    config: Config,
    retention: RetentionLock,
    registry: ReaderRegistry,
    state: RwLock<LogState>,
}

impl LogFiles {
    /// Opens the log directory with a fresh retention lock.
    ///
    /// # Errors
    ///
    /// See [`LogFiles::open_with_lock`].
    pub fn open(dir: &Path, config: Config) -> CoreResult<Self> {
        Self::open_with_lock(dir, config, RetentionLock::new())
    }

    /// Opens the log directory, sharing `retention` with other components.
    ///
    /// If the directory holds no segments and `create_if_missing` is set,
    /// segment 0 is created with an empty last-committed transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory (or its segments) is missing and `create_if_missing` is false
    /// - The retained versions are not contiguous
    /// - I/O errors occur
    pub fn open_with_lock(dir: &Path, config: Config, retention: RetentionLock) -> CoreResult<Self> {
        if !dir.exists() {
            if !config.create_if_missing {
                return Err(CoreError::invalid_argument(format!(
                    "log directory does not exist: {}",
                    dir.display()
                )));
            }
            fs::create_dir_all(dir)?;
        }
        if !dir.is_dir() {
            return Err(CoreError::invalid_argument(format!(
                "path is not a directory: {}",
                dir.display()
            )));
        }

        let versions = scan_versions(dir, &config)?;
        let (lowest, highest) = match (versions.first(), versions.last()) {
            (Some(&lowest), Some(&highest)) => (lowest, highest),
            _ if config.create_if_missing => {
                let first = LogVersion::new(0);
                write_segment(dir, &config, SegmentHeader::new(first, TransactionId::NONE))?;
                info!(dir = %dir.display(), "created initial log segment");
                (first, first)
            }
            _ => {
                return Err(CoreError::invalid_argument(format!(
                    "no log segments found in {}",
                    dir.display()
                )));
            }
        };

        let current = SegmentAppender::open(&dir.join(config.segment_file_name(highest.as_u64())))?;
        debug!(dir = %dir.display(), %lowest, %highest, "opened log files");

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            retention,
            registry: ReaderRegistry::new(),
            state: RwLock::new(LogState {
                lowest,
                highest,
                current,
            }),
        })
    }

    /// Returns the log directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the configuration the log was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the retention lock shared with pruning and export.
    #[must_use]
    pub fn retention_lock(&self) -> &RetentionLock {
        &self.retention
    }

    /// Returns the reader registry.
    #[must_use]
    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Returns the path of the segment file for `version`.
    #[must_use]
    pub fn segment_path(&self, version: LogVersion) -> PathBuf {
        self.dir.join(self.config.segment_file_name(version.as_u64()))
    }

    /// Returns the oldest retained version.
    #[must_use]
    pub fn lowest_version(&self) -> LogVersion {
        self.state.read().lowest
    }

    /// Returns every retained version, ascending.
    #[must_use]
    pub fn versions(&self) -> Vec<LogVersion> {
        let state = self.state.read();
        state.lowest.through(state.highest).collect()
    }

    /// Returns the size in bytes of the segment for `version`.
    ///
    /// # Errors
    ///
    /// Returns `SegmentMissing` if there is no such segment.
    pub fn segment_size(&self, version: LogVersion) -> CoreResult<u64> {
        let metadata = fs::metadata(self.segment_path(version))
            .map_err(|e| missing_or_io(e, version))?;
        Ok(metadata.len())
    }

    /// Appends raw transaction bytes to the current segment.
    ///
    /// Returns the position where the bytes begin.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn append(&self, data: &[u8]) -> CoreResult<LogPosition> {
        let state = self.state.read();
        let offset = state.current.append(data)?;
        if self.config.sync_on_append {
            state.current.sync()?;
        }
        Ok(LogPosition::new(state.highest, offset))
    }

    /// Starts a new segment whose header records `last_committed`.
    ///
    /// Returns the version of the new segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the new segment cannot be written.
    pub fn rotate(&self, last_committed: TransactionId) -> CoreResult<LogVersion> {
        let mut state = self.state.write();
        state.current.flush()?;

        let next = state.highest.next();
        let path = write_segment(&self.dir, &self.config, SegmentHeader::new(next, last_committed))?;
        state.current = SegmentAppender::open(&path)?;
        state.highest = next;

        info!(version = %next, last_committed = %last_committed, "rotated transaction log");
        Ok(next)
    }

    /// Deletes segments older than `keep_from`.
    ///
    /// Holds the retention lock for the whole pass. Stops at the first version
    /// that still has registered readers so the retained range stays
    /// contiguous. The highest segment is never deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment file cannot be removed.
    pub fn prune_up_to(&self, keep_from: LogVersion) -> CoreResult<PruneReport> {
        let _retention = self.retention.lock();
        let mut report = PruneReport::default();

        loop {
            let (lowest, highest) = {
                let state = self.state.read();
                (state.lowest, state.highest)
            };
            if lowest >= keep_from || lowest >= highest {
                break;
            }
            if self.registry.has_readers(lowest) {
                debug!(version = %lowest, "segment in use, pruning stops");
                report.retained_in_use = Some(lowest);
                break;
            }

            match fs::remove_file(self.segment_path(lowest)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(version = %lowest, "segment already gone while pruning");
                }
                Err(e) => return Err(e.into()),
            }
            self.state.write().lowest = lowest.next();
            report.deleted.push(lowest);
        }

        if !report.deleted.is_empty() {
            sync_directory(&self.dir)?;
            info!(deleted = report.deleted.len(), lowest = %self.lowest_version(), "pruned transaction log");
        }
        Ok(report)
    }

    fn check_retained(&self, version: LogVersion) -> CoreResult<()> {
        let state = self.state.read();
        if version < state.lowest || version > state.highest {
            return Err(CoreError::SegmentMissing { version });
        }
        Ok(())
    }
}

impl SegmentStore for LogFiles {
    fn highest_version(&self) -> CoreResult<LogVersion> {
        Ok(self.state.read().highest)
    }

    fn open_for_read(&self, version: LogVersion) -> CoreResult<Box<dyn SegmentChannel>> {
        self.check_retained(version)?;
        let channel = FileChannel::open(&self.segment_path(version)).map_err(|e| match e {
            txlog_storage::StorageError::Io(io) => missing_or_io(io, version),
            other => other.into(),
        })?;
        Ok(Box::new(channel))
    }

    fn extract_header(&self, version: LogVersion) -> CoreResult<SegmentHeader> {
        let mut channel = self.open_for_read(version)?;
        let header = SegmentHeader::read_from(channel.as_mut());
        channel.close()?;
        header?.expect_version(version)
    }

    fn register_reader(&self, version: LogVersion, reader: ReaderId) -> CoreResult<()> {
        if !self.registry.register(version, reader) {
            warn!(%version, %reader, "reader registered twice");
        }
        Ok(())
    }

    fn unregister_reader(&self, version: LogVersion, reader: ReaderId) -> CoreResult<()> {
        if !self.registry.unregister(version, reader) {
            debug!(%version, %reader, "reader was not registered");
        }
        Ok(())
    }

    fn has_readers(&self, version: LogVersion) -> bool {
        self.registry.has_readers(version)
    }
}

impl std::fmt::Debug for LogFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LogFiles")
            .field("dir", &self.dir)
            .field("lowest", &state.lowest)
            .field("highest", &state.highest)
            .field("readers", &self.registry.total_readers())
            .finish_non_exhaustive()
    }
}

fn missing_or_io(e: io::Error, version: LogVersion) -> CoreError {
    if e.kind() == io::ErrorKind::NotFound {
        CoreError::SegmentMissing { version }
    } else {
        CoreError::Io(e)
    }
}

/// Lists segment versions in `dir`, ascending, and checks they are contiguous.
fn scan_versions(dir: &Path, config: &Config) -> CoreResult<Vec<LogVersion>> {
    let mut versions = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(version) = name.to_str().and_then(|n| config.parse_segment_file_name(n)) {
            versions.push(LogVersion::new(version));
        }
    }
    versions.sort_unstable();

    for pair in versions.windows(2) {
        if pair[1] != pair[0].next() {
            return Err(CoreError::segment_corruption(format!(
                "log segments are not contiguous: {} is followed by {}",
                pair[0], pair[1]
            )));
        }
    }
    Ok(versions)
}

/// Writes a new segment containing only its header.
///
/// Uses write-then-rename so the final name only ever holds a complete header:
/// 1. Write the header to `<name>.tmp`
/// 2. Sync the temporary file (if configured)
/// 3. Rename it into place
/// 4. Sync the directory
fn write_segment(dir: &Path, config: &Config, header: SegmentHeader) -> CoreResult<PathBuf> {
    let name = config.segment_file_name(header.log_version.as_u64());
    let final_path = dir.join(&name);
    let temp_path = dir.join(format!("{name}.tmp"));

    if final_path.exists() {
        return Err(CoreError::segment_corruption(format!(
            "segment {} already exists",
            header.log_version
        )));
    }
    if temp_path.exists() {
        fs::remove_file(&temp_path)?;
    }

    let appender = SegmentAppender::create(&temp_path)?;
    let offset = appender.append(&header.encode())?;
    debug_assert_eq!(offset, 0);
    debug_assert_eq!(appender.size(), HEADER_SIZE as u64);
    if config.sync_on_rotate {
        appender.sync()?;
    }
    drop(appender);

    fs::rename(&temp_path, &final_path)?;
    if config.sync_on_rotate {
        sync_directory(dir)?;
    }
    Ok(final_path)
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> CoreResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> CoreResult<()> {
    // Directory fsync is not available; NTFS journals metadata.
    Ok(())
}
