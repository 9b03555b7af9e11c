//! CLI command implementations.

pub mod export;
pub mod inspect;

use std::path::Path;
use txlog_core::{Config, LogFiles};

/// Opens an existing log directory; never creates one.
pub fn open_log(path: &Path, prefix: &str) -> Result<LogFiles, Box<dyn std::error::Error>> {
    let config = Config::new()
        .create_if_missing(false)
        .file_prefix(prefix)
        .sync_on_rotate(false);
    Ok(LogFiles::open(path, config)?)
}
