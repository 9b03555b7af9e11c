//! Transaction log configuration.

/// Configuration for opening a log directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the log directory (and segment 0) if missing.
    pub create_if_missing: bool,

    /// File name prefix for segments; files are named `<prefix>.<version>`.
    pub file_prefix: String,

    /// Whether to sync a new segment's header to disk on rotation.
    pub sync_on_rotate: bool,

    /// Whether to sync after every append.
    pub sync_on_append: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            file_prefix: String::from("txlog"),
            sync_on_rotate: true,
            sync_on_append: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the log directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the segment file name prefix.
    #[must_use]
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Sets whether to sync new segments on rotation.
    #[must_use]
    pub const fn sync_on_rotate(mut self, value: bool) -> Self {
        self.sync_on_rotate = value;
        self
    }

    /// Sets whether to sync after every append.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Returns the file name for a segment version.
    #[must_use]
    pub fn segment_file_name(&self, version: u64) -> String {
        format!("{}.{}", self.file_prefix, version)
    }

    /// Parses a segment version from a file name, if it matches the prefix.
    #[must_use]
    pub fn parse_segment_file_name(&self, name: &str) -> Option<u64> {
        let rest = name.strip_prefix(self.file_prefix.as_str())?;
        let digits = rest.strip_prefix('.')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_rotate);
        assert!(!config.sync_on_append);
        assert_eq!(config.file_prefix, "txlog");
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .file_prefix("wal.segment")
            .sync_on_append(true);

        assert!(!config.create_if_missing);
        assert!(config.sync_on_append);
        assert_eq!(config.segment_file_name(7), "wal.segment.7");
    }

    #[test]
    fn segment_file_names_round_trip() {
        let config = Config::default();
        assert_eq!(config.segment_file_name(12), "txlog.12");
        assert_eq!(config.parse_segment_file_name("txlog.12"), Some(12));
    }

    #[test]
    fn foreign_file_names_are_ignored() {
        let config = Config::default();
        assert_eq!(config.parse_segment_file_name("txlog"), None);
        assert_eq!(config.parse_segment_file_name("txlog."), None);
        assert_eq!(config.parse_segment_file_name("txlog.1.tmp"), None);
        assert_eq!(config.parse_segment_file_name("txlogx.1"), None);
        assert_eq!(config.parse_segment_file_name("LOCK"), None);
    }
}
