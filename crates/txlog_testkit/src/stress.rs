//! Stress harnesses for concurrent export.
//!
//! These run exports on several threads while a writer keeps appending and
//! rotating and a pruner keeps deleting old segments.

use crate::fixtures::TestLog;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use txlog_core::{ChannelSet, CoreError, LogVersion, TransactionId};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Exports that returned a usable channel set.
    pub successful_ops: usize,
    /// Exports whose start had already been pruned.
    pub not_found_ops: usize,
    /// Exports that failed for any other reason, or returned a bad set.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns the number of exports attempted.
    pub fn total_ops(&self) -> usize {
        self.successful_ops + self.not_found_ops + self.failed_ops
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total exports: {}", self.total_ops());
        println!("Successful: {}", self.successful_ops);
        println!("Pruned start: {}", self.not_found_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Exports performed by each exporting thread.
    pub exports_per_thread: usize,
    /// Number of exporting threads.
    pub threads: usize,
    /// Transactions the writer appends before each rotation.
    pub tx_per_segment: usize,
    /// Segments the pruner keeps behind the highest one.
    pub keep_segments: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            exports_per_thread: 200,
            threads: 4,
            tx_per_segment: 3,
            keep_segments: 2,
        }
    }
}

/// Checks that a set covers consecutive versions and reads back cleanly.
fn drain_set(mut set: ChannelSet) -> bool {
    let versions = set.versions();
    let consecutive = versions.windows(2).all(|w| w[1] == w[0].next());

    let mut readable = true;
    let mut buf = Vec::new();
    for descriptor in &mut set {
        buf.clear();
        if descriptor.channel_mut().read_to_end(&mut buf).is_err() {
            readable = false;
        }
    }
    let closed = set.close_all().is_ok();
    consecutive && readable && closed && !set.is_empty()
}

/// Exports from random recent transactions while the log is written to and
/// pruned.
///
/// A correct export path never fails with anything but `TransactionNotFound`
/// here, and leaves no readers registered once every set is closed.
pub fn stress_export_while_pruning(log: &TestLog, config: &StressConfig) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let not_found = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let done = AtomicBool::new(false);

    log.write_transactions(config.tx_per_segment);
    let start = Instant::now();

    thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                log.write_transactions(config.tx_per_segment);
                let highest = log.rotate();
                let keep_from = LogVersion::new(highest.as_u64().saturating_sub(config.keep_segments));
                log.prune(keep_from);
                thread::yield_now();
            }
        });

        let exporters: Vec<_> = (0..config.threads)
            .map(|t| {
                let (successful, not_found, failed) = (&successful, &not_found, &failed);
                s.spawn(move || {
                    let exporter = log.exporter();
                    for i in 0..config.exports_per_thread {
                        let last = log.last_tx_id().as_u64();
                        let back = ((t + i) % (config.tx_per_segment * 4)) as u64;
                        let from = TransactionId::new(last.saturating_sub(back).max(1));

                        match exporter.build_channel_set(from) {
                            Ok(set) => {
                                let counter = if drain_set(set) { successful } else { failed };
                                counter.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(CoreError::TransactionNotFound { .. }) => {
                                not_found.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(_) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in exporters {
            handle.join().expect("Exporter thread panicked");
        }
        done.store(true, Ordering::Release);
    });

    StressTestResult {
        successful_ops: successful.load(Ordering::Relaxed),
        not_found_ops: not_found.load(Ordering::Relaxed),
        failed_ops: failed.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_while_pruning() {
        let log = TestLog::new();
        let config = StressConfig {
            exports_per_thread: 50,
            threads: 4,
            ..Default::default()
        };

        let result = stress_export_while_pruning(&log, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops(), 200);
        assert!(result.successful_ops > 0);
        assert_eq!(log.registry().total_readers(), 0);
    }
}
