//! Export against concurrent pruning and rotation.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use txlog_core::{LogVersion, TransactionId, TransactionIndex};
use txlog_testkit::{MockTransactionIndex, TestLog};

fn gated_exporter(log: &TestLog) -> (Arc<MockTransactionIndex>, txlog_core::TransactionLogExporter) {
    let index = Arc::new(MockTransactionIndex::from_positions(log.positions()));
    let exporter = log.exporter_with(Arc::clone(&index) as Arc<dyn TransactionIndex>);
    (index, exporter)
}

#[test]
fn test_pruning_blocked_while_building() {
    let log = TestLog::with_layout(&[1, 1, 1]);
    let (index, exporter) = gated_exporter(&log);
    let gate = index.install_gate();

    thread::scope(|s| {
        let build = s.spawn(|| exporter.build_channel_set(TransactionId::new(1)).unwrap());

        gate.wait_entered();
        assert!(log.retention_lock().is_locked());
        let prune = s.spawn(|| log.log().prune_up_to(LogVersion::new(2)).unwrap());

        thread::sleep(Duration::from_millis(50));
        assert!(!prune.is_finished());
        assert_eq!(log.versions().len(), 3);

        gate.release();
        let mut set = build.join().unwrap();
        let report = prune.join().unwrap();

        // The build registered every segment before the pruner got the lock.
        assert!(report.deleted.is_empty());
        assert_eq!(report.retained_in_use, Some(LogVersion::new(0)));
        assert_eq!(set.len(), 3);
        set.close_all().unwrap();
    });
}

#[test]
fn test_rotation_during_build_is_not_waited_for() {
    let log = TestLog::with_layout(&[2, 2]);
    let (index, exporter) = gated_exporter(&log);
    let gate = index.install_gate();

    thread::scope(|s| {
        let build = s.spawn(|| exporter.build_channel_set(TransactionId::new(3)).unwrap());

        gate.wait_entered();
        // Rotation does not take the retention lock.
        let newer = log.rotate();
        log.write_transaction();
        gate.release();

        let mut set = build.join().unwrap();
        let versions = set.versions();
        assert_eq!(versions.first(), Some(&LogVersion::new(1)));
        assert_eq!(versions.last(), Some(&newer));
        set.close_all().unwrap();
    });

    let newest = log.rotate();
    let mut set = exporter.build_channel_set(TransactionId::new(3)).unwrap();
    assert_eq!(set.versions().last(), Some(&newest));
    set.close_all().unwrap();
}

#[test]
fn test_concurrent_builds_are_independent() {
    let log = TestLog::with_layout(&[2, 2, 2, 2]);

    thread::scope(|s| {
        let handles: Vec<_> = (1..=8)
            .map(|tx| {
                let exporter = log.exporter();
                s.spawn(move || {
                    let mut set = exporter.build_channel_set(TransactionId::new(tx)).unwrap();
                    let versions = set.versions();
                    set.close_all().unwrap();
                    versions
                })
            })
            .collect();

        for (tx, handle) in (1u64..).zip(handles) {
            let versions = handle.join().unwrap();
            assert_eq!(versions.first(), Some(&LogVersion::new((tx - 1) / 2)));
            assert_eq!(versions.last(), Some(&LogVersion::new(3)));
        }
    });

    assert_eq!(log.registry().total_readers(), 0);
}

#[test]
fn test_readers_outlive_the_lock() {
    let log = TestLog::with_layout(&[1, 1, 1]);
    let mut set = log.exporter().build_channel_set(TransactionId::new(2)).unwrap();
    assert!(!log.retention_lock().is_locked());

    let pruner = {
        let log = Arc::clone(log.log());
        thread::spawn(move || log.prune_up_to(LogVersion::new(2)).unwrap())
    };
    let report = pruner.join().unwrap();
    assert_eq!(report.deleted, vec![LogVersion::new(0)]);
    assert!(log.log().segment_path(LogVersion::new(1)).exists());

    set.close_all().unwrap();
}
