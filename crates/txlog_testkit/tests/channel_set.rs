//! Channel set construction over on-disk segments.

use std::io::{Read, Seek, SeekFrom};
use txlog_core::{CoreError, LogVersion, TransactionId, HEADER_SIZE};
use txlog_testkit::{tx_payload, TestLog};

fn read_all(set: &mut txlog_core::ChannelSet) -> Vec<Vec<u8>> {
    set.iter_mut()
        .map(|descriptor| {
            let mut out = Vec::new();
            descriptor.channel_mut().read_to_end(&mut out).unwrap();
            out
        })
        .collect()
}

#[test]
fn test_one_channel_per_segment_in_order() {
    let log = TestLog::with_layout(&[2, 2, 2, 2]);

    for (tx, first_version) in [(1, 0), (3, 1), (4, 1), (8, 3)] {
        let mut set = log.exporter().build_channel_set(TransactionId::new(tx)).unwrap();
        let expected: Vec<_> = LogVersion::new(first_version)
            .through(LogVersion::new(3))
            .collect();

        assert_eq!(set.len(), 4 - first_version as usize);
        assert_eq!(set.versions(), expected);
        set.close_all().unwrap();
    }
}

#[test]
fn test_first_channel_starts_at_transaction() {
    let log = TestLog::with_layout(&[3, 3]);
    let tx = TransactionId::new(2);
    let position = log.position_of(tx).unwrap();

    let mut set = log.exporter().build_channel_set(tx).unwrap();
    assert_eq!(
        set.descriptors()[0].channel().position().unwrap(),
        position.byte_offset
    );
    assert_eq!(set.descriptors()[1].channel().position().unwrap(), 0);

    let contents = read_all(&mut set);
    assert_eq!(contents[0], b"tx-2;tx-3;");
    assert_eq!(&contents[1][HEADER_SIZE..], b"tx-4;tx-5;tx-6;");
    set.close_all().unwrap();
}

#[test]
fn test_start_tx_ids_follow_headers() {
    let log = TestLog::with_layout(&[2, 3, 1]);
    let mut set = log.exporter().build_channel_set(TransactionId::new(2)).unwrap();

    // v1 was created after tx 2 committed, v2 after tx 5.
    assert_eq!(
        set.start_tx_ids(),
        vec![TransactionId::new(2), TransactionId::new(2), TransactionId::new(5)]
    );
    set.close_all().unwrap();
}

#[test]
fn test_consecutive_segments_join_without_gaps() {
    let log = TestLog::with_layout(&[2, 3, 1, 4]);
    let mut set = log.exporter().build_channel_set(TransactionId::new(1)).unwrap();
    let contents = read_all(&mut set);

    let mut joined = Vec::new();
    for (i, bytes) in contents.iter().enumerate() {
        let body = if i == 0 { bytes.as_slice() } else { &bytes[HEADER_SIZE..] };
        joined.extend_from_slice(body);
    }
    let expected: Vec<u8> = (1..=10)
        .flat_map(|tx| tx_payload(TransactionId::new(tx)))
        .collect();

    assert_eq!(joined, expected);
    set.close_all().unwrap();
}

#[test]
fn test_segments_unchanged_by_export() {
    let log = TestLog::with_layout(&[2, 2, 2]);
    let before = log.snapshot();

    let mut set = log.exporter().build_channel_set(TransactionId::new(3)).unwrap();
    let _ = read_all(&mut set);
    for descriptor in &mut set {
        descriptor.channel_mut().seek(SeekFrom::Start(0)).unwrap();
    }
    let _ = read_all(&mut set);
    set.close_all().unwrap();

    assert_eq!(log.snapshot(), before);
}

#[test]
fn test_zero_transaction_id() {
    let log = TestLog::with_layout(&[1]);
    let err = log.exporter().build_channel_set(TransactionId::NONE).unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument { .. }));
}

#[test]
fn test_unknown_transaction_carries_id() {
    let log = TestLog::with_layout(&[2, 2]);
    let err = log.exporter().build_channel_set(TransactionId::new(42)).unwrap_err();

    assert!(matches!(err, CoreError::TransactionNotFound { tx_id } if tx_id == TransactionId::new(42)));
    assert!(err.to_string().contains("42"));
    assert_eq!(log.registry().total_readers(), 0);
}

#[test]
fn test_double_close_deregisters_once() {
    let log = TestLog::with_layout(&[1, 1]);
    let mut set = log.exporter().build_channel_set(TransactionId::new(1)).unwrap();
    let other = log.exporter().build_channel_set(TransactionId::new(1)).unwrap();
    assert_eq!(log.registry().reader_count(LogVersion::new(0)), 2);

    let channel = set.descriptors_mut()[0].channel_mut();
    channel.close().unwrap();
    channel.close().unwrap();

    assert_eq!(log.registry().reader_count(LogVersion::new(0)), 1);
    drop(other);
    set.close_all().unwrap();
    assert_eq!(log.registry().total_readers(), 0);
}

#[test]
fn test_rotation_after_build_is_not_included() {
    let log = TestLog::with_layout(&[2, 2]);
    let mut set = log.exporter().build_channel_set(TransactionId::new(1)).unwrap();

    let newer = log.rotate();
    log.write_transaction();

    assert_eq!(set.versions(), vec![LogVersion::new(0), LogVersion::new(1)]);
    assert!(!log.registry().has_readers(newer));
    set.close_all().unwrap();
}

#[test]
fn test_header_index_exports_from_segment_start() {
    let log = TestLog::with_layout(&[2, 2, 2]);
    let mut set = log.header_exporter().build_channel_set(TransactionId::new(3)).unwrap();

    assert_eq!(set.versions(), vec![LogVersion::new(1), LogVersion::new(2)]);
    assert_eq!(set.descriptors()[0].start_tx_id(), TransactionId::new(3));
    let contents = read_all(&mut set);
    assert_eq!(contents[0], b"tx-3;tx-4;");
    set.close_all().unwrap();
}

#[test]
fn test_header_index_rejects_ids_it_cannot_place() {
    let log = TestLog::with_layout(&[2, 1]);
    let exporter = log.header_exporter();

    for tx in [2, 4, 999] {
        let err = exporter.build_channel_set(TransactionId::new(tx)).unwrap_err();
        assert!(
            matches!(err, CoreError::TransactionNotFound { tx_id } if tx_id == TransactionId::new(tx)),
            "tx {tx}: {err}"
        );
    }
    assert_eq!(log.registry().total_readers(), 0);

    let mut set = exporter.build_channel_set(TransactionId::new(3)).unwrap();
    assert_eq!(set.versions(), vec![LogVersion::new(1)]);
    assert_eq!(read_all(&mut set)[0], b"tx-3;");
    set.close_all().unwrap();
}

#[test]
fn test_pruning_waits_for_exported_readers() {
    let log = TestLog::with_layout(&[1, 1, 1, 1]);
    let mut set = log.exporter().build_channel_set(TransactionId::new(2)).unwrap();

    let report = log.log().prune_up_to(LogVersion::new(3)).unwrap();
    assert_eq!(report.deleted, vec![LogVersion::new(0)]);
    assert_eq!(report.retained_in_use, Some(LogVersion::new(1)));

    let contents = read_all(&mut set);
    assert_eq!(contents[0], b"tx-2;");
    set.close_all().unwrap();

    let report = log.log().prune_up_to(LogVersion::new(3)).unwrap();
    assert_eq!(report.deleted, vec![LogVersion::new(1), LogVersion::new(2)]);
}
