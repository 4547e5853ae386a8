//! Tests for inbound reassembly ordering, duplicates, conflicts and eviction.

use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use crate::{
    ResourcePath,
    fragment::{
        FragmentIndex,
        Fragmenter,
        ReassemblyConflict,
        ReassemblyStatus,
        Reassembler,
        TransferKey,
    },
    message::Fragment,
};

const PEER: u32 = 0x0a1b_2c3d;
const OTHER_PEER: u32 = 0x0a1b_2c3e;

fn path(value: &str) -> ResourcePath { ResourcePath::new(value).expect("valid path") }

fn index(value: u8) -> FragmentIndex { FragmentIndex::new(value).expect("index in range") }

fn fragment(seq: u8, total: u8, data: &str) -> Fragment {
    Fragment {
        path: path("/index.html"),
        seq: index(seq),
        total: index(total),
        data: data.to_owned(),
    }
}

fn incomplete(received: usize, total: u8) -> ReassemblyStatus {
    ReassemblyStatus::Incomplete {
        received,
        total: index(total),
    }
}

#[fixture]
fn reassembler() -> Reassembler<u32> { Reassembler::new(Duration::from_secs(30)) }

#[rstest]
fn reassembler_completes_480_byte_document_out_of_order(mut reassembler: Reassembler<u32>) {
    let content = "q".repeat(480);
    let batch = Fragmenter::new()
        .fragment(&path("/index.html"), content.as_bytes())
        .expect("fragment content");
    let fragments = batch.into_fragments();

    let mut statuses = Vec::new();
    for seq in [3_usize, 1, 4, 2] {
        statuses.push(reassembler.ingest(&PEER, fragments[seq - 1].clone()));
    }

    assert_eq!(
        statuses,
        vec![
            incomplete(1, 4),
            incomplete(2, 4),
            incomplete(3, 4),
            ReassemblyStatus::Complete(content.into_bytes()),
        ]
    );
    assert_eq!(reassembler.buffered_len(), 0);
}

#[rstest]
fn single_fragment_completes_immediately(mut reassembler: Reassembler<u32>) {
    let status = reassembler.ingest(&PEER, fragment(1, 1, "<html></html>"));
    assert_eq!(status, ReassemblyStatus::Complete(b"<html></html>".to_vec()));
    assert!(!reassembler.contains(&PEER, &path("/index.html")));
}

#[rstest]
fn empty_fragment_reassembles_to_empty_content(mut reassembler: Reassembler<u32>) {
    let status = reassembler.ingest(&PEER, fragment(1, 1, ""));
    assert_eq!(status, ReassemblyStatus::Complete(Vec::new()));
}

#[rstest]
fn identical_duplicate_is_a_no_op(mut reassembler: Reassembler<u32>) {
    assert_eq!(reassembler.ingest(&PEER, fragment(1, 3, "a")), incomplete(1, 3));
    assert_eq!(reassembler.ingest(&PEER, fragment(1, 3, "a")), incomplete(1, 3));
    assert_eq!(reassembler.ingest(&PEER, fragment(2, 3, "b")), incomplete(2, 3));
    assert_eq!(reassembler.ingest(&PEER, fragment(2, 3, "b")), incomplete(2, 3));
    assert_eq!(
        reassembler.ingest(&PEER, fragment(3, 3, "c")),
        ReassemblyStatus::Complete(b"abc".to_vec())
    );
}

#[rstest]
fn duplicate_with_different_data_discards_buffer(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(1, 3, "a"));
    reassembler.ingest(&PEER, fragment(2, 3, "b"));

    let status = reassembler.ingest(&PEER, fragment(2, 3, "B"));

    assert_eq!(
        status,
        ReassemblyStatus::Conflict(ReassemblyConflict::DataMismatch { seq: index(2) })
    );
    assert!(!reassembler.contains(&PEER, &path("/index.html")));
    assert_eq!(reassembler.progress(&PEER, &path("/index.html")), None);
}

#[rstest]
fn total_mismatch_discards_buffer(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(1, 3, "a"));

    let status = reassembler.ingest(&PEER, fragment(2, 4, "b"));

    assert_eq!(
        status,
        ReassemblyStatus::Conflict(ReassemblyConflict::TotalMismatch {
            expected: index(3),
            found: index(4),
        })
    );
    assert_eq!(reassembler.buffered_len(), 0);

    // A fresh transfer for the same key starts from scratch.
    assert_eq!(reassembler.ingest(&PEER, fragment(1, 4, "a")), incomplete(1, 4));
}

#[rstest]
fn sequence_beyond_total_is_a_conflict(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(1, 2, "a"));
    let stray = Fragment {
        seq: index(5),
        ..fragment(1, 2, "x")
    };
    assert!(matches!(
        reassembler.ingest(&PEER, stray),
        ReassemblyStatus::Conflict(ReassemblyConflict::SequenceOutOfRange { .. })
    ));
}

#[rstest]
fn conflicts_are_isolated_per_key(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(1, 2, "a"));
    reassembler.ingest(&OTHER_PEER, fragment(1, 2, "a"));
    let other_path = Fragment {
        path: path("/about.html"),
        ..fragment(1, 2, "z")
    };
    reassembler.ingest(&PEER, other_path);

    reassembler.ingest(&PEER, fragment(1, 2, "conflicting"));

    assert!(!reassembler.contains(&PEER, &path("/index.html")));
    assert!(reassembler.contains(&OTHER_PEER, &path("/index.html")));
    assert!(reassembler.contains(&PEER, &path("/about.html")));
    assert_eq!(reassembler.buffered_len(), 2);
}

#[test]
fn evict_expired_reports_stale_partial_transfer() {
    let mut reassembler = Reassembler::new(Duration::from_secs(2));
    let now = Instant::now();
    reassembler.ingest_at(&PEER, fragment(1, 3, "a"), now);
    reassembler.ingest_at(&PEER, fragment(2, 3, "b"), now + Duration::from_secs(1));

    assert!(reassembler.evict_expired_at(now + Duration::from_secs(1)).is_empty());

    let evicted = reassembler.evict_expired_at(now + Duration::from_secs(3));
    assert_eq!(
        evicted,
        vec![TransferKey::new(PEER, path("/index.html"))]
    );
    assert_eq!(reassembler.buffered_len(), 0);
    assert_eq!(reassembler.progress(&PEER, &path("/index.html")), None);
}

#[test]
fn eviction_timer_counts_from_buffer_creation() {
    let mut reassembler = Reassembler::new(Duration::from_secs(10));
    let now = Instant::now();
    reassembler.ingest_at(&PEER, fragment(1, 3, "a"), now);
    reassembler.ingest_at(&PEER, fragment(2, 3, "b"), now + Duration::from_secs(9));

    assert_eq!(reassembler.evict_expired_at(now + Duration::from_secs(10)).len(), 1);
}

#[rstest]
fn progress_and_missing_track_outstanding_fragments(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(2, 4, "b"));
    reassembler.ingest(&PEER, fragment(4, 4, "d"));

    let key = path("/index.html");
    assert_eq!(reassembler.progress(&PEER, &key), Some((2, index(4))));
    assert_eq!(
        reassembler.missing(&PEER, &key),
        Some(vec![index(1), index(3)])
    );
}

#[rstest]
fn cancel_drops_buffer(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(1, 2, "a"));
    assert!(reassembler.cancel(&PEER, &path("/index.html")));
    assert!(!reassembler.cancel(&PEER, &path("/index.html")));
    assert_eq!(reassembler.buffered_len(), 0);
}

#[rstest]
fn duplicate_after_completion_leaves_no_buffer(mut reassembler: Reassembler<u32>) {
    let statuses: Vec<_> = [fragment(1, 2, "a"), fragment(2, 2, "b"), fragment(2, 2, "b")]
        .into_iter()
        .map(|fragment| reassembler.ingest(&PEER, fragment))
        .collect();

    let complete = ReassemblyStatus::Complete(b"ab".to_vec());
    assert_eq!(statuses, vec![incomplete(1, 2), complete.clone(), complete]);
    assert_eq!(reassembler.buffered_len(), 0);
    assert_eq!(reassembler.completed_len(), 1);
    assert_eq!(reassembler.missing(&PEER, &path("/index.html")), None);
}

#[rstest]
fn differing_fragment_after_completion_starts_new_transfer(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(1, 1, "old"));

    assert_eq!(reassembler.ingest(&PEER, fragment(1, 2, "new")), incomplete(1, 2));
    assert_eq!(reassembler.completed_len(), 0);
    assert_eq!(reassembler.buffered_len(), 1);
}

#[test]
fn completion_record_expires_with_timeout() {
    let mut reassembler = Reassembler::new(Duration::from_secs(5));
    let now = Instant::now();
    reassembler.ingest_at(&PEER, fragment(1, 1, "a"), now);

    assert!(reassembler.evict_expired_at(now + Duration::from_secs(4)).is_empty());
    assert_eq!(reassembler.completed_len(), 1);
    assert!(reassembler.evict_expired_at(now + Duration::from_secs(5)).is_empty());
    assert_eq!(reassembler.completed_len(), 0);
}

#[rstest]
fn cancel_forgets_completed_transfer(mut reassembler: Reassembler<u32>) {
    reassembler.ingest(&PEER, fragment(1, 1, "a"));

    assert!(!reassembler.cancel(&PEER, &path("/index.html")));
    assert_eq!(reassembler.completed_len(), 0);
}
