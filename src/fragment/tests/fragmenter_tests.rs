//! Tests for outbound fragmentation and fragment batch helpers.

use std::num::NonZeroUsize;

use rstest::rstest;

use crate::{
    ResourcePath,
    codec::DATA_BUDGET,
    fragment::{FragmentBatch, FragmentIndex, FragmentationError, Fragmenter, MAX_CONTENT_LEN},
};

fn path() -> ResourcePath { ResourcePath::new("/index.html").expect("valid path") }

fn sizes(batch: &FragmentBatch) -> Vec<usize> {
    batch
        .fragments()
        .iter()
        .map(|fragment| fragment.data.len())
        .collect()
}

#[test]
fn fragmenter_splits_480_byte_document_into_four_fragments() {
    let content = "a".repeat(480);
    let batch = Fragmenter::new()
        .fragment(&path(), content.as_bytes())
        .expect("fragment content");

    assert_eq!(batch.len(), 4);
    assert_eq!(sizes(&batch), vec![122, 122, 122, 114]);
    for (position, fragment) in batch.fragments().iter().enumerate() {
        assert_eq!(usize::from(fragment.seq), position + 1);
        assert_eq!(fragment.total, batch.total());
        assert_eq!(fragment.path, path());
    }
    assert!(batch.fragments()[3].is_last());
}

#[test]
fn fragmenter_handles_empty_content() {
    let batch = Fragmenter::new()
        .fragment(&path(), b"")
        .expect("fragment empty content");

    assert_eq!(batch.len(), 1);
    let fragment = batch
        .fragments()
        .first()
        .expect("batch should contain at least one fragment");
    assert_eq!(fragment.seq, FragmentIndex::FIRST);
    assert_eq!(fragment.total, FragmentIndex::FIRST);
    assert!(fragment.data.is_empty());
}

#[rstest]
#[case(1, 1)]
#[case(DATA_BUDGET, 1)]
#[case(DATA_BUDGET + 1, 2)]
#[case(MAX_CONTENT_LEN, 99)]
fn fragment_count_is_ceiling_of_length(#[case] len: usize, #[case] expected: u8) {
    let content = "z".repeat(len);
    let batch = Fragmenter::new()
        .fragment(&path(), content.as_bytes())
        .expect("fragment content");
    assert_eq!(batch.total().get(), expected);
    assert_eq!(batch.len(), usize::from(expected));
}

#[test]
fn fragmenter_rejects_content_beyond_ninety_nine_fragments() {
    let content = "z".repeat(MAX_CONTENT_LEN + 1);
    assert_eq!(
        Fragmenter::new().fragment(&path(), content.as_bytes()),
        Err(FragmentationError::ContentTooLarge {
            len: MAX_CONTENT_LEN + 1,
            max_fragments: 99,
        })
    );
}

#[test]
fn fragmenter_rejects_path_over_budget() {
    let long = ResourcePath::new("/abcdefghijkl").expect("valid path");
    assert!(matches!(
        Fragmenter::new().fragment(&long, b"x"),
        Err(FragmentationError::PathTooLong { len: 13, max: 12, .. })
    ));
}

#[test]
fn fragmenter_rejects_non_utf8_content() {
    assert_eq!(
        Fragmenter::new().fragment(&path(), &[b'o', b'k', 0xff]),
        Err(FragmentationError::InvalidUtf8 { valid_up_to: 2 })
    );
}

#[test]
fn boundary_is_pulled_back_before_split_code_point() {
    // 121 ASCII bytes followed by a 3-byte character straddling byte 122.
    let content = format!("{}€tail", "a".repeat(121));
    let batch = Fragmenter::new()
        .fragment(&path(), content.as_bytes())
        .expect("fragment content");

    assert_eq!(sizes(&batch), vec![121, 7]);
    assert_eq!(batch.fragments()[1].data, "€tail");
}

#[test]
fn four_byte_code_points_survive_the_smallest_chunk_size() {
    let fragmenter =
        Fragmenter::with_chunk_size(NonZeroUsize::new(4).expect("non-zero")).expect("chunk size");
    let batch = fragmenter
        .fragment(&path(), "a🦀b".as_bytes())
        .expect("fragment content");
    let data: Vec<&str> = batch.fragments().iter().map(|f| f.data.as_str()).collect();
    assert_eq!(data, vec!["a", "🦀", "b"]);
}

#[rstest]
#[case(3)]
#[case(DATA_BUDGET + 1)]
fn chunk_size_outside_supported_range_is_refused(#[case] size: usize) {
    let size = NonZeroUsize::new(size).expect("non-zero");
    assert!(Fragmenter::with_chunk_size(size).is_none());
}

#[test]
fn batch_lookup_and_iteration_follow_sequence_order() {
    let content = "x".repeat(300);
    let batch = Fragmenter::new()
        .fragment(&path(), content.as_bytes())
        .expect("fragment content");
    let second = FragmentIndex::new(2).expect("in range");
    assert_eq!(
        batch.get(second).map(|fragment| fragment.seq),
        Some(second)
    );
    assert!(batch.get(FragmentIndex::new(4).expect("in range")).is_none());

    let rebuilt: String = batch.into_iter().map(|fragment| fragment.data).collect();
    assert_eq!(rebuilt, content);
}
