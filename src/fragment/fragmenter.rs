//! Outbound helper that splits resource content into wire fragments.
//!
//! [`Fragmenter`] cuts UTF-8 content into chunks of at most
//! [`DATA_BUDGET`](crate::codec::DATA_BUDGET) bytes, pulling each cut back to
//! the preceding code-point boundary so every fragment's `data` stays valid
//! text. Sequence numbers are one-based and contiguous.

use std::num::NonZeroUsize;

use super::{FragmentIndex, FragmentationError};
use crate::{
    ResourcePath,
    codec::{DATA_BUDGET, PATH_BUDGET},
    message::Fragment,
};

/// Smallest chunk size that can always hold one UTF-8 code point.
pub const MIN_CHUNK_SIZE: usize = 4;

const FULL_CHUNK: NonZeroUsize = match NonZeroUsize::new(DATA_BUDGET) {
    Some(size) => size,
    None => panic!("data budget must be non-zero"),
};

/// Largest content that is guaranteed to fit in the fragment ceiling.
pub const MAX_CONTENT_LEN: usize = DATA_BUDGET * FragmentIndex::MAX.get() as usize;

/// Splits resource content into fragment-sized chunks.
#[derive(Clone, Copy, Debug)]
pub struct Fragmenter {
    chunk_size: NonZeroUsize,
}

impl Default for Fragmenter {
    fn default() -> Self { Self::new() }
}

impl Fragmenter {
    /// Create a fragmenter using the full data budget per fragment.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunk_size: FULL_CHUNK,
        }
    }

    /// Create a fragmenter with a smaller chunk size.
    ///
    /// Returns `None` unless `chunk_size` lies in
    /// `MIN_CHUNK_SIZE..=DATA_BUDGET`.
    #[must_use]
    pub fn with_chunk_size(chunk_size: NonZeroUsize) -> Option<Self> {
        (MIN_CHUNK_SIZE..=DATA_BUDGET)
            .contains(&chunk_size.get())
            .then_some(Self { chunk_size })
    }

    /// Return the maximum chunk size in bytes.
    #[must_use]
    pub const fn chunk_size(&self) -> NonZeroUsize { self.chunk_size }

    /// Split `content` into the fragments of one transfer of `path`.
    ///
    /// Empty content yields exactly one fragment with empty data.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::PathTooLong`] if the path exceeds its
    /// budget, [`FragmentationError::InvalidUtf8`] if the content is not text,
    /// and [`FragmentationError::ContentTooLarge`] if more than 99 fragments
    /// would be needed.
    pub fn fragment(
        &self,
        path: &ResourcePath,
        content: &[u8],
    ) -> Result<FragmentBatch, FragmentationError> {
        if path.encoded_len() > PATH_BUDGET {
            return Err(FragmentationError::PathTooLong {
                path: path.to_string(),
                len: path.encoded_len(),
                max: PATH_BUDGET,
            });
        }
        let text = std::str::from_utf8(content).map_err(|err| FragmentationError::InvalidUtf8 {
            valid_up_to: err.valid_up_to(),
        })?;

        let chunks = self.split(text)?;
        let total = FragmentIndex::try_from(chunks.len()).map_err(|_| {
            FragmentationError::ContentTooLarge {
                len: content.len(),
                max_fragments: FragmentIndex::MAX.into(),
            }
        })?;
        let fragments = total
            .up_to()
            .zip(chunks)
            .map(|(seq, data)| Fragment {
                path: path.clone(),
                seq,
                total,
                data: data.to_owned(),
            })
            .collect();
        Ok(FragmentBatch::new(path.clone(), fragments))
    }

    fn split<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, FragmentationError> {
        let max = self.chunk_size.get();
        let limit = usize::from(FragmentIndex::MAX);
        if text.is_empty() {
            return Ok(vec![""]);
        }

        let mut chunks = Vec::with_capacity(text.len().div_ceil(max).min(limit));
        let mut offset = 0;
        while offset < text.len() {
            if chunks.len() == limit {
                return Err(FragmentationError::ContentTooLarge {
                    len: text.len(),
                    max_fragments: limit,
                });
            }
            let mut end = (offset + max).min(text.len());
            // The chunk size admits at least one full code point, so `end`
            // never falls back to `offset`.
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            chunks.push(&text[offset..end]);
            offset = end;
        }
        Ok(chunks)
    }
}

/// Fragments produced for one transfer, ordered by sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    path: ResourcePath,
    fragments: Vec<Fragment>,
}

impl FragmentBatch {
    fn new(path: ResourcePath, fragments: Vec<Fragment>) -> Self {
        debug_assert!(!fragments.is_empty(), "fragment batches must not be empty");
        Self { path, fragments }
    }

    /// Path shared by all fragments.
    #[must_use]
    pub fn path(&self) -> &ResourcePath { &self.path }

    /// Return the fragments as a slice.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] { self.fragments.as_slice() }

    /// Number of fragments in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Total fragment count declared on every fragment.
    #[must_use]
    pub fn total(&self) -> FragmentIndex {
        self.fragments
            .first()
            .map_or(FragmentIndex::FIRST, |fragment| fragment.total)
    }

    /// Look up a single fragment by sequence number.
    #[must_use]
    pub fn get(&self, seq: FragmentIndex) -> Option<&Fragment> { self.fragments.get(seq.offset()) }

    /// Consume the batch, returning all fragments.
    #[must_use]
    pub fn into_fragments(self) -> Vec<Fragment> { self.fragments }
}

impl IntoIterator for FragmentBatch {
    type Item = Fragment;
    type IntoIter = std::vec::IntoIter<Fragment>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.into_iter() }
}
