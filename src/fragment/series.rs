//! Per-transfer slot tracker used to re-assemble content from fragments.
//!
//! `FragmentSeries` records fragments by sequence number in any arrival
//! order. Completion is pure set membership: the series is complete once
//! every slot in `1..=total` holds data.

use super::{FragmentIndex, FragmentStatus, ReassemblyConflict};
use crate::message::Fragment;

/// Slots for the fragments of a single transfer.
#[derive(Clone, Debug)]
pub struct FragmentSeries {
    total: FragmentIndex,
    slots: Vec<Option<String>>,
    received: usize,
}

impl FragmentSeries {
    /// Create an empty series expecting `total` fragments.
    #[must_use]
    pub fn new(total: FragmentIndex) -> Self {
        Self {
            total,
            slots: vec![None; total.into()],
            received: 0,
        }
    }

    /// Number of fragments in the transfer.
    #[must_use]
    pub const fn total(&self) -> FragmentIndex { self.total }

    /// Number of distinct fragments recorded.
    #[must_use]
    pub const fn received(&self) -> usize { self.received }

    /// Whether every slot holds data.
    #[must_use]
    pub fn is_complete(&self) -> bool { self.received == self.slots.len() }

    /// Sequence numbers that have not arrived yet, in ascending order.
    #[must_use]
    pub fn missing(&self) -> Vec<FragmentIndex> {
        self.total
            .up_to()
            .zip(&self.slots)
            .filter_map(|(seq, slot)| slot.is_none().then_some(seq))
            .collect()
    }

    /// Record a fragment.
    ///
    /// # Examples
    ///
    /// ```
    /// use minihttp::{
    ///     ResourcePath,
    ///     fragment::{FragmentIndex, FragmentSeries, FragmentStatus},
    ///     message::Fragment,
    /// };
    /// let two = FragmentIndex::new(2).expect("in range");
    /// let part = |seq: FragmentIndex, data: &str| Fragment {
    ///     path: ResourcePath::new("/a").expect("valid path"),
    ///     seq,
    ///     total: two,
    ///     data: data.into(),
    /// };
    /// let mut series = FragmentSeries::new(two);
    /// assert_eq!(series.accept(&part(two, "b")), Ok(FragmentStatus::Incomplete));
    /// assert_eq!(series.accept(&part(two, "b")), Ok(FragmentStatus::Duplicate));
    /// assert_eq!(
    ///     series.accept(&part(FragmentIndex::FIRST, "a")),
    ///     Ok(FragmentStatus::Complete)
    /// );
    /// assert_eq!(series.content(), b"ab");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyConflict`] if the fragment declares a different
    /// total, lies beyond the total, or repeats a sequence number with
    /// different data. The series is left unchanged.
    pub fn accept(&mut self, fragment: &Fragment) -> Result<FragmentStatus, ReassemblyConflict> {
        if fragment.total != self.total {
            return Err(ReassemblyConflict::TotalMismatch {
                expected: self.total,
                found: fragment.total,
            });
        }
        let Some(slot) = self.slots.get_mut(fragment.seq.offset()) else {
            return Err(ReassemblyConflict::SequenceOutOfRange {
                seq: fragment.seq,
                total: self.total,
            });
        };

        match slot {
            Some(existing) if *existing == fragment.data => Ok(FragmentStatus::Duplicate),
            Some(_) => Err(ReassemblyConflict::DataMismatch { seq: fragment.seq }),
            None => {
                *slot = Some(fragment.data.clone());
                self.received += 1;
                if self.is_complete() {
                    Ok(FragmentStatus::Complete)
                } else {
                    Ok(FragmentStatus::Incomplete)
                }
            }
        }
    }

    /// Concatenate the recorded data in ascending sequence order.
    ///
    /// Missing slots contribute nothing; callers check
    /// [`is_complete`](Self::is_complete) first.
    #[must_use]
    pub fn content(&self) -> Vec<u8> {
        let len = self.slots.iter().flatten().map(String::len).sum();
        self.slots
            .iter()
            .flatten()
            .fold(Vec::with_capacity(len), |mut content, data| {
                content.extend_from_slice(data.as_bytes());
                content
            })
    }
}
