//! One-based fragment positioning with a two-digit ceiling.
//!
//! Provides [`FragmentIndex`], a checked wrapper around `u8` restricted to
//! `1..=99`. The same type describes both a fragment's sequence number and the
//! total fragment count of a transfer, since both share the wire budget.

use derive_more::Display;

/// One-based ordinal in `1..=99`.
///
/// # Examples
///
/// ```
/// use minihttp::fragment::FragmentIndex;
/// let index = FragmentIndex::new(3).expect("in range");
/// assert_eq!(index.get(), 3);
/// assert!(FragmentIndex::new(0).is_none());
/// assert!(FragmentIndex::MAX.checked_increment().is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct FragmentIndex(u8);

impl FragmentIndex {
    /// The first fragment of every transfer.
    pub const FIRST: Self = Self(1);
    /// Largest value the two-digit wire fields can carry.
    pub const MAX: Self = Self(99);

    /// Construct an index, returning `None` outside `1..=99`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::FIRST.0 && value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Return the underlying numeric value.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Position of this fragment in a zero-based collection.
    #[must_use]
    pub const fn offset(self) -> usize { self.0 as usize - 1 }

    /// Increment the index, returning `None` once past [`Self::MAX`].
    #[must_use]
    pub const fn checked_increment(self) -> Option<Self> { Self::new(self.0 + 1) }

    /// Iterate `1..=self`.
    pub fn up_to(self) -> impl Iterator<Item = Self> { (Self::FIRST.0..=self.0).map(Self) }
}

impl TryFrom<u64> for FragmentIndex {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(value)
    }
}

impl TryFrom<usize> for FragmentIndex {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(value)
    }
}

impl From<FragmentIndex> for u8 {
    fn from(value: FragmentIndex) -> Self { value.0 }
}

impl From<FragmentIndex> for usize {
    fn from(value: FragmentIndex) -> Self { usize::from(value.0) }
}
