//! Strongly typed, zero-cost identifier wrappers.
//!
//! Street ids and the node, edge and arc indices form dense `1..=N` ranges
//! once a state has been re-indexed.  The inner integer is `pub` so instance
//! writers can emit it directly; everything else should treat the ids as
//! opaque keys.

use std::fmt;
use std::hash::Hash;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// The raw integer value.
            #[inline(always)]
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

/// Ids allocated as a dense `1..=N` sequence.
///
/// Implemented by every id that [`reindex`](crate::reindex::reindex) can
/// renumber.
pub trait DenseId: Copy + Eq + Hash + Ord + fmt::Debug {
    /// The id at 1-based position `ordinal`.
    fn from_ordinal(ordinal: usize) -> Self;

    /// The id immediately after `self`.
    fn next(self) -> Self;
}

macro_rules! dense_id {
    ($($name:ident),* $(,)?) => {
        $(
            impl DenseId for $name {
                #[inline(always)]
                fn from_ordinal(ordinal: usize) -> Self {
                    $name(ordinal as u32)
                }

                #[inline(always)]
                fn next(self) -> Self {
                    $name(self.0 + 1)
                }
            }
        )*
    };
}

typed_id! {
    /// Id of a logical street and of its aligned visual street.
    pub struct StreetId(u32);
}

typed_id! {
    /// Global node index, shared by every point at the same rounded
    /// coordinate.
    pub struct NodeIndex(u32);
}

typed_id! {
    /// Index of a bidirectional street within the edge series.
    pub struct EdgeIndex(u32);
}

typed_id! {
    /// Index of a one-way street within the arc series.
    pub struct ArcIndex(u32);
}

typed_id! {
    /// Integer key of a neighborhood polygon.  Signed because host data
    /// uses `-1` for "outside every neighborhood".
    pub struct NeighborhoodId(i64);
}

dense_id!(StreetId, NodeIndex, EdgeIndex, ArcIndex);
