//! Dense `1..=N` renumbering.
//!
//! Every stage that removes or appends streets (or nodes) finishes with a
//! call to [`reindex`] and applies the returned [`IdMap`] to every table
//! that references the renumbered ids, in one pass.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::ids::DenseId;

/// Old id → new id, as produced by [`reindex`] or [`reindex_sorted`].
#[derive(Clone, Debug, Default)]
pub struct IdMap<K: DenseId> {
    map: FxHashMap<K, K>,
}

impl<K: DenseId> IdMap<K> {
    /// New id for `old`, or `None` if `old` was not part of the renumbering
    /// (the referencing row is an orphan).
    #[inline]
    pub fn get(&self, old: K) -> Option<K> {
        self.map.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `true` if no id changed.
    pub fn is_identity(&self) -> bool {
        self.map.iter().all(|(old, new)| old == new)
    }
}

/// Renumber `old_ids` to `1..=N` in iteration order.
///
/// Returns the new id of every input position plus the old → new map.  A
/// repeated old id keeps the mapping of its first occurrence.
pub fn reindex<K, I>(old_ids: I) -> (Vec<K>, IdMap<K>)
where
    K: DenseId,
    I: IntoIterator<Item = K>,
{
    let mut map = FxHashMap::default();
    let mut new_ids = Vec::new();
    for (pos, old) in old_ids.into_iter().enumerate() {
        let new = K::from_ordinal(pos + 1);
        map.entry(old).or_insert(new);
        new_ids.push(new);
    }
    (new_ids, IdMap { map })
}

/// Renumber the distinct values of `old_ids` to `1..=N` in ascending order.
pub fn reindex_sorted<K, I>(old_ids: I) -> IdMap<K>
where
    K: DenseId,
    I: IntoIterator<Item = K>,
{
    let unique: BTreeSet<K> = old_ids.into_iter().collect();
    let map = unique
        .into_iter()
        .enumerate()
        .map(|(pos, old)| (old, K::from_ordinal(pos + 1)))
        .collect();
    IdMap { map }
}
